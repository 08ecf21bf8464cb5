//! JSON-lines persisted prediction store (spec §6.3).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::domain::Prediction;
use crate::error::PaddockError;

/// Append-only JSON-lines file, one [`Prediction`] per line. Reads tolerate
/// lines from older schema versions by skipping anything that fails to
/// deserialize rather than failing the whole load.
pub struct PredictionStore {
    path: PathBuf,
}

impl PredictionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load_all(&self) -> Result<Vec<Prediction>, PaddockError> {
        if !Path::new(&self.path).exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)
            .await
            .map_err(|e| PaddockError::Configuration { adapter: "prediction_store".into(), reason: format!("reading: {e}") })?;

        let mut predictions = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Prediction>(line) {
                Ok(p) => predictions.push(p),
                Err(e) => warn!(line = idx, error = %e, "skipping unreadable prediction record"),
            }
        }
        Ok(predictions)
    }

    /// Appends new predictions. Does not deduplicate by `race_id` — callers
    /// are expected to only append freshly generated tips.
    pub async fn append(&self, predictions: &[Prediction]) -> Result<(), PaddockError> {
        if predictions.is_empty() {
            return Ok(());
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| PaddockError::Configuration { adapter: "prediction_store".into(), reason: format!("opening: {e}") })?;

        let mut buf = String::new();
        for prediction in predictions {
            let line = serde_json::to_string(prediction)
                .map_err(|e| PaddockError::Configuration { adapter: "prediction_store".into(), reason: format!("serializing: {e}") })?;
            buf.push_str(&line);
            buf.push('\n');
        }
        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| PaddockError::Configuration { adapter: "prediction_store".into(), reason: format!("writing: {e}") })?;
        Ok(())
    }

    /// Rewrites the whole file with `predictions`, replacing prior contents.
    /// Used after an audit pass updates verdicts on existing records.
    pub async fn replace_all(&self, predictions: &[Prediction]) -> Result<(), PaddockError> {
        let mut buf = String::new();
        for prediction in predictions {
            let line = serde_json::to_string(prediction)
                .map_err(|e| PaddockError::Configuration { adapter: "prediction_store".into(), reason: format!("serializing: {e}") })?;
            buf.push_str(&line);
            buf.push('\n');
        }
        fs::write(&self.path, buf)
            .await
            .map_err(|e| PaddockError::Configuration { adapter: "prediction_store".into(), reason: format!("rewriting: {e}") })?;
        Ok(())
    }

    /// Merges `audited` (by `race_id` + `selection_number`) into the full
    /// on-disk set and rewrites the file once.
    pub async fn apply_audit_results(&self, audited: Vec<Prediction>) -> Result<(), PaddockError> {
        if audited.is_empty() {
            return Ok(());
        }
        let mut all = self.load_all().await?;
        let mut by_key: HashMap<(String, Option<u32>), usize> = HashMap::new();
        for (idx, p) in all.iter().enumerate() {
            by_key.insert((p.race_id.clone(), p.selection_number), idx);
        }
        for updated in audited {
            let key = (updated.race_id.clone(), updated.selection_number);
            if let Some(&idx) = by_key.get(&key) {
                all[idx] = updated;
            } else {
                all.push(updated);
            }
        }
        self.replace_all(&all).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Discipline;
    use chrono::Utc;

    fn prediction(race_id: &str) -> Prediction {
        Prediction {
            race_id: race_id.into(),
            venue: "Aqueduct".into(),
            race_number: 1,
            start_time: Utc::now(),
            discipline: Discipline::Thoroughbred,
            selection_number: Some(3),
            selection_name: "Horse".into(),
            top_5: vec![],
            predicted_2nd_fav_odds: None,
            is_goldmine: false,
            audit_completed: false,
            verdict: None,
            net_profit: None,
            actual_top_5: None,
            actual_2nd_fav_odds: None,
            selection_position: None,
            trifecta_payout: None,
            trifecta_combination: None,
            superfecta_payout: None,
            superfecta_combination: None,
            top1_place_payout: None,
            top2_place_payout: None,
            audit_timestamp: None,
        }
    }

    #[tokio::test]
    async fn roundtrips_append_and_load() {
        let dir = std::env::temp_dir().join(format!("paddock_predictions_{}", uuid::Uuid::new_v4()));
        let store = PredictionStore::new(dir.clone());
        store.append(&[prediction("r1"), prediction("r2")]).await.unwrap();
        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        let _ = fs::remove_file(dir).await;
    }

    #[tokio::test]
    async fn apply_audit_results_updates_existing_record() {
        let dir = std::env::temp_dir().join(format!("paddock_predictions_{}", uuid::Uuid::new_v4()));
        let store = PredictionStore::new(dir.clone());
        store.append(&[prediction("r1")]).await.unwrap();

        let mut updated = prediction("r1");
        updated.audit_completed = true;
        updated.verdict = Some(crate::domain::Verdict::Cashed);
        store.apply_audit_results(vec![updated]).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].audit_completed);
        let _ = fs::remove_file(dir).await;
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = std::env::temp_dir().join(format!("paddock_predictions_missing_{}", uuid::Uuid::new_v4()));
        let store = PredictionStore::new(dir);
        assert!(store.load_all().await.unwrap().is_empty());
    }
}
