//! Shared HTTP/runner-building helpers reused by every concrete adapter, so
//! each adapter file only needs to describe its source's wire shape.

use super::RawPayload;
use crate::domain::{OddsData, Runner};
use crate::error::PaddockError;

pub async fn fetch_text(url: &str, adapter_name: &str, headers: &[(&str, &str)]) -> Result<RawPayload, PaddockError> {
    let client = reqwest::Client::new();
    let mut request = client.get(url);
    for (k, v) in headers {
        request = request.header(*k, *v);
    }
    let response = request
        .send()
        .await
        .map_err(|e| PaddockError::Network { adapter: adapter_name.to_string(), reason: e.to_string() })?;

    let status = response.status();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(PaddockError::Authentication { adapter: adapter_name.to_string() });
    }
    if !status.is_success() {
        return Err(PaddockError::Http { status: status.as_u16(), url: url.to_string() });
    }

    let text = response
        .text()
        .await
        .map_err(|e| PaddockError::Network { adapter: adapter_name.to_string(), reason: e.to_string() })?;
    Ok(RawPayload::Text(text))
}

pub fn build_runner(source_name: &str, raw_name: &str, number: u32, scratched: bool, raw_price: Option<&str>) -> Runner {
    let mut runner = Runner::new(raw_name, number);
    runner.scratched = scratched;
    if let Some(price) = raw_price {
        if let Some(win) = crate::domain::parse_odds(price) {
            let mut odds = OddsData::new(source_name);
            odds.win = Some(win);
            runner.odds.insert(source_name.to_string(), odds);
        }
    }
    runner
}
