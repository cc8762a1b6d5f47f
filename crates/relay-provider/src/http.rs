//! JSON over HTTP for hosted model endpoints

use crate::error::{ProviderError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

/// Request timeout for hosted endpoints
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// POST `body` as JSON and decode the JSON answer
pub(crate) async fn post_json<T, R>(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    api_key: Option<&str>,
    body: &T,
) -> Result<R>
where
    T: Serialize + ?Sized,
    R: DeserializeOwned,
{
    debug!("Sending request to {}: {}", provider, url);

    let mut request = client.post(url).json(body);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(|e| {
        error!("{} request failed: {}", provider, e);
        e
    })?;

    let status = response.status();
    let text = response.text().await?;
    debug!("{} response status: {}", provider, status);

    if !status.is_success() {
        return Err(ProviderError::Api {
            provider: provider.to_string(),
            status: status.as_u16(),
            body: text,
        });
    }

    serde_json::from_str(&text).map_err(|e| ProviderError::InvalidResponse {
        provider: provider.to_string(),
        reason: format!("Parse error: {e}. Raw: {}", text.chars().take(200).collect::<String>()),
    })
}
