use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::ProviderError;

pub(crate) fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// POST a JSON body and decode a JSON response. One attempt, no retries.
pub(crate) fn post_json<B, R>(
    agent: &ureq::Agent,
    url: &str,
    headers: &[(&str, &str)],
    body: &B,
    timeout: Duration,
) -> Result<R, ProviderError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let request_json = serde_json::to_string(body)
        .map_err(|e| ProviderError::Transport(format!("failed to encode request: {}", e)))?;

    debug!("POST {} ({} bytes)", url, request_json.len());

    let mut request = agent.post(url).header("Content-Type", "application/json");
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response_text = request
        .send(&request_json)
        .and_then(|mut resp| resp.body_mut().read_to_string())
        .map_err(|e| classify(e, timeout))?;

    decode(&response_text)
}

/// GET a JSON document
pub(crate) fn get_json<R: DeserializeOwned>(
    agent: &ureq::Agent,
    url: &str,
    timeout: Duration,
) -> Result<R, ProviderError> {
    debug!("GET {}", url);

    let response_text = agent
        .get(url)
        .call()
        .and_then(|mut resp| resp.body_mut().read_to_string())
        .map_err(|e| classify(e, timeout))?;

    decode(&response_text)
}

fn decode<R: DeserializeOwned>(response_text: &str) -> Result<R, ProviderError> {
    serde_json::from_str(response_text).map_err(|e| {
        warn!("Could not decode provider response: {}", e);
        ProviderError::MalformedResponse(e.to_string())
    })
}

pub(crate) fn classify(error: ureq::Error, timeout: Duration) -> ProviderError {
    match error {
        ureq::Error::StatusCode(429) => ProviderError::RateLimited,
        ureq::Error::StatusCode(status @ (401 | 403)) => ProviderError::Auth(status),
        ureq::Error::StatusCode(status) => ProviderError::Status(status),
        ureq::Error::Timeout(_) => ProviderError::Timeout(timeout),
        other => ProviderError::Transport(other.to_string()),
    }
}
