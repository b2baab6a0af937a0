//! Minimal JSON-RPC client for the deployment backend.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

/// Timeout applied to every request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between receipt polls while a transaction is pending.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
}

/// Build the HTTP client shared by every call to one endpoint.
///
/// # Returns
/// A client whose requests time out after ten seconds.
pub fn create_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Call `method` on the endpoint and decode its `result`.
///
/// # Arguments
/// * `client` - Client from [`create_client`]
/// * `url` - The JSON-RPC endpoint
/// * `method` - The RPC method name, e.g. `eth_sendTransaction`
/// * `params` - Positional method parameters
///
/// # Returns
/// The decoded `result`. A `null` result decodes into `Option::None` for
/// optional targets. An `error` object fails with its code and message.
pub async fn call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> Result<T> {
    let request = Request {
        jsonrpc: "2.0",
        id: 1,
        method,
        params,
    };

    let response: Response = client
        .post(url.clone())
        .json(&request)
        .send()
        .await
        .with_context(|| format!("Failed to send {} request to {}", method, url))?
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    decode(method, response)
}

fn decode<T: DeserializeOwned>(method: &str, response: Response) -> Result<T> {
    if let Some(error) = response.error {
        anyhow::bail!("{} failed with RPC error {}: {}", method, error.code, error.message);
    }

    serde_json::from_value(response.result.unwrap_or(Value::Null))
        .with_context(|| format!("Unexpected {} result", method))
}
