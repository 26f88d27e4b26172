mod basic;
mod client;
pub mod auth;
pub mod retry;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use retry::{RetryPolicy, with_retry};

use anyhow::{Result, bail};

/// GETs `url` and decodes the body as JSON. Non-2xx statuses are errors.
pub async fn fetch_json<C: HttpClient>(client: &C, url: &str) -> Result<serde_json::Value> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        bail!("HTTP {}", status);
    }
    Ok(resp.json().await?)
}
