use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

const USER_AGENT: &str = concat!("octagon_oracle/", env!("CARGO_PKG_VERSION"));

/// Blocking client for the generation service. `timeout: None` disables the
/// per-request deadline.
pub fn build_http_client(timeout: Option<Duration>) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("failed to build http client")
}
