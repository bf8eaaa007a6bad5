use std::time::Duration;

use reqwest::blocking::Client;
use tracing::info;

use crate::error::Result;

pub mod bsplayer;
pub mod soap;
pub mod subdivx;
pub mod subdivx_page;

/// Blocking client with the session's proxy (if any) applied to every scheme.
/// Connections are never reused: both services close them after each reply.
pub fn build_client(timeout: Duration, proxy: Option<&str>, user_agent: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(0);
    if let Some(address) = proxy {
        info!("Requests with proxy {address}");
        builder = builder.proxy(reqwest::Proxy::all(format!("http://{address}"))?);
    }
    if let Some(user_agent) = user_agent {
        builder = builder.user_agent(user_agent.to_string());
    }
    Ok(builder.build()?)
}

/// Connection failures, timeouts and connections dropped before a reply are
/// worth another attempt; anything else is final.
pub fn is_transport_failure(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}
