//! HTTP client construction shared by handler dispatch.

use std::time::Duration;

use reqwest::{
    Client,
    header::{self, HeaderMap, HeaderValue},
};

/// Default connect timeout applied to handler clients.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds a client that sends and accepts JSON.
///
/// Request deadlines are applied per request by the caller; this only bounds
/// connection establishment.
pub fn build_json_client(connect_timeout: Duration) -> reqwest::Result<Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(header::ACCEPT, HeaderValue::from_static(super::JSON_MEDIA_TYPE));

    Client::builder()
        .connect_timeout(connect_timeout)
        .default_headers(default_headers)
        .user_agent(concat!("lambdachain/", env!("CARGO_PKG_VERSION")))
        .build()
}
