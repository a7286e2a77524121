// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resource fetching
//!
//! Loaders never talk to the network directly; they go through a
//! [`Fetcher`] so hosts can add auth, proxies or offline fixtures.

use crate::error::{LoadError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use url::Url;

/// Header name to value, forwarded verbatim to every authenticated fetch.
///
/// Ordered so the same headers always produce the same signature.
pub type AuthHeaders = BTreeMap<String, String>;

/// Stable text form of a header set, used in cache keys
pub fn auth_signature(headers: &AuthHeaders) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}={}", name.to_ascii_lowercase(), value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Retrieves the raw bytes behind a resolved URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, headers: &AuthHeaders) -> Result<Vec<u8>>;
}

/// HTTP(S) through reqwest, `file://` through the filesystem
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn fetch_file(&self, url: &str) -> Result<Vec<u8>> {
        let path = Url::parse(url)
            .ok()
            .and_then(|u| u.to_file_path().ok())
            .ok_or_else(|| LoadError::fetch(url, "not a local file URL"))?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| LoadError::fetch(url, e))
    }

    fn header_map(url: &str, headers: &AuthHeaders) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| LoadError::fetch(url, format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| LoadError::fetch(url, format!("invalid value for header {name}: {e}")))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, headers: &AuthHeaders) -> Result<Vec<u8>> {
        if url.starts_with("file:") {
            return self.fetch_file(url).await;
        }

        let resp = self
            .http
            .get(url)
            .headers(Self::header_map(url, headers)?)
            .send()
            .await
            .map_err(|e| LoadError::fetch(url, format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(LoadError::fetch(url, format!("status {}", resp.status())));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| LoadError::fetch(url, format!("reading body failed: {e}")))?;

        tracing::debug!(url = %url, size = body.len(), "Fetched resource");
        Ok(body.to_vec())
    }
}
