use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;

use crate::{
    config::{ApiKey, Config, Endpoints},
    error::GatewayError,
};

/// Thin wrapper around the provider's HTTP API.
///
/// Holds the credential and base URL; every call is a single GET whose JSON
/// body is returned untouched. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: Client,
    base_url: Arc<str>,
    api_key: ApiKey,
    endpoints: Arc<Endpoints>,
}

impl ProviderClient {
    /// Build a client from validated config; fails if the credential is
    /// missing or the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api_key()?;
        let http = Client::builder()
            .timeout(config.timeout()?)
            .user_agent(concat!("weather-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::new(http, &config.provider.base_url, api_key, config.provider.endpoints.clone()))
    }

    pub fn new(http: Client, base_url: &str, api_key: ApiKey, endpoints: Endpoints) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').into(),
            api_key,
            endpoints: Arc::new(endpoints),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` with `query` plus the credential; decode the body as JSON.
    #[tracing::instrument(level = "debug", skip(self, query))]
    pub async fn get_json(
        &self,
        label: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, GatewayError> {
        let url = self.url(path);

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.expose())])
            .send()
            .await
            .map_err(|err| GatewayError::transport(label, err))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|err| GatewayError::transport(label, err))?;

        if !status.is_success() {
            tracing::warn!(%status, %url, "{label}: provider returned an error");
            return Err(GatewayError::UpstreamStatus {
                label,
                status,
                body: truncate_body(&body),
            });
        }
        tracing::debug!(%status, %url, bytes = body.len(), "{label}: provider responded");

        serde_json::from_str(&body).map_err(|err| GatewayError::UpstreamDecode {
            label,
            reason: err.to_string(),
        })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
