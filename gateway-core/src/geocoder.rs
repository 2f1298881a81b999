use async_trait::async_trait;
use std::fmt::Debug;

use crate::{client::ProviderClient, error::GatewayError, model::Coordinates};

/// Resolves a place name to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// `city` is already trimmed and non-empty.
    async fn resolve(&self, city: &str) -> Result<Coordinates, GatewayError>;
}

/// Geocoder backed by the provider's direct-geocoding endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherGeocoder {
    client: ProviderClient,
}

impl OpenWeatherGeocoder {
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Geocoder for OpenWeatherGeocoder {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn resolve(&self, city: &str) -> Result<Coordinates, GatewayError> {
        const LABEL: &str = "geocoding";

        let path = &self.client.endpoints().geocoding;
        let body = self
            .client
            .get_json(LABEL, path, &[("q", city.to_string()), ("limit", "1".to_string())])
            .await?;

        let matches: Vec<Coordinates> =
            serde_json::from_value(body).map_err(|err| GatewayError::UpstreamDecode {
                label: LABEL,
                reason: err.to_string(),
            })?;

        let first = matches
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::CityNotFound(city.to_string()))?;

        tracing::debug!(lat = first.latitude, lon = first.longitude, "resolved {city}");
        Ok(first)
    }
}
