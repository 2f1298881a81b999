use async_stream::stream;
use futures::Stream;
use serde_json::Value;
use std::sync::Arc;

use crate::{
    Config,
    client::ProviderClient,
    error::GatewayError,
    geocoder::{Geocoder, OpenWeatherGeocoder},
    model::{OperationRequest, OutgoingEvent},
    operation::{self, LocationInput},
};

/// Turns one [`OperationRequest`] into one provider round trip and a short
/// stream of events describing it.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: ProviderClient,
    geocoder: Arc<dyn Geocoder>,
}

impl Dispatcher {
    pub fn new(client: ProviderClient, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { client, geocoder }
    }

    /// Dispatcher using the provider's own geocoding endpoint.
    pub fn with_provider_geocoder(client: ProviderClient) -> Self {
        let geocoder = Arc::new(OpenWeatherGeocoder::new(client.clone()));
        Self::new(client, geocoder)
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::with_provider_geocoder(ProviderClient::from_config(config)?))
    }

    /// Event stream for `request`: `[Result, Done]` on success, `[Error]`
    /// otherwise. Nothing runs until the stream is polled, and dropping it
    /// abandons any call in flight.
    pub fn handle(
        &self,
        request: OperationRequest,
    ) -> impl Stream<Item = OutgoingEvent> + Send + 'static {
        let this = self.clone();
        stream! {
            let id = request.id.clone();
            match this.execute(&request).await {
                Ok(payload) => {
                    yield OutgoingEvent::Result { id: id.clone(), payload };
                    yield OutgoingEvent::Done { id };
                }
                Err(err) => {
                    tracing::info!(method = %request.method, kind = ?err.kind(), "request failed: {err}");
                    yield OutgoingEvent::Error { id, message: err.to_string() };
                }
            }
        }
    }

    /// Event stream for a request body that could not be decoded.
    pub fn reject(id: Value, err: GatewayError) -> impl Stream<Item = OutgoingEvent> + Send + 'static {
        tracing::info!(kind = ?err.kind(), "rejected request: {err}");
        futures::stream::once(async move { OutgoingEvent::Error { id, message: err.to_string() } })
    }

    /// Validate, resolve and fetch; the provider body is returned verbatim.
    #[tracing::instrument(level = "debug", skip(self, request), fields(method = %request.method))]
    pub async fn execute(&self, request: &OperationRequest) -> Result<Value, GatewayError> {
        let op = operation::lookup(&request.method)
            .ok_or_else(|| GatewayError::UnknownMethod(request.method.clone()))?;
        let params = op.validate(&request.params)?;

        let mut query: Vec<(&str, String)> = Vec::with_capacity(5);
        match params.location {
            LocationInput::Name(name) => query.push(("q", name)),
            LocationInput::City(city) => {
                let coords = self.geocoder.resolve(&city).await?;
                query.push(("lat", coords.latitude.to_string()));
                query.push(("lon", coords.longitude.to_string()));
            }
            LocationInput::Coordinates(coords) => {
                query.push(("lat", coords.latitude.to_string()));
                query.push(("lon", coords.longitude.to_string()));
            }
        }
        query.extend(params.forwarded);
        query.push(("units", "metric".to_string()));

        let path = op.endpoint.path(self.client.endpoints());
        self.client.get_json(op.endpoint.label(), path, &query).await
    }
}
