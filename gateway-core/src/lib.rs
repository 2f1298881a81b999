//! Core library for the weather gateway.
//!
//! This crate defines:
//! - Configuration & credential handling
//! - The table of supported methods and their parameter rules
//! - Upstream access (weather queries and geocoding)
//! - The dispatcher that turns a request into a stream of events
//!
//! It is used by the `weather-gateway` server, but has no HTTP server of its own.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod geocoder;
pub mod model;
pub mod operation;

pub use client::ProviderClient;
pub use config::{API_KEY_ENV, ApiKey, Config, Endpoints, LogFormat, ProviderConfig, ServerConfig};
pub use dispatcher::Dispatcher;
pub use error::{ErrorKind, GatewayError};
pub use geocoder::{Geocoder, OpenWeatherGeocoder};
pub use model::{Coordinates, OperationRequest, OutgoingEvent};
