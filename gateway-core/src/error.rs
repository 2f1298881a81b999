use thiserror::Error;

/// Broad classification of a request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected locally before any network call.
    Validation,
    /// Geocoding produced no match.
    NotFound,
    /// The provider call failed or returned something unusable.
    Upstream,
}

/// Everything that can end a request with an error event.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown method '{0}'")]
    UnknownMethod(String),

    #[error("Missing param: {name}{}", hint_suffix(.hint))]
    MissingParam {
        name: &'static str,
        hint: Option<&'static str>,
    },

    #[error("Invalid param: {name} ({reason})")]
    InvalidParam { name: &'static str, reason: String },

    #[error("Provide either city or lat & lon")]
    MissingLocation,

    #[error("City '{0}' not found")]
    CityNotFound(String),

    #[error("OpenWeather {label} request failed with status {status}: {body}")]
    UpstreamStatus {
        label: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("OpenWeather {label} request timed out")]
    UpstreamTimeout { label: &'static str },

    #[error("Failed to send request to OpenWeather ({label}): {source}")]
    UpstreamTransport {
        label: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse OpenWeather {label} JSON: {reason}")]
    UpstreamDecode { label: &'static str, reason: String },
}

fn hint_suffix(hint: &Option<&str>) -> String {
    hint.map(|h| format!(" ({h})")).unwrap_or_default()
}

impl GatewayError {
    pub fn missing(name: &'static str) -> Self {
        Self::MissingParam { name, hint: None }
    }

    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParam { name, reason: reason.into() }
    }

    /// Map a `reqwest` failure for the given call onto the upstream variants.
    pub fn transport(label: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::UpstreamTimeout { label }
        } else {
            Self::UpstreamTransport { label, source }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_)
            | Self::UnknownMethod(_)
            | Self::MissingParam { .. }
            | Self::InvalidParam { .. }
            | Self::MissingLocation => ErrorKind::Validation,
            Self::CityNotFound(_) => ErrorKind::NotFound,
            Self::UpstreamStatus { .. }
            | Self::UpstreamTimeout { .. }
            | Self::UpstreamTransport { .. }
            | Self::UpstreamDecode { .. } => ErrorKind::Upstream,
        }
    }
}
