//! Static table of supported methods.
//!
//! Each method is described by data; [`crate::Dispatcher`] runs every one of
//! them through the same execution path.

use serde_json::{Map, Value};

use crate::{config::Endpoints, error::GatewayError, model::Coordinates};

/// Which upstream path a method calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Current,
    Forecast,
    OneCall,
    TimeMachine,
}

impl Endpoint {
    pub fn path(self, endpoints: &Endpoints) -> &str {
        match self {
            Self::Current => &endpoints.current,
            Self::Forecast => &endpoints.forecast,
            Self::OneCall => &endpoints.one_call,
            Self::TimeMachine => &endpoints.time_machine,
        }
    }

    /// Short name used in logs and error messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Forecast => "forecast",
            Self::OneCall => "one-call",
            Self::TimeMachine => "time-machine",
        }
    }
}

/// How a method turns params into a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationMode {
    /// `city` is required and sent as `q`.
    CityName,
    /// `city` (geocoded) or `lat` & `lon`, sent as coordinates.
    Coordinates,
}

/// A required integer param forwarded verbatim to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardedParam {
    pub name: &'static str,
    pub hint: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub method: &'static str,
    pub location: LocationMode,
    pub endpoint: Endpoint,
    pub forwarded: &'static [ForwardedParam],
}

pub const OPERATIONS: &[Operation] = &[
    Operation {
        method: "weather.current",
        location: LocationMode::CityName,
        endpoint: Endpoint::Current,
        forwarded: &[],
    },
    Operation {
        method: "weather.forecast",
        location: LocationMode::CityName,
        endpoint: Endpoint::Forecast,
        forwarded: &[],
    },
    Operation {
        method: "weather.everything",
        location: LocationMode::Coordinates,
        endpoint: Endpoint::OneCall,
        forwarded: &[],
    },
    Operation {
        method: "weather.historical",
        location: LocationMode::Coordinates,
        endpoint: Endpoint::TimeMachine,
        forwarded: &[ForwardedParam { name: "dt", hint: Some("UNIX timestamp") }],
    },
];

pub fn lookup(method: &str) -> Option<&'static Operation> {
    OPERATIONS.iter().find(|op| op.method == method)
}

/// Location as supplied by the caller, before any geocoding.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    /// Sent to the provider as-is.
    Name(String),
    /// Must be geocoded before the weather call.
    City(String),
    Coordinates(Coordinates),
}

/// Params that passed validation for a given [`Operation`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedParams {
    pub location: LocationInput,
    pub forwarded: Vec<(&'static str, String)>,
}

impl Operation {
    /// Check `params` against this operation without touching the network.
    pub fn validate(&self, params: &Map<String, Value>) -> Result<ValidatedParams, GatewayError> {
        let forwarded = self
            .forwarded
            .iter()
            .map(|param| Ok((param.name, integer_param(params, param)?.to_string())))
            .collect::<Result<Vec<_>, GatewayError>>()?;

        let location = match self.location {
            LocationMode::CityName => LocationInput::Name(
                city_param(params)?.ok_or_else(|| GatewayError::missing("city"))?,
            ),
            LocationMode::Coordinates => match city_param(params)? {
                Some(city) => LocationInput::City(city),
                None => LocationInput::Coordinates(coordinates_param(params)?),
            },
        };

        Ok(ValidatedParams { location, forwarded })
    }
}

/// Absent, null and blank strings all count as "not given".
fn city_param(params: &Map<String, Value>) -> Result<Option<String>, GatewayError> {
    match params.get("city") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(GatewayError::invalid("city", "expected a string")),
    }
}

fn coordinates_param(params: &Map<String, Value>) -> Result<Coordinates, GatewayError> {
    let lat = number_param(params, "lat")?;
    let lon = number_param(params, "lon")?;

    let (Some(latitude), Some(longitude)) = (lat, lon) else {
        return Err(GatewayError::MissingLocation);
    };

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(GatewayError::invalid("lat", "must be within -90..=90"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(GatewayError::invalid("lon", "must be within -180..=180"));
    }

    Ok(Coordinates::new(latitude, longitude))
}

fn number_param(params: &Map<String, Value>, name: &'static str) -> Result<Option<f64>, GatewayError> {
    let value = match params.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    value
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| GatewayError::invalid(name, "expected a number"))
}

fn integer_param(params: &Map<String, Value>, param: &ForwardedParam) -> Result<i64, GatewayError> {
    let missing = || GatewayError::MissingParam { name: param.name, hint: param.hint };

    let value = match params.get(param.name) {
        None | Some(Value::Null) => return Err(missing()),
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Some(Value::String(s)) if s.trim().is_empty() => return Err(missing()),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    value.ok_or_else(|| GatewayError::invalid(param.name, "expected an integer"))
}

/// `1.7e9` style values that still name a whole number.
fn integral(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}
