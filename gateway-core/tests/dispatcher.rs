//! Dispatcher behaviour against a mock provider.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use weather_gateway_core::{
    ApiKey, Coordinates, Dispatcher, Endpoints, GatewayError, Geocoder, OperationRequest,
    OutgoingEvent, ProviderClient,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "TEST_KEY";

fn provider(server: &MockServer) -> ProviderClient {
    provider_with_timeout(server, Duration::from_secs(5))
}

fn provider_with_timeout(server: &MockServer, timeout: Duration) -> ProviderClient {
    let http = reqwest::Client::builder().timeout(timeout).build().unwrap();
    ProviderClient::new(http, &server.uri(), ApiKey::new(KEY).unwrap(), Endpoints::default())
}

/// Geocoder double that records how often it is asked.
#[derive(Debug)]
struct CountingGeocoder {
    calls: AtomicUsize,
    answer: Option<Coordinates>,
}

impl CountingGeocoder {
    fn answering(answer: Option<Coordinates>) -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), answer })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for CountingGeocoder {
    async fn resolve(&self, city: &str) -> Result<Coordinates, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.ok_or_else(|| GatewayError::CityNotFound(city.to_string()))
    }
}

async fn run(dispatcher: &Dispatcher, method_name: &str, params: Value) -> Vec<OutgoingEvent> {
    let request = OperationRequest::new(json!("req-1"), method_name, params);
    dispatcher.handle(request).collect().await
}

fn error_message(events: &[OutgoingEvent]) -> &str {
    match events {
        [OutgoingEvent::Error { message, .. }] => message,
        other => panic!("expected a single error event, got {other:?}"),
    }
}

fn result_payload(events: &[OutgoingEvent]) -> &Value {
    match events {
        [OutgoingEvent::Result { payload, .. }, OutgoingEvent::Done { .. }] => payload,
        other => panic!("expected [Result, Done], got {other:?}"),
    }
}

/// Fails the test on drop if anything reaches the provider.
async fn forbid_any_call(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn current_weather_streams_result_then_done() {
    let server = MockServer::start().await;
    let body = json!({"name": "London", "main": {"temp": 11.3}, "cod": 200});

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "London"))
        .and(query_param("appid", KEY))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::with_provider_geocoder(provider(&server));
    let events = run(&dispatcher, "weather.current", json!({"city": "London"})).await;

    assert_eq!(result_payload(&events), &body);
    assert!(events.iter().all(|e| e.id() == &json!("req-1")));
}

#[tokio::test]
async fn forecast_streams_result_then_done() {
    let server = MockServer::start().await;
    let body = json!({"cnt": 40, "list": [], "city": {"name": "Oslo"}});

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("q", "Oslo"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::with_provider_geocoder(provider(&server));
    let events = run(&dispatcher, "weather.forecast", json!({"city": "Oslo"})).await;

    assert_eq!(result_payload(&events), &body);
}

#[tokio::test]
async fn missing_city_is_rejected_before_any_call() {
    let server = MockServer::start().await;
    forbid_any_call(&server).await;

    let dispatcher = Dispatcher::with_provider_geocoder(provider(&server));
    let events = run(&dispatcher, "weather.current", json!({})).await;

    assert_eq!(error_message(&events), "Missing param: city");
}

#[tokio::test]
async fn unknown_method_names_the_method() {
    let server = MockServer::start().await;
    forbid_any_call(&server).await;

    let dispatcher = Dispatcher::with_provider_geocoder(provider(&server));
    let events = run(&dispatcher, "weather.bogus", json!({"city": "London"})).await;

    assert!(error_message(&events).contains("weather.bogus"));
}

#[tokio::test]
async fn everything_with_coordinates_skips_geocoder() {
    let server = MockServer::start().await;
    let body = json!({"lat": 51.5, "lon": -0.1, "current": {}});

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .and(query_param("lat", "51.5"))
        .and(query_param("lon", "-0.1"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let geocoder = CountingGeocoder::answering(None);
    let dispatcher = Dispatcher::new(provider(&server), geocoder.clone());
    let events = run(&dispatcher, "weather.everything", json!({"lat": 51.5, "lon": -0.1})).await;

    assert_eq!(result_payload(&events), &body);
    assert_eq!(geocoder.calls(), 0);
}

#[tokio::test]
async fn everything_with_city_geocodes_once_and_forwards_coordinates() {
    let server = MockServer::start().await;
    let body = json!({"timezone": "Europe/London"});

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .and(query_param("lat", "51.5073"))
        .and(query_param("lon", "-0.1276"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let geocoder = CountingGeocoder::answering(Some(Coordinates::new(51.5073, -0.1276)));
    let dispatcher = Dispatcher::new(provider(&server), geocoder.clone());
    let events = run(&dispatcher, "weather.everything", json!({"city": "London"})).await;

    assert_eq!(result_payload(&events), &body);
    assert_eq!(geocoder.calls(), 1);
}

#[tokio::test]
async fn provider_geocoder_resolves_through_direct_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Paris"))
        .and(query_param("limit", "1"))
        .and(query_param("appid", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "Paris", "lat": 48.8589, "lon": 2.32, "country": "FR"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .and(query_param("lat", "48.8589"))
        .and(query_param("lon", "2.32"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::with_provider_geocoder(provider(&server));
    let events = run(&dispatcher, "weather.everything", json!({"city": "Paris"})).await;

    assert_eq!(result_payload(&events), &json!({"ok": true}));
}

#[tokio::test]
async fn unknown_city_never_reaches_weather_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall/timemachine"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::with_provider_geocoder(provider(&server));

    let events = run(&dispatcher, "weather.everything", json!({"city": "Atlantis"})).await;
    assert_eq!(error_message(&events), "City 'Atlantis' not found");

    let events = run(
        &dispatcher,
        "weather.historical",
        json!({"city": "Atlantis", "dt": 1_700_000_000}),
    )
    .await;
    assert_eq!(error_message(&events), "City 'Atlantis' not found");
}

async fn mount_unreachable_onecall(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn geocoding_rejection_surfaces_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;
    mount_unreachable_onecall(&server).await;

    let dispatcher = Dispatcher::with_provider_geocoder(provider(&server));
    let events = run(&dispatcher, "weather.everything", json!({"city": "Paris"})).await;

    assert_eq!(
        error_message(&events),
        "OpenWeather geocoding request failed with status 401 Unauthorized: bad key"
    );
}

#[tokio::test]
async fn geocoding_match_without_coordinates_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "X"}])))
        .expect(1)
        .mount(&server)
        .await;
    mount_unreachable_onecall(&server).await;

    let dispatcher = Dispatcher::with_provider_geocoder(provider(&server));
    let events = run(&dispatcher, "weather.everything", json!({"city": "X"})).await;

    let message = error_message(&events);
    assert!(message.starts_with("Failed to parse OpenWeather geocoding JSON"), "got {message}");
    assert!(message.contains("missing field `lat`"), "got {message}");
}

#[tokio::test]
async fn historical_forwards_timestamp_and_coordinates() {
    let server = MockServer::start().await;
    let body = json!({"data": [{"dt": 1_700_000_000, "temp": 3.1}]});

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall/timemachine"))
        .and(query_param("lat", "40"))
        .and(query_param("lon", "-74"))
        .and(query_param("dt", "1700000000"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let geocoder = CountingGeocoder::answering(None);
    let dispatcher = Dispatcher::new(provider(&server), geocoder.clone());
    let events = run(
        &dispatcher,
        "weather.historical",
        json!({"lat": 40, "lon": -74, "dt": 1_700_000_000}),
    )
    .await;

    assert_eq!(result_payload(&events), &body);
    assert_eq!(geocoder.calls(), 0);
}

#[tokio::test]
async fn historical_without_timestamp_names_dt() {
    let server = MockServer::start().await;
    forbid_any_call(&server).await;

    let geocoder = CountingGeocoder::answering(Some(Coordinates::new(1.0, 2.0)));
    let dispatcher = Dispatcher::new(provider(&server), geocoder.clone());
    let events = run(&dispatcher, "weather.historical", json!({"city": "Rome"})).await;

    assert!(error_message(&events).contains("dt"));
    assert_eq!(geocoder.calls(), 0);
}

#[tokio::test]
async fn upstream_error_statuses_yield_only_an_error() {
    for status in [404u16, 500] {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({"cod": status, "message": "nope"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = Dispatcher::with_provider_geocoder(provider(&server));
        let events = run(&dispatcher, "weather.current", json!({"city": "Nowhere"})).await;

        let message = error_message(&events);
        assert!(message.contains(&status.to_string()), "status missing from: {message}");
        assert!(message.contains("nope"), "body missing from: {message}");
    }
}

#[tokio::test]
async fn undecodable_upstream_body_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::with_provider_geocoder(provider(&server));
    let events = run(&dispatcher, "weather.current", json!({"city": "London"})).await;

    assert!(error_message(&events).starts_with("Failed to parse OpenWeather current JSON"));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let dispatcher =
        Dispatcher::with_provider_geocoder(provider_with_timeout(&server, Duration::from_millis(200)));
    let events = run(&dispatcher, "weather.current", json!({"city": "London"})).await;

    assert_eq!(error_message(&events), "OpenWeather current request timed out");
}

#[tokio::test]
async fn repeated_requests_have_identical_shape() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"list": [1, 2, 3]})))
        .expect(2)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::with_provider_geocoder(provider(&server));
    let first = run(&dispatcher, "weather.forecast", json!({"city": "Lima"})).await;
    let second = run(&dispatcher, "weather.forecast", json!({"city": "Lima"})).await;

    let shape = |events: &[OutgoingEvent]| {
        events.iter().map(std::mem::discriminant).collect::<Vec<_>>()
    };
    assert_eq!(shape(&first), shape(&second));
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn rejected_body_yields_single_error() {
    let (id, err) = OperationRequest::from_slice(b"{\"id\": 3, \"method\": 5}").unwrap_err();
    let events: Vec<_> = Dispatcher::reject(id, err).collect().await;

    match events.as_slice() {
        [OutgoingEvent::Error { id, message }] => {
            assert_eq!(id, &json!(3));
            assert!(message.starts_with("Invalid request"));
        }
        other => panic!("expected a single error event, got {other:?}"),
    }
}
