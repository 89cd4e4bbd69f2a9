use airrohr2mqtt::build_router;
use airrohr2mqtt::config::FailurePolicy;
use airrohr2mqtt::error::PublishError;
use airrohr2mqtt::handlers::AppState;
use airrohr2mqtt::publisher::Publisher;
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt; // for `oneshot`

#[derive(Default)]
struct RecordingPublisher {
    published: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingPublisher {
    fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), String::from_utf8(payload).unwrap()));
        if self.fail {
            return Err(PublishError::Timeout);
        }
        Ok(())
    }
}

fn app(publisher: Arc<RecordingPublisher>, policy: FailurePolicy) -> Router {
    build_router(Arc::new(AppState {
        publisher,
        on_publish_error: policy,
    }))
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn single_temperature_reading_end_to_end() {
    let publisher = Arc::new(RecordingPublisher::default());
    let body = r#"{"esp8266id":"123","sensordatavalues":[{"value_type":"temperature","value":"21.5"}]}"#;

    let resp = app(publisher.clone(), FailurePolicy::BestEffort)
        .oneshot(post("/", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/ascii");
    assert_eq!(resp.headers()[header::CONTENT_LENGTH], "2");
    assert_eq!(body_text(resp).await, "OK");

    let published = publisher.published();
    assert_eq!(published.len(), 3);

    let (topic, payload) = &published[0];
    assert_eq!(topic, "homeassistant/sensor/luftdaten_123_temperature/config");
    assert!(payload.contains(r#""unit_of_meas":"°C""#));
    let config: Value = serde_json::from_str(payload).unwrap();
    assert_eq!(
        config,
        json!({
            "name": "luftdaten_123_temperature",
            "json_attributes_topic": "home/Sensor/luftdaten_123/attributes",
            "state_topic": "home/sensor/luftdaten_123/state",
            "value_template": "{{value_json.temperature}}",
            "unit_of_meas": "°C",
            "icon": "mdi:thermometer"
        })
    );

    assert_eq!(
        published[1],
        (
            "home/sensor/luftdaten_123/state".to_string(),
            r#"{"temperature":"21.5"}"#.to_string()
        )
    );
    assert_eq!(
        published[2],
        (
            "home/Sensor/luftdaten_123/attributes".to_string(),
            r#"{"esp8266id":"123"}"#.to_string()
        )
    );
}

#[tokio::test]
async fn full_station_payload() {
    let publisher = Arc::new(RecordingPublisher::default());
    let body = json!({
        "esp8266id": "15377285",
        "software_version": "NRZ-2020-129",
        "sensordatavalues": [
            {"value_type": "SDS_P1", "value": "12.50"},
            {"value_type": "SDS_P2", "value": "7.25"},
            {"value_type": "BME280_temperature", "value": "21.34"},
            {"value_type": "BME280_pressure", "value": "100843.12"},
            {"value_type": "BME280_humidity", "value": "52.10"},
            {"value_type": "samples", "value": "871231"},
            {"value_type": "signal", "value": "-71"}
        ]
    })
    .to_string();

    let resp = app(publisher.clone(), FailurePolicy::BestEffort)
        .oneshot(post("/data.php", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let published = publisher.published();
    assert_eq!(published.len(), 7 + 2);

    let discovery: Vec<Value> = published[..7]
        .iter()
        .map(|(_, p)| serde_json::from_str(p).unwrap())
        .collect();
    assert_eq!(discovery[0]["icon"], "mdi:thought-bubble");
    assert_eq!(discovery[0]["unit_of_meas"], "µg/m3");
    assert_eq!(discovery[1]["icon"], "mdi:thought-bubble-outline");
    assert_eq!(discovery[3]["unit_of_meas"], "Pa");
    assert_eq!(discovery[3]["icon"], "mdi:arrow-down-bold");
    assert_eq!(discovery[4]["unit_of_meas"], "%");
    assert!(discovery[5].get("unit_of_meas").is_none());
    assert!(discovery[6].get("icon").is_none());

    let state: Value = serde_json::from_str(&published[7].1).unwrap();
    assert_eq!(state["BME280_pressure"], "100843.12");
    assert_eq!(state.as_object().unwrap().len(), 7);

    assert_eq!(
        published[8].1,
        r#"{"esp8266id":"15377285","software_version":"NRZ-2020-129"}"#
    );
}

#[tokio::test]
async fn missing_device_id_is_a_client_error() {
    let publisher = Arc::new(RecordingPublisher::default());
    let body = r#"{"sensordatavalues":[{"value_type":"temperature","value":"21.5"}]}"#;

    let resp = app(publisher.clone(), FailurePolicy::BestEffort)
        .oneshot(post("/", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/ascii");
    assert_eq!(body_text(resp).await, "missing esp8266id");
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let publisher = Arc::new(RecordingPublisher::default());
    let resp = app(publisher.clone(), FailurePolicy::BestEffort)
        .oneshot(post("/", "{not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(resp).await.starts_with("invalid JSON body"));
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn late_bad_measurement_publishes_nothing() {
    let publisher = Arc::new(RecordingPublisher::default());
    let body = r#"{"esp8266id":"1","sensordatavalues":[{"value_type":"temperature","value":"20"},{"value":"3"}]}"#;
    let resp = app(publisher.clone(), FailurePolicy::BestEffort)
        .oneshot(post("/", body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(resp).await,
        "sensordatavalues[1] is missing value_type"
    );
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn missing_content_length_reads_an_empty_body() {
    let publisher = Arc::new(RecordingPublisher::default());
    let req = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::from(
            r#"{"esp8266id":"1","sensordatavalues":[]}"#.to_string(),
        ))
        .unwrap();
    let resp = app(publisher.clone(), FailurePolicy::BestEffort)
        .oneshot(req)
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn broker_failure_is_best_effort_by_default() {
    let publisher = Arc::new(RecordingPublisher {
        fail: true,
        ..Default::default()
    });
    let body = r#"{"esp8266id":"1","sensordatavalues":[{"value_type":"humidity","value":"40"}]}"#;
    let resp = app(publisher.clone(), FailurePolicy::BestEffort)
        .oneshot(post("/", body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "OK");
    assert_eq!(publisher.published().len(), 3);
}

#[tokio::test]
async fn broker_failure_with_fail_policy_is_bad_gateway() {
    let publisher = Arc::new(RecordingPublisher {
        fail: true,
        ..Default::default()
    });
    let body = r#"{"esp8266id":"1","sensordatavalues":[{"value_type":"humidity","value":"40"}]}"#;
    let resp = app(publisher.clone(), FailurePolicy::Fail)
        .oneshot(post("/", body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/ascii");
    assert_eq!(publisher.published().len(), 1);
}

#[tokio::test]
async fn other_methods_are_not_implemented() {
    let publisher = Arc::new(RecordingPublisher::default());
    let resp = app(publisher.clone(), FailurePolicy::BestEffort)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn healthz_ok() {
    let resp = app(Arc::new(RecordingPublisher::default()), FailurePolicy::BestEffort)
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(v["status"], "ok");
}

#[tokio::test]
async fn request_id_is_propagated() {
    let resp = app(Arc::new(RecordingPublisher::default()), FailurePolicy::BestEffort)
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .header("x-request-id", "station-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "station-42");
}
