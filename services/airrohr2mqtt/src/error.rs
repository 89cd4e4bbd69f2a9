use axum::http::StatusCode;
use thiserror::Error;

/// Reasons an inbound sensor report is rejected.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("report must be a JSON object")]
    NotAnObject,

    #[error("missing esp8266id")]
    MissingDeviceId,

    #[error("esp8266id must be a string or a number")]
    InvalidDeviceId,

    #[error("missing sensordatavalues")]
    MissingMeasurements,

    #[error("sensordatavalues must be a list")]
    MeasurementsNotAList,

    #[error("sensordatavalues[{index}] is missing {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("sensordatavalues[{index}].value_type must be a non-empty string")]
    InvalidValueType { index: usize },
}

impl ReportError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

/// Failure of one connect/publish/disconnect cycle.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("mqtt client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("mqtt connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    #[error("mqtt publish timed out")]
    Timeout,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("broker address is empty")]
    EmptyBroker,

    #[error("invalid broker url: {0}")]
    InvalidUrl(String),

    #[error("unsupported broker url scheme '{0}', expected mqtt")]
    UnsupportedScheme(String),

    #[error("invalid broker port '{0}'")]
    InvalidPort(String),
}
