//! Home Assistant MQTT discovery payloads for airrohr measurements.

use serde::Serialize;

use crate::topics::SensorTopics;

/// Unit and icon picked for a measurement type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub unit: Option<&'static str>,
    pub icon: Option<&'static str>,
}

/// Classify a `value_type`. Rules are tried in order and the first one that
/// matches decides, so `humidity_SDS_P1` is a humidity reading.
pub fn classify(value_type: &str) -> Classification {
    if value_type.contains("humidity") {
        Classification {
            unit: Some("%"),
            icon: Some("mdi:water-percent"),
        }
    } else if value_type.contains("temperature") {
        Classification {
            unit: Some("°C"),
            icon: Some("mdi:thermometer"),
        }
    } else if value_type.contains("SDS_P") {
        let icon = if value_type.ends_with("P1") {
            // PM10
            Some("mdi:thought-bubble")
        } else if value_type.ends_with("P2") {
            // PM2.5
            Some("mdi:thought-bubble-outline")
        } else {
            None
        };
        Classification {
            unit: Some("µg/m3"),
            icon,
        }
    } else if value_type == "BME280_pressure" {
        Classification {
            unit: Some("Pa"),
            icon: Some("mdi:arrow-down-bold"),
        }
    } else {
        Classification::default()
    }
}

/// Body published to `homeassistant/sensor/<name>_<type>/config`.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryConfig {
    pub name: String,
    pub json_attributes_topic: String,
    pub state_topic: String,
    pub value_template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_meas: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
}

impl DiscoveryConfig {
    pub fn new(topics: &SensorTopics, value_type: &str) -> Self {
        let Classification { unit, icon } = classify(value_type);
        Self {
            name: format!("{}_{}", topics.sensor_name(), value_type),
            json_attributes_topic: topics.attributes().to_string(),
            state_topic: topics.state().to_string(),
            value_template: format!("{{{{value_json.{value_type}}}}}"),
            unit_of_meas: unit,
            icon,
        }
    }
}
