/// Topic names for one sensor station.
///
/// The attributes topic is spelled `home/Sensor/...` while the state topic is
/// `home/sensor/...`. Existing subscribers depend on both spellings.
#[derive(Debug, Clone)]
pub struct SensorTopics {
    sensor_name: String,
    state: String,
    attributes: String,
}

impl SensorTopics {
    pub fn new(sensor_name: impl Into<String>) -> Self {
        let sensor_name = sensor_name.into();
        Self {
            state: format!("home/sensor/{sensor_name}/state"),
            attributes: format!("home/Sensor/{sensor_name}/attributes"),
            sensor_name,
        }
    }

    pub fn sensor_name(&self) -> &str {
        &self.sensor_name
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn attributes(&self) -> &str {
        &self.attributes
    }

    pub fn discovery_config(&self, value_type: &str) -> String {
        format!("homeassistant/sensor/{}_{}/config", self.sensor_name, value_type)
    }
}
