use serde_json::{Map, Value};

use crate::error::ReportError;

const MEASUREMENTS_KEY: &str = "sensordatavalues";
const DEVICE_ID_KEY: &str = "esp8266id";

/// One entry of `sensordatavalues`, e.g. `SDS_P1` = `"12.50"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub value_type: String,
    pub value: Value,
}

/// Decoded body of an airrohr push.
///
/// `attributes` holds every top-level field except the measurement list, in
/// the order the station sent them.
#[derive(Debug, Clone)]
pub struct SensorReport {
    pub attributes: Map<String, Value>,
    pub measurements: Vec<Measurement>,
    device_id: String,
}

impl SensorReport {
    pub fn from_slice(body: &[u8]) -> Result<Self, ReportError> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ReportError> {
        let Value::Object(fields) = value else {
            return Err(ReportError::NotAnObject);
        };

        let mut attributes = Map::new();
        let mut raw_measurements = None;
        for (key, value) in fields {
            if key == MEASUREMENTS_KEY {
                raw_measurements = Some(value);
            } else {
                attributes.insert(key, value);
            }
        }

        let device_id = match attributes.get(DEVICE_ID_KEY) {
            None => return Err(ReportError::MissingDeviceId),
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            Some(_) => return Err(ReportError::InvalidDeviceId),
        };

        let entries = match raw_measurements {
            None => return Err(ReportError::MissingMeasurements),
            Some(Value::Array(entries)) => entries,
            Some(_) => return Err(ReportError::MeasurementsNotAList),
        };
        let measurements = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| parse_measurement(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            attributes,
            measurements,
            device_id,
        })
    }

    pub fn sensor_name(&self) -> String {
        format!("luftdaten_{}", self.device_id)
    }

    /// `value_type -> value` for the state topic. A repeated type keeps its
    /// first position and takes the last value.
    pub fn state(&self) -> Map<String, Value> {
        let mut state = Map::new();
        for m in &self.measurements {
            state.insert(m.value_type.clone(), m.value.clone());
        }
        state
    }
}

fn parse_measurement(index: usize, entry: Value) -> Result<Measurement, ReportError> {
    let Value::Object(mut fields) = entry else {
        return Err(ReportError::MissingField {
            index,
            field: "value_type",
        });
    };
    let value_type = match fields.remove("value_type") {
        None => {
            return Err(ReportError::MissingField {
                index,
                field: "value_type",
            })
        }
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(_) => return Err(ReportError::InvalidValueType { index }),
    };
    let value = fields.remove("value").ok_or(ReportError::MissingField {
        index,
        field: "value",
    })?;
    Ok(Measurement { value_type, value })
}
