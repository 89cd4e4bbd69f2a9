use serde_json::Value;

use crate::config::FailurePolicy;
use crate::discovery::DiscoveryConfig;
use crate::error::PublishError;
use crate::publisher::Publisher;
use crate::topics::SensorTopics;
use crate::types::SensorReport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: String,
}

/// Messages for one report in publish order: a discovery config per
/// measurement, then the state payload, then the attributes payload.
pub fn plan(report: &SensorReport) -> Result<Vec<OutboundMessage>, serde_json::Error> {
    let topics = SensorTopics::new(report.sensor_name());
    let mut messages = Vec::with_capacity(report.measurements.len() + 2);

    for m in &report.measurements {
        let config = DiscoveryConfig::new(&topics, &m.value_type);
        messages.push(OutboundMessage {
            topic: topics.discovery_config(&m.value_type),
            payload: serde_json::to_string(&config)?,
        });
    }

    messages.push(OutboundMessage {
        topic: topics.state().to_string(),
        payload: serde_json::to_string(&Value::Object(report.state()))?,
    });
    messages.push(OutboundMessage {
        topic: topics.attributes().to_string(),
        payload: serde_json::to_string(&report.attributes)?,
    });

    Ok(messages)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Publish `messages` one at a time, in order.
pub async fn deliver(
    publisher: &dyn Publisher,
    messages: &[OutboundMessage],
    policy: FailurePolicy,
) -> Result<DeliveryReport, PublishError> {
    let mut report = DeliveryReport::default();
    for message in messages {
        match publisher
            .publish(&message.topic, message.payload.clone().into_bytes())
            .await
        {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                tracing::error!(topic = %message.topic, error = %e, "mqtt publish failed");
                if policy == FailurePolicy::Fail {
                    return Err(e);
                }
                report.failed += 1;
            }
        }
    }
    Ok(report)
}
