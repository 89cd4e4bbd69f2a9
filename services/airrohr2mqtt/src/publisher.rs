use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, Outgoing, QoS};
use uuid::Uuid;

use crate::config::BrokerAddress;
use crate::error::PublishError;

/// Sink for outbound topic/payload pairs.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;
}

/// Publishes each message over its own short-lived broker connection:
/// connect, publish at QoS 0 without retain, disconnect.
#[derive(Debug, Clone)]
pub struct MqttPublisher {
    broker: BrokerAddress,
    timeout: Duration,
}

impl MqttPublisher {
    pub fn new(broker: BrokerAddress, timeout: Duration) -> Self {
        Self { broker, timeout }
    }

    pub fn broker(&self) -> &BrokerAddress {
        &self.broker
    }

    fn options(&self) -> MqttOptions {
        // Short enough for brokers that cap client ids at 23 bytes.
        let suffix = Uuid::new_v4().simple().to_string();
        let client_id = format!("airrohr2mqtt-{}", &suffix[..10]);
        let mut opts = MqttOptions::new(client_id, self.broker.host.clone(), self.broker.port);
        opts.set_keep_alive(Duration::from_secs(30));
        opts.set_clean_session(true);
        opts
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        // Requests are queued on the client and only hit the wire once the
        // event loop is polled.
        let (client, mut eventloop) = AsyncClient::new(self.options(), 4);
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await?;
        client.disconnect().await?;

        let cycle = async {
            loop {
                match eventloop.poll().await? {
                    Event::Incoming(Incoming::ConnAck(ack)) => {
                        tracing::trace!(?ack, "mqtt connected");
                    }
                    Event::Outgoing(Outgoing::Publish(_)) => {
                        tracing::debug!(topic, "mqtt publish sent");
                    }
                    Event::Outgoing(Outgoing::Disconnect) => return Ok::<_, PublishError>(()),
                    other => tracing::trace!("mqtt event: {other:?}"),
                }
            }
        };

        match tokio::time::timeout(self.timeout, cycle).await {
            Ok(result) => result,
            Err(_) => Err(PublishError::Timeout),
        }
    }
}
