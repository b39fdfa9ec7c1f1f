use rumqttc::{AsyncClient, QoS};

use waterbot_common::{
    PumpTransport, PumpTriggerPayload, SettingsPayload, SettingsTransport, TransportError,
    TOPIC_CMD_HISTORY_FETCH, TOPIC_CMD_PUMP, TOPIC_CMD_SETTINGS_FETCH, TOPIC_CMD_SETTINGS_SUBMIT,
};

/// Publishes outbound actions without waiting on the broker; results arrive
/// later on the subscribed state topics.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
}

impl MqttTransport {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AsyncClient {
        &self.client
    }

    pub fn request_history(&mut self) -> Result<(), TransportError> {
        self.publish(TOPIC_CMD_HISTORY_FETCH, Vec::new())
    }

    fn publish(&self, topic: &str, body: Vec<u8>) -> Result<(), TransportError> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, body)
            .map_err(|err| TransportError::Unavailable(err.to_string()))
    }
}

impl SettingsTransport for MqttTransport {
    fn send_settings(&mut self, payload: &SettingsPayload) -> Result<(), TransportError> {
        let body = serde_json::to_vec(payload)?;
        self.publish(TOPIC_CMD_SETTINGS_SUBMIT, body)
    }

    fn request_settings(&mut self) -> Result<(), TransportError> {
        self.publish(TOPIC_CMD_SETTINGS_FETCH, Vec::new())
    }
}

impl PumpTransport for MqttTransport {
    fn trigger_pump(&mut self, payload: &PumpTriggerPayload) -> Result<(), TransportError> {
        let body = serde_json::to_vec(payload)?;
        self.publish(TOPIC_CMD_PUMP, body)
    }
}
