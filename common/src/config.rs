use serde::{Deserialize, Serialize};

pub const DEFAULT_DEVICE_NAME: &str = "your flower";
pub const DEFAULT_WIDGET_TITLE: &str = "Your Flower";

/// How an edit to one moisture bound affects the other bound's validity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevalidationPolicy {
    /// Editing either bound revalidates both against each other.
    #[default]
    BothBounds,
    /// Only the edited field is revalidated; the sibling keeps its last verdict.
    EditedFieldOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub revalidation: RevalidationPolicy,
    pub fallback_device_name: String,
    pub fallback_widget_title: String,
    pub max_history_events: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            revalidation: RevalidationPolicy::BothBounds,
            fallback_device_name: DEFAULT_DEVICE_NAME.to_string(),
            fallback_widget_title: DEFAULT_WIDGET_TITLE.to_string(),
            max_history_events: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub mqtt_client_id: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            mqtt_client_id: "waterbot-dashboard".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub dashboard: DashboardConfig,
    pub network: NetworkConfig,
    pub http_port: u16,
    pub max_mqtt_payload_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dashboard: DashboardConfig::default(),
            network: NetworkConfig::default(),
            http_port: 8080,
            max_mqtt_payload_bytes: 2048,
        }
    }
}

impl DashboardConfig {
    pub fn sanitize(&mut self) {
        if self.fallback_device_name.trim().is_empty() {
            self.fallback_device_name = DEFAULT_DEVICE_NAME.to_string();
        }
        if self.fallback_widget_title.trim().is_empty() {
            self.fallback_widget_title = DEFAULT_WIDGET_TITLE.to_string();
        }
        self.max_history_events = self.max_history_events.clamp(1, 10_000);
    }
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.dashboard.sanitize();

        if self.network.mqtt_port == 0 {
            self.network.mqtt_port = 1883;
        }
        if self.network.mqtt_client_id.trim().is_empty() {
            self.network.mqtt_client_id = NetworkConfig::default().mqtt_client_id;
        }
        if self.http_port == 0 {
            self.http_port = 8080;
        }
        self.max_mqtt_payload_bytes = self.max_mqtt_payload_bytes.clamp(256, 65_536);
    }
}
