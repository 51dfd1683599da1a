//! MQTT integration configuration.

use serde::Deserialize;

use homerelay_domain::identity::AppIdentity;

/// Username the platform expects for token-authenticated devices.
const DEVICE_TOKEN_USERNAME: &str = "use-token-auth";

/// Configuration for both broker connections.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Organization id on the `IoT` platform.
    pub org: String,
    /// Broker hostname. Derived from `org` when unset.
    pub broker_host: Option<String>,
    /// MQTT broker port.
    pub broker_port: u16,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Capacity of each client's request channel and of the inbound event
    /// channel.
    pub channel_capacity: usize,
    /// The application-side connection that receives device events.
    pub application: ApplicationConfig,
    /// The device-side connection that publishes responses.
    pub device: DeviceConfig,
    /// Reconnection backoff.
    pub reconnect: ReconnectConfig,
}

/// Application client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application id, part of the MQTT client id.
    pub app_id: String,
    /// API key, used as the MQTT username.
    pub api_key: Option<String>,
    /// API token, used as the MQTT password.
    pub auth_token: Option<String>,
    /// Device type whose events are subscribed to. Discovery requests must
    /// come from this type.
    pub device_type: String,
    /// Device id discovery requests must come from.
    pub device_id: String,
}

/// Device client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub device_type: String,
    pub device_id: String,
    /// Device authentication token.
    pub auth_token: Option<String>,
}

/// Exponential backoff between reconnection attempts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// First delay after a connection error, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound for the delay, in seconds.
    pub max_delay_secs: u64,
    /// Factor applied to the delay after each consecutive failure.
    pub multiplier: u32,
}

impl MqttConfig {
    /// Broker hostname, falling back to the platform's per-org host.
    #[must_use]
    pub fn host(&self) -> String {
        self.broker_host.clone().unwrap_or_else(|| {
            format!("{}.messaging.internetofthings.ibmcloud.com", self.org)
        })
    }

    /// MQTT client id of the application connection: `a:{org}:{app_id}`.
    #[must_use]
    pub fn application_client_id(&self) -> String {
        format!("a:{}:{}", self.org, self.application.app_id)
    }

    /// MQTT client id of the device connection: `d:{org}:{type}:{id}`.
    #[must_use]
    pub fn device_client_id(&self) -> String {
        format!(
            "d:{}:{}:{}",
            self.org, self.device.device_type, self.device.device_id
        )
    }

    /// Username/password pair for the application connection, if any.
    #[must_use]
    pub fn application_credentials(&self) -> Option<(String, String)> {
        match (&self.application.api_key, &self.application.auth_token) {
            (Some(key), Some(token)) => Some((key.clone(), token.clone())),
            _ => None,
        }
    }

    /// Username/password pair for the device connection, if any.
    #[must_use]
    pub fn device_credentials(&self) -> Option<(String, String)> {
        self.device
            .auth_token
            .as_ref()
            .map(|token| (DEVICE_TOKEN_USERNAME.to_string(), token.clone()))
    }

    /// The identity discovery requests are accepted from.
    #[must_use]
    pub fn identity(&self) -> AppIdentity {
        AppIdentity::new(&self.application.device_type, &self.application.device_id)
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            org: "quickstart".to_string(),
            broker_host: None,
            broker_port: 1883,
            keep_alive_secs: 30,
            channel_capacity: 64,
            application: ApplicationConfig::default(),
            device: DeviceConfig::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            app_id: "homerelay".to_string(),
            api_key: None,
            auth_token: None,
            device_type: "HomeAutomation".to_string(),
            device_id: "Controller-1".to_string(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: "HomeAutomation".to_string(),
            device_id: "Controller-1".to_string(),
            auth_token: None,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_secs: 60,
            multiplier: 2,
        }
    }
}
