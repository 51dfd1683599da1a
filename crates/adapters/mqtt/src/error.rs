//! MQTT adapter error types.

use homerelay_domain::error::{RelayError, ShapeError};

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// Failed to encode an outgoing payload as JSON.
    #[error("failed to encode MQTT payload")]
    PayloadEncode(#[source] serde_json::Error),

    /// A message arrived on a topic that is not a device event topic.
    #[error("not a device event topic: {0}")]
    InvalidTopic(String),

    /// A domain-level error.
    #[error("domain error")]
    Domain(#[source] RelayError),
}

impl MqttError {
    /// Convert into a [`RelayError`] for propagation across port boundaries.
    ///
    /// Foreign topics become [`RelayError::Shape`]; client and encoding
    /// failures become [`RelayError::Transport`].
    #[must_use]
    pub fn into_domain(self) -> RelayError {
        match self {
            Self::Domain(err) => err,
            Self::InvalidTopic(topic) => ShapeError::UnexpectedTopic(topic).into(),
            other => RelayError::Transport(Box::new(other)),
        }
    }
}

impl From<MqttError> for RelayError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}
