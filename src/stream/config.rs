//! Per-route stream configuration.

use serde::{Deserialize, Serialize};

use super::close_code;

/// Payload coercion applied by a session when sending or receiving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Text,
    Bytes,
    Json,
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ValueType::Text => "text",
            ValueType::Bytes => "bytes",
            ValueType::Json => "json",
        })
    }
}

/// Stream route configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Accept the stream before the handler runs.
    pub auto_accept: bool,

    /// Coercion for both directions unless overridden below.
    pub value_type: ValueType,

    /// Coercion for received payloads (falls back to `value_type`).
    pub receive_type: Option<ValueType>,

    /// Coercion for sent payloads (falls back to `value_type`).
    pub send_type: Option<ValueType>,

    /// Peer close codes treated as a clean disconnect.
    pub caught_close_codes: Vec<u16>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            auto_accept: true,
            value_type: ValueType::Text,
            receive_type: None,
            send_type: None,
            caught_close_codes: vec![close_code::NORMAL, close_code::GOING_AWAY],
        }
    }
}

impl StreamConfig {
    pub fn with_auto_accept(mut self, auto_accept: bool) -> Self {
        self.auto_accept = auto_accept;
        self
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn with_receive_type(mut self, receive_type: ValueType) -> Self {
        self.receive_type = Some(receive_type);
        self
    }

    pub fn with_send_type(mut self, send_type: ValueType) -> Self {
        self.send_type = Some(send_type);
        self
    }

    pub fn with_caught_close_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.caught_close_codes = codes.into_iter().collect();
        self
    }

    /// Effective coercion for received payloads.
    pub fn receive_type(&self) -> ValueType {
        self.receive_type.unwrap_or(self.value_type)
    }

    /// Effective coercion for sent payloads.
    pub fn send_type(&self) -> ValueType {
        self.send_type.unwrap_or(self.value_type)
    }

    /// Whether a peer close with `code` is a clean disconnect.
    pub fn catches(&self, code: u16) -> bool {
        self.caught_close_codes.contains(&code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directional_types_fall_back() {
        let config = StreamConfig::default().with_value_type(ValueType::Json);
        assert_eq!(config.receive_type(), ValueType::Json);
        assert_eq!(config.send_type(), ValueType::Json);

        let config = config.with_send_type(ValueType::Bytes);
        assert_eq!(config.receive_type(), ValueType::Json);
        assert_eq!(config.send_type(), ValueType::Bytes);
    }

    #[test]
    fn default_catches_normal_and_going_away() {
        let config = StreamConfig::default();
        assert!(config.auto_accept);
        assert!(config.catches(1000));
        assert!(config.catches(1001));
        assert!(!config.catches(1006));
    }

    #[test]
    fn deserializes_lowercase_types() {
        let config: StreamConfig =
            toml::from_str("value_type = \"json\"\ncaught_close_codes = [1000]").unwrap();
        assert_eq!(config.value_type, ValueType::Json);
        assert_eq!(config.caught_close_codes, vec![1000]);
        assert!(config.auto_accept);
    }
}
