//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, buffers > 0, close codes)
//! - Check that socket addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use super::schema::ServerConfig;

/// A single semantic problem in a loaded config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("routing.streams.caught_close_codes: {0} is outside 1000..=4999")]
    CloseCode(u16),
}

/// Check every semantic rule and report all failures.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.listener.stream_buffer == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.stream_buffer",
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.request_secs",
        });
    }
    if config.routing.blocking.max_body_bytes == 0 {
        errors.push(ValidationError::Zero {
            field: "routing.blocking.max_body_bytes",
        });
    }

    errors.extend(
        config
            .routing
            .streams
            .caught_close_codes
            .iter()
            .filter(|code| !(1000..=4999).contains(*code))
            .map(|&code| ValidationError::CloseCode(code)),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
