use super::{types::Config, ConfigError, StoreBackend};

/// Validate configuration
///
/// Checks the values serde cannot: non-zero port and timeouts, a usable
/// queue namespace, positive rates and a sane tick interval.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.store.backend == StoreBackend::Redis && config.store.redis_url.trim().is_empty() {
        return Err(invalid("store.redis_url is required when store.backend = \"redis\""));
    }
    if config.store.operation_timeout_ms == 0 {
        return Err(invalid("store.operation_timeout_ms must be at least 1"));
    }

    let event_id = &config.queue.event_id;
    if event_id.is_empty() {
        return Err(invalid("queue.event_id cannot be empty"));
    }
    if event_id.contains(':') || event_id.chars().any(char::is_whitespace) {
        return Err(invalid(
            "queue.event_id cannot contain ':' or whitespace",
        ));
    }
    if config.queue.fallback_admit_rate == 0 {
        return Err(invalid("queue.fallback_admit_rate must be at least 1"));
    }
    if config.queue.initial_admit_rate == Some(0) {
        return Err(invalid("queue.initial_admit_rate must be at least 1"));
    }

    if config.admission.interval_ms < 10 {
        return Err(invalid("admission.interval_ms must be at least 10"));
    }
    if config.admission.credential_ttl_secs == 0 {
        return Err(invalid("admission.credential_ttl_secs must be at least 1"));
    }

    Ok(())
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::ValidationError(msg.to_string())
}
