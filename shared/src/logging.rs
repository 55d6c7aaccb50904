use tracing::Level;

/// Parse a `LOG_LEVEL` value; unknown names fall back to INFO
pub fn parse_log_level(value: &str) -> Level {
    match value.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("warn"), Level::WARN);
        assert_eq!(parse_log_level("Trace"), Level::TRACE);
        assert_eq!(parse_log_level(" error "), Level::ERROR);
        assert_eq!(parse_log_level("verbose"), Level::INFO);
        assert_eq!(parse_log_level(""), Level::INFO);
    }
}
