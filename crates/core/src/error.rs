use thiserror::Error;

#[derive(Error, Debug)]
pub enum UschedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_failures_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::WouldBlock, "no threads left");
        let err: UschedError = io.into();
        assert!(matches!(err, UschedError::Io(_)));
        assert_eq!(err.to_string(), "IO error: no threads left");
    }

    #[test]
    fn config_errors_carry_message() {
        let err = UschedError::Config("batch_size must be at least 1".into());
        assert_eq!(err.to_string(), "invalid config: batch_size must be at least 1");
    }
}
