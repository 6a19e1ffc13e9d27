//! Capture pipeline errors

use faultline_core::config::ValidationError;
use thiserror::Error;

/// Errors raised while building a [`Pipeline`](crate::Pipeline).
///
/// Nothing past construction returns an error to the host: dropped signals
/// and failed dispatches are only traced.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid configuration: {}", format_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("sink initialization failed: {0}")]
    SinkInit(#[source] anyhow::Error),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_lists_fields() {
        let err = CaptureError::InvalidConfig(vec![
            ValidationError {
                field: "sdk.sample_rate".into(),
                message: "must be between 0.0 and 1.0".into(),
            },
            ValidationError {
                field: "app.name".into(),
                message: "must not be empty".into(),
            },
        ]);
        let text = err.to_string();
        assert!(text.contains("sdk.sample_rate"));
        assert!(text.contains("app.name"));
    }

    #[test]
    fn test_io_conversion() {
        let err: CaptureError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, CaptureError::Io(_)));
    }
}
