use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{format} document error: {message}")]
    FormatError { format: String, message: String },

    #[error("Geocoding failed for '{address}': {message}")]
    GeocodeError { address: String, message: String },

    #[error("Web search failed for '{query}': {message}")]
    SearchError { query: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::GeocodeError { .. } | EtlError::SearchError { .. } => {
                ErrorCategory::Network
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::XmlError(_)
            | EtlError::FormatError { .. }
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤重跑通常就會好
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ApiError(_) | EtlError::GeocodeError { .. } => {
                "Check network connectivity and the geocoder endpoint, then re-run the tool"
            }
            EtlError::SearchError { .. } => {
                "The search provider may be rate limiting; wait a few minutes and re-run"
            }
            EtlError::CsvError(_) => {
                "Make sure the table has a 'name,domain,url,title,confidence' header"
            }
            EtlError::XmlError(_) | EtlError::FormatError { .. } => {
                "Open the input document in a validator and fix the reported position"
            }
            EtlError::SerializationError(_) => "Check that the input is a valid GeoJSON FeatureCollection",
            EtlError::IoError(_) => "Check that the input path exists and the output directory is writable",
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => {
                "Review the TOML configuration file and command-line overrides"
            }
            EtlError::ProcessingError { .. } => {
                "Inspect the offending record and re-run with --verbose for details"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Could not process input: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        let err = EtlError::GeocodeError {
            address: "Seattle, WA".to_string(),
            message: "timeout".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let err = EtlError::InvalidConfigValueError {
            field: "http.user_agent".to_string(),
            value: "".to_string(),
            reason: "must not be empty".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = EtlError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_user_friendly_message_includes_detail() {
        let err = EtlError::FormatError {
            format: "KML".to_string(),
            message: "unexpected end of file".to_string(),
        };
        let message = err.user_friendly_message();
        assert!(message.starts_with("Could not process input"));
        assert!(message.contains("unexpected end of file"));
    }
}
