use thiserror::Error;

/// 錯誤分類，對應傳輸層的狀態碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Unsupported,
    Upstream,
    Extraction,
    Internal,
}

#[derive(Error, Debug)]
pub enum SeismoError {
    #[error("{message}")]
    MissingParameters {
        parameters: Vec<String>,
        message: String,
    },

    #[error("{message}")]
    ConflictingParameters {
        parameters: Vec<String>,
        message: String,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid source-receiver geometry: {message}")]
    InvalidGeometry { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Unsupported { message: String },

    #[error("Collaborator contract violation: {message}")]
    UpstreamContract { message: String },

    #[error("{message}")]
    Extraction { message: String },

    #[error(
        "No seismograms found for the given phase relative offsets. This could either be \
         due to the chosen phase not existing for the specific source-receiver geometry or \
         arriving too late/with too large offsets if the database is not long enough."
    )]
    NoSeismograms,

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Message sent when the waveform database fails without a client-facing reason.
pub const EXTRACTION_FAILED: &str = "Could not extract seismogram. Make sure, the components are \
                                     valid, and the depth settings are correct.";

pub fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ")
}

impl SeismoError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        SeismoError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing<I, S>(parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parameters: Vec<String> = parameters.into_iter().map(Into::into).collect();
        parameters.sort();
        let message = format!(
            "The following required parameters are missing: {}",
            quoted(&parameters)
        );
        SeismoError::MissingParameters {
            parameters,
            message,
        }
    }

    /// 互斥參數同時出現
    pub fn conflict<I, S>(parameters: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parameters: Vec<String> = parameters.into_iter().map(Into::into).collect();
        parameters.sort();
        SeismoError::ConflictingParameters {
            parameters,
            message: message.into(),
        }
    }

    /// Offending parameter names, if the error is tied to request fields.
    pub fn parameters(&self) -> Vec<String> {
        match self {
            SeismoError::MissingParameters { parameters, .. }
            | SeismoError::ConflictingParameters { parameters, .. } => parameters.clone(),
            SeismoError::InvalidValue { field, .. } => vec![field.clone()],
            _ => Vec::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        SeismoError::NotFound {
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        SeismoError::Unsupported {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        SeismoError::UpstreamContract {
            message: message.into(),
        }
    }

    pub fn extraction_failed() -> Self {
        SeismoError::Extraction {
            message: EXTRACTION_FAILED.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SeismoError::MissingParameters { .. }
            | SeismoError::ConflictingParameters { .. }
            | SeismoError::InvalidValue { .. }
            | SeismoError::InvalidGeometry { .. }
            | SeismoError::NoSeismograms => ErrorCategory::Validation,
            SeismoError::NotFound { .. } => ErrorCategory::NotFound,
            SeismoError::Unsupported { .. } => ErrorCategory::Unsupported,
            SeismoError::UpstreamContract { .. } => ErrorCategory::Upstream,
            SeismoError::Extraction { .. } => ErrorCategory::Extraction,
            _ => ErrorCategory::Internal,
        }
    }

    /// HTTP 對應的狀態碼
    pub fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::Extraction => 400,
            ErrorCategory::NotFound | ErrorCategory::Unsupported => 404,
            ErrorCategory::Upstream | ErrorCategory::Internal => 500,
        }
    }

    /// 給客戶端看的訊息；伺服器內部錯誤不外洩細節
    pub fn client_message(&self) -> String {
        match self.category() {
            ErrorCategory::Upstream | ErrorCategory::Internal => {
                "Internal server error.".to_string()
            }
            _ => self.to_string(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

pub type Result<T> = std::result::Result<T, SeismoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameters_are_sorted_and_quoted() {
        let err = SeismoError::missing(["sourcelongitude", "sourcedepthinmeters"]);
        assert_eq!(
            err.to_string(),
            "The following required parameters are missing: 'sourcedepthinmeters', 'sourcelongitude'"
        );
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_status_codes_follow_category() {
        assert_eq!(SeismoError::not_found("Event not found.").status_code(), 404);
        assert_eq!(SeismoError::unsupported("no events").status_code(), 404);
        assert_eq!(SeismoError::upstream("bad shape").status_code(), 500);
        assert_eq!(SeismoError::NoSeismograms.status_code(), 400);
        assert_eq!(
            SeismoError::Extraction {
                message: "boom".to_string()
            }
            .status_code(),
            400
        );
    }

    #[test]
    fn test_upstream_details_are_hidden_from_clients() {
        let err = SeismoError::upstream("event callback returned 3 keys");
        assert_eq!(err.client_message(), "Internal server error.");
        assert!(!err.is_client_error());

        let err = SeismoError::invalid("scale", "must not be zero");
        assert_eq!(err.client_message(), "Invalid value for 'scale': must not be zero");
    }
}
