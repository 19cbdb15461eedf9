use crate::utils::error::{Result, SeismoError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(SeismoError::ConfigError {
            message: format!("{}: URL cannot be empty", field_name),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(SeismoError::ConfigError {
                message: format!("{}: Unsupported URL scheme: {}", field_name, scheme),
            }),
        },
        Err(e) => Err(SeismoError::ConfigError {
            message: format!("{}: Invalid URL format: {}", field_name, e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(SeismoError::ConfigError {
            message: format!("{}: Path cannot be empty", field_name),
        });
    }

    if path.contains('\0') {
        return Err(SeismoError::ConfigError {
            message: format!("{}: Path contains null bytes", field_name),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(SeismoError::ConfigError {
            message: format!("{}: Value must be at least {}", field_name, min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SeismoError::invalid(
            field_name,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

/// 閉區間檢查，NaN 一律視為超出範圍
pub fn validate_range(field_name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(SeismoError::invalid(
            field_name,
            format!("Value {} must be between {} and {}", value, min, max),
        ));
    }
    Ok(())
}

pub fn validate_finite(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(SeismoError::invalid(field_name, "Value must be a finite number"));
    }
    Ok(())
}
