use market_data::UpstreamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments failed validation; nothing was fetched.
    #[error("invalid arguments: `{field}` {constraint}")]
    InvalidArguments { field: String, constraint: String },

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ToolError {
    pub(crate) fn invalid(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::InvalidArguments {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    /// Problems with the request itself, as opposed to upstream or internal failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArguments { .. } | Self::UnknownOperation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_field_and_constraint() {
        let err = ToolError::invalid("pageSize", "must be <= 1000");
        assert_eq!(err.to_string(), "invalid arguments: `pageSize` must be <= 1000");
        assert!(err.is_client_error());

        let err = ToolError::UnknownOperation("get-price".into());
        assert_eq!(err.to_string(), "unknown operation: get-price");
        assert!(err.is_client_error());
    }

    #[test]
    fn upstream_errors_pass_through_unchanged() {
        let upstream = UpstreamError::with_status(429, "rate limited");
        let err = ToolError::from(upstream.clone());
        assert_eq!(err.to_string(), upstream.to_string());
        assert!(!err.is_client_error());
    }
}
