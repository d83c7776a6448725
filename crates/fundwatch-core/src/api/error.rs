use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Login failed: {0}")]
    Login(Box<ApiError>),

    #[error("Credential cache error: {0}")]
    Cache(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        ApiError::HttpStatus {
            status: status.as_u16(),
            body: Self::truncate_body(body),
        }
    }

    /// Status code carried by an `HttpStatus` error, looking through login failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            ApiError::Login(inner) => inner.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::HttpStatus { status: 401, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_keeps_code() {
        let err = ApiError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_unauthorized());
        assert_eq!(err.to_string(), "HTTP status 500: boom");
    }

    #[test]
    fn test_unauthorized() {
        let err = ApiError::from_status(reqwest::StatusCode::UNAUTHORIZED, "");
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with(&format!("... (truncated, {} total bytes)", long.len())));

        // Multi-byte characters are not split: 500 bytes rounds down to 166 three-byte chars
        let wide = "淨".repeat(200);
        let truncated = ApiError::truncate_body(&wide);
        assert_eq!(
            truncated,
            format!("{}... (truncated, {} total bytes)", "淨".repeat(166), wide.len())
        );
    }

    #[test]
    fn test_short_body_untouched() {
        assert_eq!(ApiError::truncate_body("oops"), "oops");
    }

    #[test]
    fn test_login_status_passthrough() {
        let err = ApiError::Login(Box::new(ApiError::HttpStatus {
            status: 403,
            body: String::new(),
        }));
        assert_eq!(err.status(), Some(403));
        assert!(!err.is_unauthorized());
    }
}
