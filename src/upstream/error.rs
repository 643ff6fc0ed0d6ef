//! The three-class failure taxonomy every Upstream Client call surfaces.

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream not configured: {0}")]
    NotConfigured(String),

    #[error("upstream rate limited: {0}")]
    RateLimited(String),

    #[error("upstream error ({status}): {message}")]
    Other { status: u16, message: String },

    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl UpstreamError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, UpstreamError::RateLimited(_))
    }

    /// Classifies an upstream JSON error body into one of the three failure classes.
    /// Mirrors the marker-string heuristic the original client used: any mention of
    /// "limit" (case-insensitive) in the error message is treated as a rate limit.
    pub fn classify(status: u16, body: &str) -> Self {
        let lowered = body.to_lowercase();
        if lowered.contains("limit") {
            UpstreamError::RateLimited(body.to_string())
        } else {
            UpstreamError::Other {
                status,
                message: body.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_detects_rate_limit_marker() {
        let err = UpstreamError::classify(400, "Error: you have reached the rate limit for this call");
        assert!(matches!(err, UpstreamError::RateLimited(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn classify_falls_back_to_other() {
        let err = UpstreamError::classify(404, "Unknown campaign id");
        assert!(matches!(err, UpstreamError::Other { status: 404, .. }));
        assert!(!err.is_retryable());
    }
}
