use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Truncation limits applied to samples before persistence, so a pathological
/// endpoint can't blow up storage during a load run.
pub const RESULT_BODY_TRUNCATE_BYTES: usize = 10 * 1024;
pub const RESULT_ERROR_TRUNCATE_BYTES: usize = 1024;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionResult {
    pub id: Uuid,
    pub report_id: Uuid,
    pub endpoint: String,
    pub method: String,
    pub request_headers: serde_json::Value,
    pub request_body: Option<String>,
    pub response_status: Option<i32>,
    pub response_headers: serde_json::Value,
    pub response_body: Option<String>,
    pub response_time_ms: i64,
    pub is_success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub fn truncate(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "é".repeat(10); // 2 bytes each
        let t = truncate(&s, 5);
        assert!(t.len() <= 5);
        assert!(s.starts_with(&t));
    }

    #[test]
    fn truncate_is_noop_under_limit() {
        assert_eq!(truncate("short", 100), "short");
    }
}
