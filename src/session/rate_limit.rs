// Rate limit detection for failed generation requests

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::error::TransportError;

/// Result of rate limit detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    /// The type of rate limit detected
    pub limit_type: RateLimitType,
    /// Suggested retry delay in milliseconds, when the message carried one
    pub retry_after_ms: Option<u64>,
    /// The text that triggered detection
    pub matched_pattern: Option<String>,
    pub detected_at: DateTime<Utc>,
}

/// Types of rate limits that can be detected
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitType {
    /// HTTP 429 Too Many Requests
    Http429,
    /// Generic rate limit message
    RateLimit,
    /// Quota exceeded
    QuotaExceeded,
    /// Service overloaded
    Overloaded,
}

impl std::fmt::Display for RateLimitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimitType::Http429 => write!(f, "http_429"),
            RateLimitType::RateLimit => write!(f, "rate_limit"),
            RateLimitType::QuotaExceeded => write!(f, "quota_exceeded"),
            RateLimitType::Overloaded => write!(f, "overloaded"),
        }
    }
}

struct CompiledPattern {
    regex: Regex,
    limit_type: RateLimitType,
}

static PATTERNS: OnceLock<Vec<CompiledPattern>> = OnceLock::new();

fn get_patterns() -> &'static Vec<CompiledPattern> {
    PATTERNS.get_or_init(|| {
        vec![
            // Word boundary keeps ids like "req_4291" from matching
            CompiledPattern {
                regex: Regex::new(r"(?i)\b429\b\s*(?:too many requests|rate limit)?").unwrap(),
                limit_type: RateLimitType::Http429,
            },
            CompiledPattern {
                regex: Regex::new(r"(?i)status[:\s]*429").unwrap(),
                limit_type: RateLimitType::Http429,
            },
            CompiledPattern {
                regex: Regex::new(r"(?i)rate[_\-\s]?limit(ed|ing)?").unwrap(),
                limit_type: RateLimitType::RateLimit,
            },
            CompiledPattern {
                regex: Regex::new(r"(?i)too\s+many\s+requests").unwrap(),
                limit_type: RateLimitType::RateLimit,
            },
            CompiledPattern {
                regex: Regex::new(r"(?i)quota\s*(exceeded|limit)").unwrap(),
                limit_type: RateLimitType::QuotaExceeded,
            },
            CompiledPattern {
                regex: Regex::new(r"(?i)usage\s+limit\s+(exceeded|reached)").unwrap(),
                limit_type: RateLimitType::QuotaExceeded,
            },
            CompiledPattern {
                regex: Regex::new(r"(?i)overloaded").unwrap(),
                limit_type: RateLimitType::Overloaded,
            },
            CompiledPattern {
                regex: Regex::new(r"(?i)capacity\s+(exceeded|limit)").unwrap(),
                limit_type: RateLimitType::Overloaded,
            },
        ]
    })
}

static RETRY_AFTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_retry_after_regex() -> &'static Regex {
    RETRY_AFTER_REGEX.get_or_init(|| Regex::new(r"(?i)retry[_\-\s]?after[:\s]*(\d+)").unwrap())
}

/// Classify a transport failure. Returns None for ordinary failures.
pub fn detect_rate_limit(error: &TransportError) -> Option<RateLimitInfo> {
    let retry_after_ms = extract_retry_after_ms(&error.message);

    let by_status = match error.status {
        Some(429) => Some(RateLimitType::Http429),
        // Anthropic-style "overloaded" status
        Some(529) => Some(RateLimitType::Overloaded),
        _ => None,
    };
    if let Some(limit_type) = by_status {
        return Some(RateLimitInfo {
            limit_type,
            retry_after_ms,
            matched_pattern: error.status.map(|s| s.to_string()),
            detected_at: Utc::now(),
        });
    }

    detect_in_message(&error.message).map(|(limit_type, matched)| RateLimitInfo {
        limit_type,
        retry_after_ms,
        matched_pattern: Some(matched),
        detected_at: Utc::now(),
    })
}

fn detect_in_message(message: &str) -> Option<(RateLimitType, String)> {
    get_patterns().iter().find_map(|pattern| {
        pattern
            .regex
            .find(message)
            .map(|m| (pattern.limit_type, m.as_str().to_string()))
    })
}

/// Retry-after values are given in seconds
fn extract_retry_after_ms(message: &str) -> Option<u64> {
    get_retry_after_regex()
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
}
