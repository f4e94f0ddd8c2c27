//! Failure classification: status code + headers + body → [`Failure`].
//!
//! The classifier is the only place that interprets non-success responses.
//! Its output drives both the retry policy and the error handed to callers.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::{Map, Value};

use crate::error::{HttpError, TransientPhase, ValidationDetail};

/// Maximum number of characters of a response body kept in [`Failure::Unknown`].
pub const EXCERPT_LIMIT: usize = 256;

/// Classification of one failed attempt.
///
/// Owns copies of whatever it needs from the response; the response itself is
/// dropped as soon as it has been classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    NotFound,
    Unauthorized,
    Forbidden { missing_scope: Option<String> },
    RateLimited { retry_after: Option<Duration> },
    Validation(ValidationDetail),
    /// No status line was received (DNS, connect, TLS, timeout).
    Transient { phase: TransientPhase },
    ServerError { status: u16 },
    Unknown { status: u16, excerpt: String },
}

impl Failure {
    /// Short kind name for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::NotFound => "not_found",
            Failure::Unauthorized => "unauthorized",
            Failure::Forbidden { .. } => "forbidden",
            Failure::RateLimited { .. } => "rate_limited",
            Failure::Validation(_) => "validation",
            Failure::Transient { .. } => "transient",
            Failure::ServerError { .. } => "server_error",
            Failure::Unknown { .. } => "unknown",
        }
    }
}

impl From<Failure> for HttpError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::NotFound => HttpError::NotFound,
            Failure::Unauthorized => HttpError::Unauthorized,
            Failure::Forbidden { missing_scope } => HttpError::Forbidden { missing_scope },
            Failure::RateLimited { retry_after } => HttpError::RateLimited { retry_after },
            Failure::Validation(detail) => HttpError::Validation(detail),
            Failure::Transient { phase } => HttpError::Network {
                phase,
                source: None,
            },
            Failure::ServerError { status } => HttpError::ServerError { status },
            Failure::Unknown { status, excerpt } => HttpError::Unknown { status, excerpt },
        }
    }
}

/// Classify a non-success response.
///
/// Pure: the same `(status, headers, body)` always yields the same `Failure`.
pub fn classify(status: u16, headers: &HeaderMap, body: &str) -> Failure {
    match status {
        404 => Failure::NotFound,
        401 => Failure::Unauthorized,
        403 => Failure::Forbidden {
            missing_scope: missing_scope(body),
        },
        429 => Failure::RateLimited {
            retry_after: retry_after(headers),
        },
        400 | 422 => match validation_detail(body) {
            Some(detail) => Failure::Validation(detail),
            None => unknown(status, body),
        },
        500..=599 => Failure::ServerError { status },
        _ => unknown(status, body),
    }
}

/// `Retry-After` as a whole number of seconds. HTTP-date values are ignored.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Truncate a body for diagnostics, on a char boundary.
pub fn excerpt(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(EXCERPT_LIMIT).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn unknown(status: u16, body: &str) -> Failure {
    Failure::Unknown {
        status,
        excerpt: excerpt(body),
    }
}

fn missing_scope(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    for key in ["missing_scope", "missingScope", "scope"] {
        if let Some(Value::String(scope)) = value.get(key) {
            return Some(scope.clone());
        }
    }

    let error = value.get("error")?.as_str()?;
    let rest = error.strip_prefix("Missing scope")?;
    let scope = rest
        .trim_start_matches(|c: char| c == ':' || c.is_whitespace())
        .trim();
    (!scope.is_empty()).then(|| scope.to_string())
}

fn validation_detail(body: &str) -> Option<ValidationDetail> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    let mut detail = ValidationDetail::default();
    match object.get("error") {
        Some(Value::String(message)) => detail.message = Some(message.clone()),
        Some(Value::Object(fields)) => collect_fields(fields, &mut detail),
        Some(_) => return None,
        None => collect_fields(object, &mut detail),
    }

    if detail.message.is_none() && detail.fields.is_empty() {
        return None;
    }
    Some(detail)
}

fn collect_fields(fields: &Map<String, Value>, detail: &mut ValidationDetail) {
    for (field, value) in fields {
        let messages = match value {
            Value::String(message) => vec![message.clone()],
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(message) => message.clone(),
                    other => other.to_string(),
                })
                .collect(),
            other => vec![other.to_string()],
        };
        detail.fields.insert(field.clone(), messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn no_headers() -> HeaderMap {
        HeaderMap::new()
    }

    fn retry_after_header(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_simple_status_mapping() {
        assert_eq!(classify(404, &no_headers(), ""), Failure::NotFound);
        assert_eq!(classify(401, &no_headers(), "{}"), Failure::Unauthorized);
        assert_eq!(
            classify(503, &no_headers(), "<html>"),
            Failure::ServerError { status: 503 }
        );
        assert_eq!(
            classify(500, &no_headers(), ""),
            Failure::ServerError { status: 500 }
        );
    }

    #[test]
    fn test_rate_limited_with_retry_after() {
        assert_eq!(
            classify(429, &retry_after_header("2"), ""),
            Failure::RateLimited {
                retry_after: Some(Duration::from_secs(2))
            }
        );
        assert_eq!(
            classify(429, &retry_after_header(" 60 "), ""),
            Failure::RateLimited {
                retry_after: Some(Duration::from_secs(60))
            }
        );
    }

    #[test]
    fn test_rate_limited_ignores_unparseable_retry_after() {
        for value in ["-1", "1.5", "Wed, 21 Oct 2015 07:28:00 GMT", ""] {
            let mut headers = HeaderMap::new();
            headers.insert(RETRY_AFTER, HeaderValue::from_str(value).unwrap());
            assert_eq!(
                classify(429, &headers, ""),
                Failure::RateLimited { retry_after: None },
                "value {value:?}"
            );
        }
        assert_eq!(
            classify(429, &no_headers(), ""),
            Failure::RateLimited { retry_after: None }
        );
    }

    #[test]
    fn test_forbidden_missing_scope() {
        assert_eq!(
            classify(403, &no_headers(), r#"{"error":"Missing scope: board:play"}"#),
            Failure::Forbidden {
                missing_scope: Some("board:play".into())
            }
        );
        assert_eq!(
            classify(403, &no_headers(), r#"{"error":"nope","missing_scope":"challenge:write"}"#),
            Failure::Forbidden {
                missing_scope: Some("challenge:write".into())
            }
        );
        assert_eq!(
            classify(403, &no_headers(), r#"{"error":"This account is closed"}"#),
            Failure::Forbidden { missing_scope: None }
        );
        assert_eq!(
            classify(403, &no_headers(), "forbidden"),
            Failure::Forbidden { missing_scope: None }
        );
    }

    #[test]
    fn test_validation_field_errors_kept_verbatim() {
        let body = r#"{"error":{"clock.limit":["Must be between 0 and 10800"],"days":["Invalid value"]}}"#;
        let Failure::Validation(detail) = classify(400, &no_headers(), body) else {
            panic!("expected validation");
        };
        assert_eq!(detail.message, None);
        assert_eq!(
            detail.fields.get("clock.limit"),
            Some(&vec!["Must be between 0 and 10800".to_string()])
        );
        assert_eq!(detail.fields.get("days"), Some(&vec!["Invalid value".to_string()]));
    }

    #[test]
    fn test_validation_message_and_top_level_fields() {
        let Failure::Validation(detail) =
            classify(400, &no_headers(), r#"{"error":"Not your turn, or game already over"}"#)
        else {
            panic!("expected validation");
        };
        assert_eq!(
            detail.message.as_deref(),
            Some("Not your turn, or game already over")
        );

        let Failure::Validation(detail) =
            classify(422, &no_headers(), r#"{"name":["Too short"]}"#)
        else {
            panic!("expected validation");
        };
        assert_eq!(detail.fields.get("name"), Some(&vec!["Too short".to_string()]));
    }

    #[test]
    fn test_unstructured_bad_request_is_unknown() {
        assert_eq!(
            classify(400, &no_headers(), "bad request"),
            Failure::Unknown {
                status: 400,
                excerpt: "bad request".into()
            }
        );
        assert_eq!(
            classify(422, &no_headers(), "{}"),
            Failure::Unknown {
                status: 422,
                excerpt: "{}".into()
            }
        );
    }

    #[test]
    fn test_unknown_status_truncates_body() {
        let body = "é".repeat(EXCERPT_LIMIT + 10);
        let Failure::Unknown { status, excerpt } = classify(418, &no_headers(), &body) else {
            panic!("expected unknown");
        };
        assert_eq!(status, 418);
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.trim_end_matches("...").chars().count(), EXCERPT_LIMIT);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let cases: Vec<(u16, HeaderMap, &str)> = vec![
            (404, no_headers(), ""),
            (429, retry_after_header("3"), ""),
            (400, no_headers(), r#"{"error":{"a":["b"]}}"#),
            (403, no_headers(), r#"{"error":"Missing scope: x"}"#),
            (302, no_headers(), "moved"),
            (502, no_headers(), "bad gateway"),
        ];
        for (status, headers, body) in cases {
            assert_eq!(
                classify(status, &headers, body),
                classify(status, &headers, body)
            );
        }
    }

    #[test]
    fn test_failure_into_http_error() {
        let err: HttpError = Failure::RateLimited {
            retry_after: Some(Duration::from_secs(5)),
        }
        .into();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));

        let err: HttpError = Failure::Transient {
            phase: TransientPhase::Connect,
        }
        .into();
        assert!(matches!(
            err,
            HttpError::Network {
                phase: TransientPhase::Connect,
                source: None
            }
        ));
    }
}
