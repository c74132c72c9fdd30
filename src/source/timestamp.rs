use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("line has no timestamp prefix")]
    Missing,

    #[error("failed to parse timestamp '{value}': {source}")]
    ParseError {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Split the RFC 3339 prefix that `docker logs --timestamps` puts before every line.
///
/// Format: `2024-01-05T10:30:00.123456789Z message`
pub fn split_timestamp_prefix(line: &str) -> Result<(DateTime<Utc>, &str), TimestampError> {
    let starts_with_digit = line.chars().next().is_some_and(|c| c.is_ascii_digit());
    let Some((prefix, content)) = line.split_once(' ').filter(|_| starts_with_digit) else {
        return Err(TimestampError::Missing);
    };

    let timestamp = DateTime::parse_from_rfc3339(prefix)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| TimestampError::ParseError {
            value: prefix.to_string(),
            source,
        })?;

    Ok((timestamp, content))
}

/// Timestamp and content for a container log line.
///
/// A missing or malformed prefix is not fatal: the line keeps its full text and
/// is stamped with `now`.
pub fn stamp_container_line(line: &str, now: DateTime<Utc>) -> (DateTime<Utc>, String) {
    match split_timestamp_prefix(line) {
        Ok((timestamp, content)) => (timestamp, content.to_string()),
        Err(e) => {
            tracing::trace!(error = %e, "Using arrival time for container line");
            (now, line.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_nanosecond_prefix() {
        let (ts, content) =
            split_timestamp_prefix("2024-01-05T10:30:00.123456789Z GET /health 200").unwrap();

        assert_eq!(content, "GET /health 200");
        assert_eq!(ts.to_rfc3339(), "2024-01-05T10:30:00.123456789+00:00");
    }

    #[test]
    fn test_offset_prefix_converted_to_utc() {
        let (ts, _) = split_timestamp_prefix("2024-01-05T10:30:00+02:00 message").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-05T08:30:00+00:00");
    }

    #[test]
    fn test_no_prefix() {
        assert!(matches!(
            split_timestamp_prefix("plain message"),
            Err(TimestampError::Missing)
        ));
        assert!(matches!(
            split_timestamp_prefix("2024-01-05T10:30:00Z"),
            Err(TimestampError::Missing)
        ));
    }

    #[test]
    fn test_malformed_prefix_falls_back_to_now() {
        let (ts, content) = stamp_container_line("404 not found on /api", now());

        assert_eq!(ts, now());
        assert_eq!(content, "404 not found on /api");
    }

    #[test]
    fn test_valid_prefix_keeps_source_time() {
        let (ts, content) = stamp_container_line("2024-01-05T10:30:00Z ERROR boom", now());

        assert_eq!(ts.to_rfc3339(), "2024-01-05T10:30:00+00:00");
        assert_eq!(content, "ERROR boom");
    }
}
