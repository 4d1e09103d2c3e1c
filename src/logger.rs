//! Protocol trace capture
//!
//! [`ProtocolLogger`] records every protocol exchange as an append-only,
//! in-memory sequence of [`LogEntry`] values. The session logs an entry for
//! each outgoing request and each incoming response or server notification;
//! commands read the trace back for display or export it as JSON.
//!
//! Durations are measured against `std::time::Instant` so they are monotonic
//! and never negative, independent of wall-clock adjustments; entry
//! timestamps use wall-clock time for human consumption and export.
//!
//! Appends take an internal mutex, so a logger behind an `Arc` can be shared
//! between the session and the transport read loop without interleaving
//! partial entries. The companion `tracing` lines are best-effort and never
//! affect the trace itself.

use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LogConfig;
use crate::error::Result;

/// Direction of a protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Client-to-server request.
    Request,
    /// Server-to-client response.
    Response,
    /// Server-to-client notification.
    Notification,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Request => write!(f, "request"),
            Direction::Response => write!(f, "response"),
            Direction::Notification => write!(f, "notification"),
        }
    }
}

/// A single captured protocol exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Wall-clock time the entry was recorded (ISO 8601 in JSON export).
    pub timestamp: DateTime<Utc>,
    /// Message direction.
    pub direction: Direction,
    /// The protocol method this entry belongs to.
    pub method: String,
    /// Request params, response result, or notification params.
    pub data: serde_json::Value,
    /// Elapsed time since the paired request. `None` for requests,
    /// notifications, and unpaired responses. Exported as `durationMs`.
    #[serde(rename = "durationMs")]
    pub duration_ms: Option<f64>,
    /// Error description when the exchange failed.
    pub error: Option<String>,
}

impl LogEntry {
    /// Whether this entry records a failed exchange.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Pairs a response with its originating request for duration measurement.
///
/// Returned by [`ProtocolLogger::log_request`] and consumed by
/// [`ProtocolLogger::log_response`]. Holds no lock and no reference into the
/// trace; dropping it without logging a response is fine (the response entry,
/// if any, simply carries no duration).
#[derive(Debug)]
pub struct RequestHandle {
    method: String,
    started: Instant,
}

impl RequestHandle {
    /// The method the originating request was sent for.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Monotonic elapsed time since the request was logged, in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

/// Append-only in-memory protocol trace.
///
/// # Examples
///
/// ```
/// use mcprobe::logger::{Direction, ProtocolLogger};
///
/// let logger = ProtocolLogger::new();
/// let handle = logger.log_request("ping", None);
/// logger.log_response("ping", serde_json::json!({}), Some(&handle), None);
/// let entries = logger.get_entries(Some(Direction::Response), None, None);
/// assert_eq!(entries.len(), 1);
/// assert!(entries[0].duration_ms.is_some());
/// ```
#[derive(Debug)]
pub struct ProtocolLogger {
    entries: Mutex<Vec<LogEntry>>,
    trace_requests: bool,
    trace_responses: bool,
}

impl Default for ProtocolLogger {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            trace_requests: true,
            trace_responses: true,
        }
    }
}

impl ProtocolLogger {
    /// Create an empty trace with all companion trace lines enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty trace with the companion `tracing` lines gated by
    /// the logging configuration. The trace itself always records every
    /// entry; the flags only control the mirrored debug output.
    pub fn with_config(config: &LogConfig) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            trace_requests: config.log_requests,
            trace_responses: config.log_responses,
        }
    }

    fn append(&self, entry: LogEntry) {
        // A poisoned mutex only means another thread panicked mid-append of
        // a different entry; the Vec itself is still valid.
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.push(entry);
    }

    /// Record an outgoing request and return a handle for pairing the
    /// response.
    ///
    /// # Arguments
    ///
    /// * `method` - The protocol method being invoked
    /// * `params` - The request parameters, if any
    pub fn log_request(&self, method: &str, params: Option<serde_json::Value>) -> RequestHandle {
        let data = params.unwrap_or_else(|| serde_json::json!({}));
        if self.trace_requests {
            tracing::debug!(method, "request");
        }
        self.append(LogEntry {
            timestamp: Utc::now(),
            direction: Direction::Request,
            method: method.to_string(),
            data,
            duration_ms: None,
            error: None,
        });
        RequestHandle {
            method: method.to_string(),
            started: Instant::now(),
        }
    }

    /// Record an incoming response.
    ///
    /// Non-object results are wrapped as `{"result": <value>}` so every
    /// entry's `data` is a JSON object. When `handle` is given the entry
    /// carries the monotonic elapsed time since the paired request.
    ///
    /// # Arguments
    ///
    /// * `method` - The protocol method the response answers
    /// * `result` - The response payload
    /// * `handle` - Handle from [`Self::log_request`], when pairing is possible
    /// * `error` - Error description when the exchange failed
    pub fn log_response(
        &self,
        method: &str,
        result: serde_json::Value,
        handle: Option<&RequestHandle>,
        error: Option<String>,
    ) {
        let duration_ms = handle.map(RequestHandle::elapsed_ms);
        let data = match result {
            serde_json::Value::Object(_) => result,
            other => serde_json::json!({ "result": other }),
        };
        // Errors are always surfaced; the flag only gates the debug lines.
        match (&error, duration_ms) {
            (Some(e), _) => tracing::error!(method, error = %e, "response error"),
            (None, Some(ms)) if self.trace_responses => {
                tracing::debug!(method, duration_ms = ms, "response");
            }
            (None, None) if self.trace_responses => tracing::debug!(method, "response"),
            _ => {}
        }
        self.append(LogEntry {
            timestamp: Utc::now(),
            direction: Direction::Response,
            method: method.to_string(),
            data,
            duration_ms,
            error,
        });
    }

    /// Record a server-initiated notification.
    pub fn log_notification(&self, method: &str, params: Option<serde_json::Value>) {
        if self.trace_responses {
            tracing::debug!(method, "notification");
        }
        self.append(LogEntry {
            timestamp: Utc::now(),
            direction: Direction::Notification,
            method: method.to_string(),
            data: params.unwrap_or_else(|| serde_json::json!({})),
            duration_ms: None,
            error: None,
        });
    }

    /// Retrieve entries, optionally filtered.
    ///
    /// Filters combine: direction first, then method, then `limit` keeps the
    /// LAST `limit` entries of what survives the filters (the most recent
    /// traffic, not the oldest).
    pub fn get_entries(
        &self,
        direction: Option<Direction>,
        method: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<LogEntry> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let filtered: Vec<LogEntry> = entries
            .iter()
            .filter(|e| direction.map_or(true, |d| e.direction == d))
            .filter(|e| method.map_or(true, |m| e.method == m))
            .cloned()
            .collect();
        match limit {
            Some(n) if n < filtered.len() => filtered[filtered.len() - n..].to_vec(),
            _ => filtered,
        }
    }

    /// Number of entries currently in the trace.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether the trace is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all entries.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Export the full trace as pretty-printed JSON.
    ///
    /// Timestamps serialize as ISO 8601 strings.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn export_json(&self) -> Result<String> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(serde_json::to_string_pretty(&*entries)?)
    }
}
