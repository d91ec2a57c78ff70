//! Log events as seen by the sink
//!
//! The sink only needs one capability from an event: rendering a column
//! layout such as `${level}` or `${event-property:user}` to a string. That is
//! the [`LogRecord`] trait. [`LogEventInfo`] is a ready-made event type; hosts
//! with their own event type implement the trait directly, and plain closures
//! work too.

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::SinkResult;

/// `${name}` or `${name:argument}`
static LAYOUT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z][A-Za-z0-9-]*)(?::([^}]*))?\}").expect("Invalid regex")
});

/// An event that can render column layouts
pub trait LogRecord {
    /// Render `layout` against this event.
    fn render(&self, layout: &str) -> String;
}

impl<F> LogRecord for F
where
    F: Fn(&str) -> String,
{
    fn render(&self, layout: &str) -> String {
        self(layout)
    }
}

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Trace => "Trace",
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warn => "Warn",
            LogLevel::Error => "Error",
            LogLevel::Fatal => "Fatal",
        };
        f.write_str(name)
    }
}

/// A structured log event
///
/// Supported layout tokens:
///
/// | Token | Renders |
/// |---|---|
/// | `${longdate}` | `2024-01-02 03:04:05.678` (UTC) |
/// | `${date}` | RFC 3339, UTC |
/// | `${level}` | `Info`, `Warn`, ... |
/// | `${logger}` | logger name |
/// | `${message}` | message |
/// | `${exception}` | exception text, empty if none |
/// | `${json}` | the whole event as JSON |
/// | `${event-property:key}` | property value, empty if missing |
///
/// Unknown tokens render as empty strings; text outside tokens is kept.
///
/// # Example
///
/// ```rust
/// use sql_bulk_sink::sink::{LogEventInfo, LogLevel, LogRecord};
///
/// let event = LogEventInfo::new(LogLevel::Warn, "billing", "card declined")
///     .with_property("attempt", 3);
/// assert_eq!(
///     event.render("${level}|${logger}|${event-property:attempt}"),
///     "Warn|billing|3"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEventInfo {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub logger: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl LogEventInfo {
    /// Create an event stamped with the current time.
    pub fn new(level: LogLevel, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            logger: logger.into(),
            message: message.into(),
            exception: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    fn render_token(&self, name: &str, argument: Option<&str>) -> String {
        match (name.to_lowercase().as_str(), argument) {
            ("longdate", _) => self
                .timestamp
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string(),
            ("date", _) => self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            ("level", _) => self.level.to_string(),
            ("logger", _) => self.logger.clone(),
            ("message", _) => self.message.clone(),
            ("exception", _) => self.exception.clone().unwrap_or_default(),
            ("json", _) => serde_json::to_string(self).unwrap_or_default(),
            ("event-property", Some(key)) => match self.properties.get(key) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
            _ => String::new(),
        }
    }
}

impl LogRecord for LogEventInfo {
    fn render(&self, layout: &str) -> String {
        LAYOUT_TOKEN
            .replace_all(layout, |caps: &Captures| {
                let argument = caps.get(2).map(|m| m.as_str());
                self.render_token(&caps[1], argument)
            })
            .into_owned()
    }
}

/// Completion handle of a queued event, called with the event's outcome
pub type Continuation = Box<dyn FnOnce(SinkResult<()>) + Send>;

/// An event paired with its completion handle
///
/// [`complete`](Self::complete) consumes the pair, so the handle runs at most
/// once; the sink calls it for every event it is given.
pub struct AsyncLogEvent<E> {
    pub event: E,
    continuation: Continuation,
}

impl<E> AsyncLogEvent<E> {
    pub fn new<F>(event: E, continuation: F) -> Self
    where
        F: FnOnce(SinkResult<()>) + Send + 'static,
    {
        Self {
            event,
            continuation: Box::new(continuation),
        }
    }

    /// An event whose outcome nobody waits for.
    pub fn detached(event: E) -> Self {
        Self::new(event, |_| {})
    }

    /// Report the outcome of writing this event.
    pub fn complete(self, result: SinkResult<()>) {
        (self.continuation)(result)
    }
}

impl<E: std::fmt::Debug> std::fmt::Debug for AsyncLogEvent<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncLogEvent")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkError;
    use chrono::TimeZone;
    use std::sync::mpsc;

    fn event() -> LogEventInfo {
        LogEventInfo::new(LogLevel::Error, "app.db", "connection lost")
            .with_timestamp(Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap())
            .with_exception("timeout after 30s")
            .with_property("user", "alice")
            .with_property("retries", 2)
    }

    #[test]
    fn test_render_builtin_tokens() {
        let event = event();
        assert_eq!(event.render("${longdate}"), "2024-03-09 14:05:07.000");
        assert_eq!(event.render("${date}"), "2024-03-09T14:05:07.000Z");
        assert_eq!(event.render("${level}"), "Error");
        assert_eq!(event.render("${logger}"), "app.db");
        assert_eq!(event.render("${message}"), "connection lost");
        assert_eq!(event.render("${exception}"), "timeout after 30s");
    }

    #[test]
    fn test_render_properties() {
        let event = event();
        assert_eq!(event.render("${event-property:user}"), "alice");
        assert_eq!(event.render("${event-property:retries}"), "2");
        assert_eq!(event.render("${event-property:missing}"), "");
    }

    #[test]
    fn test_render_mixed_and_unknown() {
        let event = event();
        assert_eq!(
            event.render("[${level}] ${message} ${nope}!"),
            "[Error] connection lost !"
        );
        assert_eq!(event.render("plain text"), "plain text");
        assert_eq!(event.render("${LEVEL}"), "Error");
    }

    #[test]
    fn test_render_json() {
        let json: serde_json::Value = serde_json::from_str(&event().render("${json}")).unwrap();
        assert_eq!(json["level"], "Error");
        assert_eq!(json["properties"]["user"], "alice");
    }

    #[test]
    fn test_closure_is_a_log_record() {
        let record = |layout: &str| layout.to_uppercase();
        assert_eq!(record.render("abc"), "ABC");
    }

    #[test]
    fn test_continuation_receives_outcome() {
        let (tx, rx) = mpsc::channel();
        let queued = AsyncLogEvent::new(event(), move |result| {
            tx.send(result).unwrap();
        });
        queued.complete(Err(SinkError::ConfigError("x".into())));
        assert_eq!(rx.recv().unwrap(), Err(SinkError::ConfigError("x".into())));

        AsyncLogEvent::detached(event()).complete(Ok(()));
    }
}
