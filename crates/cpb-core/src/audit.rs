use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{domain::OperatorId, errors::Error, formatting::truncate_text, Result};

const AUDIT_MAX_TEXT: usize = 500;

/// One line of the append-only audit trail.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,
    pub operator_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEvent {
    fn new(event: &str, operator: OperatorId) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event: event.to_string(),
            operator_id: operator.0,
            channel: None,
            content: None,
            error: None,
        }
    }

    pub fn channel_linked(operator: OperatorId, channel: &str) -> Self {
        Self {
            channel: Some(channel.to_string()),
            ..Self::new("channel_linked", operator)
        }
    }

    pub fn draft_saved(operator: OperatorId, text: &str) -> Self {
        Self {
            content: Some(text.to_string()),
            ..Self::new("draft_saved", operator)
        }
    }

    pub fn published(operator: OperatorId, channel: &str) -> Self {
        Self {
            channel: Some(channel.to_string()),
            ..Self::new("published", operator)
        }
    }

    pub fn publish_failed(operator: OperatorId, channel: &str, error: &str) -> Self {
        Self {
            channel: Some(channel.to_string()),
            error: Some(error.to_string()),
            ..Self::new("publish_failed", operator)
        }
    }

    pub fn cancelled(operator: OperatorId) -> Self {
        Self::new("cancelled", operator)
    }

    pub fn error(operator: OperatorId, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new("error", operator)
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: Option<PathBuf>,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: Some(path.into()),
            json,
        }
    }

    /// Logger that drops every event.
    pub fn disabled() -> Self {
        Self {
            path: None,
            json: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(s) = &event.content {
            event.content = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }
        if let Some(s) = &event.error {
            event.error = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::External(
                "audit event is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            match v {
                serde_json::Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            }
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }

    /// Write and log (never propagate) failures; the dialogue must not depend on the audit trail.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.write(event) {
            tracing::warn!(error = %e, "failed to write audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_lines_are_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLogger::new(dir.path().join("audit.log"), true);
        let text = "x".repeat(AUDIT_MAX_TEXT + 20);
        log.write(AuditEvent::draft_saved(OperatorId(1), &text))
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("audit.log")).unwrap();
        let v: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(v["event"], "draft_saved");
        assert_eq!(v["operator_id"], 1);
        assert!(v["content"].as_str().unwrap().ends_with("..."));
        assert!(v.get("channel").is_none());
    }

    #[test]
    fn plain_format_lists_fields() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLogger::new(dir.path().join("audit.log"), false);
        log.write(AuditEvent::publish_failed(
            OperatorId(2),
            "@c",
            "chat not found",
        ))
        .unwrap();

        let written = std::fs::read_to_string(dir.path().join("audit.log")).unwrap();
        assert!(written.contains("event: publish_failed"));
        assert!(written.contains("channel: @c"));
        assert!(written.contains("error: chat not found"));
    }

    #[test]
    fn disabled_logger_writes_nothing() {
        let log = AuditLogger::disabled();
        assert!(log.path().is_none());
        log.write(AuditEvent::cancelled(OperatorId(1))).unwrap();
    }
}
