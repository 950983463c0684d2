//! Audit events for bearer authorization decisions.
//!
//! | Event | When |
//! |-------|------|
//! | `bearer.allowed` | Every check passed and the evaluator permitted access |
//! | `bearer.denied` | Any step denied the request |

use serde::Serialize;

use super::{DenyReason, Stage};

/// Structured audit event for one bearer authorization decision.
#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Event type (`bearer.allowed` or `bearer.denied`)
    pub event: &'static str,
    /// Requested resource
    pub resource: String,
    /// Consenting subject, once introspection succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Client the token was issued to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Last stage reached before the denial
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Denial reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEvent {
    /// Construct a `bearer.allowed` event.
    #[must_use]
    pub fn allowed(resource: &str, subject: &str, client_id: Option<&str>) -> Self {
        Self {
            event: "bearer.allowed",
            resource: resource.to_string(),
            subject: Some(subject.to_string()),
            client_id: client_id.map(str::to_string),
            stage: None,
            reason: None,
        }
    }

    /// Construct a `bearer.denied` event.
    #[must_use]
    pub fn denied(
        resource: &str,
        subject: Option<&str>,
        client_id: Option<&str>,
        stage: Stage,
        reason: &DenyReason,
    ) -> Self {
        Self {
            event: "bearer.denied",
            resource: resource.to_string(),
            subject: subject.map(str::to_string),
            client_id: client_id.map(str::to_string),
            stage: Some(stage),
            reason: Some(reason.to_string()),
        }
    }
}

/// Emit an audit event as a JSON blob in the `audit` field.
pub fn emit(event: &AuditEvent) {
    match serde_json::to_string(event) {
        Ok(ref json) => tracing::info!(audit = %json, "bearer authorization audit"),
        Err(ref e) => tracing::warn!(error = %e, "Failed to serialize audit event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_event_has_subject() {
        // GIVEN/WHEN: an allowed event
        let event = AuditEvent::allowed("https://api.example.com/x", "john", Some("app"));

        // THEN: no stage or reason is attached
        assert_eq!(event.event, "bearer.allowed");
        assert_eq!(event.subject.as_deref(), Some("john"));
        assert!(event.stage.is_none());
        assert!(event.reason.is_none());
    }

    #[test]
    fn denied_event_serializes_stage_and_reason() {
        // GIVEN: a denial after introspection
        let event = AuditEvent::denied(
            "https://api.example.com/x",
            Some("john"),
            None,
            Stage::TokenIntrospected,
            &DenyReason::MissingScope,
        );

        // WHEN: serialized
        let json = serde_json::to_string(&event).unwrap();

        // THEN: stage and reason appear, client_id is omitted
        assert!(json.contains(r#""event":"bearer.denied""#));
        assert!(json.contains(r#""stage":"token_introspected""#));
        assert!(json.contains("bearer.authz"));
        assert!(!json.contains("client_id"));
    }
}
