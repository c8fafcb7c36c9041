//! Context management for logging system.
//!
//! A `LogContext` carries correlation data (user, session, request) plus any
//! extra fields. Entries receive a copy of the context active at creation time,
//! so later changes never rewrite entries that were already emitted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Correlation bundle attached to log entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogContext {
    /// User ID if available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Session ID for user sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Request ID for HTTP requests or similar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Custom key-value pairs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_context: BTreeMap<String, serde_json::Value>,
}

impl LogContext {
    /// Create a new empty logging context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set user ID
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set session ID
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set request ID
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Add a custom field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.additional_context.insert(key.into(), value.into());
        self
    }

    /// Generate and set a new request ID
    pub fn generate_request_id(&mut self) -> &str {
        self.request_id
            .insert(Uuid::new_v4().to_string())
            .as_str()
    }

    /// Generate and set a new session ID
    pub fn generate_session_id(&mut self) -> &str {
        self.session_id
            .insert(Uuid::new_v4().simple().to_string())
            .as_str()
    }

    /// Set a named field. The three correlation IDs are recognised by name,
    /// anything else lands in `additional_context`.
    pub fn set_field(&mut self, key: &str, value: impl Into<serde_json::Value>) -> &mut Self {
        let value = value.into();
        match key {
            "user_id" => self.user_id = id_from_value(&value),
            "session_id" => self.session_id = id_from_value(&value),
            "request_id" => self.request_id = id_from_value(&value),
            _ => {
                self.additional_context.insert(key.to_string(), value);
            }
        }
        self
    }

    /// Remove a custom field
    pub fn remove_field(&mut self, key: &str) -> &mut Self {
        self.additional_context.remove(key);
        self
    }

    /// Merge another context into this one.
    ///
    /// Values already present on `self` win; missing IDs and fields are
    /// filled in from `other`.
    pub fn merge(&mut self, other: &LogContext) -> &mut Self {
        if self.user_id.is_none() {
            self.user_id = other.user_id.clone();
        }
        if self.session_id.is_none() {
            self.session_id = other.session_id.clone();
        }
        if self.request_id.is_none() {
            self.request_id = other.request_id.clone();
        }
        for (key, value) in &other.additional_context {
            self.additional_context
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    /// Clear all context information
    pub fn clear(&mut self) -> &mut Self {
        *self = LogContext::new();
        self
    }

    /// Check if context has any meaningful information
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.session_id.is_none()
            && self.request_id.is_none()
            && self.additional_context.is_empty()
    }
}

fn id_from_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
