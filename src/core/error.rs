//! Error taxonomy for calls made against the Lahan Pintar backend.

use std::collections::BTreeMap;
use std::fmt::Write;

/// Failures surfaced by the transport seam.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Transport(String),

    /// The session could not be refreshed; the caller must log in again.
    #[error("Session expired, please log in again")]
    Unauthorized,

    /// 4xx responses carrying field-level messages from the backend.
    #[error("Request rejected ({status}): {}", format_fields(.fields))]
    Validation {
        status: u16,
        fields: BTreeMap<String, Vec<String>>,
    },

    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

impl ApiError {
    /// Builds the error for a non-success status and its raw body.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            400..=499 => ApiError::rejected(status, body),
            _ => ApiError::Server {
                status,
                body: body.to_string(),
            },
        }
    }

    /// A 4xx whose messages are shown to the user as sent, 401 included.
    pub fn rejected(status: u16, body: &str) -> Self {
        ApiError::Validation {
            status,
            fields: parse_field_errors(body),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Flattens a DRF-style error body into `field -> messages`.
///
/// Bodies that are not JSON objects are kept verbatim under `detail`.
fn parse_field_errors(body: &str) -> BTreeMap<String, Vec<String>> {
    let mut fields = BTreeMap::new();
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => {
            for (field, value) in map {
                let messages = match value {
                    serde_json::Value::Array(items) => items
                        .into_iter()
                        .map(|item| match item {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        })
                        .collect(),
                    serde_json::Value::String(s) => vec![s],
                    other => vec![other.to_string()],
                };
                fields.insert(field, messages);
            }
        }
        _ => {
            if !body.trim().is_empty() {
                fields.insert("detail".to_string(), vec![body.trim().to_string()]);
            }
        }
    }
    fields
}

fn format_fields(fields: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = String::new();
    for (i, (field, messages)) in fields.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{field}: {}", messages.join(", "));
    }
    out
}
