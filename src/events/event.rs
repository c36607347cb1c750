use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::EventError;

/// A validated "submission created" notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionCreated {
    pub submission_id: String,
    pub tenant_id: String,
    pub course_id: String,
}

/// Decodes a raw bus payload. Unknown fields are ignored.
pub fn decode_event(bytes: &[u8]) -> Result<SubmissionCreated, EventError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(EventError::Empty);
    }

    let text = std::str::from_utf8(bytes).map_err(|e| EventError::InvalidUtf8 {
        reason: e.to_string(),
    })?;

    let value: Value = serde_json::from_str(text).map_err(|e| EventError::InvalidJson {
        reason: e.to_string(),
    })?;
    let Value::Object(fields) = value else {
        return Err(EventError::InvalidJson {
            reason: "top-level value is not an object".to_string(),
        });
    };

    Ok(SubmissionCreated {
        submission_id: required(&fields, "submissionId")?,
        tenant_id: required(&fields, "tenantId")?,
        course_id: required(&fields, "courseId")?,
    })
}

fn required(fields: &Map<String, Value>, field: &'static str) -> Result<String, EventError> {
    fields
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(EventError::MissingField { field })
}
