//! Decoding of raw remote responses
//!
//! Transports return loosely shaped JSON values; these helpers turn them into
//! typed results or a `MalformedResponse` error.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{OrmError, Result};

/// Row returned by a bulk query
pub type Row = Map<String, Value>;

/// Extract the rows of a completed bulk query response
///
/// Fails with `IncompleteResult` unless the response reports `done: true`.
/// A completed query with no `records` key yields no rows.
pub(crate) fn completed_rows(response: &Value) -> Result<Vec<Row>> {
    let result = response
        .get("result")
        .and_then(Value::as_object)
        .ok_or_else(|| OrmError::malformed("query response has no result object"))?;

    if result.get("done") != Some(&Value::Bool(true)) {
        return Err(OrmError::IncompleteResult);
    }

    match result.get("records") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(records)) => records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                record
                    .as_object()
                    .cloned()
                    .ok_or_else(|| OrmError::malformed(format!("query row {} is not an object", i)))
            })
            .collect(),
        Some(other) => Err(OrmError::malformed(format!(
            "query records is not an array: {}",
            other
        ))),
    }
}

/// One entry of a create/update response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SaveResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub errors: Vec<SaveError>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SaveError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "statusCode")]
    pub status_code: Option<String>,
}

impl SaveError {
    fn describe(&self) -> String {
        match (&self.status_code, &self.message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (Some(code), None) => code.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

/// Extract the record id from the first entry of a create/update response
pub(crate) fn first_saved_id(response: &Value) -> Result<String> {
    let entries = response
        .get("result")
        .ok_or_else(|| OrmError::malformed("save response has no result"))?;

    let results: Vec<SaveResult> = serde_json::from_value(entries.clone())
        .map_err(|e| OrmError::malformed(format!("unexpected save result shape: {}", e)))?;

    let first = results
        .into_iter()
        .next()
        .ok_or_else(|| OrmError::malformed("save response contains no results"))?;

    if first.success == Some(false) {
        return Err(OrmError::Rejected(
            first.errors.iter().map(SaveError::describe).collect(),
        ));
    }

    match first.id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(OrmError::malformed("save result has no id")),
    }
}
