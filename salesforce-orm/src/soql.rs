//! SOQL statement building and literal escaping

use crate::model::{ID_FIELD, ModelDescriptor};

/// Build the search statement for a model
///
/// Selects the model's fields followed by any extra fields not already
/// declared on the model. The where clause is inserted verbatim; callers are
/// responsible for escaping values inside it (see [`escape`]).
pub fn search_statement(model: &ModelDescriptor, where_clause: &str, extra_fields: &[String]) -> String {
    let extras = extra_projection(model, extra_fields);

    let mut head = model.fields.join(", ");
    if !head.is_empty() && !extras.is_empty() {
        head.push(',');
    }

    format!(
        "SELECT {} {} FROM {} WHERE {}",
        head,
        extras.join(", "),
        model.name,
        where_clause
    )
}

/// Extra fields that are not already part of the model, first occurrence kept
pub(crate) fn extra_projection<'a>(model: &ModelDescriptor, extra_fields: &'a [String]) -> Vec<&'a str> {
    let mut extras: Vec<&str> = Vec::new();
    for field in extra_fields {
        let field = field.trim();
        if field.is_empty() || model.has_field(field) || extras.contains(&field) {
            continue;
        }
        extras.push(field);
    }
    extras
}

/// Build the statement fetching a single live record by id
pub fn select_by_id(model: &ModelDescriptor, id: &str) -> String {
    let fields = if model.fields.is_empty() {
        ID_FIELD.to_string()
    } else {
        model.fields.join(", ")
    };

    format!(
        "SELECT {} FROM {} WHERE {} = '{}' AND IsDeleted = FALSE",
        fields,
        model.name,
        ID_FIELD,
        escape(id)
    )
}

/// Escape text for use inside a single-quoted SOQL string literal
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{0008}' => escaped.push_str("\\b"),
            '\u{000C}' => escaped.push_str("\\f"),
            _ => escaped.push(c),
        }
    }
    escaped
}
