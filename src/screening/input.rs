use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::ScreeningQuery;
use crate::error::{AppError, FieldErrors};

pub const MAX_IDENTIFICATION_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = 100;

static IDENTIFICATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9.\-]+$").expect("static regex"));

/// Decode a search request body. JSON and urlencoded forms are both accepted.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Result<Value, AppError> {
    let ct = content_type.unwrap_or("application/json");

    if ct.contains("application/x-www-form-urlencoded") {
        let pairs: HashMap<String, String> = form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        return Ok(Value::Object(
            pairs.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
        ));
    }

    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON: {e}")))
}

/// Validate the submitted fields and pick the query shape.
///
/// `identification` (alias `identificacion`) and `name` (alias `nombres`)
/// are trimmed; blank means absent. At least one is required.
pub fn validate(raw: &Value) -> Result<ScreeningQuery, AppError> {
    let identification = field(raw, &["identification", "identificacion"]);
    let name = field(raw, &["name", "nombres"]).map(collapse_whitespace);

    let mut errors = FieldErrors::new();

    if let Some(id) = &identification {
        if id.chars().count() > MAX_IDENTIFICATION_LEN {
            errors.insert(
                "identification".to_string(),
                format!("Must be at most {MAX_IDENTIFICATION_LEN} characters"),
            );
        } else if !IDENTIFICATION_RE.is_match(id) {
            errors.insert(
                "identification".to_string(),
                "Only letters, digits, dots and dashes are allowed".to_string(),
            );
        }
    }

    if let Some(n) = &name {
        if n.chars().count() > MAX_NAME_LEN {
            errors.insert(
                "name".to_string(),
                format!("Must be at most {MAX_NAME_LEN} characters"),
            );
        }
    }

    if identification.is_none() && name.is_none() {
        errors.insert(
            "__all__".to_string(),
            "Provide an identification number or a name".to_string(),
        );
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    ScreeningQuery::from_parts(identification, name)
        .ok_or_else(|| AppError::BadRequest("Nothing to search".to_string()))
}

fn field(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| raw.get(*k))
        .and_then(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
}

fn collapse_whitespace(s: String) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
