//! Manifest schema validation.
//!
//! # Responsibilities
//! - Check the top-level envelope (`appId`, `versions`)
//! - Enforce the architecture allow-list on `versions` keys
//! - Check every present version entry against the record schema
//!
//! # Design Decisions
//! - Returns all field errors of a phase, not just the first
//! - Validation is a pure function: `&Value → Result<ValidatedManifest, ManifestError>`
//! - Top-level keys other than `appId`/`versions` are ignored, not rejected

use std::fmt;

use serde_json::{Map, Value};

use crate::manifest::types::{Architecture, ManifestDocument, ValidatedManifest};

const ENTRY_STRING_FIELDS: [&str; 4] = [
    "version",
    "versionRefreshable",
    "versionNonRefreshable",
    "versionReplaceable",
];

/// What was wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    Missing,
    Empty,
    ExpectedString,
    ExpectedObject,
    ExpectedArray,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Problem::Missing => "is required",
            Problem::Empty => "must not be empty",
            Problem::ExpectedString => "must be a string",
            Problem::ExpectedObject => "must be an object",
            Problem::ExpectedArray => "must be an array",
        };
        f.write_str(text)
    }
}

/// A field-level validation failure.
///
/// `arch` is set for errors inside a version entry; `field` is relative to
/// that entry (or to the document root when `arch` is `None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub arch: Option<Architecture>,
    pub field: String,
    pub problem: Problem,
}

impl FieldError {
    fn root(field: &str, problem: Problem) -> Self {
        Self { arch: None, field: field.to_string(), problem }
    }

    fn entry(arch: Architecture, field: impl Into<String>, problem: Problem) -> Self {
        Self { arch: Some(arch), field: field.into(), problem }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arch {
            Some(arch) if self.field.is_empty() => write!(f, "versions[\"{}\"] {}", arch, self.problem),
            Some(arch) => write!(f, "versions[\"{}\"].{} {}", arch, self.field, self.problem),
            None => write!(f, "{} {}", self.field, self.problem),
        }
    }
}

/// Why a manifest was rejected. The whole document is rejected in every case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest envelope invalid: {}", join(.0))]
    Envelope(Vec<FieldError>),

    #[error("unexpected architecture keys {unexpected:?} in versions (allowed: {allowed:?})")]
    UnexpectedArchitectures {
        unexpected: Vec<String>,
        allowed: Vec<&'static str>,
    },

    #[error("version entries invalid: {}", join(.0))]
    Entries(Vec<FieldError>),

    #[error("manifest could not be decoded: {0}")]
    Decode(String),
}

impl ManifestError {
    /// Field errors carried by this rejection, if any.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ManifestError::Envelope(errors) | ManifestError::Entries(errors) => errors,
            _ => &[],
        }
    }
}

fn join(errors: &[FieldError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}

/// Validate a parsed manifest and convert it to its typed form.
pub fn validate(document: &Value) -> Result<ValidatedManifest, ManifestError> {
    let versions = check_envelope(document)?;
    check_allowed_keys(versions)?;

    let mut errors = Vec::new();
    for (key, entry) in versions {
        // Keys were checked against the allow-list above.
        if let Some(arch) = Architecture::from_key(key) {
            check_entry(arch, entry, &mut errors);
        }
    }
    if !errors.is_empty() {
        return Err(ManifestError::Entries(errors));
    }

    let picked = serde_json::json!({
        "appId": document["appId"],
        "versions": versions,
    });
    let typed: ManifestDocument =
        serde_json::from_value(picked).map_err(|e| ManifestError::Decode(e.to_string()))?;
    Ok(ValidatedManifest::new(typed))
}

/// Phase 1: `appId` is a non-empty string, `versions` is an object whose
/// contents are not inspected yet.
fn check_envelope(document: &Value) -> Result<&Map<String, Value>, ManifestError> {
    let Some(root) = document.as_object() else {
        return Err(ManifestError::Envelope(vec![FieldError::root("<root>", Problem::ExpectedObject)]));
    };

    let mut errors = Vec::new();
    match root.get("appId") {
        None | Some(Value::Null) => errors.push(FieldError::root("appId", Problem::Missing)),
        Some(Value::String(s)) if s.is_empty() => errors.push(FieldError::root("appId", Problem::Empty)),
        Some(Value::String(_)) => {}
        Some(_) => errors.push(FieldError::root("appId", Problem::ExpectedString)),
    }

    let versions = match root.get("versions") {
        None | Some(Value::Null) => {
            errors.push(FieldError::root("versions", Problem::Missing));
            None
        }
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            errors.push(FieldError::root("versions", Problem::ExpectedObject));
            None
        }
    };

    match versions {
        Some(map) if errors.is_empty() => Ok(map),
        _ => Err(ManifestError::Envelope(errors)),
    }
}

/// Phase 2: set difference of present keys against the allow-list.
fn check_allowed_keys(versions: &Map<String, Value>) -> Result<(), ManifestError> {
    let unexpected: Vec<String> = versions
        .keys()
        .filter(|key| Architecture::from_key(key).is_none())
        .cloned()
        .collect();

    if unexpected.is_empty() {
        Ok(())
    } else {
        Err(ManifestError::UnexpectedArchitectures {
            unexpected,
            allowed: Architecture::ALL.iter().map(|a| a.key()).collect(),
        })
    }
}

/// Phase 3: one version entry record.
fn check_entry(arch: Architecture, entry: &Value, errors: &mut Vec<FieldError>) {
    let Some(record) = entry.as_object() else {
        errors.push(FieldError::entry(arch, "", Problem::ExpectedObject));
        return;
    };

    for field in ENTRY_STRING_FIELDS {
        match record.get(field) {
            None | Some(Value::Null) => errors.push(FieldError::entry(arch, field, Problem::Missing)),
            Some(Value::String(_)) => {}
            Some(_) => errors.push(FieldError::entry(arch, field, Problem::ExpectedString)),
        }
    }

    match record.get("assets") {
        None | Some(Value::Null) => {}
        Some(Value::Array(assets)) => {
            for (i, asset) in assets.iter().enumerate() {
                let Some(asset) = asset.as_object() else {
                    errors.push(FieldError::entry(arch, format!("assets[{i}]"), Problem::ExpectedObject));
                    continue;
                };
                let field = format!("assets[{i}].url");
                match asset.get("url") {
                    None | Some(Value::Null) => errors.push(FieldError::entry(arch, field, Problem::Missing)),
                    Some(Value::String(s)) if s.is_empty() => {
                        errors.push(FieldError::entry(arch, field, Problem::Empty))
                    }
                    Some(Value::String(_)) => {}
                    Some(_) => errors.push(FieldError::entry(arch, field, Problem::ExpectedString)),
                }
            }
        }
        Some(_) => errors.push(FieldError::entry(arch, "assets", Problem::ExpectedArray)),
    }
}
