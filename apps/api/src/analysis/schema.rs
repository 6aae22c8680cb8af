//! Structural validators for both sides of the provider boundary.
//!
//! Input: caller-supplied string fields are checked before any provider call.
//! Output: the provider's JSON is never trusted; it is walked field by field
//! against the feature's declared schema before being deserialized.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::analysis::data_uri::{parse_image_data_uri, ImageDataUri};

// ────────────────────────────────────────────────────────────────────────────
// Input side
// ────────────────────────────────────────────────────────────────────────────

/// Named string fields supplied by the UI for one analysis.
/// Unknown extra fields are carried but ignored by validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct AnalysisRequest(HashMap<String, String>);

impl AnalysisRequest {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AnalysisRequest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRule {
    /// Present and not blank.
    Required,
    /// Present and at least this many characters once trimmed.
    MinChars(usize),
    /// A base64 image data URI within the upload limit.
    ImageDataUri,
    /// One of a fixed set of values, compared case-insensitively.
    OneOf(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct InputField {
    pub name: &'static str,
    pub rule: InputRule,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct InputViolation {
    pub field: String,
    pub reason: String,
}

impl InputViolation {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Checks `request` against `fields`, stopping at the first violation.
///
/// Returns the parsed upload when a field carries an image, so the payload
/// is decoded once per request.
pub fn validate_input<'a>(
    request: &'a AnalysisRequest,
    fields: &[InputField],
) -> Result<Option<ImageDataUri<'a>>, InputViolation> {
    let mut upload = None;
    for field in fields {
        let value = request
            .get(field.name)
            .ok_or_else(|| InputViolation::new(field.name, "is required"))?;

        if value.trim().is_empty() {
            return Err(InputViolation::new(field.name, "must not be empty"));
        }

        match field.rule {
            InputRule::Required => {}
            InputRule::MinChars(min) => {
                let len = value.trim().chars().count();
                if len < min {
                    return Err(InputViolation::new(
                        field.name,
                        format!("must be at least {min} characters (got {len})"),
                    ));
                }
            }
            InputRule::ImageDataUri => {
                let image = parse_image_data_uri(value)
                    .map_err(|e| InputViolation::new(field.name, e.to_string()))?;
                upload = Some(image);
            }
            InputRule::OneOf(allowed) => {
                let value = value.trim();
                if !allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) {
                    return Err(InputViolation::new(
                        field.name,
                        format!("must be one of {}", allowed.join(", ")),
                    ));
                }
            }
        }
    }
    Ok(upload)
}

// ────────────────────────────────────────────────────────────────────────────
// Output side
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    TextList,
    /// Whole number within an inclusive range. Floats are rejected.
    Score { min: i64, max: i64 },
    /// Array of objects, each validated against the nested fields.
    ObjectList(&'static [OutputField]),
}

#[derive(Debug, Clone, Copy)]
pub struct OutputField {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Sent to the provider as part of the response schema.
    pub description: &'static str,
}

impl OutputField {
    pub const fn text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            description,
        }
    }

    pub const fn text_list(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::TextList,
            description,
        }
    }

    pub const fn score(name: &'static str, min: i64, max: i64, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Score { min, max },
            description,
        }
    }

    pub const fn object_list(
        name: &'static str,
        fields: &'static [OutputField],
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::ObjectList(fields),
            description,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("schema violation at '{path}': {reason}")]
pub struct SchemaViolation {
    pub path: String,
    pub reason: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Walks `value` and checks every declared field. Extra fields are tolerated.
pub fn validate_output(value: &Value, fields: &[OutputField]) -> Result<(), SchemaViolation> {
    check_object(value, fields, "$")
}

fn check_object(value: &Value, fields: &[OutputField], path: &str) -> Result<(), SchemaViolation> {
    let object = value
        .as_object()
        .ok_or_else(|| SchemaViolation::new(path, format!("expected object, got {}", type_name(value))))?;

    for field in fields {
        let field_path = format!("{path}.{}", field.name);
        let field_value = object
            .get(field.name)
            .ok_or_else(|| SchemaViolation::new(&field_path, "missing required field"))?;
        check_field(field_value, field.kind, &field_path)?;
    }
    Ok(())
}

fn check_field(value: &Value, kind: FieldKind, path: &str) -> Result<(), SchemaViolation> {
    match kind {
        FieldKind::Text => expect_string(value, path),
        FieldKind::TextList => {
            let items = expect_array(value, path)?;
            for (i, item) in items.iter().enumerate() {
                expect_string(item, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        FieldKind::Score { min, max } => {
            let n = value.as_i64().ok_or_else(|| {
                SchemaViolation::new(path, format!("expected integer, got {}", type_name(value)))
            })?;
            if !(min..=max).contains(&n) {
                return Err(SchemaViolation::new(
                    path,
                    format!("{n} is outside {min}..={max}"),
                ));
            }
            Ok(())
        }
        FieldKind::ObjectList(nested) => {
            let items = expect_array(value, path)?;
            for (i, item) in items.iter().enumerate() {
                check_object(item, nested, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
    }
}

fn expect_string(value: &Value, path: &str) -> Result<(), SchemaViolation> {
    if value.is_string() {
        Ok(())
    } else {
        Err(SchemaViolation::new(
            path,
            format!("expected string, got {}", type_name(value)),
        ))
    }
}

fn expect_array<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>, SchemaViolation> {
    value
        .as_array()
        .ok_or_else(|| SchemaViolation::new(path, format!("expected array, got {}", type_name(value))))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Renders the declared fields as a provider `responseSchema` (OpenAPI subset).
pub fn response_schema(fields: &[OutputField]) -> Value {
    let mut properties = Map::new();
    for field in fields {
        let mut property = match field.kind {
            FieldKind::Text => json!({ "type": "STRING" }),
            FieldKind::TextList => json!({ "type": "ARRAY", "items": { "type": "STRING" } }),
            FieldKind::Score { .. } => json!({ "type": "INTEGER" }),
            FieldKind::ObjectList(nested) => json!({ "type": "ARRAY", "items": response_schema(nested) }),
        };
        property["description"] = Value::String(field.description.to_string());
        properties.insert(field.name.to_string(), property);
    }

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": fields.iter().map(|f| f.name).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM: &[OutputField] = &[OutputField::text("label", "garment")];
    const FIELDS: &[OutputField] = &[
        OutputField::text("summary", "a summary"),
        OutputField::text_list("tags", "some tags"),
        OutputField::score("score", 0, 100, "0-100"),
        OutputField::object_list("items", ITEM, "items"),
    ];

    fn valid() -> Value {
        json!({
            "summary": "calm",
            "tags": ["earthy", "soft"],
            "score": 82,
            "items": [{"label": "linen blazer"}]
        })
    }

    #[test]
    fn test_valid_output_passes() {
        assert!(validate_output(&valid(), FIELDS).is_ok());
    }

    #[test]
    fn test_extra_fields_are_tolerated() {
        let mut value = valid();
        value["extra"] = json!(true);
        assert!(validate_output(&value, FIELDS).is_ok());
    }

    #[test]
    fn test_missing_field_is_violation() {
        let mut value = valid();
        value.as_object_mut().unwrap().remove("tags");
        let err = validate_output(&value, FIELDS).unwrap_err();
        assert_eq!(err.path, "$.tags");
        assert!(err.reason.contains("missing"));
    }

    #[test]
    fn test_wrong_type_is_violation() {
        let mut value = valid();
        value["tags"] = json!("earthy");
        let err = validate_output(&value, FIELDS).unwrap_err();
        assert!(err.reason.contains("expected array"));
    }

    #[test]
    fn test_non_string_list_item_is_violation() {
        let mut value = valid();
        value["tags"] = json!(["earthy", 3]);
        assert_eq!(validate_output(&value, FIELDS).unwrap_err().path, "$.tags[1]");
    }

    #[test]
    fn test_score_out_of_range_is_violation() {
        let mut value = valid();
        value["score"] = json!(101);
        assert!(validate_output(&value, FIELDS).is_err());
        value["score"] = json!(-1);
        assert!(validate_output(&value, FIELDS).is_err());
    }

    #[test]
    fn test_float_score_is_not_coerced() {
        let mut value = valid();
        value["score"] = json!(82.5);
        let err = validate_output(&value, FIELDS).unwrap_err();
        assert!(err.reason.contains("float"));
    }

    #[test]
    fn test_nested_object_field_is_checked() {
        let mut value = valid();
        value["items"] = json!([{"label": "scarf"}, {"name": "boots"}]);
        assert_eq!(
            validate_output(&value, FIELDS).unwrap_err().path,
            "$.items[1].label"
        );
    }

    #[test]
    fn test_non_object_root_is_violation() {
        let err = validate_output(&json!(["a"]), FIELDS).unwrap_err();
        assert_eq!(err.path, "$");
    }

    #[test]
    fn test_response_schema_shape() {
        let schema = response_schema(FIELDS);
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["properties"]["tags"]["items"]["type"], "STRING");
        assert_eq!(schema["properties"]["score"]["type"], "INTEGER");
        assert_eq!(
            schema["properties"]["items"]["items"]["properties"]["label"]["type"],
            "STRING"
        );
        assert_eq!(schema["required"], json!(["summary", "tags", "score", "items"]));
    }

    #[test]
    fn test_input_missing_field() {
        let request: AnalysisRequest = [("other", "value")].into_iter().collect();
        let fields = [InputField {
            name: "mood",
            rule: InputRule::Required,
        }];
        assert_eq!(
            validate_input(&request, &fields),
            Err(InputViolation::new("mood", "is required"))
        );
    }

    #[test]
    fn test_input_blank_field() {
        let request: AnalysisRequest = [("mood", "   ")].into_iter().collect();
        let fields = [InputField {
            name: "mood",
            rule: InputRule::Required,
        }];
        assert_eq!(
            validate_input(&request, &fields).unwrap_err().reason,
            "must not be empty"
        );
    }

    #[test]
    fn test_input_min_chars_counts_trimmed_chars() {
        let fields = [InputField {
            name: "notes",
            rule: InputRule::MinChars(10),
        }];
        let short: AnalysisRequest = [("notes", "  too short ")].into_iter().collect();
        assert!(validate_input(&short, &fields).is_err());
        let exact: AnalysisRequest = [("notes", "ten chars!")].into_iter().collect();
        assert!(validate_input(&exact, &fields).is_ok());
    }

    #[test]
    fn test_input_one_of_is_case_insensitive() {
        let fields = [InputField {
            name: "season",
            rule: InputRule::OneOf(&["Spring", "Winter"]),
        }];
        let ok: AnalysisRequest = [("season", "winter")].into_iter().collect();
        assert!(validate_input(&ok, &fields).is_ok());
        let bad: AnalysisRequest = [("season", "Monsoon")].into_iter().collect();
        assert_eq!(
            validate_input(&bad, &fields).unwrap_err().reason,
            "must be one of Spring, Winter"
        );
    }

    #[test]
    fn test_input_image_rule_reports_data_uri_problem() {
        let fields = [InputField {
            name: "photoDataUri",
            rule: InputRule::ImageDataUri,
        }];
        let request: AnalysisRequest =
            [("photoDataUri", "data:text/plain;base64,aGVsbG8=")].into_iter().collect();
        let err = validate_input(&request, &fields).unwrap_err();
        assert_eq!(err.field, "photoDataUri");
        assert!(err.reason.contains("must be an image"));
    }

    #[test]
    fn test_input_returns_parsed_upload() {
        let fields = [InputField {
            name: "photoDataUri",
            rule: InputRule::ImageDataUri,
        }];
        let request: AnalysisRequest = [("photoDataUri", "data:image/gif;base64,R0lGODlh")]
            .into_iter()
            .collect();
        let upload = validate_input(&request, &fields).unwrap().unwrap();
        assert_eq!(upload.mime_type, "image/gif");
        assert_eq!(upload.payload, "R0lGODlh");
        assert_eq!(upload.decoded_len, 6);
    }

    #[test]
    fn test_input_without_image_rule_returns_no_upload() {
        let fields = [InputField {
            name: "mood",
            rule: InputRule::Required,
        }];
        let request: AnalysisRequest = [("mood", "calm")].into_iter().collect();
        assert_eq!(validate_input(&request, &fields), Ok(None));
    }
}
