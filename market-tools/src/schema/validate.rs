use super::{FieldKind, FieldSpec, OperationDescriptor};
use crate::error::ToolError;
use serde_json::{Map, Value};

/// Checks `args` against every field of `descriptor`. Unknown extra keys are ignored and
/// `null` counts as absent.
pub fn validate(descriptor: &OperationDescriptor, args: &Map<String, Value>) -> Result<(), ToolError> {
    for field in descriptor.fields {
        match args.get(field.name) {
            None | Some(Value::Null) if field.required => {
                return Err(ToolError::invalid(field.name, "is required"));
            }
            None | Some(Value::Null) => {}
            Some(value) => check(field, value)?,
        }
    }
    Ok(())
}

/// Rewrites integral floats (`2.0`) in integer fields as JSON integers so typed parsing
/// accepts them. Run after [`validate`].
pub fn coerce_integers(descriptor: &OperationDescriptor, args: &mut Map<String, Value>) {
    for field in descriptor.fields {
        if !matches!(field.kind, FieldKind::Integer { .. }) {
            continue;
        }
        if let Some(value) = args.get_mut(field.name) {
            if let Some(n) = value.is_f64().then(|| as_integer(value)).flatten() {
                *value = Value::from(n);
            }
        }
    }
}

/// Integers, plus floats with no fractional part that fit an `i64`.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64().filter(|_| value.is_f64())?;
    // i64::MAX as f64 rounds up to 2^63, which is out of range.
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

fn check(field: &FieldSpec, value: &Value) -> Result<(), ToolError> {
    let invalid = |constraint: String| ToolError::invalid(field.name, constraint);

    match field.kind {
        FieldKind::Integer { min, max, .. } => {
            let Some(n) = as_integer(value) else {
                // Positive integers beyond i64 are out of range rather than ill-typed.
                return Err(match (value.is_u64(), max) {
                    (true, Some(max)) => invalid(format!("must be <= {max}")),
                    _ => invalid("must be an integer".into()),
                });
            };
            if let Some(min) = min.filter(|min| n < *min) {
                return Err(invalid(format!("must be >= {min}")));
            }
            if let Some(max) = max.filter(|max| n > *max) {
                return Err(invalid(format!("must be <= {max}")));
            }
        }
        FieldKind::String => match value.as_str() {
            Some(s) if !s.trim().is_empty() => {}
            Some(_) => return Err(invalid("must not be empty".into())),
            None => return Err(invalid("must be a string".into())),
        },
        FieldKind::StringList => {
            let items = value
                .as_array()
                .ok_or_else(|| invalid("must be an array of strings".into()))?;
            if items.is_empty() {
                return Err(invalid("must contain at least one entry".into()));
            }
            if let Some(i) = items.iter().position(|item| !item.is_string()) {
                return Err(ToolError::invalid(
                    format!("{}[{i}]", field.name),
                    "must be a string",
                ));
            }
        }
        FieldKind::Enum(values) => match value.as_str() {
            Some(s) if values.contains(&s) => {}
            _ => return Err(invalid(format!("must be one of: {}", values.join(", ")))),
        },
    }
    Ok(())
}
