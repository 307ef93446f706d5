//! Validators
//!
//! A validator turns a raw decoded value into a `T`, or rejects it. It may
//! coerce (fill defaults, normalise), so the atom always commits the
//! validator's output rather than its input.
//!
//! Validation is deterministic and never mutates its input.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::errors::{ValidationDetails, ValidationError, ValidationResult};
use super::types::{FieldDef, FieldType};

/// Validates and coerces a raw value into `T`
pub trait Validator<T>: Send + Sync {
    fn validate(&self, raw: &Value) -> ValidationResult<T>;
}

/// Plain typed deserialization. What an atom uses when no schema is configured.
pub struct TypedValidator<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedValidator<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypedValidator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypedValidator")
    }
}

impl<T: DeserializeOwned> Validator<T> for TypedValidator<T> {
    fn validate(&self, raw: &Value) -> ValidationResult<T> {
        T::deserialize(raw).map_err(ValidationError::deserialize)
    }
}

/// Validator backed by a closure
pub struct FnValidator<F> {
    check: F,
}

impl<F> FnValidator<F> {
    pub fn new(check: F) -> Self {
        Self { check }
    }
}

impl<T, F> Validator<T> for FnValidator<F>
where
    F: Fn(&Value) -> ValidationResult<T> + Send + Sync,
{
    fn validate(&self, raw: &Value) -> ValidationResult<T> {
        (self.check)(raw)
    }
}

/// Checks a value against a declared [`FieldType`] shape, then deserializes it.
///
/// Rules:
/// - required fields must be present
/// - undeclared fields are rejected unless the object allows extras
/// - types match exactly; ints are not floats-with-zero-fraction
/// - `null` only where the field is declared nullable
pub struct ShapeValidator<T> {
    root: FieldType,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ShapeValidator<T> {
    pub fn new(root: FieldType) -> Self {
        Self {
            root,
            _marker: PhantomData,
        }
    }

    /// Root must be a strict object with `fields`
    pub fn object(fields: HashMap<String, FieldDef>) -> Self {
        Self::new(FieldType::object(fields))
    }

    pub fn root(&self) -> &FieldType {
        &self.root
    }

    /// Shape check only, no deserialization
    pub fn check(&self, raw: &Value) -> ValidationResult<()> {
        if raw.is_null() {
            return Err(ValidationError::field(ValidationDetails::null_value("$root")));
        }
        check_value(raw, &self.root, "$root")
    }
}

impl<T> fmt::Debug for ShapeValidator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeValidator")
            .field("root", &self.root)
            .finish()
    }
}

impl<T: DeserializeOwned> Validator<T> for ShapeValidator<T> {
    fn validate(&self, raw: &Value) -> ValidationResult<T> {
        self.check(raw)?;
        T::deserialize(raw).map_err(ValidationError::deserialize)
    }
}

fn check_object(
    obj: &Map<String, Value>,
    fields: &HashMap<String, FieldDef>,
    allow_extra: bool,
    path: &str,
) -> ValidationResult<()> {
    if !allow_extra {
        if let Some(key) = obj.keys().find(|k| !fields.contains_key(*k)) {
            return Err(ValidationError::field(ValidationDetails::extra_field(
                make_path(path, key),
            )));
        }
    }

    // Sorted so the first reported failure is stable.
    let mut names: Vec<_> = fields.keys().collect();
    names.sort();

    for name in names {
        let def = &fields[name];
        let field_path = make_path(path, name);
        match obj.get(name) {
            Some(Value::Null) if def.nullable => {}
            Some(Value::Null) => {
                return Err(ValidationError::field(ValidationDetails::null_value(
                    field_path,
                )));
            }
            Some(value) => check_value(value, &def.field_type, &field_path)?,
            None if def.required => {
                return Err(ValidationError::field(ValidationDetails::missing_field(
                    field_path,
                )));
            }
            None => {}
        }
    }

    Ok(())
}

fn check_value(value: &Value, expected: &FieldType, path: &str) -> ValidationResult<()> {
    let matches = match expected {
        FieldType::Any => true,
        FieldType::String => value.is_string(),
        FieldType::Int => value.is_i64() || value.is_u64(),
        FieldType::Bool => value.is_boolean(),
        FieldType::Float => value.is_number(),
        FieldType::Object {
            fields,
            allow_extra,
        } => {
            let obj = value.as_object().ok_or_else(|| type_error(path, "object", value))?;
            return check_object(obj, fields, *allow_extra, path);
        }
        FieldType::Array { element_type } => {
            let arr = value.as_array().ok_or_else(|| type_error(path, "array", value))?;
            for (i, elem) in arr.iter().enumerate() {
                let elem_path = format!("{}[{}]", path, i);
                if elem.is_null() && **element_type != FieldType::Any {
                    return Err(ValidationError::field(ValidationDetails::null_value(
                        elem_path,
                    )));
                }
                check_value(elem, element_type, &elem_path)?;
            }
            return Ok(());
        }
    };

    if matches {
        Ok(())
    } else {
        Err(type_error(path, expected.type_name(), value))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn make_path(prefix: &str, field: &str) -> String {
    if prefix == "$root" {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

fn type_error(path: &str, expected: &str, actual: &Value) -> ValidationError {
    ValidationError::field(ValidationDetails::type_mismatch(
        path,
        expected,
        json_type_name(actual),
    ))
}
