//! Shape definitions
//!
//! Supported types:
//! - string, int, bool, float
//! - object: nested fields, strict unless `allow_extra`
//! - array: homogeneous elements
//! - any: accepted without inspection

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Field types a shape can require
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    String,
    /// 64-bit integer; floats are rejected
    Int,
    Bool,
    /// Any JSON number
    Float,
    Object {
        fields: HashMap<String, FieldDef>,
        /// Tolerate keys not declared in `fields`
        #[serde(default)]
        allow_extra: bool,
    },
    Array {
        element_type: Box<FieldType>,
    },
    Any,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::Float => "float",
            FieldType::Object { .. } => "object",
            FieldType::Array { .. } => "array",
            FieldType::Any => "any",
        }
    }

    /// Strict object with the given fields
    pub fn object(fields: HashMap<String, FieldDef>) -> Self {
        FieldType::Object {
            fields,
            allow_extra: false,
        }
    }

    /// Array of `element`
    pub fn array(element: FieldType) -> Self {
        FieldType::Array {
            element_type: Box::new(element),
        }
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether the field must be present
    pub required: bool,
    /// Whether an explicit `null` is accepted
    #[serde(default)]
    pub nullable: bool,
}

impl FieldDef {
    pub fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
            nullable: false,
        }
    }

    pub fn optional(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            nullable: false,
        }
    }

    /// Accept `null` in place of a value
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn required_string() -> Self {
        Self::required(FieldType::String)
    }

    pub fn optional_string() -> Self {
        Self::optional(FieldType::String)
    }

    pub fn required_int() -> Self {
        Self::required(FieldType::Int)
    }

    pub fn optional_int() -> Self {
        Self::optional(FieldType::Int)
    }

    pub fn required_bool() -> Self {
        Self::required(FieldType::Bool)
    }

    pub fn required_float() -> Self {
        Self::required(FieldType::Float)
    }
}
