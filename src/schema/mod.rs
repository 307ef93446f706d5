//! Schema validation
//!
//! Validation is a capability: anything implementing [`Validator<T>`] can
//! guard an atom. It runs on every hydrated value and on every `set`.
//!
//! # Design Principles
//!
//! - Validators may coerce; the atom commits the validator's output
//! - Violations reject the value, they never silently drop it
//! - Deterministic validation

mod errors;
mod types;
mod validator;

pub use errors::{ValidationDetails, ValidationError, ValidationResult};
pub use types::{FieldDef, FieldType};
pub use validator::{FnValidator, ShapeValidator, TypedValidator, Validator};
