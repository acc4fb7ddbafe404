//! Parameter schema derivation from application models.
//!
//! Models attach their shape at compile time with `#[derive(JsonSchema)]`.
//! Derivation places the model in a definitions table and reads back the
//! first definition only; nested definitions are used to resolve `$ref`
//! properties and are never merged into the result.

use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use schemars::Map;
use schemars::r#gen::SchemaSettings;
use schemars::schema::{InstanceType, Schema, SchemaObject, SingleOrVec};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{FunctionParameters, ParameterProperty};

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const MAX_REFERENCE_DEPTH: usize = 8;

/// Result alias for schema derivation.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised when a model shape cannot be reflected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The model's definition is not an object-like shape.
    #[error("model `{model}` cannot be reflected: {reason}")]
    Unsupported {
        /// Rust type name of the model.
        model: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl SchemaError {
    /// Creates a [`SchemaError::Unsupported`] error.
    #[must_use]
    pub fn unsupported(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

/// Type-erased handle to an application model.
///
/// Holds the model type only; no instance is kept. Derivation runs when the
/// descriptor is registered.
#[derive(Clone, Copy)]
pub struct ModelDescriptor {
    type_name: &'static str,
    derive: fn() -> SchemaResult<Option<FunctionParameters>>,
}

impl ModelDescriptor {
    /// Describes the model type `M`.
    #[must_use]
    pub fn of<M: JsonSchema + ?Sized>() -> Self {
        Self {
            type_name: type_name::<M>(),
            derive: derive_schema::<M>,
        }
    }

    /// Describes the type of `sample`. Field values are ignored.
    #[must_use]
    pub fn from_sample<M: JsonSchema>(_sample: &M) -> Self {
        Self::of::<M>()
    }

    /// Returns the Rust type name of the model.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Derives the parameter schema for the described model.
    ///
    /// # Errors
    ///
    /// See [`derive_schema`].
    pub fn derive(&self) -> SchemaResult<Option<FunctionParameters>> {
        (self.derive)()
    }
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ModelDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

impl Eq for ModelDescriptor {}

/// Derives function parameters from the model type `M`.
///
/// Returns `Ok(None)` with a warning when `M` yields no definition (primitive
/// types) or its definition has no fields.
///
/// # Errors
///
/// Returns [`SchemaError::Unsupported`] when the first definition is not an
/// object shape, e.g. a boolean schema or a string enumeration.
pub fn derive_schema<M: JsonSchema + ?Sized>() -> SchemaResult<Option<FunctionParameters>> {
    let model = type_name::<M>();
    let mut generator = SchemaSettings::draft07().into_generator();
    // Referenceable types land in the definitions table; primitives are inlined.
    let _ = generator.subschema_for::<M>();
    reflect_definitions(model, generator.definitions())
}

fn reflect_definitions(
    model: &str,
    definitions: &Map<String, Schema>,
) -> SchemaResult<Option<FunctionParameters>> {
    let Some((name, definition)) = definitions.iter().next() else {
        warn!(model, "no model definition found");
        return Ok(None);
    };

    let object = match definition {
        Schema::Object(object) => object,
        Schema::Bool(_) => {
            return Err(SchemaError::unsupported(
                model,
                format!("definition `{name}` is a boolean schema"),
            ));
        }
    };

    let validation = match object.object.as_deref() {
        Some(validation) if !validation.properties.is_empty() => validation,
        Some(_) => {
            warn!(model, definition = %name, "model has no fields");
            return Ok(None);
        }
        None if has_instance_type(object, InstanceType::Object)
            || has_instance_type(object, InstanceType::Null) =>
        {
            warn!(model, definition = %name, "model has no fields");
            return Ok(None);
        }
        None => {
            return Err(SchemaError::unsupported(
                model,
                format!("definition `{name}` is not an object"),
            ));
        }
    };

    let kind = instance_type_name(object).unwrap_or("object");
    let mut properties = BTreeMap::new();
    for (field, schema) in &validation.properties {
        let property = reflect_property(schema, definitions, 0).unwrap_or_else(|| {
            debug!(model, field = %field, "property type unresolved, leaving it empty");
            untyped_property(schema)
        });
        debug!(
            model,
            field = %field,
            kind = %property.kind,
            description = %property.description,
            "reflected property"
        );
        properties.insert(field.clone(), property);
    }

    let required: Vec<String> = validation.required.iter().cloned().collect();
    info!(
        model,
        definition = %name,
        kind,
        required = ?required,
        "reflected model schema"
    );

    Ok(Some(FunctionParameters {
        kind: kind.to_owned(),
        properties,
        required,
    }))
}

fn reflect_property(
    schema: &Schema,
    definitions: &Map<String, Schema>,
    depth: usize,
) -> Option<ParameterProperty> {
    let Schema::Object(object) = schema else {
        return None;
    };
    if depth > MAX_REFERENCE_DEPTH {
        return None;
    }

    let mut property = if let Some(kind) = instance_type_name(object) {
        ParameterProperty {
            kind: kind.to_owned(),
            description: String::new(),
            enum_values: string_enum(object),
        }
    } else if let Some(reference) = object.reference.as_deref() {
        let target = resolve_reference(reference, definitions)?;
        reflect_property(target, definitions, depth + 1)?
    } else {
        reflect_subschemas(object, definitions, depth)?
    };

    if let Some(description) = schema_description(object) {
        property.description.clone_from(description);
    }

    Some(property)
}

/// Property for a field whose schema names no type, e.g. `serde_json::Value`.
fn untyped_property(schema: &Schema) -> ParameterProperty {
    let description = match schema {
        Schema::Object(object) => schema_description(object).cloned().unwrap_or_default(),
        Schema::Bool(_) => String::new(),
    };
    ParameterProperty {
        kind: String::new(),
        description,
        enum_values: None,
    }
}

fn schema_description(object: &SchemaObject) -> Option<&String> {
    object
        .metadata
        .as_deref()
        .and_then(|metadata| metadata.description.as_ref())
}

fn reflect_subschemas(
    object: &SchemaObject,
    definitions: &Map<String, Schema>,
    depth: usize,
) -> Option<ParameterProperty> {
    let subschemas = object.subschemas.as_deref()?;

    // Unit enums with documented variants become one string enum per variant.
    if let Some(values) = subschemas.one_of.as_deref().and_then(merged_string_enum) {
        return Some(ParameterProperty {
            kind: "string".to_owned(),
            description: String::new(),
            enum_values: Some(values),
        });
    }

    [&subschemas.all_of, &subschemas.any_of, &subschemas.one_of]
        .into_iter()
        .flatten()
        .flatten()
        .filter(|branch| !is_null_schema(branch))
        .find_map(|branch| reflect_property(branch, definitions, depth + 1))
}

fn resolve_reference<'a>(
    reference: &str,
    definitions: &'a Map<String, Schema>,
) -> Option<&'a Schema> {
    definitions.get(reference.strip_prefix(DEFINITIONS_PREFIX)?)
}

fn instance_type_name(object: &SchemaObject) -> Option<&'static str> {
    match object.instance_type.as_ref()? {
        SingleOrVec::Single(kind) => Some(primitive_name(**kind)),
        SingleOrVec::Vec(kinds) => kinds
            .iter()
            .copied()
            .find(|kind| *kind != InstanceType::Null)
            .map(primitive_name),
    }
}

fn has_instance_type(object: &SchemaObject, expected: InstanceType) -> bool {
    match object.instance_type.as_ref() {
        Some(SingleOrVec::Single(kind)) => **kind == expected,
        Some(SingleOrVec::Vec(kinds)) => kinds.contains(&expected),
        None => false,
    }
}

fn is_null_schema(schema: &Schema) -> bool {
    matches!(
        schema,
        Schema::Object(object)
            if matches!(object.instance_type.as_ref(), Some(SingleOrVec::Single(kind)) if **kind == InstanceType::Null)
    )
}

fn string_enum(object: &SchemaObject) -> Option<Vec<String>> {
    object
        .enum_values
        .as_ref()?
        .iter()
        .map(|value| value.as_str().map(str::to_owned))
        .collect()
}

fn merged_string_enum(branches: &[Schema]) -> Option<Vec<String>> {
    let mut values = Vec::new();
    for branch in branches {
        let Schema::Object(object) = branch else {
            return None;
        };
        values.extend(string_enum(object)?);
    }
    (!values.is_empty()).then_some(values)
}

const fn primitive_name(kind: InstanceType) -> &'static str {
    match kind {
        InstanceType::Null => "null",
        InstanceType::Boolean => "boolean",
        InstanceType::Object => "object",
        InstanceType::Array => "array",
        InstanceType::Number => "number",
        InstanceType::String => "string",
        InstanceType::Integer => "integer",
    }
}
