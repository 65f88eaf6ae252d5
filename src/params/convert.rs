//! Parameter type conversion.
//!
//! Maps a case-sensitive type name (`number`, `decimal`, `string`, or any
//! host-defined name) to a converter function for a given message type.
//! The typed parameter parser resolves each placeholder's declared type
//! against a [`ConverterRegistry`] and converts the captured string
//! through it.
//!
//! Built-in converters may be overridden by exactly one user-supplied
//! converter per type; a second user registration for the same type is a
//! configuration error raised at registration time, never a silent pick.

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;

use crate::{params::Value, pipeline::CommandContext};

/// A parameter converter: raw captured string, the type name under which
/// the converter was invoked (so one converter can serve several
/// aliases), and the command context.
///
/// On failure the returned [`ConversionError`] message must be safe to
/// show verbatim to an end user.
pub type Converter<M> =
    dyn Fn(&str, &str, &CommandContext<M>) -> Result<Value, ConversionError> + Send + Sync;

/// A value did not match the format its declared type requires.
///
/// The message is end-user-safe and shown verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ConversionError {
    message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        ConversionError {
            message: message.into(),
        }
    }
}

/// A converter configuration fault, detected eagerly at registration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A user-supplied converter for this type already exists. Built-ins
    /// may be overridden once; user converters may not be stacked.
    #[error("a converter for type `{type_name}` is already registered")]
    DuplicateConverter { type_name: String },
}

struct ConverterEntry<M> {
    convert: Arc<Converter<M>>,
    built_in: bool,
}

/// Registry of parameter converters for one message type `M`.
///
/// Created with the built-in converters in place:
///
/// | type name | produces          |
/// |-----------|-------------------|
/// | `number`  | [`Value::Integer`] |
/// | `decimal` | [`Value::Decimal`] |
/// | `string`  | [`Value::Text`] (no-op) |
///
/// Lookups are read-only after the registry has been handed to a
/// commander, so sharing it behind an [`Arc`] across message-handling
/// threads is safe.
pub struct ConverterRegistry<M> {
    converters: HashMap<String, ConverterEntry<M>>,
}

impl<M> ConverterRegistry<M> {
    /// Creates a registry holding the built-in converters.
    pub fn new() -> Self {
        let mut registry = ConverterRegistry {
            converters: HashMap::new(),
        };

        registry.insert_built_in("number", |raw, type_name, _| {
            raw.parse::<i64>().map(Value::Integer).map_err(|_| {
                ConversionError::new(format!("`{raw}` is not a valid {type_name}"))
            })
        });
        registry.insert_built_in("decimal", |raw, type_name, _| {
            raw.parse::<f64>().map(Value::Decimal).map_err(|_| {
                ConversionError::new(format!("`{raw}` is not a valid {type_name}"))
            })
        });
        registry.insert_built_in("string", |raw, _, _| Ok(Value::Text(raw.to_owned())));

        registry
    }

    fn insert_built_in(
        &mut self,
        type_name: &str,
        convert: impl Fn(&str, &str, &CommandContext<M>) -> Result<Value, ConversionError>
        + Send
        + Sync
        + 'static,
    ) {
        self.converters.insert(
            type_name.to_owned(),
            ConverterEntry {
                convert: Arc::new(convert),
                built_in: true,
            },
        );
    }

    /// Registers a user-supplied converter for `type_name`.
    ///
    /// A built-in converter for the same type is overridden; registering
    /// over an existing user-supplied converter is a configuration error.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateConverter`] when a user converter for
    /// `type_name` is already present.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        convert: impl Fn(&str, &str, &CommandContext<M>) -> Result<Value, ConversionError>
        + Send
        + Sync
        + 'static,
    ) -> Result<(), RegistryError> {
        let type_name = type_name.into();

        if matches!(self.converters.get(&type_name), Some(entry) if !entry.built_in) {
            return Err(RegistryError::DuplicateConverter { type_name });
        }

        self.converters.insert(
            type_name,
            ConverterEntry {
                convert: Arc::new(convert),
                built_in: false,
            },
        );
        Ok(())
    }

    /// The converter registered for `type_name`, if any.
    pub fn converter_for(&self, type_name: &str) -> Option<Arc<Converter<M>>> {
        self.converters
            .get(type_name)
            .map(|entry| Arc::clone(&entry.convert))
    }

    /// Whether a converter exists for `type_name`.
    pub fn contains(&self, type_name: &str) -> bool {
        self.converters.contains_key(type_name)
    }
}

impl<M> Default for ConverterRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}
