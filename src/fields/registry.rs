//! Named field variants selectable with `field=<name>`.

use super::render::TEXT_TEMPLATE;
use super::Value;
use crate::config::types::FieldOptions;
use crate::error::{ConfigError, ValidationError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tera::Context;

/// An application-defined field variant.
///
/// The registered value is a prototype: `configure` is called once per member that selects it
/// and must return a fresh instance, so per-field configuration never leaks between fields.
pub trait CustomField: Send + Sync + fmt::Debug {
    fn configure(&self, options: &FieldOptions) -> Result<Arc<dyn CustomField>, ConfigError>;

    fn validate(&self, raw: &str) -> Result<Value, ValidationError> {
        Ok(Value::Text(raw.to_string()))
    }

    /// Name of the widget template. It must be known to the renderer in use.
    fn template(&self) -> &str {
        TEXT_TEMPLATE
    }

    /// Extra template variables.
    fn context(&self, _ctx: &mut Context) {}

    fn render_string(&self, value: &Value) -> String {
        tera::escape_html(&value.to_string())
    }

    fn from_stored(&self, value: Value) -> Value {
        value
    }
}

/// What a registered name selects.
#[derive(Clone, Debug)]
pub enum FieldType {
    Url,
    File,
    Custom(Arc<dyn CustomField>),
}

/// Per-admin registry of named field variants. `url` and `file` are always present.
#[derive(Clone, Debug)]
pub struct FieldRegistry {
    types: HashMap<String, FieldType>,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        let mut types = HashMap::new();
        types.insert("url".to_string(), FieldType::Url);
        types.insert("file".to_string(), FieldType::File);
        FieldRegistry { types }
    }
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_custom(
        &mut self,
        name: &str,
        field: Arc<dyn CustomField>,
    ) -> Result<(), ConfigError> {
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '=' || c == '\'') {
            return Err(ConfigError::InvalidCustomField(name.to_string()));
        }
        if self.types.contains_key(name) {
            return Err(ConfigError::DuplicateCustomField(name.to_string()));
        }
        self.types.insert(name.to_string(), FieldType::Custom(field));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FieldType> {
        self.types.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Colour;

    impl CustomField for Colour {
        fn configure(&self, _options: &FieldOptions) -> Result<Arc<dyn CustomField>, ConfigError> {
            Ok(Arc::new(Colour))
        }
    }

    #[test]
    fn builtins_are_preregistered() {
        let reg = FieldRegistry::new();
        assert!(matches!(reg.get("url"), Some(FieldType::Url)));
        assert!(matches!(reg.get("file"), Some(FieldType::File)));
        assert!(reg.get("colour").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut reg = FieldRegistry::new();
        reg.register_custom("colour", Arc::new(Colour)).unwrap();
        let err = reg.register_custom("colour", Arc::new(Colour)).unwrap_err();
        assert_eq!(err.to_string(), "a field with the name colour already exists");
        assert!(matches!(
            reg.register_custom("url", Arc::new(Colour)),
            Err(ConfigError::DuplicateCustomField(_))
        ));
    }

    #[test]
    fn unusable_names_are_rejected() {
        let mut reg = FieldRegistry::new();
        for name in ["", "two words", "a=b", "it's"] {
            assert!(matches!(
                reg.register_custom(name, Arc::new(Colour)),
                Err(ConfigError::InvalidCustomField(_))
            ));
        }
    }
}
