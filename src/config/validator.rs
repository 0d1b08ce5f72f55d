//! Syntactic checks on a model description before any field is built.

use crate::config::types::ModelDef;
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(def: &ModelDef) -> Result<(), ConfigError> {
    if def.type_name.trim().is_empty() {
        return Err(ConfigError::InvalidIdentifier(def.type_name.clone()));
    }
    if def.members.is_empty() {
        return Err(ConfigError::EmptyModel(def.type_name.clone()));
    }
    if def.display_name().trim().is_empty() {
        return Err(ConfigError::InvalidIdentifier(def.display_name().to_string()));
    }

    let mut names = HashSet::new();
    for m in &def.members {
        if m.name.is_empty() {
            return Err(ConfigError::InvalidIdentifier(format!("{}.<empty>", def.type_name)));
        }
        if !names.insert(m.name.as_str()) {
            return Err(ConfigError::DuplicateMember {
                model: def.type_name.clone(),
                member: m.name.clone(),
            });
        }
    }

    Ok(())
}
