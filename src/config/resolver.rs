//! Links relational fields to the slug of the model they point at, regardless of registration order.

use crate::config::types::TypeKey;
use std::collections::HashMap;
use std::fmt;

/// A relational field, addressed by owning model and field name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub model: TypeKey,
    pub field: String,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.model, self.field)
    }
}

#[derive(Debug, Default)]
pub struct Resolver {
    registered: HashMap<TypeKey, String>,
    pending: HashMap<TypeKey, Vec<FieldRef>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a model's slug. Returns the fields that were waiting for it; the caller patches them.
    pub fn register(&mut self, key: TypeKey, slug: impl Into<String>) -> Vec<FieldRef> {
        let waiting = self.pending.remove(&key).unwrap_or_default();
        self.registered.insert(key, slug.into());
        waiting
    }

    /// Slug of `target` if it has registered; otherwise remember `field` until it does.
    pub fn defer_or_resolve(&mut self, field: FieldRef, target: &TypeKey) -> Option<String> {
        match self.registered.get(target) {
            Some(slug) => Some(slug.clone()),
            None => {
                self.pending.entry(target.clone()).or_default().push(field);
                None
            }
        }
    }

    pub fn slug_of(&self, key: &TypeKey) -> Option<&str> {
        self.registered.get(key).map(String::as_str)
    }

    /// References to types that never registered, sorted for stable error messages.
    pub fn dangling(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .pending
            .iter()
            .flat_map(|(target, fields)| fields.iter().map(move |f| format!("{} -> {}", f, target)))
            .collect();
        out.sort();
        out
    }
}
