//! Model schema descriptions supplied by the embedding application, in code or as JSON.

use crate::error::ConfigError;
use crate::tag::parse_tag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a model type. Relationships name their target by this key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeKey(pub String);

impl TypeKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(s: &str) -> Self {
        TypeKey(s.to_string())
    }
}

/// Kind of a model member; selects the default field variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMemberKind", into = "RawMemberKind")]
pub enum MemberKind {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    /// Belongs-to reference; becomes a foreign key named `<member>Id`.
    Reference(TypeKey),
    /// Collection of references; becomes a many-to-many field.
    Sequence(TypeKey),
    /// A kind the admin has no field for. Registered as text.
    Unknown(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawMemberKind {
    Simple(String),
    Reference { reference: TypeKey },
    Sequence { sequence: TypeKey },
}

impl From<RawMemberKind> for MemberKind {
    fn from(raw: RawMemberKind) -> Self {
        match raw {
            RawMemberKind::Simple(s) => match s.as_str() {
                "text" | "string" => MemberKind::Text,
                "integer" | "int" => MemberKind::Integer,
                "float" => MemberKind::Float,
                "boolean" | "bool" => MemberKind::Boolean,
                "timestamp" | "time" => MemberKind::Timestamp,
                _ => MemberKind::Unknown(s),
            },
            RawMemberKind::Reference { reference } => MemberKind::Reference(reference),
            RawMemberKind::Sequence { sequence } => MemberKind::Sequence(sequence),
        }
    }
}

impl From<MemberKind> for RawMemberKind {
    fn from(kind: MemberKind) -> Self {
        match kind {
            MemberKind::Text => RawMemberKind::Simple("text".into()),
            MemberKind::Integer => RawMemberKind::Simple("integer".into()),
            MemberKind::Float => RawMemberKind::Simple("float".into()),
            MemberKind::Boolean => RawMemberKind::Simple("boolean".into()),
            MemberKind::Timestamp => RawMemberKind::Simple("timestamp".into()),
            MemberKind::Reference(reference) => RawMemberKind::Reference { reference },
            MemberKind::Sequence(sequence) => RawMemberKind::Sequence { sequence },
            MemberKind::Unknown(s) => RawMemberKind::Simple(s),
        }
    }
}

/// Normalized per-member configuration. Every field variant is configured from this.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldOptions {
    /// Exclude the member from the admin. Not allowed on the first member.
    pub skip: bool,
    pub label: Option<String>,
    pub list: bool,
    /// Column of the related table shown in list views (relational fields only).
    pub list_column: Option<String>,
    pub search: bool,
    pub blank: bool,
    pub null: bool,
    pub default: Option<String>,
    /// Grid units, 1 to 12.
    pub width: Option<u8>,
    /// Name of a registered custom field overriding the kind-inferred variant.
    pub field: Option<String>,
    pub textarea: bool,
    pub max_length: Option<usize>,
    pub step: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// chrono strftime pattern for timestamps.
    pub format: Option<String>,
    pub upload_to: Option<String>,
    /// Keys not understood by the built-in variants; handed to custom fields.
    pub extra: BTreeMap<String, String>,
}

impl FieldOptions {
    /// Build options from a tag such as `list search width=9 label='Blog title'`.
    pub fn from_tag(field: &str, tag: &str) -> Result<Self, ConfigError> {
        let mut opts = FieldOptions::default();
        for (key, value) in parse_tag(tag)? {
            match key.as_str() {
                "-" => opts.skip = true,
                "label" => opts.label = Some(value),
                "list" => {
                    opts.list = true;
                    if !value.is_empty() {
                        opts.list_column = Some(value);
                    }
                }
                "search" => opts.search = true,
                "blank" => opts.blank = true,
                "null" => opts.null = true,
                "default" => opts.default = Some(value),
                "width" => opts.width = Some(parse_option(field, "width", &value)?),
                "field" => opts.field = Some(value),
                "textarea" => opts.textarea = true,
                "maxlength" => opts.max_length = Some(parse_option(field, "maxlength", &value)?),
                "step" => opts.step = Some(parse_option(field, "step", &value)?),
                "min" => opts.min = Some(parse_option(field, "min", &value)?),
                "max" => opts.max = Some(parse_option(field, "max", &value)?),
                "format" => opts.format = Some(value),
                "upload_to" => opts.upload_to = Some(value),
                _ => {
                    opts.extra.insert(key, value);
                }
            }
        }
        Ok(opts)
    }
}

fn parse_option<T>(field: &str, key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidOption {
        field: field.to_string(),
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Member configuration as written by the application: a tag string or typed options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberConfig {
    Tag(String),
    Options(FieldOptions),
}

impl Default for MemberConfig {
    fn default() -> Self {
        MemberConfig::Tag(String::new())
    }
}

impl MemberConfig {
    pub fn normalize(&self, field: &str) -> Result<FieldOptions, ConfigError> {
        match self {
            MemberConfig::Tag(tag) => FieldOptions::from_tag(field, tag),
            MemberConfig::Options(opts) => Ok(opts.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberDef {
    pub name: String,
    pub kind: MemberKind,
    #[serde(default)]
    pub config: MemberConfig,
}

impl MemberDef {
    pub fn new(name: impl Into<String>, kind: MemberKind) -> Self {
        MemberDef {
            name: name.into(),
            kind,
            config: MemberConfig::default(),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Boolean)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Timestamp)
    }

    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Reference(TypeKey(target.into())))
    }

    pub fn sequence(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Sequence(TypeKey(target.into())))
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.config = MemberConfig::Tag(tag.into());
        self
    }

    pub fn options(mut self, options: FieldOptions) -> Self {
        self.config = MemberConfig::Options(options);
        self
    }
}

/// One application entity. The first member is the row identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelDef {
    pub type_name: String,
    /// Display name override.
    #[serde(default)]
    pub admin_name: Option<String>,
    /// Default sort field, `-` prefix for descending.
    #[serde(default)]
    pub sort_by: Option<String>,
    pub members: Vec<MemberDef>,
}

impl ModelDef {
    pub fn new(type_name: impl Into<String>) -> Self {
        ModelDef {
            type_name: type_name.into(),
            admin_name: None,
            sort_by: None,
            members: Vec::new(),
        }
    }

    pub fn admin_name(mut self, name: impl Into<String>) -> Self {
        self.admin_name = Some(name.into());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn member(mut self, member: MemberDef) -> Self {
        self.members.push(member);
        self
    }

    pub fn type_key(&self) -> TypeKey {
        TypeKey(self.type_name.clone())
    }

    pub fn display_name(&self) -> &str {
        self.admin_name.as_deref().unwrap_or(&self.type_name)
    }
}

/// A group of models shown together on the admin index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupDef {
    pub name: String,
    pub models: Vec<ModelDef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_from_tag() {
        let opts =
            FieldOptions::from_tag("Category", "list=Title search width=3 label='Post category' colour=red")
                .unwrap();
        assert!(opts.list);
        assert_eq!(opts.list_column.as_deref(), Some("Title"));
        assert!(opts.search);
        assert_eq!(opts.width, Some(3));
        assert_eq!(opts.label.as_deref(), Some("Post category"));
        assert_eq!(opts.extra.get("colour").map(String::as_str), Some("red"));
        assert!(!opts.skip);
    }

    #[test]
    fn unparseable_numbers_are_config_errors() {
        let err = FieldOptions::from_tag("Views", "min=abc").unwrap_err();
        match err {
            ConfigError::InvalidOption { field, key, value, .. } => {
                assert_eq!(field, "Views");
                assert_eq!(key, "min");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(FieldOptions::from_tag("Body", "maxlength=-1").is_err());
        assert!(FieldOptions::from_tag("Title", "width=wide").is_err());
    }

    #[test]
    fn member_kinds_from_json() {
        let def: ModelDef = serde_json::from_value(serde_json::json!({
            "type_name": "BlogPost",
            "admin_name": "Blog post",
            "members": [
                { "name": "Id", "kind": "integer" },
                { "name": "Category", "kind": { "reference": "Category" }, "config": "list=Title" },
                { "name": "Tags", "kind": { "sequence": "Tag" } },
                { "name": "Rating", "kind": "decimal", "config": { "list": true, "width": 2 } }
            ]
        }))
        .unwrap();
        assert_eq!(def.members[0].kind, MemberKind::Integer);
        assert_eq!(def.members[1].kind, MemberKind::Reference(TypeKey::from("Category")));
        assert_eq!(def.members[1].config, MemberConfig::Tag("list=Title".into()));
        assert_eq!(def.members[2].kind, MemberKind::Sequence(TypeKey::from("Tag")));
        assert_eq!(def.members[2].config, MemberConfig::default());
        assert_eq!(def.members[3].kind, MemberKind::Unknown("decimal".into()));
        let opts = def.members[3].config.normalize("Rating").unwrap();
        assert!(opts.list);
        assert_eq!(opts.width, Some(2));
    }
}
