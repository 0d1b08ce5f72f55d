//! Field variants: validation of submitted text, normalisation of stored values, rendering.

pub mod file;
pub mod registry;
pub mod render;
pub mod value;

pub use file::{FileStore, LocalFileStore, UploadedFile};
pub use registry::{CustomField, FieldRegistry, FieldType};
pub use render::{Renderer, TeraRenderer};
pub use value::{Record, Value, TIMESTAMP_STORAGE_FORMAT};

use crate::config::types::{FieldOptions, TypeKey};
use crate::error::{AppError, ConfigError, ValidationError};
use chrono::{NaiveDate, NaiveDateTime};
use render::*;
use std::sync::Arc;
use tera::{escape_html, Context};

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const DEFAULT_WIDTH: u8 = 12;

/// Attributes shared by every field variant.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldAttrs {
    /// Form and record key, e.g. `Title` or `CategoryId`.
    pub name: String,
    pub label: String,
    pub column: String,
    pub default: Option<Value>,
    pub list: bool,
    pub searchable: bool,
    pub blank: bool,
    pub null: bool,
    pub width: u8,
}

impl FieldAttrs {
    pub fn new(name: impl Into<String>, column: impl Into<String>) -> Self {
        let name = name.into();
        FieldAttrs {
            label: name.clone(),
            name,
            column: column.into(),
            default: None,
            list: false,
            searchable: false,
            blank: false,
            null: false,
            width: DEFAULT_WIDTH,
        }
    }
}

/// Link from a relational field to the model it points at.
#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    pub target: TypeKey,
    /// Table of the related model.
    pub table: String,
    /// Identifier column of the related model.
    pub related_pk: String,
    /// Column of the related table shown in list views instead of the raw id.
    pub list_column: Option<String>,
    /// Slug of the related model, known once it has registered.
    pub model_slug: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextConfig {
    pub textarea: bool,
    pub max_length: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NumberConfig {
    pub step: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberConfig {
    fn check(&self, n: f64) -> Result<(), ValidationError> {
        let below = self.min.is_some_and(|min| n < min);
        let above = self.max.is_some_and(|max| n > max);
        if below || above {
            return Err(ValidationError::OutOfRange {
                min: self.min.map(|v| v.to_string()).unwrap_or_else(|| "-inf".into()),
                max: self.max.map(|v| v.to_string()).unwrap_or_else(|| "inf".into()),
            });
        }
        Ok(())
    }

    /// Digits after the decimal point implied by the step, e.g. 2 for `0.01`.
    fn precision(&self) -> usize {
        let step = self.step.to_string();
        step.split_once('.').map_or(0, |(_, frac)| frac.len())
    }

    fn format(&self, n: f64) -> String {
        format!("{:.*}", self.precision(), n)
    }

    fn insert(&self, ctx: &mut Context) {
        ctx.insert("step", &self.step);
        if let Some(min) = self.min {
            ctx.insert("min", &min);
        }
        if let Some(max) = self.max {
            ctx.insert("max", &max);
        }
    }
}

#[derive(Clone, Debug)]
pub enum FieldKind {
    Text(TextConfig),
    Integer(NumberConfig),
    Float(NumberConfig),
    Boolean,
    Timestamp { format: String },
    Url,
    File { upload_to: Option<String> },
    ForeignKey(Relation),
    ManyToMany(Relation),
    Custom(Arc<dyn CustomField>),
}

fn invalid(field: &str, key: &'static str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidOption {
        field: field.to_string(),
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl FieldKind {
    pub fn text(opts: &FieldOptions) -> Self {
        FieldKind::Text(TextConfig {
            textarea: opts.textarea,
            max_length: opts.max_length,
        })
    }

    pub fn integer(field: &str, opts: &FieldOptions) -> Result<Self, ConfigError> {
        let cfg = number_config(field, opts, 1.0)?;
        for (key, v) in [("step", Some(cfg.step)), ("min", cfg.min), ("max", cfg.max)] {
            if let Some(v) = v.filter(|v| v.fract() != 0.0) {
                return Err(invalid(field, key, v, "expected an integer"));
            }
        }
        Ok(FieldKind::Integer(cfg))
    }

    pub fn float(field: &str, opts: &FieldOptions) -> Result<Self, ConfigError> {
        Ok(FieldKind::Float(number_config(field, opts, 0.01)?))
    }

    pub fn timestamp(opts: &FieldOptions) -> Self {
        FieldKind::Timestamp {
            format: opts
                .format
                .clone()
                .unwrap_or_else(|| DEFAULT_TIMESTAMP_FORMAT.to_string()),
        }
    }

    pub fn file(opts: &FieldOptions) -> Self {
        FieldKind::File {
            upload_to: opts.upload_to.clone(),
        }
    }

    pub fn relation(&self) -> Option<&Relation> {
        match self {
            FieldKind::ForeignKey(rel) | FieldKind::ManyToMany(rel) => Some(rel),
            _ => None,
        }
    }

    pub fn relation_mut(&mut self) -> Option<&mut Relation> {
        match self {
            FieldKind::ForeignKey(rel) | FieldKind::ManyToMany(rel) => Some(rel),
            _ => None,
        }
    }

    pub fn is_many_to_many(&self) -> bool {
        matches!(self, FieldKind::ManyToMany(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FieldKind::File { .. })
    }

    /// Whether the kind interprets empty input itself instead of going through blank/null handling.
    fn accepts_empty(&self) -> bool {
        matches!(self, FieldKind::Boolean | FieldKind::ManyToMany(_))
    }

    /// Value stored for empty input on a `blank` field.
    pub fn empty_value(&self) -> Value {
        match self {
            FieldKind::Text(_) | FieldKind::Url | FieldKind::File { .. } => Value::Text(String::new()),
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::ManyToMany(_) => Value::Ids(Default::default()),
            FieldKind::Custom(_) => Value::Text(String::new()),
            _ => Value::Null,
        }
    }

    /// Convert submitted text into the kind's typed value.
    pub fn validate(&self, raw: &str) -> Result<Value, ValidationError> {
        match self {
            FieldKind::Text(cfg) => {
                if let Some(max) = cfg.max_length {
                    if raw.chars().count() > max {
                        return Err(ValidationError::TooLong { max });
                    }
                }
                Ok(Value::Text(raw.to_string()))
            }
            FieldKind::Integer(cfg) => {
                let n: i64 = raw.trim().parse()?;
                cfg.check(n as f64)?;
                Ok(Value::Int(n))
            }
            FieldKind::Float(cfg) => {
                let n: f64 = raw.trim().parse()?;
                if !n.is_finite() {
                    return Err(ValidationError::Custom("Value must be a finite number".into()));
                }
                cfg.check(n)?;
                Ok(Value::Float(n))
            }
            FieldKind::Boolean => Ok(Value::Bool(Value::from(raw).truthy() || raw.trim() == "on")),
            FieldKind::Timestamp { format } => parse_timestamp(raw.trim(), format)
                .map(Value::Timestamp)
                .map_err(|e| ValidationError::InvalidTimestamp {
                    format: format.clone(),
                    reason: e.to_string(),
                }),
            FieldKind::Url => {
                url::Url::parse(raw)?;
                Ok(Value::Text(raw.to_string()))
            }
            FieldKind::File { .. } => Ok(Value::Text(raw.to_string())),
            FieldKind::ForeignKey(_) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    Ok(Value::Null)
                } else if let Ok(id) = raw.parse::<i64>() {
                    Ok(Value::Int(id))
                } else {
                    Ok(Value::Text(raw.to_string()))
                }
            }
            FieldKind::ManyToMany(_) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<i64>().map_err(|source| ValidationError::InvalidIds {
                        entry: s.to_string(),
                        source,
                    })
                })
                .collect::<Result<_, _>>()
                .map(Value::Ids),
            FieldKind::Custom(custom) => custom.validate(raw),
        }
    }

    /// Normalise a value read from the database so it compares equal to the validated form of the same input.
    pub fn from_stored(&self, value: Value) -> Value {
        match (self, value) {
            (FieldKind::Custom(custom), v) => custom.from_stored(v),
            (_, Value::Null) if !matches!(self, FieldKind::Boolean) => Value::Null,
            (FieldKind::Text(_) | FieldKind::Url | FieldKind::File { .. }, v) => match v {
                Value::Text(s) => Value::Text(s),
                other => Value::Text(other.to_string()),
            },
            (FieldKind::Integer(_) | FieldKind::ForeignKey(_), v) => match v {
                Value::Float(f) if f.fract() == 0.0 => Value::Int(f as i64),
                Value::Bool(b) => Value::Int(i64::from(b)),
                Value::Text(s) => match s.trim().parse() {
                    Ok(n) => Value::Int(n),
                    Err(_) => Value::Text(s),
                },
                other => other,
            },
            (FieldKind::Float(_), v) => match v {
                Value::Int(n) => Value::Float(n as f64),
                Value::Text(s) => match s.trim().parse() {
                    Ok(f) => Value::Float(f),
                    Err(_) => Value::Text(s),
                },
                other => other,
            },
            (FieldKind::Boolean, v) => Value::Bool(v.truthy()),
            (FieldKind::Timestamp { format }, v) => match v {
                Value::Text(s) => match parse_stored_timestamp(&s, format) {
                    Some(t) => Value::Timestamp(t),
                    None => Value::Text(s),
                },
                other => other,
            },
            (FieldKind::ManyToMany(_), v) => v,
        }
    }

    /// Value as shown in a form input.
    fn display_value(&self, value: &Value) -> String {
        match (self, value) {
            (FieldKind::Timestamp { format }, Value::Timestamp(t)) => t.format(format).to_string(),
            (FieldKind::Float(cfg), Value::Float(n)) => cfg.format(*n),
            (FieldKind::Boolean, v) => v.truthy().to_string(),
            (_, v) => v.to_string(),
        }
    }

    /// Template name for the widget; inserts kind-specific variables.
    fn widget<'a>(&'a self, ctx: &mut Context, value: &Value) -> &'a str {
        match self {
            FieldKind::Text(cfg) => {
                if let Some(max) = cfg.max_length {
                    ctx.insert("max_length", &max);
                }
                if cfg.textarea {
                    TEXTAREA_TEMPLATE
                } else {
                    TEXT_TEMPLATE
                }
            }
            FieldKind::Integer(cfg) | FieldKind::Float(cfg) => {
                cfg.insert(ctx);
                NUMBER_TEMPLATE
            }
            FieldKind::Boolean => {
                ctx.insert("checked", &value.truthy());
                BOOLEAN_TEMPLATE
            }
            FieldKind::Timestamp { format } => {
                ctx.insert("format", format);
                TIMESTAMP_TEMPLATE
            }
            FieldKind::Url => URL_TEMPLATE,
            FieldKind::File { .. } => FILE_TEMPLATE,
            FieldKind::ForeignKey(rel) | FieldKind::ManyToMany(rel) => {
                ctx.insert("model_slug", rel.model_slug.as_deref().unwrap_or_default());
                RELATION_TEMPLATE
            }
            FieldKind::Custom(custom) => {
                custom.context(ctx);
                custom.template()
            }
        }
    }
}

fn number_config(field: &str, opts: &FieldOptions, default_step: f64) -> Result<NumberConfig, ConfigError> {
    let step = opts.step.unwrap_or(default_step);
    if step <= 0.0 || !step.is_finite() {
        return Err(invalid(field, "step", step, "must be positive"));
    }
    if let (Some(min), Some(max)) = (opts.min, opts.max) {
        if min > max {
            return Err(invalid(field, "min", min, "greater than max"));
        }
    }
    Ok(NumberConfig {
        step,
        min: opts.min,
        max: opts.max,
    })
}

/// Parse with a strftime pattern; date-only patterns yield midnight.
fn parse_timestamp(raw: &str, format: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, format).or_else(|e| {
        NaiveDate::parse_from_str(raw, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or(e)
    })
}

fn parse_stored_timestamp(raw: &str, format: &str) -> Option<NaiveDateTime> {
    [TIMESTAMP_STORAGE_FORMAT, "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", format]
        .iter()
        .find_map(|f| parse_timestamp(raw.trim(), f).ok())
}

#[derive(Clone, Debug)]
pub struct Field {
    pub attrs: FieldAttrs,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(attrs: FieldAttrs, kind: FieldKind) -> Self {
        Field { attrs, kind }
    }

    pub fn name(&self) -> &str {
        &self.attrs.name
    }

    pub fn column(&self) -> &str {
        &self.attrs.column
    }

    /// Validate submitted text, applying blank/null handling for empty input first.
    pub fn clean(&self, raw: &str) -> Result<Value, ValidationError> {
        if raw.is_empty() && !self.kind.accepts_empty() {
            if self.attrs.null {
                return Ok(Value::Null);
            }
            if self.attrs.blank {
                return Ok(self.kind.empty_value());
            }
            return Err(ValidationError::Required);
        }
        self.kind.validate(raw)
    }

    pub fn validate(&self, raw: &str) -> Result<Value, ValidationError> {
        self.kind.validate(raw)
    }

    pub fn from_stored(&self, value: Value) -> Value {
        self.kind.from_stored(value)
    }

    /// HTML-safe text for list views.
    pub fn render_string(&self, value: &Value) -> String {
        match &self.kind {
            FieldKind::Boolean => {
                let class = if value.truthy() {
                    "text-success glyphicon-ok"
                } else {
                    "text-danger glyphicon-remove"
                };
                format!(r#"<span class="glyphicon {}"></span>"#, class)
            }
            FieldKind::Url => {
                let s = value.to_string();
                if s.is_empty() {
                    return s;
                }
                let escaped = escape_html(&s);
                format!(r#"<a href="{}">{}</a>"#, escaped, escaped)
            }
            FieldKind::Custom(custom) => custom.render_string(value),
            kind => escape_html(&kind.display_value(value)),
        }
    }

    /// Render the form widget inside the grid wrapper.
    pub fn render(
        &self,
        renderer: &dyn Renderer,
        value: &Value,
        error: Option<&str>,
        start_row: bool,
    ) -> Result<String, AppError> {
        let mut ctx = Context::new();
        ctx.insert("name", &self.attrs.name);
        ctx.insert("label", &self.attrs.label);
        ctx.insert("optional", &(self.attrs.blank || self.attrs.null));
        ctx.insert("value", &self.kind.display_value(value));
        ctx.insert("error", error.unwrap_or_default());
        ctx.insert("startrow", &start_row);
        ctx.insert("width", &self.attrs.width);
        let template = self.kind.widget(&mut ctx, value);
        let widget = renderer.render(template, &ctx)?;
        ctx.insert("field", &widget);
        renderer.render(WRAPPER_TEMPLATE, &ctx)
    }
}
