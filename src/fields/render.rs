//! Template rendering for form widgets.

use crate::error::AppError;
use tera::{Context, Tera};

/// Renders a named template with a context. Field widgets and the field wrapper go through this.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, ctx: &Context) -> Result<String, AppError>;
}

pub const WRAPPER_TEMPLATE: &str = "fields/wrapper.html";
pub const TEXT_TEMPLATE: &str = "fields/text.html";
pub const TEXTAREA_TEMPLATE: &str = "fields/textarea.html";
pub const NUMBER_TEMPLATE: &str = "fields/number.html";
pub const BOOLEAN_TEMPLATE: &str = "fields/boolean.html";
pub const TIMESTAMP_TEMPLATE: &str = "fields/timestamp.html";
pub const URL_TEMPLATE: &str = "fields/url.html";
pub const FILE_TEMPLATE: &str = "fields/file.html";
pub const RELATION_TEMPLATE: &str = "fields/relation.html";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        WRAPPER_TEMPLATE,
        r#"{% if startrow %}</div><div class="row">{% endif %}
<div class="col-sm-{{ width }}">
  <div class="form-group">
    <label for="{{ name }}">{{ label }}{% if not optional %} *{% endif %}</label>
    {{ field | safe }}
    {% if error %}<p class="text-danger">{{ error }}</p>{% endif %}
  </div>
</div>
"#,
    ),
    (
        TEXT_TEMPLATE,
        r#"<input id="{{ name }}" name="{{ name }}" type="text" value="{{ value }}" class="form-control"{% if max_length %} maxlength="{{ max_length }}"{% endif %}>"#,
    ),
    (
        TEXTAREA_TEMPLATE,
        r#"<textarea id="{{ name }}" name="{{ name }}" class="form-control">{{ value }}</textarea>"#,
    ),
    (
        NUMBER_TEMPLATE,
        r#"<input id="{{ name }}" name="{{ name }}" type="number" step="{{ step }}"{% if min is defined %} min="{{ min }}"{% endif %}{% if max is defined %} max="{{ max }}"{% endif %} value="{{ value }}" class="form-control">"#,
    ),
    (
        BOOLEAN_TEMPLATE,
        r#"<input id="{{ name }}" name="{{ name }}" type="checkbox" value="true"{% if checked %} checked{% endif %}>"#,
    ),
    (
        TIMESTAMP_TEMPLATE,
        r#"<input id="{{ name }}" name="{{ name }}" type="text" value="{{ value }}" class="form-control" placeholder="{{ format }}">"#,
    ),
    (
        URL_TEMPLATE,
        r#"<input id="{{ name }}" name="{{ name }}" type="url" value="{{ value }}" class="form-control" placeholder="http://">"#,
    ),
    (
        FILE_TEMPLATE,
        r#"<input id="{{ name }}" name="{{ name }}" type="file">
<p>{% if value %}Existing: {{ value }}{% endif %}</p>"#,
    ),
    (
        RELATION_TEMPLATE,
        r#"<div class="input-group">
  <input id="{{ name }}" name="{{ name }}" type="text" value="{{ value }}" class="form-control">
  <span class="input-group-btn">
    <button class="btn btn-default btn-fk-search" type="button" data-name="{{ name }}" data-slug="{{ model_slug }}">Search...</button>
  </span>
</div>"#,
    ),
];

/// Tera-backed renderer preloaded with the built-in widget templates.
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    pub fn new() -> Result<Self, AppError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(BUILTIN_TEMPLATES.iter().copied())?;
        Ok(TeraRenderer { tera })
    }

    /// Add or replace a template, e.g. the widget of a custom field.
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<(), AppError> {
        self.tera.add_raw_template(name, source)?;
        Ok(())
    }
}

impl Renderer for TeraRenderer {
    fn render(&self, template: &str, ctx: &Context) -> Result<String, AppError> {
        Ok(self.tera.render(template, ctx)?)
    }
}
