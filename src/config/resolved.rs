//! Registered models: fields built, relationships resolved, ready for queries and rendering.

use crate::config::types::TypeKey;
use crate::error::AppError;
use crate::fields::{Field, Record, Renderer, Value};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Items per list page.
pub const PAGE_SIZE: i64 = 25;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Sort {
    /// Field name; its column is looked up when building SQL.
    pub field: String,
    pub desc: bool,
}

impl Sort {
    /// Parse `Title` or `-Title`.
    pub fn parse(s: &str) -> Self {
        match s.strip_prefix('-') {
            Some(field) => Sort {
                field: field.to_string(),
                desc: true,
            },
            None => Sort {
                field: s.to_string(),
                desc: false,
            },
        }
    }
}

/// Column metadata for list views.
#[derive(Clone, Debug, Serialize)]
pub struct ListColumn {
    pub name: String,
    pub label: String,
}

#[derive(Clone, Debug)]
pub struct Model {
    pub name: String,
    pub slug: String,
    pub type_key: TypeKey,
    pub table: String,
    /// Declaration order; index 0 is the identifier.
    pub fields: Vec<Field>,
    /// Indexes into `fields`, in declaration order.
    pub list_fields: Vec<usize>,
    pub searchable_columns: Vec<String>,
    pub sort: Sort,
}

impl Model {
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.attrs.name == name)
    }

    /// The identifier field.
    pub fn pk(&self) -> &Field {
        &self.fields[0]
    }

    /// Every field but the identifier.
    pub fn form_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().skip(1)
    }

    pub fn list_fields(&self) -> impl Iterator<Item = &Field> {
        self.list_fields.iter().map(move |&i| &self.fields[i])
    }

    /// Fields stored in the model's own table.
    pub fn scalar_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.kind.is_many_to_many())
    }

    pub fn many_to_many_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.kind.is_many_to_many())
    }

    pub fn list_columns(&self) -> Vec<ListColumn> {
        self.list_fields()
            .map(|f| ListColumn {
                name: f.attrs.name.clone(),
                label: f.attrs.label.clone(),
            })
            .collect()
    }

    /// Requested sort if it names a sortable field, else the model default.
    pub fn resolve_sort(&self, field: Option<&str>, desc: bool) -> Sort {
        match field.map(Sort::parse) {
            Some(requested) => {
                let known = self
                    .field_by_name(&requested.field)
                    .is_some_and(|f| !f.kind.is_many_to_many());
                if known {
                    Sort {
                        desc: desc || requested.desc,
                        ..requested
                    }
                } else {
                    self.sort.clone()
                }
            }
            None => self.sort.clone(),
        }
    }

    /// Number of pages needed for `count` rows; a trailing partial page counts.
    pub fn num_pages(count: i64) -> i64 {
        (count + PAGE_SIZE - 1) / PAGE_SIZE
    }

    /// Render every non-identifier field into grid rows of 12 units.
    pub fn render_form(
        &self,
        renderer: &dyn Renderer,
        data: &Record,
        use_defaults: bool,
        errors: &BTreeMap<String, String>,
    ) -> Result<String, AppError> {
        let mut out = String::new();
        let mut active_col: u32 = 0;
        for field in self.form_fields() {
            let value = match data.get(&field.attrs.name) {
                Some(v) => v.clone(),
                None if use_defaults => field.attrs.default.clone().unwrap_or(Value::Null),
                None => Value::Null,
            };
            let error = errors.get(&field.attrs.name).map(String::as_str);
            out.push_str(&field.render(renderer, &value, error, active_col % 12 == 0)?);
            active_col += u32::from(field.attrs.width);
        }
        Ok(out)
    }
}

/// Models shown together on the admin index.
#[derive(Clone, Debug, Serialize)]
pub struct ModelGroup {
    pub name: String,
    pub slug: String,
    /// Slugs, in registration order.
    pub models: Vec<String>,
}

/// Immutable once built; shared by every request.
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    models: Vec<Model>,
    by_slug: HashMap<String, usize>,
    groups: Vec<ModelGroup>,
}

impl ModelRegistry {
    pub(crate) fn new(models: Vec<Model>, groups: Vec<ModelGroup>) -> Self {
        let by_slug = models
            .iter()
            .enumerate()
            .map(|(i, m)| (m.slug.clone(), i))
            .collect();
        ModelRegistry {
            models,
            by_slug,
            groups,
        }
    }

    pub fn get(&self, slug: &str) -> Option<&Model> {
        self.by_slug.get(slug).map(|&i| &self.models[i])
    }

    pub fn by_type(&self, key: &TypeKey) -> Option<&Model> {
        self.models.iter().find(|m| &m.type_key == key)
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn groups(&self) -> &[ModelGroup] {
        &self.groups
    }
}
