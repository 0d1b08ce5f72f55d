//! Inputs and outputs of the persistence operations.

use crate::config::Model;
use crate::fields::{Record, UploadedFile, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Submitted form: text values and file parts, keyed by field name.
#[derive(Clone, Debug, Default)]
pub struct FormData {
    pub values: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn file(mut self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.files.insert(name.into(), file);
        self
    }

    /// Form values that reproduce `record`, e.g. to re-submit a row unchanged.
    pub fn from_record(model: &Model, record: &Record) -> Self {
        let values = model
            .form_fields()
            .filter_map(|f| {
                let v = record.get(&f.attrs.name)?;
                let text = match (&f.kind, v) {
                    (crate::fields::FieldKind::Timestamp { format }, Value::Timestamp(t)) => {
                        t.format(format).to_string()
                    }
                    (_, v) => v.to_string(),
                };
                Some((f.attrs.name.clone(), text))
            })
            .collect();
        FormData {
            values,
            files: HashMap::new(),
        }
    }
}

fn first_page() -> i64 {
    1
}

/// Query-string parameters of the list operation.
#[derive(Clone, Debug, Deserialize)]
pub struct ListParams {
    #[serde(rename = "q", default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(rename = "desc", default)]
    pub sort_desc: bool,
    #[serde(default = "first_page")]
    pub page: i64,
}

impl Default for ListParams {
    fn default() -> Self {
        ListParams {
            search: None,
            sort: None,
            sort_desc: false,
            page: first_page(),
        }
    }
}

/// One page of list rows; cells follow the model's list columns.
#[derive(Clone, Debug, Serialize)]
pub struct Page {
    pub rows: Vec<Vec<Value>>,
    pub total: i64,
    pub page: i64,
}

impl Page {
    pub fn num_pages(&self) -> i64 {
        Model::num_pages(self.total)
    }

    /// No rows on this page, e.g. a page past the end.
    pub fn is_empty_page(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells formatted for display by their fields.
    pub fn display_rows(&self, model: &Model) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(model.list_fields())
                    .map(|(v, f)| f.render_string(v))
                    .collect()
            })
            .collect()
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved { id: i64, data: Record },
    /// Nothing was written; `data` holds the submitted values for re-rendering.
    Invalid {
        data: Record,
        errors: BTreeMap<String, String>,
    },
    Unchanged { message: String },
}

impl SaveOutcome {
    pub fn unchanged(model: &Model) -> Self {
        SaveOutcome::Unchanged {
            message: format!("{} was not saved because there were no changes.", model.name),
        }
    }
}
