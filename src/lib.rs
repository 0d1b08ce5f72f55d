//! Admin panel SDK: model-driven field binding, relationship resolution and CRUD SQL for admin back ends.

pub mod case;
pub mod config;
pub mod error;
pub mod fields;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;
pub mod tag;

pub use case::{snake_case_transform, to_snake_case, NameTransform};
pub use config::{models_from_json, AdminBuilder, GroupDef, MemberDef, MemberKind, Model, ModelDef, ModelRegistry};
pub use error::{AppError, ConfigError, ValidationError};
pub use fields::{CustomField, Field, FieldKind, FileStore, LocalFileStore, Record, Renderer, TeraRenderer, UploadedFile, Value};
pub use routes::{admin_router, common_routes, common_routes_with_ready, model_routes};
pub use service::{CrudService, FormData, ListParams, Page, SaveOutcome};
pub use settings::Settings;
pub use sql::Dialect;
pub use state::AppState;
pub use store::{connect, ensure_database_exists};
pub use tag::parse_tag;
