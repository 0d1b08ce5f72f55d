mod crud;
mod form;

pub use crud::CrudService;
pub use form::{FormData, ListParams, Page, SaveOutcome};
