//! Projects
//!
//! CRUD over portfolio projects. Each project may carry one image, stored
//! in the project row and served from its own endpoint; list and detail
//! responses only ever carry image metadata and a versioned `imageUrl`.

pub mod form;
pub mod handlers;
pub mod models;
pub mod store;
pub mod validation;

pub use handlers::{
    create_project, delete_project, get_project, get_project_image, list_projects, update_project,
};
pub use store::ProjectStore;
