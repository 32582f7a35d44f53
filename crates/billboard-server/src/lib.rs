// ABOUTME: HTTP server for billboard, exposing the announcement and user REST API.
// ABOUTME: Also owns environment configuration and the Cloudinary image uploader.

pub mod api;
pub mod app_state;
pub mod cloudinary;
pub mod config;
pub mod routes;

pub use app_state::{AppState, SharedState};
pub use cloudinary::{CloudinaryConfig, CloudinaryUploader};
pub use config::{BillboardConfig, ConfigError};
pub use routes::create_router;
