// ABOUTME: Core library for billboard, containing domain types, store ports, and the write flows.
// ABOUTME: Defines the announcement/user model shared by the store and server crates.

pub mod consistency;
pub mod error;
pub mod memory;
pub mod model;
pub mod query;
pub mod repository;
pub mod store;
pub mod testing;
pub mod upload;
pub mod users;

pub use consistency::ConsistencyManager;
pub use error::{BillboardError, StoreError, UploadError};
pub use memory::MemoryStore;
pub use model::{
    Announcement, AnnouncementDetail, AnnouncementFields, AnnouncementPatch, NewUser, User,
    UserDetail,
};
pub use query::{
    AnnouncementFilter, AnnouncementQuery, ListParams, Page, Sort, SortField, SortOrder,
};
pub use repository::AnnouncementRepository;
pub use store::{DocumentStore, UnitOfWork};
pub use upload::{DisabledUploader, ImageUploader};
pub use users::UserDirectory;
