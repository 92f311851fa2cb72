//! Storage module
//!
//! Flat per-category upload directories on the local filesystem.

mod category;
mod store;

pub use category::Category;
pub use store::{StoredFile, UploadStore};
