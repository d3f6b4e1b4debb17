pub mod database;
pub mod error;

pub use database::{DATABASE_FILE, Database, default_base_dir, is_absent_or_empty_dir};
pub use error::{Result, StoreError};
