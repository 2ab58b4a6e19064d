pub mod config;
pub mod models;
pub mod api;
pub mod lookup;
pub mod database;
pub mod session;
pub mod logging;

pub use config::Config;
pub use models::*;
pub use lookup::{LookupError, LookupService};
pub use database::{RecordStore, StorageError};
pub use session::Session;
