pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use config::CirklConfig;
pub use error::{CirklError, StoreError};
pub use models::{ConnectionRecord, ConnectionRequest, Episode};
pub use store::MemoryStore;
