pub mod connection;
pub mod episode;

pub use connection::{ConnectionRecord, ConnectionRequest};
pub use episode::Episode;
