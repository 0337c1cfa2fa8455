pub mod config;
pub mod console;
pub mod explorer;
pub mod format;
pub mod navigation;
pub mod transfer;
pub mod upload;

pub use config::ClientConfig;
pub use explorer::{Explorer, ExplorerError, Settled};
