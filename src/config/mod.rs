mod access;
mod server;

pub use access::{AccessConfig, AdmissionConfig, SyncConfig};
pub use server::ServerConfig;
