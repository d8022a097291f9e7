pub mod access;
pub mod server;

pub use access::{Access, Operation};
pub use server::{AppState, HttpServer, HttpServerConfig};
