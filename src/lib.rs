pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod geolocation;
pub mod intake;
pub mod render;
pub mod server;
pub mod session;
pub mod store;
pub mod sync;
pub mod types;
