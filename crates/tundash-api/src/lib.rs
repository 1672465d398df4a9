// tundash-api: Async Rust client for the Phantun tunnel manager backend

pub mod client;
pub mod error;
pub mod logs;
pub mod models;
pub mod transport;

pub use client::ApiClient;
pub use error::Error;
pub use logs::{LineDecoder, LogFrame, LogFrameStream};
pub use transport::{TlsMode, TransportConfig};
