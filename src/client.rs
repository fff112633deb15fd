//! GenesisAI backend client

mod error;
mod transport;
mod types;

pub use error::{ApiError, ApiErrorKind};
pub use transport::{fetch_remote_config, ApiClient, ChunkStream};
pub use types::{CompletionRequest, LoginRequest, LoginResponse, RemoteConfig};
