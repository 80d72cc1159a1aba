pub mod routes;
pub mod storage;

pub use routes::{app, ApiKeyStore, AppState, AuthUser};
pub use storage::{ServerStorage, ServerStorageError};
