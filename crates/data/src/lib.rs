pub mod backend;
pub mod registry;
pub mod run_store;

pub use backend::{AvailableTicker, BackendClient, LatestHash, DEFAULT_BACKEND_URL};
pub use registry::JsonModelRegistry;
pub use run_store::JsonRunStore;
