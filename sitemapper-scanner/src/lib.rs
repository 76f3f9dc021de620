pub mod error;
pub mod loader;

pub use error::ScanError;
pub use loader::{DEFAULT_TIMEOUT_SECS, HttpLoader, LoaderConfig, PageLoader};
