pub mod paths;
pub mod tracing;

pub use paths::AppPaths;
pub use tracing::init_tracing;
