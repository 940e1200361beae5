pub mod builder;
pub mod incremental;

pub use builder::{build_all, BuildReport};
pub use incremental::{add_documents, IngestStats};
