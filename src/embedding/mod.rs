pub mod model;

pub use model::EmbeddingModel;
