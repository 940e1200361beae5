pub mod document_store;
pub mod dynamic;
pub mod metadata;
