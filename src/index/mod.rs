pub mod barrel;
pub mod dense_offsets;
pub mod forward;
