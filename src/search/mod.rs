pub mod autocomplete;
pub mod corrector;

pub use autocomplete::{suggest, Suggestion};
pub use corrector::{correct_word, CorrectionResult, CorrectionType, CorrectorContext};
