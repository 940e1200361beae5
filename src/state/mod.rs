pub mod persistent;

pub use persistent::PersistedState;
