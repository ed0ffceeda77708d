//! Player profile storage

pub mod profiles;

pub use profiles::{PlayerProfile, PlayerRegistry};
