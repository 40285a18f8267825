pub mod pending;
pub mod recall;
pub mod states;

pub use states::{resolve_affected_states, NATIONWIDE};
