pub mod engine;

pub use engine::{ToggleAction, ToggleEngine, ToggleOutcome};
