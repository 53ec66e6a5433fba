//! Keep a checklist of keyed checkboxes in an issue comment (or the issue body),
//! and report which boxes were toggled since the last run.

pub mod action;
pub mod checkbox;
pub mod checklist_config;
pub mod config;
pub mod error;
pub mod event;
pub mod github;
pub mod inputs;
pub mod marker;
pub mod metadata;
pub mod mock_github;
pub mod mocks;
pub mod outputs;
pub mod state;

pub use checkbox::CheckboxItem;
pub use checklist_config::ConfigPair;
pub use error::{ValidationError, Violation, ViolationKind};
pub use inputs::{ActionInputs, Target};
pub use marker::Marker;
pub use metadata::StateMetadata;
pub use outputs::ActionOutputs;
pub use state::CheckboxState;
