// Library crate: the editor core plus the headless harness used by the tests
// and by the script-driven binary.

pub mod api;
pub mod collaborators;
pub mod drawing;
pub mod editor;
pub mod error;
pub mod fixtures;
pub mod geometry;
pub mod harness;
pub mod history;
pub mod rotation;
pub mod scene;
pub mod script;
pub mod settings;
pub mod surface;

pub use drawing::EditorMode;
pub use editor::{Editor, FeatureReport, FeatureUpdate, KeyInput};
pub use error::{ApiError, EditorError};
pub use settings::EditorSettings;
