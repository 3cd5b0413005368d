pub mod config;
pub mod editor;
pub mod history;
pub mod reflow;
pub mod store;

pub use config::EditorConfig;
pub use editor::Editor;
pub use history::{History, HistorySource, Snapshot};
pub use store::{Mutation, SelectMode, Transition, apply};
