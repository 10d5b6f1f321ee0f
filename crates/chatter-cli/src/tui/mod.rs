//! Terminal User Interface for Chatter

pub mod app;
pub mod components;
pub mod input;
pub mod theme;
pub mod utils;

// Re-exports
pub use app::App;
