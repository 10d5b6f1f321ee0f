//! Reusable UI components

mod messages;
mod status_bar;
mod toast;

pub use messages::render_messages;
pub use status_bar::render_status_bar;
pub use toast::{render_toasts, Toast, ToastQueue};
