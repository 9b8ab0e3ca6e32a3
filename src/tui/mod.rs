//! TUI module for browsing probed endpoints

mod actions;
mod app;
mod palette;

pub use actions::{copy_to_clipboard, open_link, osc52_sequence};
pub use app::App;
pub use palette::Palette;
