//! Path rendering and playlist utilities

pub mod layout;
pub mod m3u;
pub mod sanitize;

pub use layout::{LayoutOptions, render_layout};
pub use m3u::assemble_playlist;
pub use sanitize::sanitize_component;
