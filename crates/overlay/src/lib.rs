//! Frame-driven state behind the track selection overlay.
//!
//! Nothing here draws. The front end calls into these types once per render
//! pass and paints whatever they hold afterwards.

pub mod browser;
pub mod log_buffer;

pub use browser::{QueryReason, RefreshOutcome, TrackBrowserState, DEFAULT_REFRESH_INTERVAL};
pub use log_buffer::{FilteredLines, LogBuffer, LogFilter, LogPanel, LogView};
