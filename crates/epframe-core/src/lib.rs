//! # epframe-core
//!
//! Settings and time-of-day rules shared by the epaper-frame supervisor.
//!
//! Settings are read from the first existing `settings.json` among
//! `/etc/epaper_frame`, the user's config directory and the binary's own
//! directory, then merged over built-in defaults.
//!
//! ```rust
//! use epframe_core::quiet::{QuietWindow, TimeOfDay};
//!
//! let night = QuietWindow::new("22:00".parse().unwrap(), "07:00".parse().unwrap());
//! assert!(night.contains(TimeOfDay::new(23, 30).unwrap()));
//! assert!(!night.contains(TimeOfDay::new(12, 0).unwrap()));
//! ```

pub mod config;
pub mod paths;
pub mod quiet;

pub use config::{Configuration, ConfigError, PictureMode, Resolved};
pub use quiet::{Clock, LocalClock, QuietWindow, TimeOfDay, TimeParseError};
