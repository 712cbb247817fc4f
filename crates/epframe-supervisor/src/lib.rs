//! # epframe-supervisor
//!
//! Watches a mount root for a removable volume and keeps exactly one
//! display worker running while a volume is present and quiet hours are
//! not in effect.
//!
//! ```rust,no_run
//! use epframe_core::LocalClock;
//! use epframe_supervisor::{PollingDriver, ProcessLauncher, Supervisor, WorkerSpec};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let resolved = epframe_core::config::resolve();
//! let supervisor = Supervisor::new(
//!     ProcessLauncher::default(),
//!     WorkerSpec::new("frame-manager"),
//!     resolved.config,
//! );
//! let driver = PollingDriver::new(
//!     supervisor,
//!     LocalClock,
//!     "/media/pi".into(),
//!     epframe_supervisor::driver::DEFAULT_POLL_INTERVAL,
//! );
//! driver.run(epframe_supervisor::driver::shutdown_signal()).await;
//! # }
//! ```

pub mod driver;
pub mod error;
pub mod process;
pub mod supervisor;
pub mod volume;

pub use driver::PollingDriver;
pub use error::{SpawnError, StopError, VolumeError};
pub use process::{Launcher, ProcessLauncher, StopPolicy, WorkerCommand, WorkerHandle, WorkerSpec};
pub use supervisor::{Phase, StartReason, StopReason, Supervisor, SupervisorState, Transition};
pub use volume::VolumeObservation;
