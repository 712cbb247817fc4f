use std::fmt;
use std::path::Path;

use epframe_core::config::{self, Configuration};

use crate::process::{Launcher, WorkerSpec};
use crate::volume::VolumeObservation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartReason {
	FirstInsert,
	Reinserted,
	WorkerExited,
	QuietEnded,
}

impl fmt::Display for StartReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			StartReason::FirstInsert => "volume inserted",
			StartReason::Reinserted => "volume reinserted",
			StartReason::WorkerExited => "worker not running",
			StartReason::QuietEnded => "quiet hours ended",
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
	QuietHours,
	VolumeRemoved,
	Restart,
	Shutdown,
}

impl fmt::Display for StopReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			StopReason::QuietHours => "entering quiet hours",
			StopReason::VolumeRemoved => "volume removed",
			StopReason::Restart => "restarting",
			StopReason::Shutdown => "supervisor shutting down",
		})
	}
}

/// What one tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
	Unchanged,
	Started { reason: StartReason, refresh_secs: u64 },
	SpawnFailed { reason: StartReason },
	Stopped { reason: StopReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Idle,
	Running,
	QuietSuppressed,
	Removed,
}

#[derive(Debug)]
pub struct SupervisorState<H> {
	pub volume_inserted: bool,
	pub volume_was_removed: bool,
	pub was_in_quiet_hours: bool,
	worker: Option<H>,
}

impl<H> Default for SupervisorState<H> {
	fn default() -> Self {
		Self {
			volume_inserted: false,
			volume_was_removed: false,
			was_in_quiet_hours: false,
			worker: None,
		}
	}
}

impl<H> SupervisorState<H> {
	pub fn worker(&self) -> Option<&H> {
		self.worker.as_ref()
	}

	pub fn phase(&self) -> Phase {
		match (self.volume_inserted, self.volume_was_removed) {
			(true, _) if self.was_in_quiet_hours => Phase::QuietSuppressed,
			(true, _) => Phase::Running,
			(false, true) => Phase::Removed,
			(false, false) => Phase::Idle,
		}
	}
}

/// Decides, once per tick, whether the worker should be running.
///
/// Holds the only handle to the worker; a replacement is never spawned
/// before the previous one has been stopped and waited for.
pub struct Supervisor<L: Launcher> {
	launcher: L,
	worker: WorkerSpec,
	config: Configuration,
	state: SupervisorState<L::Handle>,
}

impl<L: Launcher> Supervisor<L> {
	pub fn new(launcher: L, worker: WorkerSpec, config: Configuration) -> Self {
		Self {
			launcher,
			worker,
			config,
			state: SupervisorState::default(),
		}
	}

	pub fn config(&self) -> &Configuration {
		&self.config
	}

	pub fn state(&self) -> &SupervisorState<L::Handle> {
		&self.state
	}

	pub fn launcher(&self) -> &L {
		&self.launcher
	}

	/// Probe the worker, dropping the handle if it has exited.
	pub fn worker_alive(&mut self) -> bool {
		let Some(handle) = self.state.worker.as_mut() else {
			return false;
		};
		if self.launcher.is_alive(handle) {
			return true;
		}
		tracing::info!("worker has exited");
		self.state.worker = None;
		false
	}

	pub async fn tick(&mut self, observation: &VolumeObservation, in_quiet: bool) -> Transition {
		let Some(volume) = observation.path.as_deref() else {
			if !self.state.volume_inserted {
				return Transition::Unchanged;
			}
			tracing::info!("volume removed");
			self.stop_worker(StopReason::VolumeRemoved).await;
			self.state.volume_inserted = false;
			self.state.volume_was_removed = true;
			return Transition::Stopped {
				reason: StopReason::VolumeRemoved,
			};
		};

		let alive = self.worker_alive();

		if in_quiet {
			let transition = if alive {
				self.stop_worker(StopReason::QuietHours).await;
				Transition::Stopped {
					reason: StopReason::QuietHours,
				}
			} else {
				Transition::Unchanged
			};
			self.state.volume_inserted = true;
			self.state.volume_was_removed = false;
			self.state.was_in_quiet_hours = true;
			return transition;
		}

		// removal and quiet hours both drop the handle, so they are checked
		// ahead of the flags they imply
		let reason = if self.state.volume_was_removed {
			StartReason::Reinserted
		} else if !self.state.volume_inserted {
			StartReason::FirstInsert
		} else if self.state.was_in_quiet_hours {
			StartReason::QuietEnded
		} else if !alive {
			StartReason::WorkerExited
		} else {
			return Transition::Unchanged;
		};

		self.start_worker(volume, reason).await
	}

	/// Stop the worker before the supervisor exits.
	pub async fn shutdown(&mut self) -> Transition {
		if self.worker_alive() {
			self.stop_worker(StopReason::Shutdown).await;
			Transition::Stopped {
				reason: StopReason::Shutdown,
			}
		} else {
			Transition::Unchanged
		}
	}

	async fn start_worker(&mut self, volume: &Path, reason: StartReason) -> Transition {
		tracing::info!("{}, starting worker on {}", reason, volume.display());

		if self.state.worker.is_some() {
			self.stop_worker(StopReason::Restart).await;
		}

		// re-read on every start so the volume's refresh file is honoured
		let refresh_secs = config::refresh_seconds(&self.config, volume);
		let command = self.worker.command(volume, refresh_secs);

		match self.launcher.spawn(&command) {
			Ok(handle) => {
				tracing::info!(refresh_secs, "worker started: {}", command);
				self.state.worker = Some(handle);
				self.state.volume_inserted = true;
				self.state.volume_was_removed = false;
				self.state.was_in_quiet_hours = false;
				Transition::Started {
					reason,
					refresh_secs,
				}
			}
			Err(e) => {
				tracing::error!("{}", e);
				Transition::SpawnFailed { reason }
			}
		}
	}

	/// The handle is cleared even when stopping fails.
	async fn stop_worker(&mut self, reason: StopReason) {
		let Some(handle) = self.state.worker.take() else {
			return;
		};
		tracing::info!("stopping worker: {}", reason);
		match self.launcher.stop(handle).await {
			Ok(()) => tracing::info!("worker stopped"),
			Err(e) => tracing::warn!("{}; the worker may still be running", e),
		}
	}
}
