use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use epframe_core::quiet::{self, Clock};

use crate::error::VolumeError;
use crate::process::Launcher;
use crate::supervisor::{Supervisor, Transition};
use crate::volume::{self, VolumeObservation};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Fixed-period polling loop around a [`Supervisor`].
pub struct PollingDriver<L: Launcher, C: Clock> {
	supervisor: Supervisor<L>,
	clock: C,
	mount_root: PathBuf,
	interval: Duration,
}

impl<L: Launcher, C: Clock> PollingDriver<L, C> {
	pub fn new(supervisor: Supervisor<L>, clock: C, mount_root: PathBuf, interval: Duration) -> Self {
		Self {
			supervisor,
			clock,
			mount_root,
			interval,
		}
	}

	pub fn supervisor(&self) -> &Supervisor<L> {
		&self.supervisor
	}

	pub fn supervisor_mut(&mut self) -> &mut Supervisor<L> {
		&mut self.supervisor
	}

	pub fn into_supervisor(self) -> Supervisor<L> {
		self.supervisor
	}

	pub fn observe(&self) -> Result<(VolumeObservation, bool), VolumeError> {
		let now = self.clock.now();
		let in_quiet = quiet::is_quiet(now, self.supervisor.config().quiet_hours.as_ref());
		let observation = volume::observe(&self.mount_root)?;
		Ok((observation, in_quiet))
	}

	/// One tick. `None` when the mount root could not be inspected.
	pub async fn poll_once(&mut self) -> Option<Transition> {
		let (observation, in_quiet) = match self.observe() {
			Ok(o) => o,
			Err(e) => {
				tracing::warn!("{}, skipping tick", e);
				return None;
			}
		};
		let transition = self.supervisor.tick(&observation, in_quiet).await;
		if transition != Transition::Unchanged {
			tracing::debug!(?transition, in_quiet, volume = ?observation.path, "tick");
		}
		Some(transition)
	}

	/// Poll until `shutdown` resolves, then stop the worker.
	pub async fn run<F>(mut self, shutdown: F) -> Supervisor<L>
	where
		F: Future<Output = ()>,
	{
		let config = self.supervisor.config();
		tracing::info!(
			mount_root = %self.mount_root.display(),
			interval_secs = self.interval.as_secs_f32(),
			picture_mode = %config.picture_mode,
			"watching for volumes"
		);
		match &config.quiet_hours {
			Some(window) => tracing::info!("quiet hours configured: {}", window),
			None => tracing::info!("no quiet hours configured"),
		}

		tokio::pin!(shutdown);
		loop {
			self.poll_once().await;
			tokio::select! {
				_ = &mut shutdown => break,
				_ = tokio::time::sleep(self.interval) => {}
			}
		}

		tracing::info!("shutting down");
		self.supervisor.shutdown().await;
		self.supervisor
	}
}

/// Resolves on SIGINT or SIGTERM.
///
/// The handlers are installed when this is called, not when the future is
/// first polled, so a signal arriving during the first tick is not lost.
pub fn shutdown_signal() -> impl Future<Output = ()> {
	use tokio::signal::unix::{signal, SignalKind};

	let streams = signal(SignalKind::terminate())
		.and_then(|term| Ok((term, signal(SignalKind::interrupt())?)));
	async move {
		match streams {
			Ok((mut term, mut int)) => tokio::select! {
				_ = term.recv() => tracing::info!("received SIGTERM"),
				_ = int.recv() => tracing::info!("received SIGINT"),
			},
			Err(e) => {
				tracing::warn!("cannot listen for SIGTERM: {}", e);
				let _ = tokio::signal::ctrl_c().await;
			}
		}
	}
}
