use std::ffi::{OsStr, OsString};
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};

use crate::error::{SpawnError, StopError};

/// The worker executable plus any arguments that precede the per-start ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
	pub program: OsString,
	pub leading_args: Vec<OsString>,
}

impl WorkerSpec {
	pub fn new(program: impl Into<OsString>) -> Self {
		Self {
			program: program.into(),
			leading_args: Vec::new(),
		}
	}

	pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
		self.leading_args.push(arg.into());
		self
	}

	/// `<program> [leading args...] <source> <refresh_secs>`
	pub fn command(&self, source: &Path, refresh_secs: u64) -> WorkerCommand {
		let mut args = self.leading_args.clone();
		args.push(source.as_os_str().to_os_string());
		args.push(refresh_secs.to_string().into());
		WorkerCommand {
			program: self.program.clone(),
			args,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
	pub program: OsString,
	pub args: Vec<OsString>,
}

impl fmt::Display for WorkerCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.program.to_string_lossy())?;
		for arg in &self.args {
			write!(f, " {}", arg.to_string_lossy())?;
		}
		Ok(())
	}
}

/// Start, probe and stop one worker process.
///
/// The supervisor only talks to the OS through this trait, so its decisions
/// can be exercised against an in-memory launcher.
pub trait Launcher {
	type Handle;

	fn spawn(&mut self, command: &WorkerCommand) -> Result<Self::Handle, SpawnError>;

	/// Non-blocking. When the status cannot be determined the worker is
	/// reported alive.
	fn is_alive(&mut self, handle: &mut Self::Handle) -> bool;

	/// Ask the process to terminate and wait for it. A process that is already
	/// gone is not an error.
	fn stop(&mut self, handle: Self::Handle) -> impl Future<Output = Result<(), StopError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopPolicy {
	/// SIGTERM, then wait for as long as it takes.
	#[default]
	Graceful,
	/// SIGTERM, wait up to `grace`, then SIGKILL.
	Escalate { grace: Duration },
}

pub struct WorkerHandle {
	child: Child,
	pid: u32,
}

impl WorkerHandle {
	pub fn pid(&self) -> u32 {
		self.pid
	}
}

impl fmt::Debug for WorkerHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WorkerHandle").field("pid", &self.pid).finish()
	}
}

/// Runs workers as real child processes, each leading its own process group.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
	policy: StopPolicy,
}

impl ProcessLauncher {
	pub fn new(policy: StopPolicy) -> Self {
		Self { policy }
	}

	pub fn policy(&self) -> StopPolicy {
		self.policy
	}
}

impl Launcher for ProcessLauncher {
	type Handle = WorkerHandle;

	fn spawn(&mut self, command: &WorkerCommand) -> Result<WorkerHandle, SpawnError> {
		let mut cmd = Command::new(&command.program);
		cmd.args(&command.args)
			.stdin(Stdio::null())
			.stdout(Stdio::inherit())
			.stderr(Stdio::inherit())
			.process_group(0);

		let child = cmd.spawn().map_err(|source| SpawnError {
			program: lossy(&command.program),
			source,
		})?;
		let pid = child.id().unwrap_or(0);
		tracing::debug!(pid, "spawned {}", command);
		Ok(WorkerHandle { child, pid })
	}

	fn is_alive(&mut self, handle: &mut WorkerHandle) -> bool {
		match handle.child.try_wait() {
			Ok(None) => true,
			Ok(Some(status)) => {
				tracing::debug!(pid = handle.pid, "worker exited with {}", status);
				false
			}
			// unknown status counts as alive so the handle is stopped, never dropped
			Err(e) => {
				tracing::warn!(pid = handle.pid, "failed to poll worker: {}", e);
				true
			}
		}
	}

	async fn stop(&mut self, mut handle: WorkerHandle) -> Result<(), StopError> {
		// An exited child has been reaped; its pid may already belong to someone else.
		if !self.is_alive(&mut handle) || handle.pid == 0 {
			return Ok(());
		}

		let pgid = Pid::from_raw(handle.pid as i32);
		match killpg(pgid, Signal::SIGTERM) {
			Ok(()) => {}
			Err(Errno::ESRCH) => {
				reap(&mut handle).await;
				return Ok(());
			}
			Err(errno) => {
				return Err(StopError::Signal {
					pid: handle.pid,
					errno,
				})
			}
		}

		match self.policy {
			StopPolicy::Graceful => reap(&mut handle).await,
			StopPolicy::Escalate { grace } => {
				if tokio::time::timeout(grace, reap(&mut handle)).await.is_err() {
					tracing::warn!(
						pid = handle.pid,
						"worker ignored SIGTERM for {}s, sending SIGKILL",
						grace.as_secs()
					);
					match killpg(pgid, Signal::SIGKILL) {
						Ok(()) | Err(Errno::ESRCH) => {}
						Err(errno) => {
							return Err(StopError::Signal {
								pid: handle.pid,
								errno,
							})
						}
					}
					reap(&mut handle).await;
				}
			}
		}
		Ok(())
	}
}

async fn reap(handle: &mut WorkerHandle) {
	match handle.child.wait().await {
		Ok(status) => tracing::debug!(pid = handle.pid, "worker exited with {}", status),
		Err(e) => tracing::warn!(pid = handle.pid, "failed to wait for worker: {}", e),
	}
}

fn lossy(s: &OsStr) -> String {
	s.to_string_lossy().into_owned()
}
