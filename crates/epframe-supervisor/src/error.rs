use std::path::PathBuf;

use nix::errno::Errno;

#[derive(Debug, thiserror::Error)]
#[error("failed to spawn {program}: {source}")]
pub struct SpawnError {
	pub program: String,
	#[source]
	pub source: std::io::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum StopError {
	#[error("failed to signal worker process group {pid}: {errno}")]
	Signal { pid: u32, errno: Errno },
}

#[derive(Debug, thiserror::Error)]
pub enum VolumeError {
	#[error("failed to list {}: {source}", .root.display())]
	List {
		root: PathBuf,
		#[source]
		source: std::io::Error,
	},
}
