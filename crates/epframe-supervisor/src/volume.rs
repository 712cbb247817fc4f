use std::path::{Path, PathBuf};

use crate::error::VolumeError;

/// What the mount root looked like on one tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VolumeObservation {
	pub path: Option<PathBuf>,
}

impl VolumeObservation {
	pub fn absent() -> Self {
		Self { path: None }
	}

	pub fn at(path: impl Into<PathBuf>) -> Self {
		Self {
			path: Some(path.into()),
		}
	}

	pub fn present(&self) -> bool {
		self.path.is_some()
	}
}

/// First directory directly under `mount_root`, in the order the OS lists them.
///
/// With several volumes mounted the pick is arbitrary. A missing root counts
/// as no volume.
pub fn locate(mount_root: &Path) -> Result<Option<PathBuf>, VolumeError> {
	let entries = match std::fs::read_dir(mount_root) {
		Ok(entries) => entries,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(source) => {
			return Err(VolumeError::List {
				root: mount_root.to_path_buf(),
				source,
			})
		}
	};

	for entry in entries {
		let entry = match entry {
			Ok(entry) => entry,
			Err(e) => {
				tracing::debug!("skipping unreadable entry in {}: {}", mount_root.display(), e);
				continue;
			}
		};
		let path = entry.path();
		// stat, not lstat: a symlinked mount point counts
		match std::fs::metadata(&path) {
			Ok(meta) if meta.is_dir() => return Ok(Some(path)),
			Ok(_) => {}
			Err(e) => tracing::debug!("cannot stat {}: {}", path.display(), e),
		}
	}
	Ok(None)
}

pub fn observe(mount_root: &Path) -> Result<VolumeObservation, VolumeError> {
	Ok(VolumeObservation {
		path: locate(mount_root)?,
	})
}
