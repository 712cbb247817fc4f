use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::paths;
use crate::quiet::{QuietWindow, TimeOfDay};

pub const DEFAULT_REFRESH_MINUTES: u32 = 15;
pub const FALLBACK_REFRESH_SECS: u64 = 600;
pub const REFRESH_FILE: &str = "refresh_time.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PictureMode {
	#[default]
	Local,
	Online,
	Both,
}

impl fmt::Display for PictureMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			PictureMode::Local => "local",
			PictureMode::Online => "online",
			PictureMode::Both => "both",
		};
		f.write_str(s)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
	pub picture_mode: PictureMode,
	pub refresh_interval_minutes: Option<u32>,
	pub quiet_hours: Option<QuietWindow>,
	pub cloud_folder_name: String,
}

impl Default for Configuration {
	fn default() -> Self {
		Self {
			picture_mode: PictureMode::Local,
			refresh_interval_minutes: Some(DEFAULT_REFRESH_MINUTES),
			quiet_hours: None,
			cloud_folder_name: "s3_folder".to_string(),
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read {}: {source}", .path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to parse {}: {source}", .path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

/// Outcome of settings resolution: the merged configuration and the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
	pub config: Configuration,
	pub source: Option<PathBuf>,
}

impl Configuration {
	/// Returns a copy with every recognised key from `overrides` applied.
	pub fn merged(&self, overrides: &Map<String, Value>) -> Configuration {
		let mut config = self.clone();

		if let Some(v) = overrides.get("picture_mode") {
			config.picture_mode = match serde_json::from_value::<PictureMode>(v.clone()) {
				Ok(mode) => mode,
				Err(_) => {
					tracing::warn!("unknown picture_mode {}, using all pictures", v);
					PictureMode::Both
				}
			};
		}

		if let Some(v) = overrides.get("change_interval_minutes") {
			config.refresh_interval_minutes = parse_minutes(v);
			if config.refresh_interval_minutes.is_none() && !v.is_null() {
				tracing::warn!("invalid change_interval_minutes {}, ignoring", v);
			}
		}

		if let Some(v) = overrides.get("stop_rotation_between") {
			config.quiet_hours = parse_quiet_window(v);
			if config.quiet_hours.is_none() && !v.is_null() {
				tracing::warn!("invalid stop_rotation_between {}, quiet hours disabled", v);
			}
		}

		if let Some(v) = overrides.get("s3_folder") {
			match v.as_str() {
				Some(folder) => config.cloud_folder_name = folder.to_string(),
				None => tracing::warn!("s3_folder must be a string, got {}", v),
			}
		}

		config
	}
}

fn parse_minutes(value: &Value) -> Option<u32> {
	let minutes = match value {
		// fractional minutes truncate toward zero
		Value::Number(n) => n
			.as_u64()
			.or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.trunc() as u64)),
		Value::String(s) => s.trim().parse::<u64>().ok(),
		_ => None,
	}?;
	u32::try_from(minutes).ok().filter(|m| *m > 0)
}

/// Both halves must be present and valid, otherwise there is no window.
pub fn parse_quiet_window(value: &Value) -> Option<QuietWindow> {
	let obj = value.as_object()?;
	let evening = obj.get("evening")?.as_str()?.parse::<TimeOfDay>().ok()?;
	let morning = obj.get("morning")?.as_str()?.parse::<TimeOfDay>().ok()?;
	Some(QuietWindow::new(evening, morning))
}

fn read_settings(path: &Path) -> Result<Value, ConfigError> {
	let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
		path: path.to_path_buf(),
		source,
	})?;
	serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
		path: path.to_path_buf(),
		source,
	})
}

/// Merge the first readable settings file among `candidates` into the defaults.
pub fn resolve_from(candidates: &[PathBuf]) -> Resolved {
	let defaults = Configuration::default();
	for path in candidates {
		if !path.exists() {
			continue;
		}
		match read_settings(path) {
			Ok(Value::Object(map)) => {
				tracing::info!("loaded settings from {}", path.display());
				return Resolved {
					config: defaults.merged(&map),
					source: Some(path.clone()),
				};
			}
			Ok(_) => {
				tracing::warn!("{} is not a JSON object, using defaults", path.display());
				return Resolved {
					config: defaults,
					source: Some(path.clone()),
				};
			}
			Err(e) => tracing::warn!("{}", e),
		}
	}
	tracing::info!("no settings file found, using defaults");
	Resolved {
		config: defaults,
		source: None,
	}
}

pub fn resolve() -> Resolved {
	resolve_from(&paths::settings_candidates())
}

/// Seconds between picture changes for a worker started on `volume`.
pub fn refresh_seconds(config: &Configuration, volume: &Path) -> u64 {
	if let Some(minutes) = config.refresh_interval_minutes.filter(|m| *m > 0) {
		return minutes as u64 * 60;
	}

	let path = volume.join(REFRESH_FILE);
	let content = match std::fs::read_to_string(&path) {
		Ok(c) => c,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
			tracing::info!("{} not found, defaulting to {}s", REFRESH_FILE, FALLBACK_REFRESH_SECS);
			return FALLBACK_REFRESH_SECS;
		}
		Err(e) => {
			tracing::warn!("failed to read {}: {}", path.display(), e);
			return FALLBACK_REFRESH_SECS;
		}
	};

	let number = content.trim();
	if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) {
		if let Ok(secs) = number.parse::<u64>() {
			return secs;
		}
	}
	tracing::warn!("invalid number in {}, defaulting to {}s", REFRESH_FILE, FALLBACK_REFRESH_SECS);
	FALLBACK_REFRESH_SECS
}
