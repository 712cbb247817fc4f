use std::path::PathBuf;

pub const APP_DIR: &str = "epaper_frame";
pub const SETTINGS_FILE: &str = "settings.json";

pub fn system_config_dir() -> PathBuf {
	PathBuf::from("/etc").join(APP_DIR)
}

pub fn user_config_dir() -> Option<PathBuf> {
	if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
		if !dir.is_empty() {
			return Some(PathBuf::from(dir).join(APP_DIR));
		}
	}
	home_dir().map(|home| home.join(".config").join(APP_DIR))
}

/// Directory holding the running binary, for a settings file shipped beside it.
pub fn install_dir() -> Option<PathBuf> {
	std::env::current_exe()
		.ok()
		.and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
}

/// Settings locations in lookup order.
pub fn settings_candidates() -> Vec<PathBuf> {
	let mut candidates = vec![system_config_dir().join(SETTINGS_FILE)];
	if let Some(dir) = user_config_dir() {
		candidates.push(dir.join(SETTINGS_FILE));
	}
	if let Some(dir) = install_dir() {
		candidates.push(dir.join(SETTINGS_FILE));
	}
	candidates
}

/// Where the desktop automounter places removable media for the invoking user.
pub fn default_mount_root() -> PathBuf {
	let user = std::env::var("SUDO_USER")
		.ok()
		.filter(|u| !u.is_empty())
		.or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()));
	match user {
		Some(user) => PathBuf::from("/media").join(user),
		None => PathBuf::from("/media"),
	}
}

fn home_dir() -> Option<PathBuf> {
	std::env::var("HOME").ok().filter(|h| !h.is_empty()).map(PathBuf::from)
}
