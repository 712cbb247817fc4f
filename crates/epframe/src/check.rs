use std::path::PathBuf;
use std::process::ExitCode;

use epframe_core::quiet::{self, Clock, TimeOfDay};
use epframe_core::{config, Configuration, LocalClock};
use epframe_supervisor::volume;
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::CheckArgs;

#[derive(Debug, Serialize)]
struct Report {
	settings: Option<PathBuf>,
	config: Configuration,
	now: TimeOfDay,
	quiet_now: bool,
	mount_root: PathBuf,
	volume: Option<PathBuf>,
	volume_error: Option<String>,
	refresh_secs: Option<u64>,
}

pub fn cmd_check(args: &CheckArgs) -> ExitCode {
	let resolved = crate::resolve_settings(args.common.settings.as_deref());
	let mount_root = crate::mount_root(&args.common);
	let now = LocalClock.now();
	let quiet_now = quiet::is_quiet(now, resolved.config.quiet_hours.as_ref());

	let (volume, volume_error) = match volume::locate(&mount_root) {
		Ok(v) => (v, None),
		Err(e) => (None, Some(e.to_string())),
	};
	let refresh_secs = volume
		.as_deref()
		.map(|v| config::refresh_seconds(&resolved.config, v));

	let report = Report {
		settings: resolved.source,
		config: resolved.config,
		now,
		quiet_now,
		mount_root,
		volume,
		volume_error,
		refresh_secs,
	};

	if args.json {
		match serde_json::to_string_pretty(&report) {
			Ok(json) => println!("{}", json),
			Err(e) => {
				eprintln!("error: {}", e);
				return ExitCode::FAILURE;
			}
		}
	} else {
		render(&report);
	}

	if report.volume_error.is_some() {
		ExitCode::FAILURE
	} else {
		ExitCode::SUCCESS
	}
}

fn render(report: &Report) {
	let c = &report.config;

	println!("{}", "settings".cyan().bold());
	match &report.settings {
		Some(path) => println!("  {:<14} {}", "file", path.display()),
		None => println!("  {:<14} {}", "file", "(defaults)".dimmed()),
	}
	println!("  {:<14} {}", "picture mode", c.picture_mode);
	match c.refresh_interval_minutes {
		Some(m) => println!("  {:<14} {} min", "interval", m),
		None => println!("  {:<14} {}", "interval", "from volume".dimmed()),
	}
	println!("  {:<14} {}", "cloud folder", c.cloud_folder_name);
	println!();

	println!("{}", "quiet hours".cyan().bold());
	match &c.quiet_hours {
		Some(window) => {
			let state = if report.quiet_now {
				"active".yellow().to_string()
			} else {
				"inactive".green().to_string()
			};
			println!("  {:<14} {}", "window", window);
			println!("  {:<14} {} (now {})", "state", state, report.now);
		}
		None => println!("  {:<14} {}", "window", "none".dimmed()),
	}
	println!();

	println!("{}", "volume".cyan().bold());
	println!("  {:<14} {}", "mount root", report.mount_root.display());
	match (&report.volume, &report.volume_error) {
		(_, Some(err)) => println!("  {:<14} {}", "detected", err.red()),
		(Some(path), None) => println!("  {:<14} {}", "detected", path.display().green()),
		(None, None) => println!("  {:<14} {}", "detected", "none".dimmed()),
	}
	if let Some(secs) = report.refresh_secs {
		println!("  {:<14} {}s", "refresh", secs);
	}
}
