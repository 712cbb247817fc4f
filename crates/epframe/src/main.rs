mod check;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use epframe_core::{config, paths, LocalClock, Resolved};
use epframe_supervisor::{driver, PollingDriver, ProcessLauncher, StopPolicy, Supervisor, WorkerSpec};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
	name = "epaper-frame",
	version,
	about = "Run the picture-frame worker while a memory card is mounted",
	args_conflicts_with_subcommands = true
)]
struct Cli {
	#[command(subcommand)]
	command: Option<Command>,

	#[command(flatten)]
	run: RunArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Watch for volumes and supervise the worker (default)
	Run(RunArgs),
	/// Show resolved settings, quiet-hours state and the detected volume
	Check(CheckArgs),
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
	/// Directory whose subdirectories are mounted volumes [default: /media/$USER]
	#[arg(long, env = "EPFRAME_MOUNT_ROOT", value_name = "DIR")]
	mount_root: Option<PathBuf>,

	/// Settings file to try before the standard locations
	#[arg(long, env = "EPFRAME_SETTINGS", value_name = "FILE")]
	settings: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
	#[command(flatten)]
	common: CommonArgs,

	/// Worker executable, invoked as `<worker> [args] <volume> <refresh_secs>`
	#[arg(long, env = "EPFRAME_WORKER", value_name = "PROGRAM", default_value = "frame-manager")]
	worker: String,

	/// Extra argument placed before the volume path (repeatable)
	#[arg(long = "worker-arg", value_name = "ARG", allow_hyphen_values = true)]
	worker_args: Vec<String>,

	/// Seconds between polls of the mount root
	#[arg(
		long,
		value_name = "SECS",
		default_value_t = driver::DEFAULT_POLL_INTERVAL.as_secs(),
		value_parser = clap::value_parser!(u64).range(1..)
	)]
	poll_interval: u64,

	/// SIGKILL a worker still running this many seconds after SIGTERM [default: wait forever]
	#[arg(long, value_name = "SECS")]
	stop_timeout: Option<u64>,
}

#[derive(Debug, Clone, Args)]
struct CheckArgs {
	#[command(flatten)]
	common: CommonArgs,

	/// Print the report as JSON
	#[arg(long)]
	json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let cli = Cli::parse();
	init_tracing();

	match cli.command {
		Some(Command::Check(args)) => check::cmd_check(&args),
		Some(Command::Run(args)) => cmd_run(args).await,
		None => cmd_run(cli.run).await,
	}
}

fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.with_writer(std::io::stderr)
		.init();
}

pub(crate) fn resolve_settings(explicit: Option<&Path>) -> Resolved {
	let mut candidates = Vec::new();
	if let Some(path) = explicit {
		if !path.exists() {
			tracing::warn!("settings file {} does not exist", path.display());
		}
		candidates.push(path.to_path_buf());
	}
	candidates.extend(paths::settings_candidates());
	config::resolve_from(&candidates)
}

pub(crate) fn mount_root(common: &CommonArgs) -> PathBuf {
	common.mount_root.clone().unwrap_or_else(paths::default_mount_root)
}

async fn cmd_run(args: RunArgs) -> ExitCode {
	tracing::info!("epaper-frame {} started (pid {})", env!("CARGO_PKG_VERSION"), std::process::id());

	let resolved = resolve_settings(args.common.settings.as_deref());
	let mount_root = mount_root(&args.common);

	let policy = match args.stop_timeout {
		Some(secs) => StopPolicy::Escalate {
			grace: Duration::from_secs(secs),
		},
		None => StopPolicy::Graceful,
	};
	let worker = args
		.worker_args
		.iter()
		.fold(WorkerSpec::new(&args.worker), |spec, arg| spec.arg(arg));

	let supervisor = Supervisor::new(ProcessLauncher::new(policy), worker, resolved.config);
	let poller = PollingDriver::new(
		supervisor,
		LocalClock,
		mount_root,
		Duration::from_secs(args.poll_interval),
	);
	poller.run(driver::shutdown_signal()).await;
	ExitCode::SUCCESS
}
