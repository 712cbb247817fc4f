use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use epframe_core::quiet::{Clock, QuietWindow, TimeOfDay};
use epframe_core::Configuration;
use epframe_supervisor::supervisor::{StartReason, StopReason, Transition};
use epframe_supervisor::{Launcher, PollingDriver, ProcessLauncher, Supervisor, WorkerSpec};

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

fn temp_dir(name: &str) -> PathBuf {
	let n = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
	let dir = std::env::temp_dir().join(format!("epframe-test-{}-{}-{}", std::process::id(), n, name));
	let _ = std::fs::remove_dir_all(&dir);
	let _ = std::fs::create_dir_all(&dir);
	dir
}

#[derive(Clone)]
struct ManualClock(Rc<Cell<TimeOfDay>>);

impl ManualClock {
	fn at(h: u8, m: u8) -> Self {
		Self(Rc::new(Cell::new(TimeOfDay::new(h, m).unwrap())))
	}

	fn set(&self, h: u8, m: u8) {
		self.0.set(TimeOfDay::new(h, m).unwrap());
	}
}

impl Clock for ManualClock {
	fn now(&self) -> TimeOfDay {
		self.0.get()
	}
}

/// A shell worker that records its arguments, then sleeps in the foreground.
fn recording_worker(marker: &Path) -> WorkerSpec {
	let script = format!("echo \"$0 $1\" >> '{}'; exec sleep 60", marker.display());
	WorkerSpec::new("/bin/sh").arg("-c").arg(script)
}

async fn wait_for_lines(path: &Path, n: usize) -> Vec<String> {
	for _ in 0..100 {
		if let Ok(content) = std::fs::read_to_string(path) {
			let lines: Vec<String> = content.lines().map(String::from).collect();
			if lines.len() >= n {
				return lines;
			}
		}
		tokio::time::sleep(Duration::from_millis(20)).await;
	}
	panic!("worker never wrote {} line(s) to {}", n, path.display());
}

fn driver(
	config: Configuration,
	worker: WorkerSpec,
	clock: ManualClock,
	mount_root: &Path,
) -> PollingDriver<ProcessLauncher, ManualClock> {
	let supervisor = Supervisor::new(ProcessLauncher::default(), worker, config);
	PollingDriver::new(supervisor, clock, mount_root.to_path_buf(), Duration::from_millis(50))
}

// --- Driver against real processes ---

#[tokio::test]
async fn insert_remove_reinsert_lifecycle() {
	let dir = temp_dir("lifecycle");
	let mount_root = dir.join("media");
	let marker = dir.join("starts.log");
	std::fs::create_dir_all(&mount_root).unwrap();

	let config = Configuration {
		refresh_interval_minutes: Some(2),
		..Configuration::default()
	};
	let mut driver = driver(config, recording_worker(&marker), ManualClock::at(12, 0), &mount_root);

	assert_eq!(driver.poll_once().await, Some(Transition::Unchanged));
	assert!(driver.supervisor().state().worker().is_none());

	let card = mount_root.join("CARD");
	std::fs::create_dir(&card).unwrap();
	assert_eq!(
		driver.poll_once().await,
		Some(Transition::Started {
			reason: StartReason::FirstInsert,
			refresh_secs: 120
		})
	);
	let lines = wait_for_lines(&marker, 1).await;
	assert_eq!(lines[0], format!("{} 120", card.display()));
	assert_eq!(driver.poll_once().await, Some(Transition::Unchanged));
	assert!(driver.supervisor_mut().worker_alive());

	std::fs::remove_dir(&card).unwrap();
	assert_eq!(
		driver.poll_once().await,
		Some(Transition::Stopped {
			reason: StopReason::VolumeRemoved
		})
	);
	assert!(driver.supervisor().state().worker().is_none());

	let other = mount_root.join("OTHER");
	std::fs::create_dir(&other).unwrap();
	assert!(matches!(
		driver.poll_once().await,
		Some(Transition::Started {
			reason: StartReason::Reinserted,
			..
		})
	));
	let lines = wait_for_lines(&marker, 2).await;
	assert_eq!(lines[1], format!("{} 120", other.display()));

	let mut sup = driver.into_supervisor();
	assert_eq!(
		sup.shutdown().await,
		Transition::Stopped {
			reason: StopReason::Shutdown
		}
	);
	let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn quiet_hours_suspend_and_resume_worker() {
	let dir = temp_dir("quiet");
	let mount_root = dir.join("media");
	let marker = dir.join("starts.log");
	std::fs::create_dir_all(mount_root.join("CARD")).unwrap();

	let config = Configuration {
		quiet_hours: Some(QuietWindow::new(
			TimeOfDay::new(22, 0).unwrap(),
			TimeOfDay::new(7, 0).unwrap(),
		)),
		..Configuration::default()
	};
	let clock = ManualClock::at(21, 59);
	let mut driver = driver(config, recording_worker(&marker), clock.clone(), &mount_root);

	assert!(matches!(driver.poll_once().await, Some(Transition::Started { .. })));
	wait_for_lines(&marker, 1).await;

	clock.set(22, 0);
	assert_eq!(
		driver.poll_once().await,
		Some(Transition::Stopped {
			reason: StopReason::QuietHours
		})
	);
	clock.set(3, 30);
	assert_eq!(driver.poll_once().await, Some(Transition::Unchanged));
	assert!(!driver.supervisor_mut().worker_alive());

	clock.set(7, 0);
	assert!(matches!(
		driver.poll_once().await,
		Some(Transition::Started {
			reason: StartReason::QuietEnded,
			..
		})
	));
	assert_eq!(wait_for_lines(&marker, 2).await.len(), 2);

	driver.into_supervisor().shutdown().await;
	let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn exited_worker_is_restarted_on_next_tick() {
	let dir = temp_dir("exited");
	let mount_root = dir.join("media");
	std::fs::create_dir_all(mount_root.join("CARD")).unwrap();

	let worker = WorkerSpec::new("/bin/sh").arg("-c").arg("exit 0");
	let mut driver = driver(Configuration::default(), worker, ManualClock::at(9, 0), &mount_root);

	assert!(matches!(driver.poll_once().await, Some(Transition::Started { .. })));
	for _ in 0..100 {
		if !driver.supervisor_mut().worker_alive() {
			break;
		}
		tokio::time::sleep(Duration::from_millis(20)).await;
	}
	assert!(matches!(
		driver.poll_once().await,
		Some(Transition::Started {
			reason: StartReason::WorkerExited,
			..
		})
	));
	driver.into_supervisor().shutdown().await;
	let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn missing_worker_binary_keeps_polling() {
	let dir = temp_dir("missing-worker");
	let mount_root = dir.join("media");
	std::fs::create_dir_all(mount_root.join("CARD")).unwrap();

	let worker = WorkerSpec::new(dir.join("no-such-worker").into_os_string());
	let mut driver = driver(Configuration::default(), worker, ManualClock::at(9, 0), &mount_root);

	for _ in 0..3 {
		assert_eq!(
			driver.poll_once().await,
			Some(Transition::SpawnFailed {
				reason: StartReason::FirstInsert
			})
		);
	}
	let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn unreadable_mount_root_skips_tick() {
	let dir = temp_dir("bad-root");
	let mount_root = dir.join("media");
	std::fs::write(&mount_root, "not a directory").unwrap();

	let worker = WorkerSpec::new("/bin/true");
	let mut driver = driver(Configuration::default(), worker, ManualClock::at(9, 0), &mount_root);
	assert_eq!(driver.poll_once().await, None);
	let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn run_stops_worker_on_shutdown() {
	let dir = temp_dir("run");
	let mount_root = dir.join("media");
	let marker = dir.join("starts.log");
	std::fs::create_dir_all(mount_root.join("CARD")).unwrap();

	let driver = driver(
		Configuration::default(),
		recording_worker(&marker),
		ManualClock::at(10, 0),
		&mount_root,
	);
	let shutdown = {
		let marker = marker.clone();
		async move {
			wait_for_lines(&marker, 1).await;
			tokio::time::sleep(Duration::from_millis(150)).await;
		}
	};
	let mut sup = driver.run(shutdown).await;
	assert!(sup.state().worker().is_none());
	assert!(!sup.worker_alive());
	// no restarts while the single worker stayed up
	assert_eq!(std::fs::read_to_string(&marker).unwrap().lines().count(), 1);
	let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn shutdown_signal_is_armed_before_first_poll() {
	let shutdown = epframe_supervisor::driver::shutdown_signal();
	nix::sys::signal::kill(nix::unistd::Pid::this(), nix::sys::signal::Signal::SIGTERM).unwrap();
	let fired = tokio::time::timeout(Duration::from_secs(5), shutdown).await;
	assert!(fired.is_ok());
}

// --- Launcher ---

#[tokio::test]
async fn launcher_stop_waits_for_exit() {
	let mut launcher = ProcessLauncher::default();
	let spec = WorkerSpec::new("/bin/sh").arg("-c").arg("exec sleep 60");
	let mut handle = launcher.spawn(&spec.command(Path::new("/tmp"), 1)).unwrap();
	assert!(launcher.is_alive(&mut handle));
	let pid = handle.pid();
	launcher.stop(handle).await.unwrap();
	// the process group is gone once stop returns
	let gone = nix::sys::signal::killpg(nix::unistd::Pid::from_raw(pid as i32), None);
	assert_eq!(gone, Err(nix::errno::Errno::ESRCH));
}
