//! Launcher writing each instance's output to its own log file

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::config::FleetConfig;
use crate::descriptor::{BenchmarkKind, InstanceDescriptor};
use crate::error::LaunchError;
use crate::launcher::{BatchStamp, CommandLine, ProcessHandle, ProcessLauncher};

/// Executables of the external benchmarks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkBinaries {
    /// Transfer-engine benchmark
    pub transfer_engine: String,
    /// Write-bandwidth benchmark
    pub write_bw: String,
}

impl BenchmarkBinaries {
    /// Binaries named in the config
    pub fn from_config(config: &FleetConfig) -> Self {
        Self {
            transfer_engine: config.transfer_engine.binary.clone(),
            write_bw: config.write_bw.binary.clone(),
        }
    }

    /// Executable for a benchmark kind
    pub fn program(&self, kind: BenchmarkKind) -> &str {
        match kind {
            BenchmarkKind::TransferEngine => &self.transfer_engine,
            BenchmarkKind::WriteBandwidth => &self.write_bw,
        }
    }
}

/// Launches benchmarks detached into their own process group, logging to
/// `<results_dir>/<benchmark>_<stamp>_slot<NN>_<discriminator>.log`
#[derive(Debug, Clone)]
pub struct LogFileLauncher {
    binaries: BenchmarkBinaries,
    results_dir: PathBuf,
}

impl LogFileLauncher {
    /// Create a launcher
    pub fn new(binaries: BenchmarkBinaries, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            binaries,
            results_dir: results_dir.into(),
        }
    }

    /// Launcher for the binaries and results directory in the config
    pub fn from_config(config: &FleetConfig) -> Self {
        Self::new(
            BenchmarkBinaries::from_config(config),
            config.output.results_dir.clone(),
        )
    }

    /// Directory receiving the logs
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Replace the binaries
    pub fn with_binaries(mut self, binaries: BenchmarkBinaries) -> Self {
        self.binaries = binaries;
        self
    }
}

/// Create the log file and write the command header
///
/// An existing log is never truncated.
fn open_log(path: &Path, command: &CommandLine) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "Command: {command}")?;
    writeln!(file)?;
    file.flush()?;
    Ok(file)
}

impl ProcessLauncher for LogFileLauncher {
    fn name(&self) -> &str {
        "log-file"
    }

    fn command(&self, descriptor: &InstanceDescriptor) -> CommandLine {
        CommandLine::new(self.binaries.program(descriptor.kind()), descriptor.args())
    }

    fn log_path(
        &self,
        slot: usize,
        descriptor: &InstanceDescriptor,
        stamp: &BatchStamp,
    ) -> PathBuf {
        self.results_dir.join(format!(
            "{}_{}_slot{:02}_{}.log",
            descriptor.kind().log_prefix(),
            stamp,
            slot,
            descriptor.discriminator()
        ))
    }

    fn launch(
        &self,
        slot: usize,
        descriptor: InstanceDescriptor,
        stamp: &BatchStamp,
    ) -> Result<ProcessHandle, LaunchError> {
        let command = self.command(&descriptor);
        let log_path = self.log_path(slot, &descriptor, stamp);

        let log_error = |source| LaunchError::LogFile {
            slot,
            path: log_path.clone(),
            source,
        };
        let stdout = open_log(&log_path, &command).map_err(log_error)?;
        let stderr = stdout.try_clone().map_err(log_error)?;

        let spawn_error = |source| LaunchError::Spawn {
            slot,
            program: command.program.clone(),
            device: descriptor.device_name().to_string(),
            source,
        };
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .process_group(0)
            .spawn()
            .map_err(spawn_error)?;

        // Only `None` once the child has been reaped, which cannot have
        // happened yet.
        let pid = child.id().ok_or_else(|| {
            spawn_error(io::Error::other(
                "process exited before its pid was recorded",
            ))
        })?;

        tracing::info!(
            slot,
            pid,
            device = descriptor.device_name(),
            log_path = %log_path.display(),
            "Started benchmark instance"
        );
        tracing::debug!(slot, command = %command, "Benchmark command line");

        Ok(ProcessHandle::new(
            slot, pid, child, descriptor, command, log_path,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::WriteBwDescriptor;
    use crate::test_support::{own_process_group, process_group, write_script};

    fn launcher(dir: &Path, program: &Path) -> LogFileLauncher {
        LogFileLauncher::new(
            BenchmarkBinaries {
                transfer_engine: program.display().to_string(),
                write_bw: program.display().to_string(),
            },
            dir.join("results"),
        )
    }

    #[test]
    fn test_binaries_by_kind() {
        let binaries = BenchmarkBinaries::from_config(&FleetConfig::default());
        assert_eq!(
            binaries.program(BenchmarkKind::TransferEngine),
            "transfer_engine_bench"
        );
        assert_eq!(binaries.program(BenchmarkKind::WriteBandwidth), "ib_write_bw");
    }

    #[test]
    fn test_log_path_layout() {
        let launcher = LogFileLauncher::from_config(&FleetConfig::default());
        let descriptor: InstanceDescriptor = WriteBwDescriptor::for_device("mlx5_4", 6671).into();
        let path = launcher.log_path(3, &descriptor, &BatchStamp::fixed("20250101_120000"));
        assert_eq!(
            path,
            PathBuf::from("results/ib_write_bw_20250101_120000_slot03_mlx5_4.log")
        );
    }

    #[tokio::test]
    async fn test_launch_writes_command_then_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "echo_bench", "echo \"args: $*\"\necho oops >&2\n");
        let launcher = launcher(dir.path(), &script);

        let descriptor: InstanceDescriptor = WriteBwDescriptor::for_device("mlx5_0", 6667).into();
        let mut handle = launcher
            .launch(0, descriptor, &BatchStamp::fixed("stamp"))
            .expect("launch failed");

        let status = handle.wait().await.unwrap();
        assert!(status.success());

        let log = std::fs::read_to_string(handle.log_path()).unwrap();
        let mut lines = log.lines();
        assert_eq!(
            lines.next().unwrap(),
            format!("Command: {}", handle.command())
        );
        assert!(log.contains("args: -d mlx5_0 -p 6667"));
        assert!(log.contains("oops"));
    }

    #[tokio::test]
    async fn test_launch_runs_in_own_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "sleeper", "exec sleep 30\n");
        let launcher = launcher(dir.path(), &script);

        let descriptor: InstanceDescriptor = WriteBwDescriptor::for_device("mlx5_0", 6667).into();
        let mut handle = launcher
            .launch(0, descriptor, &BatchStamp::fixed("stamp"))
            .unwrap();

        let pgid = process_group(handle.pid());
        assert_eq!(pgid, handle.pid() as libc::pid_t);
        assert_ne!(pgid, own_process_group());

        handle.start_kill().unwrap();
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_launch_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(dir.path(), &dir.path().join("no_such_bench"));

        let descriptor: InstanceDescriptor = WriteBwDescriptor::for_device("mlx5_1", 6668).into();
        let err = launcher
            .launch(4, descriptor, &BatchStamp::fixed("stamp"))
            .unwrap_err();

        assert_eq!(err.slot(), 4);
        match err {
            LaunchError::Spawn { source, device, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
                assert_eq!(device, "mlx5_1");
            }
            other => panic!("expected spawn error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_launch_keeps_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(dir.path(), Path::new("/bin/true"));
        let descriptor: InstanceDescriptor = WriteBwDescriptor::for_device("mlx5_2", 6669).into();
        let stamp = BatchStamp::fixed("stamp");

        let path = launcher.log_path(0, &descriptor, &stamp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "earlier run\n").unwrap();

        let err = launcher.launch(0, descriptor, &stamp).unwrap_err();
        match err {
            LaunchError::LogFile { slot, source, .. } => {
                assert_eq!(slot, 0);
                assert_eq!(source.kind(), io::ErrorKind::AlreadyExists);
            }
            other => panic!("expected log file error, got {other:?}"),
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "earlier run\n");
    }

    #[tokio::test]
    async fn test_launch_unwritable_results_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("results");
        std::fs::write(&blocker, "not a directory").unwrap();
        let launcher = launcher(dir.path(), Path::new("/bin/true"));

        let descriptor: InstanceDescriptor = WriteBwDescriptor::for_device("mlx5_1", 6668).into();
        let err = launcher
            .launch(0, descriptor, &BatchStamp::fixed("stamp"))
            .unwrap_err();
        assert!(matches!(err, LaunchError::LogFile { slot: 0, .. }));
    }
}
