use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

/// Terminates every other process running the executable at `name`. Returns how many were
/// stopped.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("can't read own pid: {e}"))?;
    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping {name:?} with pid {pid}");
            // This will forcefully terminate the process on Windows.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            stopped += 1;
        }
    }
    Ok(stopped)
}

/// Stops a running daemon and starts a detached one, passing along the settings path.
pub fn restart_server(daemon: PathBuf, config: Option<&Path>) -> Result<()> {
    if !daemon.exists() {
        return Err(anyhow!("daemon executable {daemon:?} not found"));
    }
    kill_previous_servers(&daemon)?;
    let mut command = std::process::Command::new(&daemon);
    if let Some(config) = config {
        command.arg("--config").arg(config);
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        command.arg("--force");
        command.creation_flags(DETACHED_PROCESS);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    info!("Spawning {daemon:?}");
    #[allow(clippy::zombie_processes)]
    let _ = command.spawn()?;
    Ok(())
}
