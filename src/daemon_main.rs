// This runs daemon on windows without creating a console. Disable during development to see
// stdout.
#![windows_subsystem = "windows"]

use std::env::args;

use anyhow::Result;
use clap::Parser;
use daybook::{
    config::CONFIG_FILE_NAME,
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, DAEMON_PREFIX},
        runtime::single_thread_runtime,
    },
};

fn main() -> Result<()> {
    run_service(args().collect::<Vec<_>>())
}

fn run_service(command_args: Vec<String>) -> Result<()> {
    let args = DaemonArgs::parse_from(&command_args);

    #[cfg(unix)]
    if !args.force {
        use daemonize::Daemonize;

        // Relative paths stop making sense once the daemon changes its working directory.
        let args = absolute_paths(args)?;
        let daemonize = Daemonize::new()
            .stdout(daemonize::Stdio::devnull())
            .stderr(daemonize::Stdio::devnull())
            .execute();
        return match daemonize {
            daemonize::Outcome::Parent(parent) => {
                parent.map_err(|e| anyhow::anyhow!("Failed to create daemon: {e}"))?;
                println!("Created daemon");
                Ok(())
            }
            daemonize::Outcome::Child(child) => {
                child.map_err(|e| anyhow::anyhow!("Failed to become a daemon: {e}"))?;
                run(args)
            }
        };
    }

    run(args)
}

#[cfg(unix)]
fn absolute_paths(mut args: DaemonArgs) -> Result<DaemonArgs> {
    args.config = args.config.map(std::path::absolute).transpose()?;
    args.dir = args.dir.map(std::path::absolute).transpose()?;
    Ok(args)
}

fn run(args: DaemonArgs) -> Result<()> {
    let app_dir = args.dir.map_or_else(create_application_default_path, Ok)?;
    let _guard = enable_logging(DAEMON_PREFIX, &app_dir.join("logs"), args.log, args.log_console)?;
    let config = args
        .config
        .unwrap_or_else(|| app_dir.join(CONFIG_FILE_NAME));
    single_thread_runtime()?.block_on(async move { start_daemon(&config).await })?;
    Ok(())
}
