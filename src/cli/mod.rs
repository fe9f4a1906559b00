pub mod daemon_path;
pub mod date_arg;
pub mod process;
pub mod status;

use std::{
    env,
    io::IsTerminal,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use daemon_path::to_daemon_path;
use date_arg::{parse_day, DateArg, DateStyle};
use process::{kill_previous_servers, restart_server};
use tracing::{error, info, level_filters::LevelFilter};

use crate::{
    config::{Settings, CONFIG_FILE_NAME},
    context::JournalContext,
    daemon::start_daemon,
    journal::orchestrator::{inspect, RunOptions},
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "daybook", version, long_about = None)]
#[command(about = "Keeps today's journal note up to date", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Option<Commands>,
    #[arg(
        long,
        global = true,
        help = "Settings file. By default config.json in $XDG_STATE_HOME/daybook or $HOME/.local/state/daybook"
    )]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print log output to the console")]
    log: bool,
    #[arg(long = "log-filter", global = true, help = "Log level, overrides RUST_LOG")]
    log_filter: Option<LevelFilter>,
    #[arg(long, help = "Run daily at the configured time instead of once. Same as `serve`")]
    scheduled: bool,
}

#[derive(ClapArgs, Debug)]
struct RunCommand {
    #[command(flatten)]
    date: DateArg,
    #[arg(long, help = "Regenerate summaries that already exist")]
    refresh_summaries: bool,
    #[arg(long, help = "Skip the lifelog sync")]
    no_sync: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Create or update the daily note, then sync lifelogs. This is the default")]
    Run(RunCommand),
    #[command(about = "Show what a run would find for a day")]
    Status {
        #[command(flatten)]
        date: DateArg,
    },
    #[command(about = "Sync lifelogs since the last successful sync")]
    Sync {},
    #[command(about = "Fetch lifelogs week by week from a past date until today")]
    Backfill {
        #[arg(long, help = "First day to fetch, e.g. \"01/01/2025\" or \"3 weeks ago\"")]
        since: String,
        #[arg(long, default_value_t = DateStyle::Uk)]
        date_style: DateStyle,
    },
    #[command(
        about = "Run the scheduler directly in current console. Used by the daemon internally and for debugging"
    )]
    Serve {},
    #[command(about = "Starts a detached daemon that runs the daily pass on schedule")]
    Init {},
    #[command(about = "Stop currently running daemon.")]
    Stop {},
}

fn load_context(config_path: &Path) -> Result<JournalContext> {
    let settings = Settings::load(config_path)?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    Ok(JournalContext::from_settings(settings, clock)?)
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = create_application_default_path()?;
    let logging_level = args
        .log_filter
        .or_else(|| args.log.then_some(LevelFilter::TRACE));
    let _guard = enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;

    execute(args, &app_dir).await.inspect_err(|e| {
        error!("Error running cli {e:?}");
    })
}

async fn execute(args: Args, app_dir: &Path) -> Result<()> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| app_dir.join(CONFIG_FILE_NAME));
    let color = std::io::stdout().is_terminal();

    let command = match (args.scheduled, args.commands) {
        (true, _) => Commands::Serve {},
        (false, Some(command)) => command,
        (false, None) => Commands::Run(RunCommand {
            date: DateArg {
                date: None,
                date_style: DateStyle::Uk,
            },
            refresh_summaries: false,
            no_sync: false,
        }),
    };

    match command {
        Commands::Run(command) => {
            let ctx = load_context(&config_path)?;
            let now = ctx.clock.local_time(&ctx.zone);
            let date = command.date.resolve(now).map_err(|e| anyhow!(e))?;
            let options = RunOptions {
                refresh_summaries: command.refresh_summaries,
            };
            let pass = ctx.daily_pass(date, now, options, !command.no_sync).await?;
            println!("{}", status::format_run(&pass.note));
            if let Some(sync) = &pass.sync {
                println!("{}", status::format_sync(sync));
            }
            Ok(())
        }
        Commands::Status { date } => {
            let ctx = load_context(&config_path)?;
            let now = ctx.clock.local_time(&ctx.zone);
            let date = date.resolve(now).map_err(|e| anyhow!(e))?;
            let note = inspect(&ctx, date).await?;
            println!("{}", status::format_status(&note, color));
            Ok(())
        }
        Commands::Sync {} => {
            let ctx = load_context(&config_path)?;
            let lifelog = ctx
                .lifelog
                .as_ref()
                .ok_or_else(|| anyhow!("lifelog sync is disabled in {config_path:?}"))?;
            let report = lifelog.sync(ctx.clock.local_time(&ctx.zone)).await?;
            println!("{}", status::format_sync(&report));
            Ok(())
        }
        Commands::Backfill { since, date_style } => {
            let ctx = load_context(&config_path)?;
            let lifelog = ctx
                .lifelog
                .as_ref()
                .ok_or_else(|| anyhow!("lifelog sync is disabled in {config_path:?}"))?;
            let now = ctx.clock.local_time(&ctx.zone);
            let since = parse_day(&since, now, date_style).map_err(|e| anyhow!(e))?;
            let report = lifelog.backfill(since, now).await?;
            println!("{}", status::format_backfill(&report));
            Ok(())
        }
        Commands::Serve {} => start_daemon(&config_path).await,
        Commands::Init {} => {
            restart_server(to_daemon_path(env::current_exe()?), args.config.as_deref())?;
            println!("Daemon started");
            Ok(())
        }
        Commands::Stop {} => {
            let stopped = kill_previous_servers(&to_daemon_path(env::current_exe()?))?;
            info!("Stopped {stopped} daemons");
            println!("Stopped {stopped} daemon processes");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Args, Commands};

    #[test]
    fn arguments_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn no_command_and_global_flags() {
        let args = Args::try_parse_from(["daybook", "--config", "/tmp/c.json"]).unwrap();
        assert!(args.commands.is_none());
        assert_eq!(args.config.as_deref(), Some(std::path::Path::new("/tmp/c.json")));

        let args = Args::try_parse_from([
            "daybook",
            "run",
            "--date",
            "yesterday",
            "--no-sync",
            "--log",
        ])
        .unwrap();
        assert!(args.log);
        match args.commands {
            Some(Commands::Run(run)) => {
                assert_eq!(run.date.date.as_deref(), Some("yesterday"));
                assert!(run.no_sync);
                assert!(!run.refresh_summaries);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn backfill_requires_since() {
        assert!(Args::try_parse_from(["daybook", "backfill"]).is_err());
        assert!(Args::try_parse_from(["daybook", "backfill", "--since", "01/01/2025"]).is_ok());
    }
}
