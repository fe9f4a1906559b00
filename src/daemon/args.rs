use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "daybook-daemon", version, about = "Runs the daily journal pass on a schedule")]
pub struct DaemonArgs {
    /// Stay attached instead of detaching from the terminal.
    #[arg(long)]
    pub force: bool,
    /// Application directory for logs. By default $XDG_STATE_HOME/daybook or
    /// $HOME/.local/state/daybook.
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Settings file. Defaults to config.json inside the application directory.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}
