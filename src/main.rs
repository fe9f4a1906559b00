use anyhow::Result;
use daybook::cli::run_cli;

#[tokio::main]
async fn main() -> Result<()> {
    run_cli().await
}
