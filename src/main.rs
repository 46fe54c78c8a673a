mod cli;

use github_issues_mcp::{server, Config, IssueQueryHandler};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::build_cli();
    let matches = cmd.get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("github-issues-mcp {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let cfg = Config::from_env()?;
    let handler = IssueQueryHandler::new(cfg)?;
    server::run_stdio_server(handler).await?;
    Ok(())
}
