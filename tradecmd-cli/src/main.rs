//! TradeCommander CLI - Command-driven client for the SpaceTraders API
//!
//! Commands:
//! - shell: Interactive prompt (default)
//! - exec: Run command lines once and exit

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tradecmd_cli::{configure, App, ClientConfig, ConnectionArgs};

#[derive(Parser)]
#[command(name = "tradecmd")]
#[command(about = "Command-driven client for the SpaceTraders trading game")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read commands interactively
    Shell,
    /// Run each argument as a command line, failing if any command fails
    Exec {
        #[arg(required = true)]
        lines: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = configure(&cli.connection)?;
    let command = cli.command.unwrap_or(Commands::Shell);

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let succeeded = runtime.block_on(run(command, config, cli.connection.token))?;

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// Logs go to stderr so they never interleave with console output
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands, config: ClientConfig, token: Option<String>) -> Result<bool> {
    let (mut app, mut output) = App::build(&config)?;
    let mut stdout = std::io::stdout();

    let succeeded = match command {
        Commands::Shell => {
            app.start_background(&config);
            app.restore_session(token).await;

            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            tradecmd_cli::shell::run_shell(&app, output, stdin, &mut stdout).await?;
            true
        }
        Commands::Exec { lines } => {
            if app.restore_session(token).await {
                app.sync().await;
            }
            tradecmd_cli::shell::run_lines(&app, &mut output, &lines, &mut stdout).await?
        }
    };

    app.shutdown();
    Ok(succeeded)
}
