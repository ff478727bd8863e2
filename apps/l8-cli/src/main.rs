//! # l8-cli
//!
//! Command-line interface for the Liber8 command gateway.
//!
//! - `l8 classify <COMMAND>` — show how a command would be classified
//! - `l8 exec <COMMAND> [--approve TOKEN]` — run a command through the gateway
//! - `l8 audit verify/tail` — inspect the tamper-evident audit trail

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::Context;

/// Liber8 — classify, approve and run agent shell commands.
#[derive(Parser)]
#[command(name = "l8", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Gateway config file (defaults to <project-root>/.liber8/exec.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a command without running it.
    Classify {
        /// The shell command, quoted as one argument.
        command: String,
        /// Approval token to evaluate alongside the command.
        #[arg(long)]
        approve: Option<String>,
        /// Print the full decision as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run a command through the gateway.
    Exec(commands::exec::ExecArgs),
    /// Inspect the audit trail.
    Audit {
        #[command(subcommand)]
        command: commands::audit::AuditCommands,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for command output and --json.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("l8_exec=warn".parse()?)
                .add_directive("l8=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let ctx = Context::new(project_root, cli.config);

    let code = match &cli.command {
        Commands::Classify {
            command,
            approve,
            json,
        } => commands::classify::execute(&ctx, command, approve.as_deref(), *json)?,
        Commands::Exec(args) => commands::exec::execute(&ctx, args)?,
        Commands::Audit { command } => commands::audit::execute(command, &ctx)?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
