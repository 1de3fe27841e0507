#![forbid(unsafe_code)]

mod cmd;
mod output;
mod wallet;

use clap::{CommandFactory, Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use wishwall_core::config;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "wish: a shared wall of wishes",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Use this wallet identity for one command (skips the session file).
    #[arg(long, global = true)]
    identity: Option<String>,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Get the identity flag as an `Option<&str>` for resolution.
    fn identity_flag(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a wish wall",
        long_about = "Create .wishwall/ with a config.toml in the current directory.",
        after_help = "EXAMPLES:\n    # Wall that requires a connected wallet\n    wish init\n\n    # Wall that anyone can post to\n    wish init --policy open"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Wallet",
        about = "Connect a wallet",
        long_about = "Record a wallet identity in the session file so submissions are attributed to it.",
        after_help = "EXAMPLES:\n    wish connect 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU"
    )]
    Connect(cmd::wallet::ConnectArgs),

    #[command(
        next_help_heading = "Wallet",
        about = "Disconnect the wallet",
        long_about = "Remove the session file. Later submissions on a gated wall are rejected."
    )]
    Disconnect,

    #[command(
        next_help_heading = "Wallet",
        about = "Show the current identity",
        long_about = "Show the wall policy, connection state, and the identity shown on new wishes."
    )]
    Whoami,

    #[command(
        next_help_heading = "Wishes",
        about = "Submit a wish",
        long_about = "Submit a wish. Words are joined with single spaces and surrounding whitespace is trimmed.",
        after_help = "EXAMPLES:\n    wish submit I wish for rain\n\n    # Emit machine-readable output\n    wish submit \"I wish for rain\" --json"
    )]
    Submit(cmd::submit::SubmitArgs),

    #[command(
        next_help_heading = "Wishes",
        about = "List wishes",
        long_about = "List all wishes on the wall, oldest first.",
        after_help = "EXAMPLES:\n    wish list\n\n    # Tab-separated rows for scripts\n    wish list --format text"
    )]
    List,

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        long_about = "Print a completion script for the given shell to stdout.",
        after_help = "EXAMPLES:\n    wish completions bash > ~/.local/share/bash-completion/completions/wish"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

/// Fallback filter when `WISHWALL_LOG` is unset.
fn default_filter(verbose: bool, quiet: bool) -> &'static str {
    if verbose || env::var("DEBUG").is_ok() {
        "wishwall=debug,info"
    } else if quiet {
        "error"
    } else {
        "wishwall=info,warn"
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("WISHWALL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, quiet)));

    let format = env::var("WISHWALL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let effective = config::resolve_config(&project_root, cli.json)?;
    let output = resolve_output_mode(cli.format, &effective.resolved_output);
    let wall = &effective.wall;

    match cli.command {
        Commands::Init(ref args) => cmd::init::run_init(args, output, &project_root),
        Commands::Connect(ref args) => {
            cmd::wallet::run_connect(args, wall, output, &project_root)
        }
        Commands::Disconnect => cmd::wallet::run_disconnect(output, &project_root),
        Commands::Whoami => {
            cmd::wallet::run_whoami(wall, cli.identity_flag(), output, &project_root)
        }
        Commands::Submit(ref args) => {
            cmd::submit::run_submit(args, wall, cli.identity_flag(), output, &project_root)
        }
        Commands::List => cmd::list::run_list(wall, output, &project_root),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["wish", "list", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn format_flag_parses() {
        let cli = Cli::parse_from(["wish", "--format", "text", "list"]);
        assert_eq!(cli.format, Some(OutputMode::Text));

        let cli = Cli::parse_from(["wish", "list"]);
        assert_eq!(cli.format, None);
    }

    #[test]
    fn identity_flag_is_global() {
        let cli = Cli::parse_from(["wish", "submit", "--identity", "me", "rain"]);
        assert_eq!(cli.identity_flag(), Some("me"));
        let Commands::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.joined(), "rain");

        let cli = Cli::parse_from(["wish", "--identity", "me", "whoami"]);
        assert_eq!(cli.identity_flag(), Some("me"));
    }

    #[test]
    fn submit_joins_trailing_words() {
        let cli = Cli::parse_from(["wish", "submit", "I", "wish", "for", "rain"]);
        let Commands::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.joined(), "I wish for rain");
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["wish", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Bash,
            })
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["wish", "init"],
            vec!["wish", "init", "--policy", "open", "--force"],
            vec!["wish", "connect", "key"],
            vec!["wish", "disconnect"],
            vec!["wish", "whoami"],
            vec!["wish", "submit", "rain"],
            vec!["wish", "submit"],
            vec!["wish", "list"],
            vec!["wish", "completions", "zsh"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(
                result.is_ok(),
                "Failed to parse: {:?} error: {:?}",
                args,
                result.err()
            );
        }
    }

    #[test]
    fn quiet_and_verbose_pick_filters() {
        assert_eq!(default_filter(false, true), "error");
        assert_eq!(default_filter(true, true), "wishwall=debug,info");
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(Cli::try_parse_from(["wish", "init", "--policy", "closed"]).is_err());
    }
}
