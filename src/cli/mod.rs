//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `read` -- run one prompt-and-collect read against a simulated call
//! - `config show|path` -- inspect configuration
//! - `version` -- print build/version info

use clap::{Args, Parser, Subcommand};

/// Interactive voice response read tool.
#[derive(Parser, Debug)]
#[command(
    name = "ivr",
    version = env!("CARGO_PKG_VERSION"),
    about = "Play prompts to a caller and collect DTMF digits"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one read against a simulated call.
    Read(ReadArgs),

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Prompt to play; repeat for several prompts, played in order.
    #[arg(short, long = "prompt", required = true)]
    pub prompts: Vec<String>,

    /// Number of digits to collect (0 plays the prompts only).
    #[arg(short, long, default_value_t = 0)]
    pub digits: usize,

    /// Attempts before giving up (default: from config).
    #[arg(short, long)]
    pub attempts: Option<u32>,

    /// Inactivity timeout in seconds (default: from config).
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Accepted responses; any response is accepted when none are given.
    #[arg(long = "accept")]
    pub accept: Vec<String>,

    /// Scripted caller response, `<prompt>=<digits>`, pressed after the prompt plays.
    /// Without scripts, digits are read from stdin.
    #[arg(long = "script", value_parser = parse_script)]
    pub scripts: Vec<(String, String)>,

    /// Log read diagnostics at info level.
    #[arg(long)]
    pub debug: bool,

    /// Print the read report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration as JSON.
    Show,

    /// Print the resolved configuration file path.
    Path,
}

fn parse_script(raw: &str) -> Result<(String, String), String> {
    let (prompt, digits) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <prompt>=<digits>, got '{}'", raw))?;
    if prompt.is_empty() {
        return Err("script prompt must not be empty".to_string());
    }
    Ok((prompt.to_string(), digits.to_string()))
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

use crate::config::{self, IvrConfig};
use crate::voice::{ReadOptions, ReadStatus, Reader, SimulatedChannel};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Build read options from CLI arguments.
pub fn read_options(args: &ReadArgs) -> ReadOptions {
    let mut options = ReadOptions::new(args.prompts.iter().cloned())
        .digits(args.digits)
        .debug(args.debug);
    if let Some(attempts) = args.attempts {
        options = options.attempts(attempts);
    }
    if let Some(timeout) = args.timeout {
        options = options.timeout(Duration::from_secs(timeout));
    }
    if !args.accept.is_empty() {
        let accepted: HashSet<String> = args.accept.iter().cloned().collect();
        options = options.validator(move |digits| accepted.contains(digits));
    }
    options
}

/// Forward stdin lines to the call as key presses; a `hangup` line ends the call.
async fn forward_stdin(channel: SimulatedChannel) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.eq_ignore_ascii_case("hangup") {
                    channel.end_call();
                    return;
                }
                channel.press_all(line);
            }
            Ok(None) => return,
            Err(e) => {
                debug!(error = %e, "stdin closed");
                return;
            }
        }
    }
}

/// Run the `read` subcommand.
pub async fn handle_read(
    cfg: &IvrConfig,
    args: &ReadArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let channel = SimulatedChannel::new(cfg.simulator.clone());
    for (prompt, digits) in &args.scripts {
        channel.script(prompt, digits);
    }

    let stdin_task = (args.scripts.is_empty() && args.digits > 0)
        .then(|| tokio::spawn(forward_stdin(channel.clone())));

    let reader = Reader::new(Arc::new(channel.clone()), cfg.reader.clone());
    let (result, report) = reader.read_with_report(read_options(args)).await;

    if let Some(task) = stdin_task {
        task.abort();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for prompt in &report.prompts_played {
            println!("played   {}", prompt);
        }
        match report.status {
            ReadStatus::Accepted => {
                println!("digits   {}", report.digits.as_deref().unwrap_or_default())
            }
            ReadStatus::Completed => println!("done"),
            _ => {}
        }
    }

    if let Err(e) = result {
        eprintln!("read failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Run the `config show` subcommand.
pub fn handle_config_show(cfg: &IvrConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pretty = serde_json::to_string_pretty(cfg)?;
    println!("{}", pretty);
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path() {
    println!("{}", config::config_path().display());
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("ivr {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("IVR_BUILD_DATE"));
    println!("  Git commit: {}", env!("IVR_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_no_args_defaults_to_none() {
        let cli = Cli::try_parse_from(["ivr"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_version_subcommand() {
        let cli = Cli::try_parse_from(["ivr", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
    }

    #[test]
    fn test_cli_config_show() {
        let cli = Cli::try_parse_from(["ivr", "config", "show"]).unwrap();
        match cli.command {
            Some(Command::Config(ConfigCommand::Show)) => {}
            other => panic!("Expected Config(Show), got {:?}", other),
        }
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::try_parse_from(["ivr", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand::Path))
        ));
    }

    #[test]
    fn test_cli_read_requires_prompt() {
        assert!(Cli::try_parse_from(["ivr", "read"]).is_err());
    }

    #[test]
    fn test_cli_read_defaults() {
        let cli = Cli::try_parse_from(["ivr", "read", "--prompt", "welcome"]).unwrap();
        match cli.command {
            Some(Command::Read(args)) => {
                assert_eq!(args.prompts, vec!["welcome"]);
                assert_eq!(args.digits, 0);
                assert_eq!(args.attempts, None);
                assert_eq!(args.timeout, None);
                assert!(args.accept.is_empty());
                assert!(args.scripts.is_empty());
                assert!(!args.debug);
                assert!(!args.json);
            }
            other => panic!("Expected Read, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_read_full() {
        let cli = Cli::try_parse_from([
            "ivr", "read", "-p", "enter-pin", "-p", "then-hash", "-d", "4", "-a", "2", "-t",
            "5", "--accept", "1234", "--script", "then-hash=1234", "--json",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Read(args)) => {
                assert_eq!(args.prompts, vec!["enter-pin", "then-hash"]);
                assert_eq!(args.digits, 4);
                assert_eq!(args.attempts, Some(2));
                assert_eq!(args.timeout, Some(5));
                assert_eq!(args.accept, vec!["1234"]);
                assert_eq!(
                    args.scripts,
                    vec![("then-hash".to_string(), "1234".to_string())]
                );
                assert!(args.json);
            }
            other => panic!("Expected Read, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_script() {
        assert_eq!(
            parse_script("enter-pin=12#").unwrap(),
            ("enter-pin".to_string(), "12#".to_string())
        );
        assert!(parse_script("enter-pin").is_err());
        assert!(parse_script("=12").is_err());
    }

    #[test]
    fn test_read_options_from_args() {
        let cli = Cli::try_parse_from([
            "ivr", "read", "-p", "enter-pin", "-d", "4", "--accept", "1234",
        ])
        .unwrap();
        let Some(Command::Read(args)) = cli.command else {
            panic!("Expected Read");
        };
        let rendered = format!("{:?}", read_options(&args));
        assert!(rendered.contains("digits: 4"));
        assert!(rendered.contains("validator: true"));
    }
}
