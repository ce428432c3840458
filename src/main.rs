use clap::{CommandFactory, Parser};
use ivr_read::cli::{self, Cli, Command, ConfigCommand};
use ivr_read::{config, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_tracing(&cfg.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let result = match cli.command {
        Some(Command::Read(args)) => cli::handle_read(&cfg, &args).await,
        Some(Command::Config(ConfigCommand::Show)) => cli::handle_config_show(&cfg),
        Some(Command::Config(ConfigCommand::Path)) => {
            cli::handle_config_path();
            Ok(())
        }
        Some(Command::Version) => {
            cli::handle_version();
            Ok(())
        }
        None => Cli::command().print_help().map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
