mod cli;
mod server;

use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use cli::{CliArgs, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.ping {
        println!("pong");
        return ExitCode::SUCCESS;
    }

    let config = match cli::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Some(Commands::Config) => match cli::render_config(&config) {
            Ok(rendered) => {
                println!("{}", rendered);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to render configuration: {}", e);
                ExitCode::FAILURE
            }
        },
        Some(Commands::Serve { listen }) => {
            if let Err(e) = core_logging::init_logging(&cli::logging_config(&config)) {
                eprintln!("Failed to initialize logging: {}", e);
                return ExitCode::FAILURE;
            }

            let application = match cli::build_application(config) {
                Ok(application) => application,
                Err(e) => {
                    error!("Failed to initialize application: {}", e);
                    return ExitCode::FAILURE;
                }
            };

            match server::serve(application, listen).await {
                Ok(()) => {
                    info!("Server stopped");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("{}", e);
                    ExitCode::FAILURE
                }
            }
        }
        None => {
            println!("No command given. Run `pictor serve` to start the server, or `pictor --help`.");
            ExitCode::SUCCESS
        }
    }
}
