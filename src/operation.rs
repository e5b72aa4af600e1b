//! What the binary can do for you.
//!
//! This module implements the commands of the standalone binary. They are
//! encapsulated in the type [`Operation`] which can determine the command
//! from the command line arguments and then execute it.

use clap::{ArgMatches, Command};
use log::{error, info};
use crate::config::Config;
use crate::error::{ExitError, Failed};
use crate::http::{ActionRegistry, http_listener};


//------------ Operation -----------------------------------------------------

/// The command to execute.
pub enum Operation {
    Server(Server),
    PrintConfig(PrintConfig),
}

impl Operation {
    /// Prepares everything.
    ///
    /// Call this before doing anything else.
    pub fn prepare() -> Result<(), Failed> {
        Config::init_logging()
    }

    /// Adds the command configuration to a clap command.
    pub fn config_args(app: Command) -> Command {
        let app = Server::config_args(app);
        PrintConfig::config_args(app)
    }

    /// Creates an operation from clap matches.
    pub fn from_arg_matches(matches: &ArgMatches) -> Result<Self, Failed> {
        Ok(match matches.subcommand() {
            Some(("server", _)) => Operation::Server(Server),
            Some(("config", _)) => Operation::PrintConfig(PrintConfig),
            _ => {
                error!(
                    "Failed: a command is required.\
                     \n\nAvailable commands are:\
                     \n   server   Start the HTTP server\
                     \n   config   Print the effective configuration\
                     \n\nSee capstan-web -h for a usage summary."
                );
                return Err(Failed)
            }
        })
    }

    /// Runs the operation.
    pub fn run(self, config: Config) -> Result<(), ExitError> {
        match self {
            Operation::Server(cmd) => cmd.run(config),
            Operation::PrintConfig(cmd) => cmd.run(config),
        }
    }
}


//------------ Server --------------------------------------------------------

/// Run the HTTP server until interrupted.
pub struct Server;

impl Server {
    /// Adds the command configuration to a clap command.
    fn config_args(app: Command) -> Command {
        app.subcommand(
            Command::new("server").about("Starts the HTTP server")
        )
    }

    /// Runs the server.
    ///
    /// The standalone binary registers no actions; it serves the UI and
    /// the built-in token action only. The daemon embeds the library and
    /// fills the registry with its own actions instead.
    fn run(self, config: Config) -> Result<(), ExitError> {
        config.switch_logging()?;
        let registry = ActionRegistry::new();
        let (handle, server) = http_listener(registry, &config)?;
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(err) => {
                error!("Failed to create runtime: {}", err);
                return Err(ExitError::Generic)
            }
        };
        runtime.block_on(async move {
            let server = tokio::spawn(server);
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutting down."),
                Err(err) => {
                    error!(
                        "Failed to listen for shutdown signal: {}", err
                    );
                }
            }
            handle.stop();
            let _ = server.await;
        });
        Ok(())
    }
}


//------------ PrintConfig ---------------------------------------------------

/// Print the effective configuration and exit.
pub struct PrintConfig;

impl PrintConfig {
    /// Adds the command configuration to a clap command.
    fn config_args(app: Command) -> Command {
        app.subcommand(
            Command::new("config")
                .about("Prints the effective configuration")
        )
    }

    /// Prints the configuration.
    fn run(self, config: Config) -> Result<(), ExitError> {
        println!("{}", config.to_toml());
        Ok(())
    }
}
