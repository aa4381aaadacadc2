//! Topic Router - command-line driver.
//!
//! Loads the configuration and a route file into a routing table, then
//! resolves topics or runs diagnostic commands against it.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use topic_router_lib::config::{ConfigLoader, RouterConfig, ENV_PREFIX};
use topic_router_lib::data_structures::{RoutingStrategy, RoutingTable};
use topic_router_lib::diagnostics::{DiagnosticCommand, VerbosityControl};
use topic_router_lib::error::{ErrorContext, ErrorReporter, RouterResult, TracingErrorReporter};
use topic_router_lib::logging::init_logging;
use topic_router_lib::route_file::RouteFile;

/// Command line arguments for the topic router.
#[derive(Parser, Debug)]
#[clap(name = "topic_router", version, author, about)]
struct Args {
    /// Path to configuration file
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Path to a TOML file listing the routes to register
    #[clap(short, long, value_parser)]
    routes: Option<PathBuf>,

    /// Command to execute
    #[clap(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve topics to their destinations
    Lookup {
        /// Override the configured lookup strategy
        #[clap(short, long, value_parser)]
        strategy: Option<RoutingStrategy>,

        /// Topics to resolve
        #[clap(required = true)]
        topics: Vec<String>,
    },

    /// List the topics routed to a destination
    Owner {
        /// Destination name
        destination: String,
    },

    /// List the distinct destinations reachable below an expression
    Endpoints {
        /// Topic expression naming an existing node
        expression: String,
    },

    /// Run a diagnostic command, or list them when none is given
    Diag {
        /// Command name, e.g. dumpRoutingTable
        name: Option<String>,
    },

    /// Validate the configuration file and route file
    Validate,

    /// Generate a default configuration file
    GenConfig {
        /// Path to output configuration file
        #[clap(short, long, value_parser)]
        output: PathBuf,
    },
}

/// Builds the routing table described by `config`, loading `routes` if given.
fn build_table(config: &RouterConfig, routes: Option<&Path>) -> RouterResult<RoutingTable<String>> {
    let mut table = RoutingTable::with_config(config.routing.table_config()?);
    match routes {
        Some(path) => {
            let count = RouteFile::load(path)?.apply(&mut table)?;
            info!("Loaded {} routes from {:?}", count, path);
        }
        None => warn!("No route file given, routing table is empty"),
    }
    Ok(table)
}

fn run(args: Args, config: &RouterConfig, logs: &dyn VerbosityControl) -> RouterResult<()> {
    let routes = args.routes.as_deref();
    match args.command {
        Command::Lookup { strategy, topics } => {
            let mut table = build_table(config, routes)?;
            if let Some(strategy) = strategy {
                table.set_strategy(strategy);
            }
            for topic in topics {
                match table.lookup(&topic) {
                    Ok(destination) => println!("{topic} -> {destination}"),
                    Err(err) if err.is_not_found() => println!("{topic} -> (no route)"),
                    Err(err) => return Err(err.into()),
                }
            }
            Ok(())
        }
        Command::Owner { destination } => {
            let table = build_table(config, routes)?;
            for topic in table.find_all_routes_for_value(&destination)? {
                println!("{topic}");
            }
            Ok(())
        }
        Command::Endpoints { expression } => {
            let table = build_table(config, routes)?;
            for entry in table.resolvable_endpoints_for(&expression)? {
                println!("{} -> {}", entry.path(), entry.value());
            }
            Ok(())
        }
        Command::Diag { name: None } => {
            print!("{}", DiagnosticCommand::help());
            Ok(())
        }
        Command::Diag { name: Some(name) } => {
            let command: DiagnosticCommand = name.parse()?;
            let mut table = build_table(config, routes)?;
            let report = command.execute(&mut table, Some(logs))?;
            println!("{report}");
            Ok(())
        }
        Command::Validate => {
            info!("Validating configuration");
            build_table(config, routes)?;
            info!("Configuration validated successfully");
            Ok(())
        }
        Command::GenConfig { output } => {
            info!("Generating default configuration");
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let toml = toml::to_string_pretty(&RouterConfig::default())?;
            std::fs::write(&output, toml)?;
            info!("Default configuration written to {:?}", output);
            Ok(())
        }
    }
}

/// Main entry point for the application.
fn main() {
    let args = Args::parse();

    let loader = ConfigLoader::new(args.config.as_deref(), ENV_PREFIX);
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };

    let logs = match init_logging(&config.log) {
        Ok(logs) => logs,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let command = format!("{:?}", args.command);
    if let Err(error) = run(args, &config, &logs) {
        TracingErrorReporter.report(ErrorContext::new(error).with_details(command));
        process::exit(1);
    }
}
