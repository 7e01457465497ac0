use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Parser as ClapParser, Subcommand};
use idp_mapping::cli::{self, CheckOptions, CliError, MapOptions};
use idp_mapping::output::{to_json, to_json_pretty};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(ClapParser)]
#[command(name = "idpmap")]
#[command(about = "idpmap - Map identity provider assertions onto local claims")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a rule file against an assertion
    Map {
        /// JSON file containing the rule list
        #[arg(short, long)]
        rules: PathBuf,

        /// JSON file containing named mappings
        #[arg(short, long)]
        mappings: Option<PathBuf>,

        /// Assertion JSON (reads from stdin if not provided)
        #[arg(short, long)]
        assertion: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Validate a rule file without evaluating it
    Check {
        /// JSON file containing the rule list
        #[arg(short, long)]
        rules: PathBuf,
    },

    /// List documentation topics
    Docs,

    /// Show documentation for a specific topic
    Doc {
        /// Topic name (use 'idpmap docs' to list topics)
        topic: String,
    },
}

fn main() {
    // Logs go to stderr so stdout stays pure JSON (respects RUST_LOG)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Map {
            rules,
            mappings,
            assertion,
            pretty,
        } => run_map(rules, mappings, assertion, pretty),
        Commands::Check { rules } => run_check(rules),
        Commands::Docs => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Doc { topic } => cli::get_doc_topic(&topic).map(|content| print!("{}", content)),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_map(
    rules: PathBuf,
    mappings: Option<PathBuf>,
    assertion: Option<String>,
    pretty: bool,
) -> Result<(), CliError> {
    let assertion = match assertion {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = MapOptions {
        rules,
        mappings,
        assertion,
    };

    match cli::execute_map(&options)? {
        Some(claim) if pretty => println!("{}", to_json_pretty(&claim)),
        Some(claim) => println!("{}", to_json(&claim)),
        None => println!("null"),
    }
    Ok(())
}

fn run_check(rules: PathBuf) -> Result<(), CliError> {
    let report = cli::execute_check(&CheckOptions { rules })?;
    println!(
        "Rules are valid: {} rules, {} blocks, {} statements",
        report.rules, report.blocks, report.statements
    );
    Ok(())
}
