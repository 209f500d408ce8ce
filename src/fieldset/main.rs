use std::fs;
use std::io::Read;
use std::path::Path;

use clap::Parser;
use colored::*;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use fieldset::catalog::Catalog;
use fieldset::commands::filter::FilterRequest;
use fieldset::commands::project::ProjectRequest;
use fieldset::commands::validate::ValidateRequest;
use fieldset::commands::{self, CmdMessage, CmdResult, MessageLevel};
use fieldset::config::FieldsetConfig;
use fieldset::error::Result;

mod args;
use args::{Cli, Commands, ModelArgs};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = FieldsetConfig::load(cli.config.as_deref())?;
    let pretty = config.pretty && !cli.compact;

    let result = match cli.command {
        Commands::Blueprint { target } => {
            let catalog = Catalog::load(&target.schema)?;
            commands::blueprint::run(&catalog, &target.model)?
        }
        Commands::Filter {
            target,
            off,
            complete,
            enable,
            disable,
        } => {
            let catalog = Catalog::load(&target.schema)?;
            let request = FilterRequest {
                default: !off,
                complete,
                enable,
                disable,
            };
            commands::filter::run(&catalog, &target.model, &request)?
        }
        Commands::Project {
            target,
            input,
            filter,
            minified,
            assignments,
        } => handle_project(&config, target, &input, filter.as_deref(), minified, assignments)?,
        Commands::Validate {
            target,
            input,
            filter,
        } => {
            let catalog = Catalog::load(&target.schema)?;
            let request = ValidateRequest {
                record: read_json(&input)?,
                filter: read_filter(filter.as_deref())?,
                filter_default: config.filter_default,
            };
            commands::validate::run(&catalog, &target.model, &request)?
        }
    };

    print_result(&result, pretty)
}

/// `RUST_LOG` wins; otherwise `-v` shows debug output and the default is
/// warnings only. Logs go to stderr so stdout stays pure JSON.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "fieldset=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_project(
    config: &FieldsetConfig,
    target: ModelArgs,
    input: &str,
    filter: Option<&Path>,
    minified: bool,
    assignments: Vec<(String, Value)>,
) -> Result<CmdResult> {
    let catalog = Catalog::load(&target.schema)?;
    let record = read_json(input)?;
    let request = ProjectRequest {
        record,
        filter: read_filter(filter)?,
        filter_default: config.filter_default,
        assignments,
        model_options: config.model_options(),
        projection: config.projection_options(minified),
    };
    commands::project::run(&catalog, &target.model, &request)
}

fn read_filter(path: Option<&Path>) -> Result<Option<Value>> {
    match path {
        Some(path) => Ok(Some(serde_json::from_str(&fs::read_to_string(path)?)?)),
        None => Ok(None),
    }
}

/// Read JSON from a file, or from stdin when `source` is `-`.
fn read_json(source: &str) -> Result<Value> {
    let text = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(source)?
    };
    Ok(serde_json::from_str(&text)?)
}

fn print_result(result: &CmdResult, pretty: bool) -> Result<()> {
    if let Some(output) = &result.output {
        let text = if pretty {
            serde_json::to_string_pretty(output)?
        } else {
            serde_json::to_string(output)?
        };
        println!("{}", text);
    }
    print_messages(&result.messages);
    Ok(())
}

fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => eprintln!("{}", message.content.dimmed()),
            MessageLevel::Success => eprintln!("{}", message.content.green()),
            MessageLevel::Warning => eprintln!("{}", message.content.yellow()),
            MessageLevel::Error => eprintln!("{}", message.content.red()),
        }
    }
}
