use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use fieldset::commands::project::parse_assignment;

#[derive(Parser, Debug)]
#[command(name = "fieldset")]
#[command(about = "Inspect schemas, build filters and project JSON records", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (overrides ./fieldset.toml and the user config)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print JSON on one line
    #[arg(long, global = true)]
    pub compact: bool,
}

/// Which schema document and model a command works on.
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// JSON schema document
    #[arg(short, long, value_name = "FILE")]
    pub schema: PathBuf,

    /// Model name inside the schema document
    #[arg(short, long, value_name = "NAME")]
    pub model: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Describe a model's fields and constraints
    #[command(alias = "bp")]
    Blueprint {
        #[command(flatten)]
        target: ModelArgs,
    },

    /// Print a filter in wire format
    Filter {
        #[command(flatten)]
        target: ModelArgs,

        /// Start with every field off
        #[arg(long)]
        off: bool,

        /// Write disabled fields too
        #[arg(long)]
        complete: bool,

        /// Turn a field on (dotted paths reach nested models)
        #[arg(short, long, value_name = "FIELD")]
        enable: Vec<String>,

        /// Turn a field off (dotted paths reach nested models)
        #[arg(short, long, value_name = "FIELD")]
        disable: Vec<String>,
    },

    /// Read a record into the model and print its projection
    #[command(alias = "p")]
    Project {
        #[command(flatten)]
        target: ModelArgs,

        /// Record to read, `-` for stdin
        #[arg(short, long, value_name = "FILE", default_value = "-")]
        input: String,

        /// Filter document in wire format
        #[arg(short, long, value_name = "FILE")]
        filter: Option<PathBuf>,

        /// Use minified keys
        #[arg(long)]
        minified: bool,

        /// Assign a value after reading (`key=json`), reporting change events
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
        assignments: Vec<(String, Value)>,
    },

    /// Strictly validate a record
    Validate {
        #[command(flatten)]
        target: ModelArgs,

        /// Record to read, `-` for stdin
        #[arg(short, long, value_name = "FILE", default_value = "-")]
        input: String,

        /// Only read and require the fields this filter document shows
        #[arg(short, long, value_name = "FILE")]
        filter: Option<PathBuf>,
    },
}
