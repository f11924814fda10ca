//! Command-line interface for the `tessel` binary

use clap::{ArgAction, Parser, Subcommand};
use std::ops::Range;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "tessel")]
#[command(about = "Parse, edit and inspect sources with tessel languages")]
#[command(version)]
pub struct Cli {
    /// Log more (-v for debug, -vv for trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse a source file and print its syntax tree
    Parse {
        /// Source file to parse
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "sexp")]
        format: OutputFormat,

        /// Language blob to use instead of the built-in P language
        #[arg(short, long)]
        language: Option<PathBuf>,
    },

    /// Apply one edit to a source file and reparse it incrementally
    Edit {
        /// Source file to edit
        input: PathBuf,

        /// Byte range to replace, as `start..end`
        #[arg(short, long, value_parser = parse_range)]
        range: Range<usize>,

        /// Replacement text
        #[arg(short, long, default_value = "")]
        text: String,

        /// Also print the reparsed tree
        #[arg(long)]
        print_tree: bool,

        /// Language blob to use instead of the built-in P language
        #[arg(short, long)]
        language: Option<PathBuf>,
    },

    /// Compile the P grammar and write its language blob
    Compile {
        /// Output file
        #[arg(short, long, default_value = "p.tslg")]
        output: PathBuf,
    },

    /// Print the header and table statistics of a language blob
    Inspect {
        /// Blob to inspect (default: the built-in P language)
        input: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Sexp,
    Json,
    Dump,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sexp" | "s-expression" => Ok(Self::Sexp),
            "json" => Ok(Self::Json),
            "dump" | "debug" => Ok(Self::Dump),
            _ => Err(format!("Unknown format: {s}. Supported: sexp, json, dump")),
        }
    }
}

/// Parse `start..end` into a byte range.
///
/// # Errors
///
/// Returns a message if either bound is missing or not a number, or if
/// `start > end`.
pub fn parse_range(s: &str) -> Result<Range<usize>, String> {
    let (start, end) = s
        .split_once("..")
        .ok_or_else(|| format!("expected `start..end`, got `{s}`"))?;
    let start: usize = start.trim().parse().map_err(|_| format!("invalid start in `{s}`"))?;
    let end: usize = end.trim().parse().map_err(|_| format!("invalid end in `{s}`"))?;
    if start > end {
        return Err(format!("range `{s}` ends before it starts"));
    }
    Ok(start..end)
}
