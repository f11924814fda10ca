//! Tessel Tools CLI
//!
//! Command-line tools for tessel languages.

use clap::Parser;
use miette::{NamedSource, Report};
use std::path::Path;
use std::process::ExitCode;
use tessel::Tree;
use tessel_tools::cli::{Cli, Commands};
use tessel_tools::{commands, ToolError};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", Report::new(err));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<(), ToolError> {
    match command {
        Commands::Parse {
            input,
            format,
            language,
        } => {
            let language = commands::load_language(language.as_deref())?;
            let source = commands::read_file(&input)?;
            let report = commands::parse(&language, &source, format)?;
            println!("{}", report.rendered);
            report_syntax_errors(&input, &source, &report.tree);
        }
        Commands::Edit {
            input,
            range,
            text,
            print_tree,
            language,
        } => {
            let language = commands::load_language(language.as_deref())?;
            let source = commands::read_file(&input)?;
            let report = commands::edit(&language, &source, range, text.as_bytes())?;
            print!("{}", report.render(print_tree));
            report_syntax_errors(&input, &report.new_text, &report.tree);
        }
        Commands::Compile { output } => {
            let (blob, stats) = commands::compile()?;
            std::fs::write(&output, &blob).map_err(|source| ToolError::Write {
                path: output.clone(),
                source,
            })?;
            println!("Wrote {} bytes to {}", blob.len(), output.display());
            print!("{}", commands::render_table_stats(&stats));
        }
        Commands::Inspect { input, json } => {
            let bytes = match &input {
                Some(path) => commands::read_file(path)?,
                None => tessel_p::LANGUAGE_BLOB.to_vec(),
            };
            let report = commands::inspect(&bytes)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }
        }
    }
    Ok(())
}

/// Print recovered syntax errors as diagnostics. They never fail the command.
fn report_syntax_errors(path: &Path, source: &[u8], tree: &Tree) {
    let text = String::from_utf8_lossy(source).into_owned();
    for error in tree.errors() {
        let report = Report::new(error).with_source_code(NamedSource::new(path.display().to_string(), text.clone()));
        eprintln!("{report:?}");
    }
}
