//! Command-line interface implementation for kiln.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, ArgGroup, CommandFactory, Parser};
use std::path::PathBuf;

/// Command-line arguments structure for kiln.
#[derive(Parser, Debug)]
#[command(author, version, about = "kiln: template-driven project scaffolding with plugin hooks", long_about = None)]
#[command(group(ArgGroup::new("preset").args(["data", "data_file", "stdin"]).multiple(false)))]
pub struct Args {
    /// Path to the template directory or git repository URL
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// Directory where the generated project will be created
    #[arg(value_name = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Answers as a JSON object, used instead of prompting
    #[arg(long, value_name = "JSON")]
    pub data: Option<String>,

    /// Read answers from a JSON file
    #[arg(long, value_name = "PATH")]
    pub data_file: Option<PathBuf>,

    /// Read answers from stdin
    #[arg(short, long)]
    pub stdin: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip the confirmation prompt before running plugin scripts.
    /// This will execute every script in the plugin directory of the template
    /// without asking first.
    #[arg(long)]
    pub skip_plugins_check: bool,

    /// Skip the confirmation prompt when a previous clone of a git template
    /// exists. The clone is replaced without asking.
    #[arg(long)]
    pub skip_overwrite_check: bool,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Returns
/// * `Args` - Parsed command line arguments
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
