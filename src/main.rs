//! kiln's main application entry point.
//! Handles command-line argument parsing and drives a template run: template
//! acquisition, plugin consent, prompting and rendering.

use std::io::{self, IsTerminal};

use kiln::{
    cli::{get_args, Args},
    error::{default_error_handler, Result},
    executor::Executor,
    hooks::confirm_plugin_execution,
    loader::load_template,
    plugin::{discover_scripts, PluginRegistry},
    preset::{load_preset, PresetSource},
    prompt::{DefaultsPrompter, DialoguerPrompter, LinePrompter, Prompter},
};

/// Main application entry point.
fn main() {
    let args = get_args();

    // Logger configuration
    env_logger::Builder::new()
        .filter_level(if args.verbose { log::LevelFilter::Trace } else { log::LevelFilter::Warn })
        .init();

    // With --stdin the preset consumes standard input, so nothing is left to
    // answer the remaining questions with.
    let mut prompter: Box<dyn Prompter> = if args.stdin {
        Box::new(DefaultsPrompter::new())
    } else if io::stdin().is_terminal() {
        Box::new(DialoguerPrompter::new())
    } else {
        Box::new(LinePrompter::new(io::BufReader::new(io::stdin()), io::stderr()))
    };

    if let Err(err) = run(args, prompter.as_mut()) {
        default_error_handler(err);
    }
}

/// Main application logic execution.
///
/// # Flow
/// 1. Loads the template from a local path or git repository
/// 2. Loads the configuration and checks preset data
/// 3. Asks before enabling plugin scripts shipped with the template
/// 4. Prompts for metadata and renders the source tree
fn run(args: Args, prompter: &mut dyn Prompter) -> Result<()> {
    let template_root = load_template(prompter, &args.template, args.skip_overwrite_check)?;
    let mut executor = Executor::new(&template_root, &args.output_dir)?;

    let preset = load_preset(&PresetSource::from_args(args.data, args.data_file, args.stdin))?;
    let preset = preset.map(|preset| executor.check_preset(&preset)).transpose()?;

    let mut registry = PluginRegistry::new();
    let plugin_dir = executor.plugin_dir();
    if !discover_scripts(&plugin_dir)?.is_empty() {
        if confirm_plugin_execution(prompter, args.skip_plugins_check)? {
            registry.discover(&plugin_dir)?;
        } else {
            log::warn!("Plugin scripts of '{}' will not run", plugin_dir.display());
        }
    }

    executor.load_plugins(&registry)?;
    executor.prompt(prompter, preset.as_ref())?;
    let written = executor.render()?;

    println!(
        "Template '{}' generated {} entries in {}.",
        executor.config().name,
        written.len(),
        executor.output_dir().display()
    );
    Ok(())
}
