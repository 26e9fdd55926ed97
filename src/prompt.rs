//! Interactive resolution of metadata fields.
//! Each field is answered from preset data when available, otherwise through a
//! validated prompt loop that renders templated defaults and choices against
//! the metadata collected so far.

use std::io::{self, BufRead, Write};

use dialoguer::{Confirm, Input};
use log::debug;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::meta::{display_value, parse_bool, FieldKind, MetaField};
use crate::renderer::{metadata_context, Metadata, TemplateRenderer};

/// Message shown when an empty answer is given to a field that needs one.
pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// Source of user answers.
pub trait Prompter {
    /// Shows `prompt` and reads one line of input.
    ///
    /// # Errors
    /// Any error, including end of input, cancels the surrounding run.
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;

    /// Reports why the previous answer was rejected.
    fn reject(&mut self, message: &str);

    /// Asks a yes/no question.
    fn confirm(&mut self, prompt: &str, default: bool) -> io::Result<bool>;
}

/// Terminal prompter backed by dialoguer.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

fn interrupted(e: dialoguer::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, e.to_string())
}

impl Prompter for DialoguerPrompter {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(interrupted)
    }

    fn reject(&mut self, message: &str) {
        eprintln!("{}", message);
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> io::Result<bool> {
        Confirm::new().with_prompt(prompt).default(default).interact().map_err(interrupted)
    }
}

/// Line-oriented prompter over arbitrary streams, used for piped input.
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Everything written so far: prompts followed by rejection messages.
    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn next_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(line)
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{}: ", prompt)?;
        self.output.flush()?;
        self.next_line()
    }

    fn reject(&mut self, message: &str) {
        // Output is best effort; the loop re-prompts regardless.
        let _ = writeln!(self.output, "{}", message);
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let line = self.read_line(&format!("{} ({})", prompt, hint))?;
            let answer = line.trim();
            if answer.is_empty() {
                return Ok(default);
            }
            match parse_bool(answer) {
                Some(answer) => return Ok(answer),
                None => self.reject("Input must be yes or no."),
            }
        }
    }
}

/// Prompter for runs without an input stream.
///
/// Every question gets an empty answer, so fields fall back to their
/// defaults and confirmations to their default choice. A rejected answer
/// cannot be corrected and ends the run with the rejection message.
#[derive(Debug, Default)]
pub struct DefaultsPrompter {
    rejected: Option<String>,
}

impl DefaultsPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for DefaultsPrompter {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        match self.rejected.take() {
            Some(message) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                message.trim_end_matches('.').to_string(),
            )),
            None => {
                debug!("Answering '{}' with its default", prompt);
                Ok(String::new())
            }
        }
    }

    fn reject(&mut self, message: &str) {
        self.rejected = Some(message.to_string());
    }

    fn confirm(&mut self, _prompt: &str, default: bool) -> io::Result<bool> {
        Ok(default)
    }
}

/// Resolves one field to a value.
///
/// # Arguments
/// * `field` - Field to resolve
/// * `renderer` - Renders templated defaults and choices
/// * `metadata` - Values resolved so far
/// * `preset` - Pre-supplied answers, returned verbatim when they contain the key
/// * `prompter` - Source of interactive answers
///
/// # Returns
/// * `Result<Value>` - A value satisfying the field constraints, or the preset value
///
/// # Errors
/// * `Error::TemplateStringError` if a default or a choice fails to render
/// * `Error::PromptAbortedError` if input is closed or cancelled
pub fn resolve_field(
    field: &MetaField,
    renderer: &dyn TemplateRenderer,
    metadata: &Metadata,
    preset: Option<&Map<String, Value>>,
    prompter: &mut dyn Prompter,
) -> Result<Value> {
    if let Some(value) = preset.and_then(|preset| preset.get(field.key())) {
        debug!("Using preset value for '{}'", field.key());
        return Ok(value.clone());
    }

    let context = metadata_context(metadata);
    let kind = match field.kind().options() {
        Some(options) => field.kind().with_options(
            options
                .iter()
                .map(|option| render_value(renderer, option, &context))
                .collect::<Result<Vec<_>>>()?,
        ),
        None => field.kind().clone(),
    };
    let default = match (field.kind(), field.default()) {
        (FieldKind::Number { .. } | FieldKind::Boolean, default) => default.cloned(),
        (_, Some(default)) => Some(render_value(renderer, default, &context)?),
        (_, None) => None,
    };

    let text = prompt_text(field.prompt(), &kind, default.as_ref());
    loop {
        let line = prompter.read_line(&text).map_err(|source| Error::PromptAbortedError {
            key: field.key().to_string(),
            source,
        })?;
        let input = line.trim();

        let candidate = if input.is_empty() {
            let fallback = if field.required() {
                None
            } else {
                default.clone().or_else(|| kind.fallback())
            };
            match fallback {
                Some(value) => value,
                None => {
                    prompter.reject(REQUIRED_MESSAGE);
                    continue;
                }
            }
        } else {
            match kind.coerce(input) {
                Ok(value) => value,
                Err(message) => {
                    prompter.reject(&message);
                    continue;
                }
            }
        };

        match kind.check(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(message) => prompter.reject(&message),
        }
    }
}

/// Builds the text shown for a field: `Label (hint) [default]`.
///
/// Boolean fields carry their default in the hint instead of a suffix.
pub fn prompt_text(label: &str, kind: &FieldKind, default: Option<&Value>) -> String {
    let mut text = label.to_string();
    if let Some(hint) = kind.hint(default) {
        text.push_str(&format!(" ({})", hint));
    }
    if let Some(default) = default.filter(|_| !matches!(kind, FieldKind::Boolean)) {
        text.push_str(&format!(" [{}]", display_value(default)));
    }
    text
}

/// Renders string values, including strings nested in lists.
fn render_value(renderer: &dyn TemplateRenderer, value: &Value, context: &Value) -> Result<Value> {
    match value {
        Value::String(template) => Ok(Value::String(renderer.render(template, context)?)),
        Value::Array(items) => items
            .iter()
            .map(|item| render_value(renderer, item, context))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}
