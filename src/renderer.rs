//! Template rendering for kiln.
//! Path segments, templated defaults and file contents are all rendered by a
//! MiniJinja environment built from the template's engine settings.
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use cruet::Inflector;
use indexmap::IndexMap;
use minijinja::syntax::SyntaxConfig;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};

/// Resolved metadata of a run, keyed by field in declaration order.
pub type Metadata = IndexMap<String, serde_json::Value>;

/// Builds the rendering context for a metadata mapping.
pub fn metadata_context(metadata: &Metadata) -> serde_json::Value {
    serde_json::Value::Object(
        metadata.iter().map(|(key, value)| (key.clone(), value.clone())).collect(),
    )
}

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders a template string with the given context.
    ///
    /// # Arguments
    /// * `template` - Template string to render
    /// * `context` - Context variables for rendering
    ///
    /// # Returns
    /// * `Result<String>` - Rendered template string
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String>;
}

/// MiniJinja-based template rendering engine.
pub struct MiniJinjaRenderer {
    /// MiniJinja environment instance
    env: Environment<'static>,
    newline: String,
}

impl MiniJinjaRenderer {
    /// Creates a renderer with the delimiters and whitespace rules of `config`.
    ///
    /// # Errors
    /// * `Error::ConfigError` if the delimiters cannot be combined
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let mut syntax = SyntaxConfig::builder();
        syntax
            .block_delimiters(config.block_start.clone(), config.block_end.clone())
            .variable_delimiters(config.variable_start.clone(), config.variable_end.clone())
            .comment_delimiters(config.comment_start.clone(), config.comment_end.clone());
        if let Some(prefix) = &config.line_statement_prefix {
            syntax.line_statement_prefix(prefix.clone());
        }
        if let Some(prefix) = &config.line_comment_prefix {
            syntax.line_comment_prefix(prefix.clone());
        }
        let syntax = syntax
            .build()
            .map_err(|e| Error::ConfigError(format!("invalid template delimiters: {}", e)))?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_trim_blocks(config.trim_blocks);
        env.set_lstrip_blocks(config.lstrip_blocks);
        env.set_keep_trailing_newline(config.keep_trailing_newline);
        if config.strict_undefined {
            env.set_undefined_behavior(UndefinedBehavior::Strict);
        }
        let autoescape = config.autoescape;
        env.set_auto_escape_callback(move |_| {
            if autoescape {
                AutoEscape::Html
            } else {
                AutoEscape::None
            }
        });
        add_case_filters(&mut env);

        Ok(Self { env, newline: config.newline_sequence.clone() })
    }
}

/// Case conversion filters, e.g. `[[ project_name | snake_case ]]`.
fn add_case_filters(env: &mut Environment<'static>) {
    env.add_filter("camel_case", |value: String| value.to_camel_case());
    env.add_filter("pascal_case", |value: String| value.to_pascal_case());
    env.add_filter("snake_case", |value: String| value.to_snake_case());
    env.add_filter("screaming_snake_case", |value: String| value.to_screaming_snake_case());
    env.add_filter("kebab_case", |value: String| value.to_kebab_case());
    env.add_filter("train_case", |value: String| value.to_train_case());
    env.add_filter("title_case", |value: String| value.to_title_case());
    env.add_filter("sentence_case", |value: String| value.to_sentence_case());
    env.add_filter("plural", |value: String| value.to_plural());
    env.add_filter("singular", |value: String| value.to_singular());
}

impl TemplateRenderer for MiniJinjaRenderer {
    /// Renders a template string using MiniJinja.
    ///
    /// # Errors
    /// * `Error::TemplateStringError` carrying the template text if parsing or
    ///   evaluation fails, including references to undefined variables in
    ///   strict mode
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String> {
        let rendered = self.env.render_str(template, context).map_err(|source| {
            Error::TemplateStringError { template: template.to_string(), source }
        })?;

        if self.newline == "\n" {
            Ok(rendered)
        } else {
            Ok(rendered.replace("\r\n", "\n").replace('\n', &self.newline))
        }
    }
}
