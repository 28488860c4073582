use std::marker::PhantomData;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::docs::{self, DocOptions};
use crate::env;
use crate::error::KeyfigError;
use crate::field::{ClassId, Configurable};
use crate::file;
use crate::ops::{self, ConfigResult};
use crate::overrides::{CliOverride, flatten_value};
use crate::registry::Registry;
use crate::resolve::{self, ResolveInput, ResolveOptions, Resolved};
use crate::schema::{self, SchemaNode};
use crate::types::{ConfigAction, SourceKind};
use crate::validate::ValidatorOptions;

/// Entry point for building a keyfig configuration.
pub struct Keyfig;

impl Keyfig {
    pub fn builder<C: Configurable>() -> KeyfigBuilder<C> {
        KeyfigBuilder::new()
    }
}

/// Builder for collecting sources and resolving a typed configuration.
///
/// Sources are gathered here; everything after loading is the pure
/// [`resolve`](crate::resolve::resolve) pipeline:
///
/// - **Files**: [`files()`](Self::files) / [`add_file()`](Self::add_file), lowest
///   priority first. Missing files are skipped unless
///   [`fail_on_missing_file()`](Self::fail_on_missing_file).
/// - **Environment**: the process environment, plus
///   [`env_files()`](Self::env_files) underneath it.
/// - **CLI**: an argument vector ([`args()`](Self::args)) and programmatic
///   [`cli_override()`](Self::cli_override)s.
pub struct KeyfigBuilder<C: Configurable> {
    files: Vec<PathBuf>,
    fail_on_missing_file: bool,
    env_files: Vec<PathBuf>,
    load_env_files: bool,
    fail_on_missing_env_file: bool,
    env_enabled: bool,
    env_vars: Option<Vec<(String, String)>>,
    cli_args: Vec<String>,
    cli_overrides: Vec<CliOverride>,
    deferred_error: Option<KeyfigError>,
    doc_title: Option<String>,
    options: ResolveOptions,
    _phantom: PhantomData<C>,
}

impl<C: Configurable> KeyfigBuilder<C> {
    fn new() -> Self {
        Self {
            files: Vec::new(),
            fail_on_missing_file: false,
            env_files: Vec::new(),
            load_env_files: false,
            fail_on_missing_env_file: false,
            env_enabled: true,
            env_vars: None,
            cli_args: Vec::new(),
            cli_overrides: Vec::new(),
            deferred_error: None,
            doc_title: None,
            options: ResolveOptions::default(),
            _phantom: PhantomData,
        }
    }

    /// Set the source priority list. The last source that defines a key wins.
    ///
    /// Default: `[File, Env, Cli]`.
    pub fn priority(mut self, priority: Vec<SourceKind>) -> Self {
        self.options.priority = priority;
        self
    }

    /// Replace the config file list. Later files override earlier ones.
    pub fn files<P: Into<PathBuf>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.files = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Append one config file with the highest file priority so far.
    pub fn add_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Treat a missing config file as an error (default: skip it).
    pub fn fail_on_missing_file(mut self, fail: bool) -> Self {
        self.fail_on_missing_file = fail;
        self
    }

    /// Set the `.env`-style files to load, and turn env-file loading on.
    /// Later files override earlier ones; the process environment overrides all.
    pub fn env_files<P: Into<PathBuf>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.env_files = paths.into_iter().map(Into::into).collect();
        self.load_env_files = true;
        self
    }

    /// Enable or disable env-file loading without touching the file list.
    pub fn load_env_files(mut self, load: bool) -> Self {
        self.load_env_files = load;
        self
    }

    /// Treat a missing env file as an error (default: skip it).
    pub fn fail_on_missing_env_file(mut self, fail: bool) -> Self {
        self.fail_on_missing_env_file = fail;
        self
    }

    /// Do not read the process environment. Env files are still loaded.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    /// Use these pairs in place of the process environment.
    pub fn env_vars<K: Into<String>, V: Into<String>>(
        mut self,
        vars: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Read config flags from this argument vector (without the program name).
    ///
    /// Only `--<cli key>` flags of the config type are read; everything else
    /// is left for the application's own parser.
    #[cfg(feature = "clap")]
    pub fn args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.cli_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Read config flags from the process arguments.
    #[cfg(feature = "clap")]
    pub fn process_args(self) -> Self {
        self.args(std::env::args().skip(1))
    }

    /// Add a CLI-source override at a dotted CLI key. `None` values are ignored
    /// (useful for optional clap args).
    pub fn cli_override<V: Into<Value>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.cli_overrides.push(CliOverride::explicit(key, v.into()));
        }
        self
    }

    /// Add CLI-source overrides from any serializable source, auto-matching by
    /// field name.
    ///
    /// Serializes `source` into dotted key-value pairs, skips `None` values,
    /// and keeps only keys that name a config field, either by its CLI key or
    /// by its dotted field path. Non-matching keys are silently ignored, so
    /// clap-only fields like `command` or `verbose` are excluded.
    ///
    /// Composes with [`cli_override`](Self::cli_override): both push to the
    /// same list, later entries take precedence.
    pub fn cli_overrides_from<S: Serialize>(mut self, source: &S) -> Self {
        match serde_json::to_value(source) {
            Ok(value) => {
                self.cli_overrides.extend(
                    flatten_value(&value)
                        .into_iter()
                        .map(|(key, value)| CliOverride::matched(key, value)),
                );
            }
            Err(e) => {
                self.deferred_error.get_or_insert(KeyfigError::InvalidArgs(format!(
                    "override source does not serialize: {e}"
                )));
            }
        }
        self
    }

    /// Fail on any violation (default) instead of returning violations with
    /// the config.
    pub fn throw_on_validation_error(mut self, throw: bool) -> Self {
        self.options.throw_on_validation_error = throw;
        self
    }

    pub fn validator_options(mut self, options: ValidatorOptions) -> Self {
        self.options.validator_options = options;
        self
    }

    /// Fail on values that do not parse as their declared type (default
    /// `true`). Fields can override this with `Field::lenient`.
    pub fn strict_coercion(mut self, strict: bool) -> Self {
        self.options.strict_coercion = strict;
        self
    }

    /// Fill unset fields from the type's `Default` instance (default `true`).
    pub fn expose_default_values(mut self, expose: bool) -> Self {
        self.options.expose_default_values = expose;
        self
    }

    /// Resolve the root type under an enclosing key, e.g. `"svc"` reads
    /// `svc.app.port` from files and `SVC_APP_PORT` from the environment.
    pub fn top_level_prefix(mut self, prefix: &str) -> Self {
        self.options.top_level_prefix = Some(prefix.to_string()).filter(|p| !p.is_empty());
        self
    }

    /// Title of the generated Markdown reference (default `"Configuration"`).
    pub fn doc_title(mut self, title: &str) -> Self {
        self.doc_title = Some(title.to_string());
        self
    }

    /// Build the `ResolveInput` from current builder state.
    fn build_input(self) -> Result<ResolveInput, KeyfigError> {
        if let Some(err) = self.deferred_error {
            return Err(err);
        }

        let files = file::read_files(&self.files, self.fail_on_missing_file)?;
        let env_files = if self.load_env_files {
            env::read_env_files(&self.env_files, self.fail_on_missing_env_file)?
        } else {
            Vec::new()
        };
        let env_vars = match (self.env_enabled, self.env_vars) {
            (false, _) => Vec::new(),
            (true, Some(vars)) => vars,
            (true, None) => std::env::vars().collect(),
        };

        Ok(ResolveInput {
            files,
            env_files,
            env_vars,
            cli_args: self.cli_args,
            cli_overrides: self.cli_overrides,
            options: self.options,
        })
    }

    /// Load every source and resolve, keeping the schema and any returned
    /// violations.
    pub fn resolve(self) -> Result<Resolved<C>, KeyfigError> {
        let input = self.build_input()?;
        resolve::resolve(input)
    }

    /// Load and resolve the configuration.
    pub fn load(self) -> Result<C, KeyfigError> {
        self.resolve().map(|resolved| resolved.config)
    }

    /// The planned schema tree, without reading any source.
    pub fn schema(&self) -> Result<SchemaNode, KeyfigError> {
        let registry = Registry::for_class::<C>()?;
        schema::plan(
            &registry,
            ClassId::of::<C>(),
            self.options.top_level_prefix.as_deref(),
        )
    }

    /// Handle a `ConfigAction` and print the result to stdout.
    pub fn handle_and_print(self, action: &ConfigAction) -> Result<(), KeyfigError> {
        let result = self.handle(action)?;
        println!("{result}");
        Ok(())
    }

    /// Handle a `ConfigAction` (list / get / schema / doc).
    pub fn handle(self, action: &ConfigAction) -> Result<ConfigResult, KeyfigError> {
        match action {
            ConfigAction::List => {
                let (schema, tree) = self.resolved_tree()?;
                Ok(ops::list_values(&schema, &tree))
            }
            ConfigAction::Get { key } => {
                let (schema, tree) = self.resolved_tree()?;
                ops::get_value(&schema, &tree, key)
            }
            ConfigAction::Schema { output } => {
                let text = docs::json_schema_string(&self.schema()?)?;
                match output {
                    Some(path) => {
                        ops::write_output(path, &text)?;
                        Ok(ConfigResult::Written { path: path.clone() })
                    }
                    None => Ok(ConfigResult::Schema(text)),
                }
            }
            ConfigAction::Doc { output, source } => {
                let mut options = DocOptions {
                    source: *source,
                    write_to_file: output.clone(),
                    ..DocOptions::default()
                };
                if let Some(title) = &self.doc_title {
                    options.title = title.clone();
                }
                let text = docs::markdown(&self.schema()?, &options)?;
                match output {
                    Some(path) => Ok(ConfigResult::Written { path: path.clone() }),
                    None => Ok(ConfigResult::Doc(text)),
                }
            }
        }
    }

    fn resolved_tree(self) -> Result<(SchemaNode, Value), KeyfigError> {
        let resolved = self.resolve()?;
        let tree = serde_json::to_value(&resolved.config).map_err(|e| KeyfigError::Render {
            what: "resolved config".into(),
            reason: e.to_string(),
        })?;
        Ok((resolved.schema, tree))
    }
}
