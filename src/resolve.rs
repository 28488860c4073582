//! Core resolution pipeline: materialize sources and produce a typed config.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, making the full
//! pipeline testable with synthetic inputs. Steps:
//!
//! 1. Plan the schema tree from the registry (keys, types, defaults)
//! 2. Materialize sources: merge files, build the env map, parse CLI flags
//!    for the planned keys and apply programmatic overrides
//! 3. Collect one raw value per leaf under the priority list
//! 4. Coerce raw values into their declared types
//! 5. Run the built-in structural checks, dropping invalid leaves
//! 6. Overlay onto the type's defaults and deserialize into `C`, dropping
//!    values the Rust field cannot hold
//! 7. Run the type's own `validate` rules and apply the error policy

use std::path::PathBuf;

use serde_json::Value;

use crate::coerce::{self, CoerceOptions};
use crate::env;
use crate::error::{FieldViolation, KeyfigError, ValidationErrors};
use crate::field::{ClassId, ClassRef, Configurable};
use crate::file;
use crate::merge::{get_path, overlay_values, remove_path, set_path};
use crate::overrides::{self, CliOverride};
use crate::registry::Registry;
use crate::schema::{self, ResolvedSources, SchemaNode};
use crate::types::{SourceKind, default_priority};
use crate::validate::{self, ValidatorOptions};

/// Knobs that shape resolution, independent of where the inputs came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOptions {
    /// Lowest to highest: the last listed source that defines a key wins.
    pub priority: Vec<SourceKind>,
    /// Fail on strings that do not parse as the declared type.
    pub strict_coercion: bool,
    /// Fill unset values from the type's `Default` instance.
    pub expose_default_values: bool,
    /// Fail when any validation rule is violated, instead of returning the
    /// violations alongside the config.
    pub throw_on_validation_error: bool,
    pub validator_options: ValidatorOptions,
    /// Enclosing key prefix for the root type.
    pub top_level_prefix: Option<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            strict_coercion: true,
            expose_default_values: true,
            throw_on_validation_error: true,
            validator_options: ValidatorOptions::default(),
            top_level_prefix: None,
        }
    }
}

/// All pre-loaded data needed to resolve a config. No I/O happens here.
#[derive(Debug, Clone, Default)]
pub struct ResolveInput {
    /// File contents in precedence order: first = lowest priority, last = highest.
    pub files: Vec<(PathBuf, String)>,
    /// Env-file contents in precedence order.
    pub env_files: Vec<(PathBuf, String)>,
    /// Process environment pairs (pass `std::env::vars().collect()` or synthetic data).
    /// These override env files.
    pub env_vars: Vec<(String, String)>,
    /// Argument vector without the program name. Read only with the `clap` feature.
    pub cli_args: Vec<String>,
    /// Programmatic overrides, applied after `cli_args` (later wins).
    pub cli_overrides: Vec<CliOverride>,
    pub options: ResolveOptions,
}

/// A resolved config with everything learned along the way.
#[derive(Debug, Clone)]
pub struct Resolved<C> {
    pub config: C,
    /// Empty unless violations were returned instead of raised.
    pub validation_errors: Vec<FieldViolation>,
    pub schema: SchemaNode,
}

/// Resolve `C` from pre-loaded inputs.
pub fn resolve<C: Configurable>(input: ResolveInput) -> Result<Resolved<C>, KeyfigError> {
    let registry = Registry::for_class::<C>()?;
    resolve_with(&registry, input)
}

/// Resolve `C` using an already-built registry, which must contain `C`.
pub fn resolve_with<C: Configurable>(
    registry: &Registry,
    input: ResolveInput,
) -> Result<Resolved<C>, KeyfigError> {
    let options = &input.options;

    // 1: Plan
    let schema = schema::plan(
        registry,
        ClassId::of::<C>(),
        options.top_level_prefix.as_deref(),
    )?;

    // 2: Materialize sources
    let sources = materialize(&schema, &input)?;
    tracing::debug!(
        files = input.files.len(),
        env_files = input.env_files.len(),
        env_vars = sources.env.len(),
        priority = ?options.priority,
        "resolving config"
    );

    // 3: Collect raw values
    let raw = schema::collect(&schema, &sources, &options.priority);

    // 4: Coerce
    let coerce_options = CoerceOptions {
        strict: options.strict_coercion,
        expose_defaults: options.expose_default_values,
    };
    let mut coerced = coerce::coerce_tree(&schema, &raw, &coerce_options)?;

    // 5: Built-in checks
    let mut violations = validate::validate(&schema, &mut coerced, &options.validator_options);

    // 6: Assemble and instantiate
    let (config, misfits) = instantiate::<C>(&schema, coerced, options.expose_default_values)?;
    violations.extend(misfits);

    // 7: Type rules and policy
    violations.extend(config.validate());
    if !violations.is_empty() {
        if options.throw_on_validation_error {
            return Err(KeyfigError::Validation(ValidationErrors(violations)));
        }
        tracing::debug!(count = violations.len(), "returning config with violations");
    }

    Ok(Resolved {
        config,
        validation_errors: violations,
        schema,
    })
}

/// Build the three source lookups for a planned schema.
pub fn materialize(schema: &SchemaNode, input: &ResolveInput) -> Result<ResolvedSources, KeyfigError> {
    let file = file::merge_documents(&input.files)?;
    let env = env::env_map(&input.env_files, input.env_vars.iter().cloned())?;

    let mut cli_pairs = cli_arg_pairs(schema, &input.cli_args)?;
    cli_pairs.extend(overrides::select(&input.cli_overrides, schema));
    let cli = overrides::overrides_to_tree(&cli_pairs);

    Ok(ResolvedSources { file, env, cli })
}

#[cfg(feature = "clap")]
fn cli_arg_pairs(schema: &SchemaNode, args: &[String]) -> Result<Vec<(String, Value)>, KeyfigError> {
    crate::cli::parse_args(&schema::cli_keys(schema), args)
}

#[cfg(not(feature = "clap"))]
fn cli_arg_pairs(_schema: &SchemaNode, args: &[String]) -> Result<Vec<(String, Value)>, KeyfigError> {
    if !args.is_empty() {
        tracing::debug!("ignoring argument vector: built without the `clap` feature");
    }
    Ok(Vec::new())
}

/// Deserialize `C` from the coerced tree.
///
/// When that fails, every set leaf is tried on its own over the defaults. A
/// value its Rust field cannot hold (`70000` for a `u16`) is reported as a
/// `fitsType` violation and dropped, and the rest is built again.
fn instantiate<C: Configurable>(
    schema: &SchemaNode,
    mut coerced: Value,
    expose_defaults: bool,
) -> Result<(C, Vec<FieldViolation>), KeyfigError> {
    let defaults = ClassRef::of::<C>()
        .defaults()
        .map_err(|e| instantiate_error::<C>(format!("default instance does not serialize: {e}")))?;

    let tree = assemble(schema, &defaults, coerced.clone(), expose_defaults);
    let first = match serde_json::from_value(tree) {
        Ok(config) => return Ok((config, Vec::new())),
        Err(e) => e,
    };

    let misfits = misfit_leaves::<C>(schema, &defaults, &coerced);
    if misfits.is_empty() {
        return Err(instantiate_error::<C>(first.to_string()));
    }
    if let Value::Object(map) = &mut coerced {
        for misfit in &misfits {
            tracing::debug!(field = %misfit.path, "dropping value that does not fit its field");
            remove_path(map, &misfit.path);
        }
    }

    let tree = assemble(schema, &defaults, coerced, expose_defaults);
    let config = serde_json::from_value(tree).map_err(|e| instantiate_error::<C>(e.to_string()))?;
    Ok((config, misfits))
}

/// Leaves whose value alone, over the defaults, fails to deserialize.
fn misfit_leaves<C: Configurable>(
    schema: &SchemaNode,
    defaults: &Value,
    coerced: &Value,
) -> Vec<FieldViolation> {
    let Value::Object(base) = defaults else {
        return Vec::new();
    };
    if serde_json::from_value::<C>(defaults.clone()).is_err() {
        return Vec::new();
    }

    let mut misfits = Vec::new();
    for (path, _) in schema.leaves() {
        let Some(value) = get_path(coerced, &path).filter(|v| !v.is_null()) else {
            continue;
        };
        let mut trial = base.clone();
        set_path(&mut trial, &path, value.clone());
        let mut trial = Value::Object(trial);
        complete_groups(schema, &mut trial);
        if let Err(e) = serde_json::from_value::<C>(trial) {
            misfits.push(FieldViolation::new(
                path,
                Some(value.clone()),
                "fitsType",
                e.to_string(),
            ));
        }
    }
    misfits
}

fn instantiate_error<C: Configurable>(reason: String) -> KeyfigError {
    KeyfigError::Instantiate {
        class: ClassRef::of::<C>().name().to_string(),
        reason,
    }
}

/// The tree handed to serde: coerced values over the type's defaults, or
/// the coerced values alone.
fn assemble(schema: &SchemaNode, defaults: &Value, coerced: Value, expose_defaults: bool) -> Value {
    if !expose_defaults {
        return coerced;
    }
    let mut tree = match (defaults.clone(), coerced) {
        (Value::Object(base), Value::Object(overlay)) => Value::Object(overlay_values(base, overlay)),
        (_, coerced) => coerced,
    };
    complete_groups(schema, &mut tree);
    tree
}

/// Fill unset leaves of every group present in `tree` from the planned
/// defaults. An optional section whose default is `null` arrives here with
/// only the values some source set.
fn complete_groups(schema: &SchemaNode, tree: &mut Value) {
    let (Some(children), Value::Object(map)) = (schema.children(), tree) else {
        return;
    };
    for (name, child) in children {
        match child {
            SchemaNode::Group { .. } => {
                if let Some(inner) = map.get_mut(name) {
                    complete_groups(child, inner);
                }
            }
            SchemaNode::Leaf(leaf) => {
                if let Some(default) = &leaf.default
                    && map.get(name).is_none_or(Value::is_null)
                {
                    map.insert(name.clone(), default.clone());
                }
            }
        }
    }
}
