//! Typed configuration resolved from files, environment variables, and
//! command-line arguments.
//!
//! Declare a struct, describe its fields once, and keyfig reads each value
//! from wherever it is set: a YAML/TOML/JSON file, an environment variable
//! (or `.env` file), or a `--flag`. Every field gets a key in each of those
//! sources, derived from one generic key.
//!
//! ```ignore
//! let config: AppConfig = Keyfig::builder::<AppConfig>()
//!     .add_file("config.yml")
//!     .process_args()
//!     .load()?;
//! ```
//!
//! That call reads `config.yml`, the process environment, and the process
//! arguments, picks one value per field, coerces env and CLI strings into the
//! declared types, validates the result, and hands you a typed struct.
//!
//! # Declaring a config type
//!
//! A config type is a serde struct with a `Default` impl that implements
//! [`Configurable`]. Its [`describe()`](Configurable::describe) returns a
//! static descriptor table:
//!
//! ```ignore
//! #[derive(Default, Serialize, Deserialize)]
//! struct AppConfig {
//!     app_port: u16,
//!     tasks: Vec<String>,
//!     db: DbConfig,
//!     repositories: Vec<Repository>,
//! }
//!
//! impl Configurable for AppConfig {
//!     fn describe() -> ClassDescriptor {
//!         ClassDescriptor::new()
//!             .field(Field::number("app_port").generic_key("app.port"))
//!             .field(Field::array("tasks", Primitive::String).separator(":"))
//!             .field(Field::nested::<DbConfig>("db").nested_key("db.mysql"))
//!             .field(Field::array_of::<Repository>("repositories"))
//!     }
//! }
//! ```
//!
//! - **Defaults** come from the `Default` instance. A field with no default
//!   (`None`) that is not marked [`optional()`](Field::optional) must be set
//!   by some source, or validation reports it as `required`.
//! - **Nested types** ([`Field::nested`]) contribute their fields under the
//!   field's nested key. A type's [`namespace`](ClassDescriptor::namespace)
//!   adds one more segment to all of its keys.
//! - **Inheritance** ([`ClassDescriptor::extends`]) copies a base type's
//!   fields ahead of the type's own; redeclaring a field replaces it.
//!
//! Declarations are read once into a [`Registry`]. A field declared without
//! a type ([`Field::untyped`]) is rejected there, before any source is read.
//!
//! # Keys per source
//!
//! One generic key, such as `db.mysql.autoReconnect`, gives:
//!
//! | Source | Key | Example |
//! |--------|-----|---------|
//! | File | the generic key, as a path | `db: { mysql: { autoReconnect: true } }` |
//! | Env | upper snake case | `DB_MYSQL_AUTO_RECONNECT=true` |
//! | CLI | the generic key | `--db.mysql.autoReconnect=true` |
//!
//! Any of the three can be replaced per field with
//! [`env_key`](Field::env_key), [`file_key`](Field::file_key), or
//! [`cli_key`](Field::cli_key). Two fields that derive the same key both
//! read it; keys are not deduplicated.
//!
//! # Priority
//!
//! The priority list names sources from lowest to highest: the last source
//! that defines a key wins. The default is `[File, Env, Cli]`, so a flag
//! beats an env var beats a file. An explicit `null` counts as defined (it
//! shadows lower sources) and leaves the field at its default.
//!
//! ```text
//! Type defaults          Default::default()
//!        ↑ overridden by
//! File                   files in order, later files win
//!        ↑ overridden by
//! Env                    .env files in order, then the process environment
//!        ↑ overridden by
//! Cli                    --flags, then cli_override() values
//! ```
//!
//! Change the order with [`priority()`](KeyfigBuilder::priority).
//!
//! # Coercion and validation
//!
//! Env vars and flags are strings. Each value is coerced into its declared
//! type: numbers and integers (with a radix) are parsed, booleans accept
//! exactly `true` and `false`, arrays are split on the field's separator
//! (`,` by default), and arrays of config objects read each element as
//! `key=value;key=value`.
//!
//! With [`strict_coercion`](KeyfigBuilder::strict_coercion) on (the
//! default), a string that does not parse fails the whole resolution with
//! [`KeyfigError::Coercion`]. Off, the string is kept and the validator
//! reports it.
//!
//! Validation runs the built-in type checks, then the type's own
//! [`validate()`](Configurable::validate) rules. Violations fail resolution
//! by default; with
//! [`throw_on_validation_error(false)`](KeyfigBuilder::throw_on_validation_error)
//! they are returned in [`Resolved::validation_errors`] and the offending
//! fields keep their defaults. A value that passes the type checks but does
//! not fit the Rust field (`70000` for a `u16`) is reported the same way,
//! under the `fitsType` constraint.
//!
//! # Schema and docs
//!
//! The planned schema is available without reading any source
//! ([`schema()`](KeyfigBuilder::schema)). [`docs::json_schema`] turns it into
//! a draft-07 JSON Schema of the file layout, where every value also lists
//! its keys in all three sources. [`docs::markdown`] renders a reference
//! page for one source.
//!
//! # Core library and clap adapter
//!
//! Resolution itself is pure: [`resolve::resolve`] takes pre-loaded
//! [`ResolveInput`] and does no I/O, so any source can be tested with
//! synthetic data. The builder only reads files and the environment.
//!
//! The `clap` Cargo feature (on by default) adds the argument-vector source
//! ([`args()`](KeyfigBuilder::args)) and [`ConfigArgs`], a derive type that
//! gives your app `config list|get|schema|doc` subcommands. Without it:
//!
//! ```toml
//! keyfig = { version = "...", default-features = false }
//! ```
//!
//! Programmatic overrides ([`cli_override()`](KeyfigBuilder::cli_override),
//! [`cli_overrides_from()`](KeyfigBuilder::cli_overrides_from)) feed the CLI
//! source either way.
//!
//! # Error handling
//!
//! All fallible operations return [`KeyfigError`]. Messages name the file,
//! key, or field path involved and the value that was received. See the
//! [`error`] module for the full set.

pub mod docs;
pub mod error;
pub mod resolve;
pub mod schema;
pub mod types;

mod builder;
#[cfg(feature = "clap")]
mod cli;
mod coerce;
mod env;
mod field;
mod file;
mod keys;
pub(crate) mod merge;
mod ops;
mod overrides;
mod priority;
mod registry;
mod validate;

#[cfg(test)]
mod fixtures;

pub use builder::{Keyfig, KeyfigBuilder};
#[cfg(feature = "clap")]
pub use cli::{ConfigArgs, ConfigSubcommand};
pub use docs::DocOptions;
pub use error::{FieldViolation, KeyfigError, ValidationErrors};
pub use field::{
    ArrayElement, ClassDescriptor, ClassId, ClassRef, Configurable, Field, FieldType,
    KeyOverrides, Primitive,
};
pub use keys::derive_key;
pub use ops::ConfigResult;
pub use overrides::CliOverride;
pub use priority::{Lookup, pick};
pub use registry::{FieldDescriptor, Registry};
pub use resolve::{ResolveInput, ResolveOptions, Resolved, resolve};
pub use schema::{SchemaLeaf, SchemaNode, SourceKeys};
pub use types::{ConfigAction, SourceKind, default_priority};
pub use validate::ValidatorOptions;
