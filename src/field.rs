//! Declaring config types: the [`Configurable`] trait and its descriptor tables.
//!
//! A config type is an ordinary serde struct with a `Default` impl. Its
//! `describe()` returns a [`ClassDescriptor`] listing every config field with
//! its declared type and key mapping. The descriptor is static data: it is read
//! once into a [`Registry`](crate::Registry) and never consulted through the
//! struct itself.
//!
//! ```ignore
//! #[derive(Default, Serialize, Deserialize)]
//! struct AppConfig {
//!     app_port: u16,
//!     tasks: Vec<String>,
//!     db: DbConfig,
//! }
//!
//! impl Configurable for AppConfig {
//!     fn describe() -> ClassDescriptor {
//!         ClassDescriptor::new()
//!             .field(Field::number("app_port").generic_key("app.port"))
//!             .field(Field::array("tasks", Primitive::String).separator(":"))
//!             .field(Field::nested::<DbConfig>("db").nested_key("db.mysql"))
//!     }
//! }
//! ```
//!
//! Field names must match the serialized (serde) names of the struct fields,
//! since resolved values are assembled into a tree and deserialized.

use std::any::TypeId;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::FieldViolation;

/// A struct that can be resolved from config sources.
pub trait Configurable: Default + Serialize + DeserializeOwned + 'static {
    /// The static descriptor table for this type's config fields.
    fn describe() -> ClassDescriptor;

    /// Custom validation rules, run on the built instance after the built-in
    /// structural checks.
    fn validate(&self) -> Vec<FieldViolation> {
        Vec::new()
    }
}

/// Identity of a config type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(TypeId);

impl ClassId {
    pub fn of<C: 'static>() -> Self {
        ClassId(TypeId::of::<C>())
    }
}

/// A handle to a [`Configurable`] type: its identity, name, descriptor table,
/// and a way to produce its default instance as a value tree.
#[derive(Clone, Copy)]
pub struct ClassRef {
    id: ClassId,
    name: &'static str,
    describe: fn() -> ClassDescriptor,
    defaults: fn() -> Result<Value, serde_json::Error>,
}

impl ClassRef {
    pub fn of<C: Configurable>() -> Self {
        ClassRef {
            id: ClassId::of::<C>(),
            name: std::any::type_name::<C>(),
            describe: C::describe,
            defaults: defaults_of::<C>,
        }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    /// The type name without its module path.
    pub fn name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }

    pub fn describe(&self) -> ClassDescriptor {
        (self.describe)()
    }

    /// The type's `Default` instance serialized into a value tree.
    pub fn defaults(&self) -> Result<Value, serde_json::Error> {
        (self.defaults)()
    }
}

fn defaults_of<C: Configurable>() -> Result<Value, serde_json::Error> {
    serde_json::to_value(C::default())
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClassRef {}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({})", self.name())
    }
}

/// Scalar field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    /// Any number. Strings are parsed as integers first, then as floats.
    Number,
    /// Whole numbers parsed with the given radix.
    Integer { radix: u32 },
    Boolean,
}

impl Primitive {
    /// JSON-Schema type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Number => "number",
            Primitive::Integer { .. } => "integer",
            Primitive::Boolean => "boolean",
        }
    }
}

/// What an array field holds.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElement {
    Primitive(Primitive),
    Class(ClassRef),
}

/// The declared type of a config field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Primitive(Primitive),
    Array(ArrayElement),
    Nested(ClassRef),
    /// Passed through as-is: no coercion, no type check.
    Raw,
}

impl FieldType {
    /// JSON-Schema type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Primitive(p) => p.type_name(),
            FieldType::Array(_) => "array",
            FieldType::Nested(_) => "object",
            FieldType::Raw => "any",
        }
    }
}

/// Explicit per-source keys that replace the derived ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyOverrides {
    pub file: Option<String>,
    pub env: Option<String>,
    pub cli: Option<String>,
}

/// Builder for one field declaration. Turned into a
/// [`FieldDescriptor`](crate::FieldDescriptor) on registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) generic_key: Option<String>,
    pub(crate) overrides: KeyOverrides,
    pub(crate) nested_key: Option<String>,
    pub(crate) field_type: Option<FieldType>,
    pub(crate) optional: bool,
    pub(crate) array_separator: String,
    pub(crate) lenient: Option<bool>,
}

impl Field {
    /// A field whose type is supplied later with [`of`](Self::of).
    /// Registering it without a type fails.
    pub fn untyped(name: &str) -> Self {
        Field {
            name: name.to_string(),
            generic_key: None,
            overrides: KeyOverrides::default(),
            nested_key: None,
            field_type: None,
            optional: false,
            array_separator: ",".to_string(),
            lenient: None,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::untyped(name).of(FieldType::Primitive(Primitive::String))
    }

    pub fn number(name: &str) -> Self {
        Self::untyped(name).of(FieldType::Primitive(Primitive::Number))
    }

    /// Base-10 integer; change the radix with [`radix`](Self::radix).
    pub fn integer(name: &str) -> Self {
        Self::untyped(name).of(FieldType::Primitive(Primitive::Integer { radix: 10 }))
    }

    pub fn boolean(name: &str) -> Self {
        Self::untyped(name).of(FieldType::Primitive(Primitive::Boolean))
    }

    /// Array of primitives. String inputs are split on the separator (`,`).
    pub fn array(name: &str, element: Primitive) -> Self {
        Self::untyped(name).of(FieldType::Array(ArrayElement::Primitive(element)))
    }

    /// Array of config objects. String elements are `key=value` pairs joined with `;`.
    pub fn array_of<T: Configurable>(name: &str) -> Self {
        Self::untyped(name).of(FieldType::Array(ArrayElement::Class(ClassRef::of::<T>())))
    }

    /// A nested config object, resolved under this field's nested key.
    pub fn nested<T: Configurable>(name: &str) -> Self {
        Self::untyped(name).of(FieldType::Nested(ClassRef::of::<T>()))
    }

    pub fn raw(name: &str) -> Self {
        Self::untyped(name).of(FieldType::Raw)
    }

    pub fn of(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    /// Generic key used to derive all source keys (default: the field name).
    pub fn generic_key(mut self, key: &str) -> Self {
        self.generic_key = Some(key.to_string());
        self
    }

    pub fn file_key(mut self, key: &str) -> Self {
        self.overrides.file = Some(key.to_string());
        self
    }

    pub fn env_key(mut self, key: &str) -> Self {
        self.overrides.env = Some(key.to_string());
        self
    }

    pub fn cli_key(mut self, key: &str) -> Self {
        self.overrides.cli = Some(key.to_string());
        self
    }

    /// Key segment contributed by a nested field (default: the field name).
    /// May itself be dotted, e.g. `db.mysql`.
    pub fn nested_key(mut self, key: &str) -> Self {
        self.nested_key = Some(key.to_string());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn separator(mut self, separator: &str) -> Self {
        self.array_separator = separator.to_string();
        self
    }

    /// Radix for integer fields and integer arrays. No effect on other types.
    pub fn radix(mut self, radix: u32) -> Self {
        self.field_type = match self.field_type {
            Some(FieldType::Primitive(Primitive::Integer { .. })) => {
                Some(FieldType::Primitive(Primitive::Integer { radix }))
            }
            Some(FieldType::Array(ArrayElement::Primitive(Primitive::Integer { .. }))) => Some(
                FieldType::Array(ArrayElement::Primitive(Primitive::Integer { radix })),
            ),
            other => other,
        };
        self
    }

    /// Pass unparseable strings through instead of failing, for this field only.
    pub fn lenient(mut self) -> Self {
        self.lenient = Some(true);
        self
    }

    /// Fail on unparseable strings for this field even when coercion is lenient globally.
    pub fn strict(mut self) -> Self {
        self.lenient = Some(false);
        self
    }
}

/// The declaration of one config type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassDescriptor {
    pub(crate) namespace: Option<String>,
    pub(crate) parent: Option<ClassRef>,
    pub(crate) fields: Vec<Field>,
}

impl ClassDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix applied to every key declared on this type and on types nested
    /// under it.
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Inherit the parent's field list. Parent fields come first; a field
    /// declared here with the same name replaces the inherited one.
    ///
    /// The struct must embed the parent's fields under the same names,
    /// typically with `#[serde(flatten)]`.
    pub fn extends<P: Configurable>(mut self) -> Self {
        self.parent = Some(ClassRef::of::<P>());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}
