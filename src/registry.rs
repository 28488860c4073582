//! The field metadata store.
//!
//! A [`Registry`] maps `(config type, field name)` to a resolved
//! [`FieldDescriptor`]. It is filled once, before any resolution, by walking
//! descriptor tables from [`Configurable::describe`]: the root type, its
//! parent, and every type reachable through nested or array-of-class fields.
//! Resolution only ever borrows it immutably, so one registry can serve many
//! concurrent resolutions.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::KeyfigError;
use crate::field::{
    ArrayElement, ClassId, ClassRef, Configurable, Field, FieldType, KeyOverrides, Primitive,
};

/// A fully-resolved field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    /// Always present; defaults to the field name.
    pub generic_key: String,
    pub overrides: KeyOverrides,
    /// Key segment for nested fields; defaults to the field name.
    pub nested_key: String,
    pub field_type: FieldType,
    pub optional: bool,
    pub array_separator: String,
    /// Per-field strictness override. `None` follows the resolution options.
    pub lenient: Option<bool>,
}

#[derive(Debug, Clone)]
struct ClassEntry {
    class: ClassRef,
    namespace: Option<String>,
    fields: IndexMap<String, FieldDescriptor>,
}

#[derive(Debug, Default)]
pub struct Registry {
    classes: HashMap<ClassId, ClassEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `C` and everything it reaches.
    pub fn for_class<C: Configurable>() -> Result<Self, KeyfigError> {
        let mut registry = Self::new();
        registry.register_class::<C>()?;
        Ok(registry)
    }

    /// Register `C`'s descriptor table and, recursively, its parent and every
    /// nested or array-element type. Registering a type twice is a no-op.
    pub fn register_class<C: Configurable>(&mut self) -> Result<&mut Self, KeyfigError> {
        self.register_ref(ClassRef::of::<C>(), &mut Vec::new())?;
        Ok(self)
    }

    fn register_ref(
        &mut self,
        class: ClassRef,
        stack: &mut Vec<ClassId>,
    ) -> Result<(), KeyfigError> {
        if stack.contains(&class.id()) {
            return Err(KeyfigError::MissingTypeMetadata {
                class: class.name().to_string(),
                field: "*".into(),
                reason: "circular reference between config types".into(),
            });
        }
        if self.classes.contains_key(&class.id()) {
            return Ok(());
        }

        stack.push(class.id());
        let descriptor = class.describe();

        let mut fields = IndexMap::new();
        let mut namespace = descriptor.namespace;
        if let Some(parent) = descriptor.parent {
            self.register_ref(parent, stack)?;
            if let Some(entry) = self.classes.get(&parent.id()) {
                fields = entry.fields.clone();
                // A type without a namespace of its own inherits its parent's.
                if namespace.is_none() {
                    namespace = entry.namespace.clone();
                }
            }
        }

        for field in descriptor.fields {
            let resolved = resolve_field(&class, field)?;
            match &resolved.field_type {
                FieldType::Nested(child) | FieldType::Array(ArrayElement::Class(child)) => {
                    self.register_ref(*child, stack)?;
                }
                _ => {}
            }
            fields.insert(resolved.name.clone(), resolved);
        }
        stack.pop();

        tracing::trace!(class = class.name(), fields = fields.len(), "registered config type");
        self.classes.insert(
            class.id(),
            ClassEntry {
                class,
                namespace,
                fields,
            },
        );
        Ok(())
    }

    /// Add or replace a single field on `class`. A field with the same name
    /// keeps its position in the list.
    pub fn register(&mut self, class: ClassRef, field: FieldDescriptor) {
        self.classes
            .entry(class.id())
            .or_insert_with(|| ClassEntry {
                class,
                namespace: None,
                fields: IndexMap::new(),
            })
            .fields
            .insert(field.name.clone(), field);
    }

    /// Field names of `class` in declaration order (inherited fields first).
    /// Empty for unknown types.
    pub fn list(&self, class: ClassId) -> Vec<&str> {
        self.classes
            .get(&class)
            .map(|e| e.fields.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, class: ClassId, field: &str) -> Option<&FieldDescriptor> {
        self.classes.get(&class)?.fields.get(field)
    }

    pub fn namespace(&self, class: ClassId) -> Option<&str> {
        self.classes.get(&class)?.namespace.as_deref()
    }

    pub fn contains(&self, class: ClassId) -> bool {
        self.classes.contains_key(&class)
    }

    pub(crate) fn class(&self, class: ClassId) -> Option<&ClassRef> {
        self.classes.get(&class).map(|e| &e.class)
    }

    pub(crate) fn fields(&self, class: ClassId) -> impl Iterator<Item = &FieldDescriptor> {
        self.classes
            .get(&class)
            .into_iter()
            .flat_map(|e| e.fields.values())
    }
}

fn resolve_field(class: &ClassRef, field: Field) -> Result<FieldDescriptor, KeyfigError> {
    let missing = |reason: &str| KeyfigError::MissingTypeMetadata {
        class: class.name().to_string(),
        field: field.name.clone(),
        reason: reason.to_string(),
    };

    let Some(field_type) = field.field_type.clone() else {
        return Err(missing("no declared type"));
    };

    let radix = match &field_type {
        FieldType::Primitive(Primitive::Integer { radix })
        | FieldType::Array(ArrayElement::Primitive(Primitive::Integer { radix })) => Some(*radix),
        _ => None,
    };
    if let Some(radix) = radix
        && !(2..=36).contains(&radix)
    {
        return Err(missing("integer radix must be between 2 and 36"));
    }
    if matches!(field_type, FieldType::Array(_)) && field.array_separator.is_empty() {
        return Err(missing("array separator must not be empty"));
    }

    Ok(FieldDescriptor {
        generic_key: field.generic_key.unwrap_or_else(|| field.name.clone()),
        nested_key: field.nested_key.unwrap_or_else(|| field.name.clone()),
        name: field.name,
        overrides: field.overrides,
        field_type,
        optional: field.optional,
        array_separator: field.array_separator,
        lenient: field.lenient,
    })
}
