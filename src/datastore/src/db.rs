// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The model/entity mapping layer.
//!
//! This module moves data between typed application structs and the
//! wire-level [Entity] representation. A struct participates by
//! implementing [Model], a small trait of hand-written accessors, and by
//! describing its schema in a [ModelDescriptor]: the kind name, and for
//! each property the field name, the wire property name, the expected type,
//! and the indexing policy.
//!
//! Descriptors are collected in a [ModelRegistry], built once at startup and
//! passed around explicitly. The registry checks the schema invariants at
//! registration time: kind names are unique, property names within a kind
//! are unique, and the identifier is never declared as a property (it lives
//! in the key).
//!
//! # Example
//! ```
//! # use gcloud_datastore::db::*;
//! # use gcloud_datastore::model::Value;
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct Book {
//!     id: Option<i64>,
//!     title: String,
//! }
//!
//! impl Model for Book {
//!     fn id(&self) -> Option<IdValue> {
//!         self.id.map(IdValue::Int)
//!     }
//!     fn set_id(&mut self, id: IdValue) {
//!         if let IdValue::Int(v) = id {
//!             self.id = Some(v);
//!         }
//!     }
//!     fn get(&self, field: &str) -> Option<Value> {
//!         match field {
//!             "title" => Some(Value::string(&self.title)),
//!             _ => None,
//!         }
//!     }
//!     fn set(&mut self, field: &str, value: Value) -> bool {
//!         use gcloud_datastore::model::ValueKind;
//!         match (field, value.kind) {
//!             ("title", ValueKind::String(v)) => self.title = v,
//!             _ => return false,
//!         }
//!         true
//!     }
//! }
//!
//! let descriptor = ModelDescriptor::<Book>::builder("Book")
//!     .property(PropertyDescriptor::new("title", PropertyType::String).required())
//!     .build()?;
//! let registry = ModelRegistry::builder().register(descriptor)?.build();
//! # Ok::<(), SchemaError>(())
//! ```

use crate::model::{Entity, Key, PartitionId, Value, ValueKind};
use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

/// The reserved name of the synthetic property holding the class path of
/// polymorphic models.
const CLASS_PROPERTY: &str = "class";

/// The reserved name of the identifier. The identifier is part of the key,
/// it is never stored as an entity property.
const ID_FIELD: &str = "id";

/// The identifier of a model: either an integer or a string.
///
/// Every model has exactly one identifier. It is not a named property, it is
/// stored in the last element of the entity key path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum IdValue {
    Int(i64),
    Name(String),
}

impl From<i64> for IdValue {
    fn from(value: i64) -> Self {
        IdValue::Int(value)
    }
}

impl From<&str> for IdValue {
    fn from(value: &str) -> Self {
        IdValue::Name(value.to_string())
    }
}

impl From<String> for IdValue {
    fn from(value: String) -> Self {
        IdValue::Name(value)
    }
}

/// The accessor functions connecting a struct to the mapper.
///
/// Languages with runtime reflection discover these dynamically. Here they
/// are hand-written (or generated) per model type, see the [module
/// documentation][crate::db] for an example.
pub trait Model: Default + Send + Sync + 'static {
    /// The identifier, `None` until the entity is stored and an ID is
    /// allocated.
    fn id(&self) -> Option<IdValue>;

    /// Stores the identifier, typically after an auto-ID insert.
    fn set_id(&mut self, id: IdValue);

    /// Reads a declared property by field name. `None` if the field is
    /// unset.
    fn get(&self, field: &str) -> Option<Value>;

    /// Writes a declared property by field name. Returns `false` if the
    /// field is unknown or the value has the wrong shape.
    fn set(&mut self, field: &str, value: Value) -> bool;

    /// The key of the ancestor entity, if any.
    fn parent_key(&self) -> Option<Key> {
        None
    }

    /// Stores the ancestor key on decode. Models without ancestors ignore
    /// it.
    fn set_parent_key(&mut self, _key: Key) {}

    /// The extra properties of an expando model, beyond the declared
    /// schema.
    fn extra_properties(&self) -> Vec<(String, Value)> {
        Vec::new()
    }

    /// Stores an extra property on an expando model. Returns `false` if the
    /// model does not accept extra properties.
    fn set_extra_property(&mut self, _name: &str, _value: Value) -> bool {
        false
    }
}

/// The expected type of a property, used for validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum PropertyType {
    Boolean,
    Integer,
    Double,
    String,
    Timestamp,
    Blob,
    Key,
    Entity,
    Array,
    /// No validation, any value type is accepted.
    Any,
}

impl PropertyType {
    fn matches(&self, kind: &ValueKind) -> bool {
        // Null is accepted for any declared type, absence and null are both
        // the "unset" state.
        matches!(
            (self, kind),
            (PropertyType::Any, _)
                | (_, ValueKind::Null)
                | (PropertyType::Boolean, ValueKind::Boolean(_))
                | (PropertyType::Integer, ValueKind::Integer(_))
                | (PropertyType::Double, ValueKind::Double(_))
                | (PropertyType::String, ValueKind::String(_))
                | (PropertyType::Timestamp, ValueKind::Timestamp(_))
                | (PropertyType::Blob, ValueKind::Blob(_))
                | (PropertyType::Key, ValueKind::Key(_))
                | (PropertyType::Entity, ValueKind::Entity(_))
                | (PropertyType::Array, ValueKind::Array(_))
        )
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PropertyType::Boolean => "boolean",
            PropertyType::Integer => "integer",
            PropertyType::Double => "double",
            PropertyType::String => "string",
            PropertyType::Timestamp => "timestamp",
            PropertyType::Blob => "blob",
            PropertyType::Key => "key",
            PropertyType::Entity => "entity",
            PropertyType::Array => "array",
            PropertyType::Any => "any",
        };
        f.write_str(name)
    }
}

/// Describes one property of a model: the field name on the struct, the
/// property name on the wire, the expected type, and the indexing policy.
#[derive(Clone, Debug)]
pub struct PropertyDescriptor {
    field: String,
    property_name: String,
    property_type: PropertyType,
    required: bool,
    indexed: bool,
}

impl PropertyDescriptor {
    /// Creates a descriptor for `field`, stored under the same name on the
    /// wire, optional and indexed.
    pub fn new<T: Into<String>>(field: T, property_type: PropertyType) -> Self {
        let field = field.into();
        Self {
            property_name: field.clone(),
            field,
            property_type,
            required: false,
            indexed: true,
        }
    }

    /// Stores the property under a different name on the wire.
    pub fn with_property_name<T: Into<String>>(mut self, v: T) -> Self {
        self.property_name = v.into();
        self
    }

    /// Marks the property as required: encode and decode fail when unset.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Excludes the property from all indexes.
    pub fn unindexed(mut self) -> Self {
        self.indexed = false;
        self
    }
}

/// The errors detected when building descriptors and registries.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("duplicate kind name {0}")]
    DuplicateKind(String),
    #[error("kind {kind}: duplicate property name {property}")]
    DuplicateProperty { kind: String, property: String },
    #[error("kind {kind}: property name {property} is reserved")]
    ReservedProperty { kind: String, property: String },
    #[error("kind {kind}: duplicate class path {path:?}")]
    DuplicateClass { kind: String, path: Vec<String> },
    #[error("kind {kind}: the class path of a polymorphic model may not be empty")]
    EmptyClassPath { kind: String },
    #[error("the model type for kind {0} is registered twice")]
    DuplicateModelType(String),
}

/// The errors produced while mapping between models and entities.
///
/// The errors identify the offending kind and property.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum MappingError {
    #[error("the entity has no key")]
    MissingKey,
    #[error("expected an entity of kind {expected}, the key has kind {got:?}")]
    KindMismatch {
        expected: String,
        got: Option<String>,
    },
    #[error("kind {kind}: missing required property {property}")]
    MissingProperty { kind: String, property: String },
    #[error("kind {kind}: property {property} does not have the expected type {expected}")]
    TypeMismatch {
        kind: String,
        property: String,
        expected: PropertyType,
    },
    #[error("kind {kind}: unknown property {property}")]
    UnknownProperty { kind: String, property: String },
    #[error("kind {kind}: property {property} conflicts with a declared property")]
    PropertyConflict { kind: String, property: String },
    #[error("kind {kind}: the model cannot represent property {property}")]
    RejectedProperty { kind: String, property: String },
    #[error("kind {kind}: expected class {expected:?}, the entity has class {got:?}")]
    ClassMismatch {
        kind: String,
        expected: Vec<String>,
        got: Vec<String>,
    },
    #[error("no model registered for kind {0}")]
    UnknownKind(String),
    #[error("kind {kind}: no model registered for class {path:?}")]
    UnknownClass { kind: String, path: Vec<String> },
    #[error("the model type is not registered")]
    UnregisteredType,
}

/// Builds [ModelDescriptor] values, validating the schema.
pub struct ModelDescriptorBuilder<M> {
    kind: String,
    class_path: Vec<String>,
    expando: bool,
    properties: Vec<PropertyDescriptor>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Model> ModelDescriptorBuilder<M> {
    /// Adds a property to the schema.
    pub fn property(mut self, descriptor: PropertyDescriptor) -> Self {
        self.properties.push(descriptor);
        self
    }

    /// Permits arbitrary extra properties beyond the declared schema.
    ///
    /// The extra properties round-trip opaquely through
    /// [Model::extra_properties] and [Model::set_extra_property].
    pub fn expando(mut self) -> Self {
        self.expando = true;
        self
    }

    /// Declares this model as one leaf of a polymorphic hierarchy.
    ///
    /// All models in the hierarchy share the kind of the root class. The
    /// class path, from root to leaf, is stored in a synthetic `class`
    /// property and selects the concrete model type on decode.
    pub fn class_path<I, T>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.class_path = path.into_iter().map(Into::into).collect();
        self
    }

    /// Validates the schema and builds the descriptor.
    ///
    /// Property name collisions within the schema are rejected here, at
    /// registration time, not during encode or decode.
    pub fn build(self) -> Result<ModelDescriptor<M>, SchemaError> {
        let mut fields = BTreeSet::new();
        let mut names = BTreeSet::new();
        for property in &self.properties {
            for reserved in [ID_FIELD, CLASS_PROPERTY] {
                if property.field == reserved || property.property_name == reserved {
                    return Err(SchemaError::ReservedProperty {
                        kind: self.kind,
                        property: reserved.to_string(),
                    });
                }
            }
            if !fields.insert(property.field.clone()) {
                return Err(SchemaError::DuplicateProperty {
                    kind: self.kind,
                    property: property.field.clone(),
                });
            }
            if !names.insert(property.property_name.clone()) {
                return Err(SchemaError::DuplicateProperty {
                    kind: self.kind,
                    property: property.property_name.clone(),
                });
            }
        }
        Ok(ModelDescriptor {
            kind: self.kind,
            class_path: self.class_path,
            expando: self.expando,
            properties: self.properties,
            _marker: PhantomData,
        })
    }
}

/// The schema binding a model type to a kind.
pub struct ModelDescriptor<M> {
    kind: String,
    class_path: Vec<String>,
    expando: bool,
    properties: Vec<PropertyDescriptor>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Model> ModelDescriptor<M> {
    /// Starts a builder for a model of the given kind.
    pub fn builder<T: Into<String>>(kind: T) -> ModelDescriptorBuilder<M> {
        ModelDescriptorBuilder {
            kind: kind.into(),
            class_path: Vec::new(),
            expando: false,
            properties: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// The kind name for this model.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The class path of a polymorphic model, empty otherwise.
    pub fn class_path(&self) -> &[String] {
        &self.class_path
    }

    /// Builds the key for a model instance.
    ///
    /// The key is incomplete when the model has no ID yet.
    pub fn key_for(&self, model: &M, partition: &PartitionId) -> Key {
        let mut key = match model.parent_key() {
            Some(parent) => parent.child(&self.kind),
            None => {
                let key = Key::new(&self.kind);
                if partition == &PartitionId::default() {
                    key
                } else {
                    key.with_partition(partition.clone())
                }
            }
        };
        match model.id() {
            Some(IdValue::Int(id)) => key = key.with_id(id),
            Some(IdValue::Name(name)) => key = key.with_name(name),
            None => {}
        }
        key
    }

    /// Encodes a model into its wire entity.
    ///
    /// Validates the required properties and the property types; the errors
    /// identify the offending property.
    pub fn encode(&self, model: &M, partition: &PartitionId) -> Result<Entity, MappingError> {
        let mut entity = Entity::default().set_key(self.key_for(model, partition));
        for property in &self.properties {
            let value = match model.get(&property.field) {
                None if property.required => {
                    return Err(MappingError::MissingProperty {
                        kind: self.kind.clone(),
                        property: property.field.clone(),
                    });
                }
                None => continue,
                Some(value) => value,
            };
            if !property.property_type.matches(&value.kind) {
                return Err(MappingError::TypeMismatch {
                    kind: self.kind.clone(),
                    property: property.field.clone(),
                    expected: property.property_type,
                });
            }
            let value = apply_index_policy(value, property.indexed);
            entity = entity.set_property(&property.property_name, value);
        }
        if self.expando {
            for (name, value) in model.extra_properties() {
                if entity.properties.contains_key(&name)
                    || name == CLASS_PROPERTY
                    || name == ID_FIELD
                {
                    return Err(MappingError::PropertyConflict {
                        kind: self.kind.clone(),
                        property: name,
                    });
                }
                entity = entity.set_property(name, value);
            }
        }
        if !self.class_path.is_empty() {
            let class = self
                .class_path
                .iter()
                .map(|c| Value::string(c.clone()))
                .collect::<Vec<_>>();
            entity = entity.set_property(CLASS_PROPERTY, Value::array(class));
        }
        Ok(entity)
    }

    /// Decodes a wire entity into a model.
    ///
    /// Validates the kind, the class path (for polymorphic models), the
    /// required properties and the property types.
    pub fn decode(&self, entity: &Entity) -> Result<M, MappingError> {
        let key = entity.key.as_ref().ok_or(MappingError::MissingKey)?;
        if key.kind() != Some(self.kind.as_str()) {
            return Err(MappingError::KindMismatch {
                expected: self.kind.clone(),
                got: key.kind().map(str::to_string),
            });
        }
        let entity_class = class_path_of(entity);
        if entity_class != self.class_path {
            return Err(MappingError::ClassMismatch {
                kind: self.kind.clone(),
                expected: self.class_path.clone(),
                got: entity_class,
            });
        }

        let mut model = M::default();
        if let Some(element) = key.path.last() {
            if let Some(id) = element.id {
                model.set_id(IdValue::Int(id));
            } else if let Some(name) = &element.name {
                model.set_id(IdValue::Name(name.clone()));
            }
        }
        if let Some(parent) = key.parent() {
            model.set_parent_key(parent);
        }

        let mut seen = BTreeSet::new();
        for (name, value) in &entity.properties {
            if name == CLASS_PROPERTY && !self.class_path.is_empty() {
                continue;
            }
            match self.properties.iter().find(|p| &p.property_name == name) {
                Some(property) => {
                    if !property.property_type.matches(&value.kind) {
                        return Err(MappingError::TypeMismatch {
                            kind: self.kind.clone(),
                            property: property.property_name.clone(),
                            expected: property.property_type,
                        });
                    }
                    if !model.set(&property.field, value.clone()) {
                        return Err(MappingError::RejectedProperty {
                            kind: self.kind.clone(),
                            property: property.field.clone(),
                        });
                    }
                    seen.insert(property.property_name.as_str());
                }
                None if self.expando => {
                    if !model.set_extra_property(name, value.clone()) {
                        return Err(MappingError::RejectedProperty {
                            kind: self.kind.clone(),
                            property: name.clone(),
                        });
                    }
                }
                None => {
                    return Err(MappingError::UnknownProperty {
                        kind: self.kind.clone(),
                        property: name.clone(),
                    });
                }
            }
        }
        if let Some(missing) = self
            .properties
            .iter()
            .find(|p| p.required && !seen.contains(p.property_name.as_str()))
        {
            return Err(MappingError::MissingProperty {
                kind: self.kind.clone(),
                property: missing.property_name.clone(),
            });
        }
        Ok(model)
    }
}

/// Applies the descriptor's indexing policy to an encoded value.
///
/// The service rejects the exclusion flag on array values themselves, the
/// flag belongs on each element.
fn apply_index_policy(mut value: Value, indexed: bool) -> Value {
    if indexed {
        return value;
    }
    match value.kind {
        ValueKind::Array(elements) => {
            let elements = elements
                .into_iter()
                .map(|v| v.with_exclude_from_indexes(true))
                .collect();
            value.kind = ValueKind::Array(elements);
            value.exclude_from_indexes = false;
            value
        }
        _ => value.with_exclude_from_indexes(true),
    }
}

/// The class path stored in an entity, empty for plain entities.
fn class_path_of(entity: &Entity) -> Vec<String> {
    let Some(value) = entity.properties.get(CLASS_PROPERTY) else {
        return Vec::new();
    };
    let ValueKind::Array(elements) = &value.kind else {
        return Vec::new();
    };
    elements
        .iter()
        .filter_map(|v| match &v.kind {
            ValueKind::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

/// Type-erased access to a [ModelDescriptor], used for polymorphic
/// dispatch.
trait ErasedDescriptor: Send + Sync {
    fn decode_erased(&self, entity: &Entity) -> Result<Box<dyn Any + Send>, MappingError>;
}

impl<M: Model> ErasedDescriptor for ModelDescriptor<M> {
    fn decode_erased(&self, entity: &Entity) -> Result<Box<dyn Any + Send>, MappingError> {
        Ok(Box::new(self.decode(entity)?))
    }
}

struct KindEntry {
    // Plain kinds have a single decoder under the empty class path.
    decoders: HashMap<Vec<String>, Arc<dyn ErasedDescriptor>>,
}

/// Builds a [ModelRegistry], validating the registration invariants.
#[derive(Default)]
pub struct ModelRegistryBuilder {
    kinds: HashMap<String, KindEntry>,
    types: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ModelRegistryBuilder {
    /// Registers a model descriptor.
    ///
    /// Kind names are unique across the registry: two plain models may not
    /// share a kind, and a plain model may not share a kind with a
    /// polymorphic hierarchy. Within a hierarchy, class paths are unique.
    pub fn register<M: Model>(
        mut self,
        descriptor: ModelDescriptor<M>,
    ) -> Result<Self, SchemaError> {
        let kind = descriptor.kind.clone();
        let class_path = descriptor.class_path.clone();
        if self.types.contains_key(&TypeId::of::<M>()) {
            return Err(SchemaError::DuplicateModelType(kind));
        }
        let descriptor = Arc::new(descriptor);
        match self.kinds.get_mut(&kind) {
            None => {
                let mut decoders: HashMap<_, Arc<dyn ErasedDescriptor>> = HashMap::new();
                decoders.insert(class_path, descriptor.clone());
                self.kinds.insert(kind.clone(), KindEntry { decoders });
            }
            Some(entry) => {
                // Sharing a kind is only valid between members of a
                // polymorphic hierarchy.
                let polymorphic =
                    !class_path.is_empty() && entry.decoders.keys().all(|k| !k.is_empty());
                if !polymorphic {
                    return Err(SchemaError::DuplicateKind(kind));
                }
                if entry.decoders.contains_key(&class_path) {
                    return Err(SchemaError::DuplicateClass {
                        kind,
                        path: class_path,
                    });
                }
                let erased: Arc<dyn ErasedDescriptor> = descriptor.clone();
                entry.decoders.insert(class_path, erased);
            }
        }
        self.types.insert(TypeId::of::<M>(), descriptor);
        Ok(self)
    }

    /// Builds the registry.
    pub fn build(self) -> ModelRegistry {
        ModelRegistry {
            kinds: self.kinds,
            types: self.types,
        }
    }
}

/// An explicitly constructed collection of model schemas.
///
/// The registry is immutable once built. Share it with [Arc] if multiple
/// clients need it.
pub struct ModelRegistry {
    kinds: HashMap<String, KindEntry>,
    types: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ModelRegistry {
    /// Starts a registry builder.
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// The descriptor registered for `M`, if any.
    pub fn descriptor<M: Model>(&self) -> Option<&ModelDescriptor<M>> {
        self.types
            .get(&TypeId::of::<M>())
            .and_then(|d| d.downcast_ref::<ModelDescriptor<M>>())
    }

    /// Encodes a model into its wire entity.
    pub fn encode<M: Model>(
        &self,
        model: &M,
        partition: &PartitionId,
    ) -> Result<Entity, MappingError> {
        self.descriptor::<M>()
            .ok_or(MappingError::UnregisteredType)?
            .encode(model, partition)
    }

    /// Decodes a wire entity into a model of a known type.
    pub fn decode<M: Model>(&self, entity: &Entity) -> Result<M, MappingError> {
        self.descriptor::<M>()
            .ok_or(MappingError::UnregisteredType)?
            .decode(entity)
    }

    /// Decodes a wire entity, dispatching on its kind and class path.
    ///
    /// For polymorphic hierarchies this selects the registered leaf model
    /// matching the entity's `class` property. The caller downcasts the
    /// result to the concrete model type.
    ///
    /// # Example
    /// ```no_run
    /// # use gcloud_datastore::db::ModelRegistry;
    /// # use gcloud_datastore::model::Entity;
    /// # fn sample(registry: &ModelRegistry, entity: &Entity) {
    /// # #[derive(Default)] struct Dog;
    /// # impl gcloud_datastore::db::Model for Dog {
    /// #     fn id(&self) -> Option<gcloud_datastore::db::IdValue> { None }
    /// #     fn set_id(&mut self, _: gcloud_datastore::db::IdValue) {}
    /// #     fn get(&self, _: &str) -> Option<gcloud_datastore::model::Value> { None }
    /// #     fn set(&mut self, _: &str, _: gcloud_datastore::model::Value) -> bool { false }
    /// # }
    /// let decoded = registry.decode_dispatch(entity).unwrap();
    /// if let Some(dog) = decoded.downcast_ref::<Dog>() {
    ///     // ...
    /// }
    /// # }
    /// ```
    pub fn decode_dispatch(&self, entity: &Entity) -> Result<Box<dyn Any + Send>, MappingError> {
        let kind = entity
            .key
            .as_ref()
            .ok_or(MappingError::MissingKey)?
            .kind()
            .ok_or(MappingError::MissingKey)?;
        let entry = self
            .kinds
            .get(kind)
            .ok_or_else(|| MappingError::UnknownKind(kind.to_string()))?;
        let class_path = class_path_of(entity);
        let descriptor =
            entry
                .decoders
                .get(&class_path)
                .ok_or_else(|| MappingError::UnknownClass {
                    kind: kind.to_string(),
                    path: class_path.clone(),
                })?;
        descriptor.decode_erased(entity)
    }
}
