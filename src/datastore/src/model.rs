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

//! The request and response types of the Cloud Datastore v1 API.
//!
//! These are the opaque wire types exchanged with the service. The JSON
//! representation follows the proto-JSON conventions of the REST API:
//! 64-bit integers are encoded as decimal strings, and byte fields are
//! base64.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A partition ID identifies a grouping of entities.
///
/// The grouping is always by project and namespace, however the namespace ID
/// may be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct PartitionId {
    /// The ID of the project to which the entities belong.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub project_id: String,

    /// If not empty, the ID of the namespace to which the entities belong.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace_id: String,
}

impl PartitionId {
    /// Sets the value of `project_id`.
    pub fn set_project_id<T: Into<String>>(mut self, v: T) -> Self {
        self.project_id = v.into();
        self
    }

    /// Sets the value of `namespace_id`.
    pub fn set_namespace_id<T: Into<String>>(mut self, v: T) -> Self {
        self.namespace_id = v.into();
        self
    }
}

/// A (kind, ID/name) pair used to construct a key path.
///
/// If neither `id` nor `name` is set the element is *incomplete*: the
/// service assigns an ID when the entity is inserted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct PathElement {
    /// The kind of the entity. Kinds matching `__.*__` are reserved.
    pub kind: String,

    /// The auto-allocated ID of the entity. Never equal to zero.
    #[serde(
        with = "int64::option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub id: Option<i64>,

    /// The name of the entity. Names matching `__.*__` are reserved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PathElement {
    /// If true, the element has an ID or a name.
    pub fn is_complete(&self) -> bool {
        self.id.is_some() || self.name.is_some()
    }
}

/// A unique identifier for an entity.
///
/// A key is an ordered path of [PathElement], scoped by a [PartitionId].
/// Ancestor relationships are positional: all path elements before the last
/// one identify the ancestors of the entity. Equality is structural, two
/// keys with the same partition and path are the same key.
///
/// # Example
/// ```
/// # use gcloud_datastore::model::Key;
/// let key = Key::new("Author").with_name("melville").child("Book").with_id(42);
/// assert!(key.is_complete());
/// assert_eq!(key.parent(), Some(Key::new("Author").with_name("melville")));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Key {
    /// Entities are partitioned into subsets, currently identified by a
    /// project and namespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_id: Option<PartitionId>,

    /// The entity path, from root ancestor to the entity itself.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathElement>,
}

impl Key {
    /// Creates a key with a single, incomplete path element of the given kind.
    pub fn new<T: Into<String>>(kind: T) -> Self {
        Self::default().child(kind)
    }

    /// Appends an incomplete path element of the given kind.
    pub fn child<T: Into<String>>(mut self, kind: T) -> Self {
        self.path.push(PathElement {
            kind: kind.into(),
            ..Default::default()
        });
        self
    }

    /// Sets the numeric ID of the last path element.
    pub fn with_id(mut self, id: i64) -> Self {
        if let Some(last) = self.path.last_mut() {
            last.id = Some(id);
            last.name = None;
        }
        self
    }

    /// Sets the name of the last path element.
    pub fn with_name<T: Into<String>>(mut self, name: T) -> Self {
        if let Some(last) = self.path.last_mut() {
            last.name = Some(name.into());
            last.id = None;
        }
        self
    }

    /// Sets the partition for this key.
    pub fn with_partition(mut self, partition: PartitionId) -> Self {
        self.partition_id = Some(partition);
        self
    }

    /// The kind of the entity identified by this key.
    pub fn kind(&self) -> Option<&str> {
        self.path.last().map(|e| e.kind.as_str())
    }

    /// If true, every path element has an ID or a name.
    pub fn is_complete(&self) -> bool {
        !self.path.is_empty() && self.path.iter().all(PathElement::is_complete)
    }

    /// The key of the immediate ancestor, if any.
    pub fn parent(&self) -> Option<Key> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Key {
            partition_id: self.partition_id.clone(),
            path: self.path[..self.path.len() - 1].to_vec(),
        })
    }
}

/// A list of values, the wire form of array properties.
///
/// An array may not contain another array.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ArrayValue {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

/// The type of a [Value].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ValueKind {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    /// An RFC 3339 timestamp, kept in its wire form.
    Timestamp(String),
    Key(Key),
    String(String),
    Blob(bytes::Bytes),
    Entity(Entity),
    Array(Vec<Value>),
}

/// A message that can hold any of the supported property value types.
///
/// # Example
/// ```
/// # use gcloud_datastore::model::Value;
/// let indexed = Value::integer(42);
/// let unindexed = Value::string("a very long description")
///     .with_exclude_from_indexes(true);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Value {
    /// The value payload.
    pub kind: ValueKind,

    /// If true, the value is excluded from all indexes.
    pub exclude_from_indexes: bool,
}

impl Value {
    fn from_kind(kind: ValueKind) -> Self {
        Self {
            kind,
            exclude_from_indexes: false,
        }
    }

    pub fn null() -> Self {
        Self::from_kind(ValueKind::Null)
    }
    pub fn boolean(v: bool) -> Self {
        Self::from_kind(ValueKind::Boolean(v))
    }
    pub fn integer(v: i64) -> Self {
        Self::from_kind(ValueKind::Integer(v))
    }
    pub fn double(v: f64) -> Self {
        Self::from_kind(ValueKind::Double(v))
    }
    pub fn timestamp<T: Into<String>>(v: T) -> Self {
        Self::from_kind(ValueKind::Timestamp(v.into()))
    }
    pub fn key(v: Key) -> Self {
        Self::from_kind(ValueKind::Key(v))
    }
    pub fn string<T: Into<String>>(v: T) -> Self {
        Self::from_kind(ValueKind::String(v.into()))
    }
    pub fn blob<T: Into<bytes::Bytes>>(v: T) -> Self {
        Self::from_kind(ValueKind::Blob(v.into()))
    }
    pub fn entity(v: Entity) -> Self {
        Self::from_kind(ValueKind::Entity(v))
    }
    pub fn array<T: IntoIterator<Item = Value>>(v: T) -> Self {
        Self::from_kind(ValueKind::Array(v.into_iter().collect()))
    }

    /// Sets the indexing exclusion for this value.
    pub fn with_exclude_from_indexes(mut self, v: bool) -> Self {
        self.exclude_from_indexes = v;
        self
    }
}

// `Value` needs hand-written serde implementations: the payload is a proto
// oneof (exactly one of `nullValue`, `booleanValue`, ...), and some variants
// need the proto-JSON string encodings for int64 and bytes.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use base64::Engine;
        use serde::ser::SerializeMap;
        let len = if self.exclude_from_indexes { 2 } else { 1 };
        let mut map = serializer.serialize_map(Some(len))?;
        match &self.kind {
            ValueKind::Null => map.serialize_entry("nullValue", &Option::<bool>::None)?,
            ValueKind::Boolean(v) => map.serialize_entry("booleanValue", v)?,
            ValueKind::Integer(v) => map.serialize_entry("integerValue", &v.to_string())?,
            ValueKind::Double(v) => map.serialize_entry("doubleValue", v)?,
            ValueKind::Timestamp(v) => map.serialize_entry("timestampValue", v)?,
            ValueKind::Key(v) => map.serialize_entry("keyValue", v)?,
            ValueKind::String(v) => map.serialize_entry("stringValue", v)?,
            ValueKind::Blob(v) => map.serialize_entry(
                "blobValue",
                &base64::engine::general_purpose::STANDARD.encode(v),
            )?,
            ValueKind::Entity(v) => map.serialize_entry("entityValue", v)?,
            ValueKind::Array(v) => {
                map.serialize_entry("arrayValue", &ArrayValue { values: v.clone() })?
            }
        };
        if self.exclude_from_indexes {
            map.serialize_entry("excludeFromIndexes", &true)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> serde::de::Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a Datastore Value object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        use base64::Engine;
        use serde::de::Error as _;
        let mut kind = None;
        let mut exclude_from_indexes = false;
        while let Some(field) = map.next_key::<String>()? {
            match field.as_str() {
                "nullValue" => {
                    // Either JSON `null` or the enum name.
                    let _ = map.next_value::<Option<String>>()?;
                    kind = Some(ValueKind::Null);
                }
                "booleanValue" => kind = Some(ValueKind::Boolean(map.next_value()?)),
                "integerValue" => {
                    kind = Some(ValueKind::Integer(map.next_value::<int64::Int64>()?.0))
                }
                "doubleValue" => kind = Some(ValueKind::Double(map.next_value()?)),
                "timestampValue" => kind = Some(ValueKind::Timestamp(map.next_value()?)),
                "keyValue" => kind = Some(ValueKind::Key(map.next_value()?)),
                "stringValue" => kind = Some(ValueKind::String(map.next_value()?)),
                "blobValue" => {
                    let encoded = map.next_value::<String>()?;
                    let decoded = base64::engine::general_purpose::STANDARD
                        .decode(&encoded)
                        .map_err(A::Error::custom)?;
                    kind = Some(ValueKind::Blob(bytes::Bytes::from(decoded)));
                }
                "entityValue" => kind = Some(ValueKind::Entity(map.next_value()?)),
                "arrayValue" => {
                    kind = Some(ValueKind::Array(map.next_value::<ArrayValue>()?.values))
                }
                "excludeFromIndexes" => exclude_from_indexes = map.next_value()?,
                _ => {
                    let _ = map.next_value::<serde::de::IgnoredAny>()?;
                }
            }
        }
        let kind = kind.ok_or_else(|| A::Error::custom("Value has no payload field"))?;
        Ok(Value {
            kind,
            exclude_from_indexes,
        })
    }
}

/// A Datastore data object.
///
/// An entity is limited to 1 megabyte when stored.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Entity {
    /// The entity's key. An entity must have a key, unless it is embedded in
    /// another value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,

    /// The entity's properties. Property names matching `__.*__` are
    /// reserved.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
}

impl Entity {
    /// Sets the value of `key`.
    pub fn set_key<T: Into<Key>>(mut self, v: T) -> Self {
        self.key = Some(v.into());
        self
    }

    /// Inserts one property.
    pub fn set_property<N: Into<String>>(mut self, name: N, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// The names of the properties excluded from indexes.
    pub fn unindexed_properties(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter(|(_, v)| v.exclude_from_indexes)
            .map(|(k, _)| k.as_str())
    }
}

/// The result of fetching an entity from Datastore.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct EntityResult {
    /// The resulting entity. In `missing` results only the key is set.
    pub entity: Entity,

    /// The version of the entity.
    #[serde(with = "int64::option", skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,

    /// A cursor that points to the position after the result entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// The options shared by read lookups and queries.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ReadOptions {
    /// The non-transactional read consistency to use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_consistency: Option<ReadConsistency>,

    /// The identifier of the transaction in which to read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
}

/// The non-transactional read consistency levels.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ReadConsistency {
    Strong,
    Eventual,
}

/// The request for a lookup operation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct LookupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_options: Option<ReadOptions>,

    /// Keys of entities to look up.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<Key>,
}

impl LookupRequest {
    /// Sets the value of `keys`.
    pub fn set_keys<T: IntoIterator<Item = Key>>(mut self, v: T) -> Self {
        self.keys = v.into_iter().collect();
        self
    }

    /// Sets the value of `read_options`.
    pub fn set_read_options(mut self, v: ReadOptions) -> Self {
        self.read_options = Some(v);
        self
    }
}

/// The response for a lookup operation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct LookupResponse {
    /// Entities found, in the order requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub found: Vec<EntityResult>,

    /// Keys that were looked up but not found, with only the key filled in.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<EntityResult>,

    /// Keys that could not be looked up in a single request. The caller
    /// should retry these in a follow-up lookup.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deferred: Vec<Key>,
}

/// A mutation to apply to an entity.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum Mutation {
    /// Insert a new entity. Fails if the key is complete and already exists.
    Insert(Entity),
    /// Update an existing entity. Fails if the entity does not exist.
    Update(Entity),
    /// Insert or update.
    Upsert(Entity),
    /// Delete the entity with the given key.
    Delete(Key),
}

impl Mutation {
    /// The entity key affected by this mutation, if known client-side.
    pub fn key(&self) -> Option<&Key> {
        match self {
            Mutation::Insert(e) | Mutation::Update(e) | Mutation::Upsert(e) => e.key.as_ref(),
            Mutation::Delete(k) => Some(k),
        }
    }

    /// If true, this is an insert whose key still needs an allocated ID.
    pub fn is_auto_id_insert(&self) -> bool {
        match self {
            Mutation::Insert(e) => e.key.as_ref().is_none_or(|k| !k.is_complete()),
            _ => false,
        }
    }
}

/// The modes of a commit operation.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum CommitMode {
    Transactional,
    NonTransactional,
}

/// The request for a commit operation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct CommitRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<CommitMode>,

    /// The identifier of the transaction associated with the commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,

    /// The mutations to perform.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mutations: Vec<Mutation>,
}

impl CommitRequest {
    /// Sets the value of `mode`.
    pub fn set_mode(mut self, v: CommitMode) -> Self {
        self.mode = Some(v);
        self
    }

    /// Sets the value of `transaction`.
    pub fn set_transaction<T: Into<String>>(mut self, v: T) -> Self {
        self.transaction = Some(v.into());
        self
    }

    /// Sets the value of `mutations`.
    pub fn set_mutations<T: IntoIterator<Item = Mutation>>(mut self, v: T) -> Self {
        self.mutations = v.into_iter().collect();
        self
    }

    /// If true, retrying this commit risks creating duplicate entities.
    ///
    /// Inserts with incomplete keys are assigned an ID by the service on
    /// each attempt. Outside a transaction there is no way to tell whether a
    /// failed attempt was actually applied.
    pub fn is_retry_unsafe(&self) -> bool {
        self.transaction.is_none() && self.mutations.iter().any(Mutation::is_auto_id_insert)
    }
}

/// The result of applying a mutation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct MutationResult {
    /// The automatically allocated key, set only when the mutation had an
    /// incomplete key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,

    /// The version of the entity on the server after processing.
    #[serde(with = "int64::option", skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,

    /// Whether a conflict was detected for this mutation.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub conflict_detected: bool,
}

/// The response for a commit operation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct CommitResponse {
    /// The result of performing the mutations, in the order requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mutation_results: Vec<MutationResult>,

    /// The number of index entries updated during the commit.
    #[serde(skip_serializing_if = "is_zero")]
    pub index_updates: i32,
}

/// The request to begin a new transaction.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct BeginTransactionRequest {}

/// The response for beginning a transaction.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct BeginTransactionResponse {
    /// The transaction identifier (base64 bytes).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub transaction: String,
}

/// The request to roll back a transaction.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct RollbackRequest {
    /// The transaction identifier.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub transaction: String,
}

impl RollbackRequest {
    /// Sets the value of `transaction`.
    pub fn set_transaction<T: Into<String>>(mut self, v: T) -> Self {
        self.transaction = v.into();
        self
    }
}

/// The (empty) response for a rollback.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct RollbackResponse {}

/// The request to allocate IDs for incomplete keys.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct AllocateIdsRequest {
    /// A list of keys with incomplete key paths, with no reserved IDs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<Key>,
}

impl AllocateIdsRequest {
    /// Sets the value of `keys`.
    pub fn set_keys<T: IntoIterator<Item = Key>>(mut self, v: T) -> Self {
        self.keys = v.into_iter().collect();
        self
    }
}

/// The response for an ID allocation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct AllocateIdsResponse {
    /// The keys, now complete, in the order requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<Key>,
}

/// A representation of a kind.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct KindExpression {
    pub name: String,
}

/// A reference to a property relative to the kind expressions.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct PropertyReference {
    pub name: String,
}

/// The comparison operators of a [PropertyFilter].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum PropertyOperator {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Equal,
    HasAncestor,
}

/// A filter on a specific property.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct PropertyFilter {
    pub property: PropertyReference,
    pub op: PropertyOperator,
    pub value: Value,
}

/// A filter that merges multiple other filters using an operator.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct CompositeFilter {
    /// Always `AND` in the current API.
    pub op: CompositeOperator,
    pub filters: Vec<Filter>,
}

/// The operators of a [CompositeFilter].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum CompositeOperator {
    And,
}

/// A holder for any type of filter.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum Filter {
    PropertyFilter(PropertyFilter),
    CompositeFilter(Box<CompositeFilter>),
}

impl Filter {
    /// A filter comparing a property against a value.
    pub fn property<N: Into<String>>(name: N, op: PropertyOperator, value: Value) -> Self {
        Filter::PropertyFilter(PropertyFilter {
            property: PropertyReference { name: name.into() },
            op,
            value,
        })
    }

    /// A filter restricting results to descendants of `ancestor`.
    pub fn ancestor(ancestor: Key) -> Self {
        Self::property("__key__", PropertyOperator::HasAncestor, Value::key(ancestor))
    }

    /// The conjunction of `self` and `other`.
    pub fn and(self, other: Filter) -> Self {
        Filter::CompositeFilter(Box::new(CompositeFilter {
            op: CompositeOperator::And,
            filters: vec![self, other],
        }))
    }
}

/// The sort directions of a [PropertyOrder].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum Direction {
    Ascending,
    Descending,
}

/// The desired order for a specific property.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct PropertyOrder {
    pub property: PropertyReference,
    pub direction: Direction,
}

/// A query for entities.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Query {
    /// The kinds to query, if empty, returns entities of all kinds.
    /// Currently at most one kind may be specified.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub kind: Vec<KindExpression>,

    /// The filter to apply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,

    /// The order to apply to the query results.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<PropertyOrder>,

    /// A starting point for the query results (base64 cursor).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,

    /// The number of results to skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i32>,

    /// The maximum number of results to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

impl Query {
    /// Creates a query over a single kind.
    pub fn new_kind<T: Into<String>>(kind: T) -> Self {
        Self {
            kind: vec![KindExpression { name: kind.into() }],
            ..Default::default()
        }
    }

    /// Sets the value of `filter`.
    pub fn set_filter(mut self, v: Filter) -> Self {
        self.filter = Some(v);
        self
    }

    /// Appends an ordering.
    pub fn order_by<N: Into<String>>(mut self, name: N, direction: Direction) -> Self {
        self.order.push(PropertyOrder {
            property: PropertyReference { name: name.into() },
            direction,
        });
        self
    }

    /// Sets the value of `limit`.
    pub fn set_limit(mut self, v: i32) -> Self {
        self.limit = Some(v);
        self
    }

    /// Sets the value of `start_cursor`.
    pub fn set_start_cursor<T: Into<String>>(mut self, v: T) -> Self {
        self.start_cursor = Some(v.into());
        self
    }
}

/// The possible values for the `more_results` field of a query batch.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum MoreResultsType {
    #[default]
    MoreResultsTypeUnspecified,
    /// There may be additional batches to fetch from this query.
    NotFinished,
    /// The query is finished, but there may be more results after the limit.
    MoreResultsAfterLimit,
    /// The query is finished, but there may be more results after the end
    /// cursor.
    MoreResultsAfterCursor,
    /// The query is finished, and there are no more results.
    NoMoreResults,
}

/// A batch of results produced by a query.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct QueryResultBatch {
    /// The results for this batch.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entity_results: Vec<EntityResult>,

    /// A cursor that points to the position after the last result in the
    /// batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_cursor: Option<String>,

    /// The state of the query after the current batch.
    pub more_results: MoreResultsType,

    /// The number of results skipped, typically because of an offset.
    #[serde(skip_serializing_if = "is_zero")]
    pub skipped_results: i32,
}

/// The request for a query.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct RunQueryRequest {
    /// Queries are scoped to a single partition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_id: Option<PartitionId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_options: Option<ReadOptions>,

    /// The query to run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
}

impl RunQueryRequest {
    /// Sets the value of `query`.
    pub fn set_query(mut self, v: Query) -> Self {
        self.query = Some(v);
        self
    }

    /// Sets the value of `partition_id`.
    pub fn set_partition_id(mut self, v: PartitionId) -> Self {
        self.partition_id = Some(v);
        self
    }

    /// Sets the value of `read_options`.
    pub fn set_read_options(mut self, v: ReadOptions) -> Self {
        self.read_options = Some(v);
        self
    }
}

/// The response for a query.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct RunQueryResponse {
    /// A batch of query results, always present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<QueryResultBatch>,

    /// The parsed form of the query from the request, if it was set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
}

impl gax::paginator::PageableResponse for RunQueryResponse {
    type PageItem = EntityResult;

    fn next_page_token(&self) -> String {
        match &self.batch {
            Some(b) if b.more_results == MoreResultsType::NotFinished => {
                b.end_cursor.clone().unwrap_or_default()
            }
            _ => String::new(),
        }
    }

    fn into_items(self) -> Vec<EntityResult> {
        self.batch.map(|b| b.entity_results).unwrap_or_default()
    }
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

/// Serde helpers for proto-JSON int64 fields, which are encoded as decimal
/// strings on the wire but also accepted as JSON numbers.
pub(crate) mod int64 {
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(crate) enum MaybeQuoted {
        Num(i64),
        Str(String),
    }

    pub(crate) struct Int64(pub i64);

    impl<'de> Deserialize<'de> for Int64 {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            use serde::de::Error as _;
            match MaybeQuoted::deserialize(deserializer)? {
                MaybeQuoted::Num(v) => Ok(Int64(v)),
                MaybeQuoted::Str(s) => s.parse::<i64>().map(Int64).map_err(D::Error::custom),
            }
        }
    }

    pub(crate) mod option {
        use super::Int64;
        use serde::{Deserialize, Serializer};

        pub fn serialize<S>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(v) => serializer.serialize_str(&v.to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            Ok(Option::<Int64>::deserialize(deserializer)?.map(|v| v.0))
        }
    }
}
