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

use crate::Result;
use crate::db::{IdValue, MappingError, Model, ModelRegistry};
use crate::model::*;
use crate::retry::RetryingStub;
use crate::stub::DatastoreStub;
use crate::transport::HttpDatastore;
use gax::backoff_policy::BackoffPolicyArg;
use gax::credentials::{AnonymousCredentials, SharedCredentials};
use gax::error::Error;
use gax::options::RequestOptions;
use gax::paginator::Paginator;
use gax::retry_policy::RetryPolicyArg;
use gax::retry_throttler::RetryThrottlerArg;
use std::collections::HashMap;
use std::sync::Arc;

/// The default service endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://datastore.googleapis.com";

/// The OAuth2 scopes used by this client.
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/datastore"];

/// A builder for [Datastore].
///
/// # Example
/// ```no_run
/// # use gcloud_datastore::client::Datastore;
/// # fn sample() -> gax::client_builder::Result<Datastore> {
/// Datastore::builder()
///     .with_project_id("my-project")
///     .with_endpoint("http://localhost:8081")
///     .build()
/// # }
/// ```
pub struct ClientBuilder {
    project_id: Option<String>,
    endpoint: String,
    scopes: Vec<String>,
    credentials: Option<SharedCredentials>,
    http_client: Option<reqwest::Client>,
    retry_policy: Option<RetryPolicyArg>,
    backoff_policy: Option<BackoffPolicyArg>,
    retry_throttler: Option<RetryThrottlerArg>,
}

impl ClientBuilder {
    fn new() -> Self {
        Self {
            project_id: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            credentials: None,
            http_client: None,
            retry_policy: None,
            backoff_policy: None,
            retry_throttler: None,
        }
    }

    /// Sets the project all requests are scoped to. Required.
    pub fn with_project_id<T: Into<String>>(mut self, v: T) -> Self {
        self.project_id = Some(v.into());
        self
    }

    /// Overrides the default endpoint, e.g. to target an emulator.
    pub fn with_endpoint<T: Into<String>>(mut self, v: T) -> Self {
        self.endpoint = v.into();
        self
    }

    /// Overrides the OAuth2 scopes requested from the credentials.
    pub fn with_scopes<I, T>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.scopes = v.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the credentials.
    ///
    /// By default no authentication headers are sent, which only works
    /// against emulators and test servers. Production applications must
    /// provide credentials.
    pub fn with_credentials<T: Into<SharedCredentials>>(mut self, v: T) -> Self {
        self.credentials = Some(v.into());
        self
    }

    /// Provides the HTTP client instance to use as the transport.
    pub fn with_http_client(mut self, v: reqwest::Client) -> Self {
        self.http_client = Some(v);
        self
    }

    /// Overrides the default retry policy.
    pub fn with_retry_policy<V: Into<RetryPolicyArg>>(mut self, v: V) -> Self {
        self.retry_policy = Some(v.into());
        self
    }

    /// Overrides the default backoff policy.
    pub fn with_backoff_policy<V: Into<BackoffPolicyArg>>(mut self, v: V) -> Self {
        self.backoff_policy = Some(v.into());
        self
    }

    /// Overrides the default retry throttler.
    pub fn with_retry_throttler<V: Into<RetryThrottlerArg>>(mut self, v: V) -> Self {
        self.retry_throttler = Some(v.into());
        self
    }

    /// Builds the client.
    pub fn build(self) -> gax::client_builder::Result<Datastore> {
        use gax::client_builder::Error;
        let project_id = self.project_id.ok_or(Error::MissingField("project_id"))?;
        let client = self.http_client.unwrap_or_default();
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(AnonymousCredentials));
        let transport = HttpDatastore::new(
            client,
            self.endpoint,
            project_id.clone(),
            credentials,
            self.scopes,
        );
        let mut stub = RetryingStub::new(transport);
        if let Some(v) = self.retry_policy {
            stub = stub.with_retry_policy(v);
        }
        if let Some(v) = self.backoff_policy {
            stub = stub.with_backoff_policy(v);
        }
        if let Some(v) = self.retry_throttler {
            stub = stub.with_retry_throttler(v);
        }
        Ok(Datastore::from_stub(stub, project_id))
    }
}

/// Implements a client for the Cloud Datastore API.
///
/// # Configuration
///
/// To configure `Datastore` use the `with_*` methods in the type returned
/// by [builder()][Datastore::builder]. The only required setting is the
/// project ID.
///
/// # Pooling and Cloning
///
/// `Datastore` holds a connection pool internally, it is advised to create
/// one and then reuse it. You do not need to wrap `Datastore` in an
/// [Rc](std::rc::Rc) or [Arc] to reuse it, because it already uses an `Arc`
/// internally.
#[derive(Clone, Debug)]
pub struct Datastore {
    inner: Arc<dyn DatastoreStub>,
    project_id: String,
}

impl Datastore {
    /// Returns a builder for [Datastore].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client over a custom stub, typically a mock.
    pub fn from_stub<S, T>(stub: S, project_id: T) -> Self
    where
        S: DatastoreStub + 'static,
        T: Into<String>,
    {
        Self {
            inner: Arc::new(stub),
            project_id: project_id.into(),
        }
    }

    /// The project this client is scoped to.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// The partition for the default namespace of this project.
    pub fn partition(&self) -> PartitionId {
        PartitionId::default().set_project_id(&self.project_id)
    }

    /// Looks up entities by key.
    ///
    /// The service may defer some keys under load. This method re-issues
    /// lookups for the deferred keys until every key is either found or
    /// reported missing.
    pub async fn lookup<I>(&self, keys: I) -> Result<LookupResponse>
    where
        I: IntoIterator<Item = Key>,
    {
        let req = LookupRequest::default().set_keys(keys);
        let mut response = self.inner.lookup(req, RequestOptions::default()).await?;
        while !response.deferred.is_empty() {
            let deferred = std::mem::take(&mut response.deferred);
            tracing::debug!(count = deferred.len(), "retrying deferred lookup keys");
            let follow_up = self
                .inner
                .lookup(
                    LookupRequest::default().set_keys(deferred),
                    RequestOptions::default(),
                )
                .await?;
            response.found.extend(follow_up.found);
            response.missing.extend(follow_up.missing);
            response.deferred = follow_up.deferred;
        }
        Ok(response)
    }

    /// Inserts entities, failing if any of them already exists.
    ///
    /// Returns the entity keys, with server-allocated IDs filled in.
    pub async fn insert<I>(&self, entities: I) -> Result<Vec<Key>>
    where
        I: IntoIterator<Item = Entity>,
    {
        self.mutate(entities.into_iter().map(Mutation::Insert)).await
    }

    /// Inserts or updates entities.
    pub async fn upsert<I>(&self, entities: I) -> Result<Vec<Key>>
    where
        I: IntoIterator<Item = Entity>,
    {
        self.mutate(entities.into_iter().map(Mutation::Upsert)).await
    }

    /// Updates entities, failing if any of them does not exist.
    pub async fn update<I>(&self, entities: I) -> Result<Vec<Key>>
    where
        I: IntoIterator<Item = Entity>,
    {
        self.mutate(entities.into_iter().map(Mutation::Update)).await
    }

    /// Deletes the entities with the given keys.
    pub async fn delete<I>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = Key>,
    {
        self.mutate(keys.into_iter().map(Mutation::Delete))
            .await
            .map(|_| ())
    }

    async fn mutate<I>(&self, mutations: I) -> Result<Vec<Key>>
    where
        I: IntoIterator<Item = Mutation>,
    {
        let mutations = mutations.into_iter().collect::<Vec<_>>();
        let original = mutations
            .iter()
            .map(|m| m.key().cloned())
            .collect::<Vec<_>>();
        let req = CommitRequest::default()
            .set_mode(CommitMode::NonTransactional)
            .set_mutations(mutations);
        let response = self.commit(req).await?;
        let keys = response
            .mutation_results
            .into_iter()
            .zip(original)
            .filter_map(|(result, original)| result.key.or(original))
            .collect();
        Ok(keys)
    }

    /// Commits a transaction or a set of mutations.
    ///
    /// This is the raw operation, [insert][Datastore::insert] and its
    /// siblings are more convenient for non-transactional work.
    pub async fn commit(&self, req: CommitRequest) -> Result<CommitResponse> {
        self.inner.commit(req, RequestOptions::default()).await
    }

    /// Allocates IDs for incomplete keys.
    pub async fn allocate_ids<I>(&self, keys: I) -> Result<Vec<Key>>
    where
        I: IntoIterator<Item = Key>,
    {
        let req = AllocateIdsRequest::default().set_keys(keys);
        let response = self.inner.allocate_ids(req, RequestOptions::default()).await?;
        Ok(response.keys)
    }

    /// Begins a new transaction, returning its identifier.
    pub async fn begin_transaction(&self) -> Result<String> {
        let response = self
            .inner
            .begin_transaction(BeginTransactionRequest::default(), RequestOptions::default())
            .await?;
        Ok(response.transaction)
    }

    /// Rolls back a transaction.
    pub async fn rollback<T: Into<String>>(&self, transaction: T) -> Result<()> {
        let req = RollbackRequest::default().set_transaction(transaction);
        self.inner.rollback(req, RequestOptions::default()).await?;
        Ok(())
    }

    /// Runs a query in the default namespace, returning a stream of result
    /// batches.
    ///
    /// The stream is driven by the query cursors: each polled page issues
    /// one request, stopping the stream stops the requests.
    pub fn run_query(&self, query: Query) -> Paginator<RunQueryResponse, Error> {
        let req = RunQueryRequest::default()
            .set_partition_id(self.partition())
            .set_query(query);
        self.run_query_request(req)
    }

    /// Runs a fully specified query request, returning a stream of result
    /// batches.
    pub fn run_query_request(&self, req: RunQueryRequest) -> Paginator<RunQueryResponse, Error> {
        let inner = self.inner.clone();
        let execute = move |cursor: String| {
            let mut req = req.clone();
            let inner = inner.clone();
            if !cursor.is_empty() {
                req.query.get_or_insert_default().start_cursor = Some(cursor);
            }
            async move { inner.run_query(req, RequestOptions::default()).await }
        };
        Paginator::new(String::new(), execute)
    }
}

/// A mapper-aware layer over [Datastore].
///
/// `Db` combines a client with a [ModelRegistry], moving typed models in
/// and out of the service.
///
/// # Example
/// ```no_run
/// # use gcloud_datastore::client::{Datastore, Db};
/// # use gcloud_datastore::db::{IdValue, Model, ModelRegistry};
/// # use std::sync::Arc;
/// # async fn sample<M: Model>(client: Datastore, registry: Arc<ModelRegistry>)
/// # -> gax::Result<()> {
/// let db = Db::new(client, registry);
/// let books: Vec<Option<M>> = db.get([IdValue::Int(42)]).await?;
/// # Ok(()) }
/// ```
#[derive(Clone)]
pub struct Db {
    client: Datastore,
    registry: Arc<ModelRegistry>,
    partition: PartitionId,
}

impl Db {
    /// Creates a mapper layer in the project's default namespace.
    pub fn new(client: Datastore, registry: Arc<ModelRegistry>) -> Self {
        let partition = client.partition();
        Self {
            client,
            registry,
            partition,
        }
    }

    /// Scopes this instance to a namespace.
    pub fn with_namespace<T: Into<String>>(mut self, namespace: T) -> Self {
        self.partition = self.partition.set_namespace_id(namespace);
        self
    }

    /// The underlying client.
    pub fn client(&self) -> &Datastore {
        &self.client
    }

    /// The registry used by this instance.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Builds the key of a model of type `M` with the given identifier.
    pub fn key<M: Model>(&self, id: impl Into<IdValue>) -> Result<Key> {
        let descriptor = self
            .registry
            .descriptor::<M>()
            .ok_or_else(|| Error::ser(MappingError::UnregisteredType))?;
        let key = Key::new(descriptor.kind()).with_partition(self.partition.clone());
        Ok(match id.into() {
            IdValue::Int(v) => key.with_id(v),
            IdValue::Name(v) => key.with_name(v),
        })
    }

    /// Fetches models by identifier.
    ///
    /// The result has one element per requested identifier, in order,
    /// `None` when the entity does not exist.
    pub async fn get<M, I>(&self, ids: I) -> Result<Vec<Option<M>>>
    where
        M: Model,
        I: IntoIterator<Item = IdValue>,
    {
        let keys = ids
            .into_iter()
            .map(|id| self.key::<M>(id))
            .collect::<Result<Vec<_>>>()?;
        let response = self.client.lookup(keys.clone()).await?;
        // Match responses by key path, the service may return them in any
        // order.
        let mut found = response
            .found
            .into_iter()
            .filter_map(|r| r.entity.key.clone().map(|k| (k.path, r.entity)))
            .collect::<HashMap<_, _>>();
        keys.into_iter()
            .map(|key| {
                found
                    .remove(&key.path)
                    .map(|entity| self.registry.decode::<M>(&entity).map_err(Error::deser))
                    .transpose()
            })
            .collect()
    }

    /// Inserts or updates models.
    ///
    /// Identifiers allocated by the service are written back to the models.
    pub async fn put<M: Model>(&self, models: &mut [M]) -> Result<()> {
        self.write(models, Mutation::Upsert).await
    }

    /// Inserts models, failing if any of them already exists.
    ///
    /// Models without an identifier get one allocated by the service; those
    /// inserts are never retried, a transient failure surfaces to the
    /// caller instead of risking a duplicate entity.
    pub async fn insert<M: Model>(&self, models: &mut [M]) -> Result<()> {
        self.write(models, Mutation::Insert).await
    }

    async fn write<M: Model>(
        &self,
        models: &mut [M],
        mutation: fn(Entity) -> Mutation,
    ) -> Result<()> {
        let mutations = models
            .iter()
            .map(|m| {
                self.registry
                    .encode(m, &self.partition)
                    .map(mutation)
                    .map_err(Error::ser)
            })
            .collect::<Result<Vec<_>>>()?;
        let req = CommitRequest::default()
            .set_mode(CommitMode::NonTransactional)
            .set_mutations(mutations);
        let response = self.client.commit(req).await?;
        for (model, result) in models.iter_mut().zip(response.mutation_results) {
            let Some(element) = result.key.as_ref().and_then(|k| k.path.last()) else {
                continue;
            };
            if let Some(id) = element.id {
                model.set_id(IdValue::Int(id));
            } else if let Some(name) = &element.name {
                model.set_id(IdValue::Name(name.clone()));
            }
        }
        Ok(())
    }

    /// Deletes the models with the given identifiers.
    pub async fn delete<M, I>(&self, ids: I) -> Result<()>
    where
        M: Model,
        I: IntoIterator<Item = IdValue>,
    {
        let keys = ids
            .into_iter()
            .map(|id| self.key::<M>(id))
            .collect::<Result<Vec<_>>>()?;
        self.client.delete(keys).await
    }

    /// Queries for models of type `M`, returning all results.
    ///
    /// Polymorphic models are filtered by their class, so a query for a
    /// leaf type does not return its siblings.
    pub async fn query<M: Model>(&self, filter: Option<Filter>) -> Result<Vec<M>> {
        let descriptor = self
            .registry
            .descriptor::<M>()
            .ok_or_else(|| Error::ser(MappingError::UnregisteredType))?;
        let mut query = Query::new_kind(descriptor.kind());
        let class_filter = descriptor.class_path().last().map(|leaf| {
            Filter::property("class", PropertyOperator::Equal, Value::string(leaf.clone()))
        });
        query.filter = match (filter, class_filter) {
            (Some(f), Some(c)) => Some(f.and(c)),
            (Some(f), None) => Some(f),
            (None, Some(c)) => Some(c),
            (None, None) => None,
        };
        let req = RunQueryRequest::default()
            .set_partition_id(self.partition.clone())
            .set_query(query);
        let mut results = Vec::new();
        let mut stream = self.client.run_query_request(req).items();
        while let Some(result) = stream.next().await {
            let entity = result?.entity;
            results.push(self.registry.decode::<M>(&entity).map_err(Error::deser)?);
        }
        Ok(results)
    }
}
