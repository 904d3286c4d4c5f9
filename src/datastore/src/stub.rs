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

use crate::model::{
    AllocateIdsRequest, AllocateIdsResponse, BeginTransactionRequest, BeginTransactionResponse,
    CommitRequest, CommitResponse, LookupRequest, LookupResponse, RollbackRequest,
    RollbackResponse, RunQueryRequest, RunQueryResponse,
};
use gax::Result;
use gax::options::RequestOptions;

/// The transport interface of the Datastore service.
///
/// The default implementation translates calls into HTTP requests against
/// the REST API. Applications may provide their own implementation in
/// mocks, and decorators (such as [RetryingStub][crate::retry::RetryingStub])
/// wrap one stub in another.
#[async_trait::async_trait]
pub trait DatastoreStub: Send + Sync + std::fmt::Debug {
    /// Looks up entities by key.
    async fn lookup(&self, req: LookupRequest, options: RequestOptions) -> Result<LookupResponse>;

    /// Queries for entities.
    async fn run_query(
        &self,
        req: RunQueryRequest,
        options: RequestOptions,
    ) -> Result<RunQueryResponse>;

    /// Begins a new transaction.
    async fn begin_transaction(
        &self,
        req: BeginTransactionRequest,
        options: RequestOptions,
    ) -> Result<BeginTransactionResponse>;

    /// Commits a transaction, or a set of non-transactional mutations.
    async fn commit(&self, req: CommitRequest, options: RequestOptions) -> Result<CommitResponse>;

    /// Rolls back a transaction.
    async fn rollback(
        &self,
        req: RollbackRequest,
        options: RequestOptions,
    ) -> Result<RollbackResponse>;

    /// Allocates IDs for incomplete keys, before they are inserted.
    async fn allocate_ids(
        &self,
        req: AllocateIdsRequest,
        options: RequestOptions,
    ) -> Result<AllocateIdsResponse>;
}
