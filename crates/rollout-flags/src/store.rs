// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Seams to the remote record store and its session.

use std::sync::Arc;

use async_trait::async_trait;
use rollout_flags_core::{Query, Record, RecordId, ZoneId};

use crate::error::StoreResult;

/// Remote record store.
///
/// Every call completes exactly once with either a value or an error.
/// Implementations must not retry; that is left to callers.
#[async_trait]
pub trait RecordStore: Send + Sync {
	/// Fetches a single record by id.
	async fn fetch(&self, id: &RecordId) -> StoreResult<Record>;

	/// Upserts a record and returns the persisted version, which may carry
	/// server-assigned metadata the input lacked.
	async fn save(&self, record: Record) -> StoreResult<Record>;

	/// Runs a query in `zone`, or in the global zone when `zone` is `None`.
	async fn query(&self, query: &Query, zone: Option<&ZoneId>) -> StoreResult<Vec<Record>>;
}

/// Session-level access: who the current user is, and where flags live.
#[async_trait]
pub trait Container: Send + Sync {
	/// Store that holds flag definitions and user records.
	fn flagging_store(&self) -> Arc<dyn RecordStore>;

	/// Resolves the record id of the signed-in user.
	async fn user_record_id(&self) -> StoreResult<RecordId>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
	async fn fetch(&self, id: &RecordId) -> StoreResult<Record> {
		(**self).fetch(id).await
	}

	async fn save(&self, record: Record) -> StoreResult<Record> {
		(**self).save(record).await
	}

	async fn query(&self, query: &Query, zone: Option<&ZoneId>) -> StoreResult<Vec<Record>> {
		(**self).query(query, zone).await
	}
}

#[async_trait]
impl<T: Container + ?Sized> Container for Arc<T> {
	fn flagging_store(&self) -> Arc<dyn RecordStore> {
		(**self).flagging_store()
	}

	async fn user_record_id(&self) -> StoreResult<RecordId> {
		(**self).user_record_id().await
	}
}
