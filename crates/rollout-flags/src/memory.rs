// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory record store with fault injection.
//!
//! Useful as a stand-in for the remote store in tests and local development.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rollout_flags_core::{Query, Record, RecordId, ZoneId};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::store::{Container, RecordStore};

#[derive(Debug, Clone)]
enum Fault {
	Once(StoreError),
	Always(StoreError),
}

#[derive(Debug, Default)]
struct Faults {
	fetch: Option<Fault>,
	save: Option<Fault>,
	query: Option<Fault>,
	/// Field removed from records as they are saved.
	strip_on_save: Option<String>,
}

fn take_fault(slot: &mut Option<Fault>) -> Option<StoreError> {
	match slot.take() {
		Some(Fault::Once(err)) => Some(err),
		Some(Fault::Always(err)) => {
			*slot = Some(Fault::Always(err.clone()));
			Some(err)
		}
		None => None,
	}
}

#[derive(Debug, Default)]
struct State {
	records: BTreeMap<RecordId, (Option<ZoneId>, Record)>,
	faults: Faults,
}

/// Thread-safe in-memory [`RecordStore`].
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
	state: Mutex<State>,
	fetch_count: AtomicUsize,
	save_count: AtomicUsize,
	query_count: AtomicUsize,
}

impl MemoryRecordStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts a record into the global zone without counting as a save.
	pub async fn insert(&self, record: Record) {
		self.insert_in_zone(None, record).await;
	}

	pub async fn insert_in_zone(&self, zone: Option<ZoneId>, record: Record) {
		let mut state = self.state.lock().await;
		state.records.insert(record.id.clone(), (zone, record));
	}

	/// Reads a record without counting as a fetch.
	pub async fn get(&self, id: &RecordId) -> Option<Record> {
		let state = self.state.lock().await;
		state.records.get(id).map(|(_, r)| r.clone())
	}

	pub async fn fail_next_fetch(&self, err: StoreError) {
		self.state.lock().await.faults.fetch = Some(Fault::Once(err));
	}

	pub async fn fail_all_fetches(&self, err: StoreError) {
		self.state.lock().await.faults.fetch = Some(Fault::Always(err));
	}

	pub async fn fail_next_save(&self, err: StoreError) {
		self.state.lock().await.faults.save = Some(Fault::Once(err));
	}

	pub async fn fail_all_saves(&self, err: StoreError) {
		self.state.lock().await.faults.save = Some(Fault::Always(err));
	}

	pub async fn fail_next_query(&self, err: StoreError) {
		self.state.lock().await.faults.query = Some(Fault::Once(err));
	}

	pub async fn fail_all_queries(&self, err: StoreError) {
		self.state.lock().await.faults.query = Some(Fault::Always(err));
	}

	/// Makes every subsequent save persist the record without `field`.
	pub async fn strip_field_on_save(&self, field: impl Into<String>) {
		self.state.lock().await.faults.strip_on_save = Some(field.into());
	}

	/// Removes all injected faults.
	pub async fn clear_faults(&self) {
		self.state.lock().await.faults = Faults::default();
	}

	pub fn fetch_count(&self) -> usize {
		self.fetch_count.load(Ordering::SeqCst)
	}

	pub fn save_count(&self) -> usize {
		self.save_count.load(Ordering::SeqCst)
	}

	pub fn query_count(&self) -> usize {
		self.query_count.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
	async fn fetch(&self, id: &RecordId) -> StoreResult<Record> {
		self.fetch_count.fetch_add(1, Ordering::SeqCst);
		let mut state = self.state.lock().await;

		if let Some(err) = take_fault(&mut state.faults.fetch) {
			debug!(record_id = %id, error = %err, "Injected fetch failure");
			return Err(err);
		}

		state
			.records
			.get(id)
			.map(|(_, r)| r.clone())
			.ok_or_else(|| StoreError::NotFound { id: id.clone() })
	}

	async fn save(&self, mut record: Record) -> StoreResult<Record> {
		self.save_count.fetch_add(1, Ordering::SeqCst);
		let mut state = self.state.lock().await;

		if let Some(err) = take_fault(&mut state.faults.save) {
			debug!(record_id = %record.id, error = %err, "Injected save failure");
			return Err(err);
		}

		if let Some(field) = &state.faults.strip_on_save {
			record.remove(field);
		}

		record.change_tag = Some(Uuid::new_v4().simple().to_string());
		record.modified_at = Some(Utc::now());

		let zone = state
			.records
			.get(&record.id)
			.and_then(|(zone, _)| zone.clone());
		state
			.records
			.insert(record.id.clone(), (zone, record.clone()));

		Ok(record)
	}

	async fn query(&self, query: &Query, zone: Option<&ZoneId>) -> StoreResult<Vec<Record>> {
		self.query_count.fetch_add(1, Ordering::SeqCst);
		let mut state = self.state.lock().await;

		if let Some(err) = take_fault(&mut state.faults.query) {
			debug!(record_type = %query.record_type, error = %err, "Injected query failure");
			return Err(err);
		}

		Ok(state
			.records
			.values()
			.filter(|(record_zone, record)| record_zone.as_ref() == zone && query.matches(record))
			.map(|(_, record)| record.clone())
			.collect())
	}
}

/// In-memory [`Container`] backed by a [`MemoryRecordStore`].
#[derive(Debug)]
pub struct MemoryContainer {
	store: Arc<MemoryRecordStore>,
	user: StoreResult<RecordId>,
	user_lookups: AtomicUsize,
}

impl MemoryContainer {
	/// Container whose signed-in user is `user_record_id`.
	pub fn new(store: Arc<MemoryRecordStore>, user_record_id: impl Into<RecordId>) -> Self {
		Self {
			store,
			user: Ok(user_record_id.into()),
			user_lookups: AtomicUsize::new(0),
		}
	}

	/// Container whose user lookup always fails with `err`.
	pub fn with_user_error(store: Arc<MemoryRecordStore>, err: StoreError) -> Self {
		Self {
			store,
			user: Err(err),
			user_lookups: AtomicUsize::new(0),
		}
	}

	pub fn store(&self) -> &Arc<MemoryRecordStore> {
		&self.store
	}

	pub fn user_lookups(&self) -> usize {
		self.user_lookups.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Container for MemoryContainer {
	fn flagging_store(&self) -> Arc<dyn RecordStore> {
		self.store.clone()
	}

	async fn user_record_id(&self) -> StoreResult<RecordId> {
		self.user_lookups.fetch_add(1, Ordering::SeqCst);
		self.user.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rollout_flags_core::FlagDefinition;

	#[tokio::test]
	async fn test_fetch_missing_is_not_found() {
		let store = MemoryRecordStore::new();
		let err = store.fetch(&RecordId::from("nope")).await.unwrap_err();
		assert_eq!(
			err,
			StoreError::NotFound {
				id: RecordId::from("nope")
			}
		);
		assert_eq!(store.fetch_count(), 1);
	}

	#[tokio::test]
	async fn test_save_assigns_metadata() {
		let store = MemoryRecordStore::new();
		let saved = store.save(Record::new("u1", "Users")).await.unwrap();

		assert!(saved.change_tag.is_some());
		assert!(saved.modified_at.is_some());
		assert_eq!(store.fetch(&RecordId::from("u1")).await.unwrap(), saved);
		assert_eq!(store.save_count(), 1);
	}

	#[tokio::test]
	async fn test_save_changes_tag_each_time() {
		let store = MemoryRecordStore::new();
		let first = store.save(Record::new("u1", "Users")).await.unwrap();
		let second = store.save(first.clone()).await.unwrap();
		assert_ne!(first.change_tag, second.change_tag);
	}

	#[tokio::test]
	async fn test_query_respects_zone_and_type() {
		let store = MemoryRecordStore::new();
		store
			.insert(FlagDefinition::new("global", 10.0).to_record("f1"))
			.await;
		store
			.insert_in_zone(
				Some(ZoneId::from("beta")),
				FlagDefinition::new("zoned", 10.0).to_record("f2"),
			)
			.await;
		store.insert(Record::new("u1", "Users")).await;

		let query = Query::all("FeatureFlag");
		let global = store.query(&query, None).await.unwrap();
		assert_eq!(global.len(), 1);
		assert_eq!(global[0].id, RecordId::from("f1"));

		let zone = ZoneId::from("beta");
		let zoned = store.query(&query, Some(&zone)).await.unwrap();
		assert_eq!(zoned.len(), 1);
		assert_eq!(zoned[0].id, RecordId::from("f2"));
	}

	#[tokio::test]
	async fn test_fail_next_applies_once() {
		let store = MemoryRecordStore::new();
		store.fail_next_query(StoreError::transient("503")).await;

		let query = Query::all("FeatureFlag");
		assert!(store.query(&query, None).await.is_err());
		assert!(store.query(&query, None).await.is_ok());
	}

	#[tokio::test]
	async fn test_fail_all_is_sticky() {
		let store = MemoryRecordStore::new();
		store.insert(Record::new("u1", "Users")).await;
		store.fail_all_fetches(StoreError::Unauthenticated).await;

		for _ in 0..3 {
			assert_eq!(
				store.fetch(&RecordId::from("u1")).await.unwrap_err(),
				StoreError::Unauthenticated
			);
		}

		store.clear_faults().await;
		assert!(store.fetch(&RecordId::from("u1")).await.is_ok());
	}

	#[tokio::test]
	async fn test_strip_field_on_save() {
		let store = MemoryRecordStore::new();
		store.strip_field_on_save("secret").await;

		let saved = store
			.save(Record::new("u1", "Users").with_field("secret", "x"))
			.await
			.unwrap();
		assert!(saved.get("secret").is_none());
	}

	#[tokio::test]
	async fn test_container_user_lookup() {
		let store = Arc::new(MemoryRecordStore::new());
		let container = MemoryContainer::new(store.clone(), "_user_1");
		assert_eq!(
			container.user_record_id().await.unwrap(),
			RecordId::from("_user_1")
		);

		let failing = MemoryContainer::with_user_error(store, StoreError::Unauthenticated);
		assert_eq!(
			failing.user_record_id().await.unwrap_err(),
			StoreError::Unauthenticated
		);
		assert_eq!(failing.user_lookups(), 1);
	}
}
