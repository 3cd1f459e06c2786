// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolves the signed-in user's feature-flagging identity.

use rollout_flags_core::{Record, UserIdentity};
use tracing::{debug, info, instrument};

use crate::config::CoordinatorConfig;
use crate::error::Result;
use crate::store::{Container, RecordStore};

/// Looks up the current user's record and extracts its feature-flagging
/// identifier, provisioning and saving a new one if the record has none.
///
/// Only a missing or malformed identifier triggers provisioning. Store
/// failures, and a saved record that still lacks a valid identifier, are
/// returned as errors. Nothing is retried.
#[instrument(skip_all)]
pub async fn resolve_user_identity(
	container: &dyn Container,
	store: &dyn RecordStore,
	config: &CoordinatorConfig,
) -> Result<UserIdentity> {
	let user_record_id = container.user_record_id().await?;
	debug!(user_record_id = %user_record_id, "Resolved user record id");

	let record = store.fetch(&user_record_id).await?;

	match UserIdentity::from_record_field(&record, &config.identity_field) {
		Ok(identity) => Ok(identity),
		Err(e) if e.is_missing_identifier() => provision_identity(store, record, config).await,
		Err(e) => Err(e.into()),
	}
}

async fn provision_identity(
	store: &dyn RecordStore,
	record: Record,
	config: &CoordinatorConfig,
) -> Result<UserIdentity> {
	let record_id = record.id.clone();
	let (record, _) = UserIdentity::provision(record, &config.identity_field);

	let saved = store.save(record).await?;
	let identity = UserIdentity::from_record_field(&saved, &config.identity_field)?;

	info!(
		user_record_id = %record_id,
		feature_flagging_id = %identity.feature_flagging_id,
		"Provisioned feature-flagging identifier"
	);

	Ok(identity)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	use rollout_flags_core::{FeatureFlaggingId, ParseError, RecordId, USER_FEATURE_FLAGGING_ID_FIELD};

	use crate::error::{FlagsError, StoreError};
	use crate::memory::{MemoryContainer, MemoryRecordStore};
	use crate::store::RecordStore;

	const USER: &str = "_user_1";

	async fn setup(record: Option<Record>) -> (Arc<MemoryRecordStore>, MemoryContainer) {
		let store = Arc::new(MemoryRecordStore::new());
		if let Some(record) = record {
			store.insert(record).await;
		}
		let container = MemoryContainer::new(store.clone(), USER);
		(store, container)
	}

	#[tokio::test]
	async fn test_existing_identifier_is_used() {
		let id = FeatureFlaggingId::new();
		let record = Record::new(USER, "Users").with_field(USER_FEATURE_FLAGGING_ID_FIELD, id.to_string());
		let (store, container) = setup(Some(record)).await;

		let identity = resolve_user_identity(&container, &*store, &CoordinatorConfig::default())
			.await
			.unwrap();

		assert_eq!(identity.feature_flagging_id, id);
		assert_eq!(store.save_count(), 0);
	}

	#[tokio::test]
	async fn test_missing_identifier_is_provisioned_and_persisted() {
		let (store, container) = setup(Some(Record::new(USER, "Users"))).await;

		let identity = resolve_user_identity(&container, &*store, &CoordinatorConfig::default())
			.await
			.unwrap();

		assert_eq!(store.save_count(), 1);
		let persisted = store.get(&RecordId::from(USER)).await.unwrap();
		assert_eq!(
			UserIdentity::from_record(&persisted).unwrap(),
			identity
		);
	}

	#[tokio::test]
	async fn test_provisioned_identifier_round_trips_through_store() {
		let (store, container) = setup(Some(Record::new(USER, "Users"))).await;
		let config = CoordinatorConfig::default();

		let first = resolve_user_identity(&container, &*store, &config)
			.await
			.unwrap();
		let second = resolve_user_identity(&container, &*store, &config)
			.await
			.unwrap();

		assert_eq!(first, second);
		assert_eq!(store.save_count(), 1);
	}

	#[tokio::test]
	async fn test_malformed_identifier_is_replaced() {
		let record = Record::new(USER, "Users").with_field(USER_FEATURE_FLAGGING_ID_FIELD, "zzz");
		let (store, container) = setup(Some(record)).await;

		let identity = resolve_user_identity(&container, &*store, &CoordinatorConfig::default())
			.await
			.unwrap();

		let persisted = store.get(&RecordId::from(USER)).await.unwrap();
		assert_eq!(
			persisted.get_str(USER_FEATURE_FLAGGING_ID_FIELD).unwrap(),
			identity.feature_flagging_id.to_string()
		);
	}

	#[tokio::test]
	async fn test_user_lookup_failure_is_fatal() {
		let store = Arc::new(MemoryRecordStore::new());
		let container = MemoryContainer::with_user_error(store.clone(), StoreError::Unauthenticated);

		let err = resolve_user_identity(&container, &*store, &CoordinatorConfig::default())
			.await
			.unwrap_err();

		assert_eq!(err, FlagsError::Store(StoreError::Unauthenticated));
		assert_eq!(store.fetch_count(), 0);
	}

	#[tokio::test]
	async fn test_missing_user_record_is_fatal() {
		let (store, container) = setup(None).await;

		let err = resolve_user_identity(&container, &*store, &CoordinatorConfig::default())
			.await
			.unwrap_err();

		assert!(matches!(err, FlagsError::Store(StoreError::NotFound { .. })));
		assert_eq!(store.save_count(), 0);
	}

	#[tokio::test]
	async fn test_save_failure_is_fatal() {
		let (store, container) = setup(Some(Record::new(USER, "Users"))).await;
		store.fail_next_save(StoreError::transient("503")).await;

		let err = resolve_user_identity(&container, &*store, &CoordinatorConfig::default())
			.await
			.unwrap_err();

		assert!(err.is_retryable());
		let persisted = store.get(&RecordId::from(USER)).await.unwrap();
		assert!(persisted.get(USER_FEATURE_FLAGGING_ID_FIELD).is_none());
	}

	#[tokio::test]
	async fn test_saved_record_without_identifier_is_fatal() {
		let (store, container) = setup(Some(Record::new(USER, "Users"))).await;
		store.strip_field_on_save(USER_FEATURE_FLAGGING_ID_FIELD).await;

		let err = resolve_user_identity(&container, &*store, &CoordinatorConfig::default())
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			FlagsError::Parse(ParseError::MissingIdentifier { .. })
		));
		assert_eq!(store.save_count(), 1);
	}

	#[tokio::test]
	async fn test_custom_identity_field() {
		let (store, container) = setup(Some(Record::new(USER, "Users"))).await;
		let config = CoordinatorConfig {
			identity_field: "ffid".to_string(),
			..CoordinatorConfig::default()
		};

		let identity = resolve_user_identity(&container, &*store, &config)
			.await
			.unwrap();

		let persisted = store.fetch(&RecordId::from(USER)).await.unwrap();
		assert_eq!(
			persisted.get_str("ffid").unwrap(),
			identity.feature_flagging_id.to_string()
		);
		assert!(persisted.get(USER_FEATURE_FLAGGING_ID_FIELD).is_none());
	}
}
