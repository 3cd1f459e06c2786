// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for percentage-rollout feature flags.
//!
//! This crate is pure and synchronous. It provides the record model shared
//! with the remote record store, the flag and user-identity schemas, and the
//! deterministic rollout hash. The async orchestration lives in
//! `rollout-flags`.
//!
//! # Example
//!
//! ```
//! use rollout_flags_core::{
//!     should_be_active, user_feature_flag_hash, FeatureFlaggingId, FlagDefinition,
//! };
//!
//! let flag = FlagDefinition::new("new_checkout", 100.0);
//! let user = FeatureFlaggingId::new();
//!
//! let hash = user_feature_flag_hash(flag.uuid, user);
//! assert!(should_be_active(hash, flag.rollout));
//! ```

pub mod error;
pub mod flag;
pub mod identity;
pub mod record;
pub mod rollout;

pub use error::{ParseError, Result};
pub use flag::{
	FlagCatalog, FlagDefinition, FlagUuid, FEATURE_FLAG_RECORD_TYPE, FLAG_NAME_FIELD,
	FLAG_ROLLOUT_FIELD, FLAG_UUID_FIELD,
};
pub use identity::{FeatureFlaggingId, UserIdentity, USER_FEATURE_FLAGGING_ID_FIELD};
pub use record::{FieldValue, Predicate, Query, Record, RecordId, ZoneId};
pub use rollout::{should_be_active, user_feature_flag_hash, RolloutHash};
