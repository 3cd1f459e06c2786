// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseError;
use crate::record::Record;

/// Field on the user record holding the feature-flagging identifier.
pub const USER_FEATURE_FLAGGING_ID_FIELD: &str = "userFeatureFlaggingID";

/// Per-user random identifier used only as rollout hashing input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureFlaggingId(pub Uuid);

impl FeatureFlaggingId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}

	pub fn as_bytes(&self) -> &[u8; 16] {
		self.0.as_bytes()
	}
}

impl Default for FeatureFlaggingId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for FeatureFlaggingId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for FeatureFlaggingId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Flagging-relevant data extracted from a user's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
	pub feature_flagging_id: FeatureFlaggingId,
}

impl UserIdentity {
	/// Extracts the identity stored under the default field name.
	pub fn from_record(record: &Record) -> Result<Self, ParseError> {
		Self::from_record_field(record, USER_FEATURE_FLAGGING_ID_FIELD)
	}

	/// Extracts the identity from `field`.
	///
	/// An absent, non-string or unparsable value yields
	/// [`ParseError::MissingIdentifier`], which callers treat as a signal to
	/// provision a new identifier.
	pub fn from_record_field(record: &Record, field: &str) -> Result<Self, ParseError> {
		record
			.get(field)
			.and_then(|value| value.as_str())
			.and_then(|s| s.parse::<FeatureFlaggingId>().ok())
			.map(|feature_flagging_id| Self {
				feature_flagging_id,
			})
			.ok_or_else(|| ParseError::MissingIdentifier {
				record_id: record.id.clone(),
			})
	}

	/// Writes a freshly generated identifier into `field` of `record`.
	///
	/// Returns the updated record, ready to be saved, and the new identifier.
	pub fn provision(mut record: Record, field: &str) -> (Record, FeatureFlaggingId) {
		let id = FeatureFlaggingId::new();
		record.set(field, id.to_string());
		(record, id)
	}
}
