// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use rollout_flags_core::{ZoneId, FEATURE_FLAG_RECORD_TYPE, USER_FEATURE_FLAGGING_ID_FIELD};
use serde::{Deserialize, Serialize};

/// Schema names the coordinator uses when talking to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
	/// Record type queried for flag definitions.
	pub flag_record_type: String,
	/// Field on the user record that holds the feature-flagging identifier.
	pub identity_field: String,
	/// Zone searched for flag definitions; `None` is the global zone.
	pub catalog_zone: Option<ZoneId>,
}

impl Default for CoordinatorConfig {
	fn default() -> Self {
		Self {
			flag_record_type: FEATURE_FLAG_RECORD_TYPE.to_string(),
			identity_field: USER_FEATURE_FLAGGING_ID_FIELD.to_string(),
			catalog_zone: None,
		}
	}
}
