// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseError;
use crate::record::{Record, RecordId};

/// Record type of flag definitions in the store.
pub const FEATURE_FLAG_RECORD_TYPE: &str = "FeatureFlag";

pub const FLAG_NAME_FIELD: &str = "name";
pub const FLAG_ROLLOUT_FIELD: &str = "rollout";
pub const FLAG_UUID_FIELD: &str = "uuid";

/// Identifies one instance of a flag. A flag deleted and recreated under the
/// same name gets a new `FlagUuid`, and with it a fresh user partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagUuid(pub Uuid);

impl FlagUuid {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}

	pub fn as_bytes(&self) -> &[u8; 16] {
		self.0.as_bytes()
	}
}

impl Default for FlagUuid {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for FlagUuid {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for FlagUuid {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// A named flag with its rollout percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagDefinition {
	pub name: String,
	/// Percentage of users in `[0, 100]`; values outside are clamped at evaluation.
	pub rollout: f64,
	pub uuid: FlagUuid,
}

impl FlagDefinition {
	pub fn new(name: impl Into<String>, rollout: f64) -> Self {
		Self {
			name: name.into(),
			rollout,
			uuid: FlagUuid::new(),
		}
	}

	/// Serializes the definition into a `FeatureFlag` record.
	pub fn to_record(&self, id: impl Into<RecordId>) -> Record {
		Record::new(id, FEATURE_FLAG_RECORD_TYPE)
			.with_field(FLAG_NAME_FIELD, self.name.as_str())
			.with_field(FLAG_ROLLOUT_FIELD, self.rollout)
			.with_field(FLAG_UUID_FIELD, self.uuid.to_string())
	}
}

impl TryFrom<&Record> for FlagDefinition {
	type Error = ParseError;

	fn try_from(record: &Record) -> Result<Self, Self::Error> {
		let name = record.get_str(FLAG_NAME_FIELD)?.to_string();
		let rollout = record.get_number(FLAG_ROLLOUT_FIELD)?;
		let uuid = record
			.get_str(FLAG_UUID_FIELD)?
			.parse::<FlagUuid>()
			.map_err(|e| ParseError::MalformedField {
				record_id: record.id.clone(),
				field: FLAG_UUID_FIELD.to_string(),
				reason: e.to_string(),
			})?;

		Ok(Self {
			name,
			rollout,
			uuid,
		})
	}
}

/// All known flags, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagCatalog {
	flags: HashMap<String, FlagDefinition>,
}

impl FlagCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a catalog from raw records.
	///
	/// Records that fail to parse are left out of the catalog and returned
	/// alongside it. When two records share a name the later one wins.
	pub fn from_records<'a, I>(records: I) -> (Self, Vec<ParseError>)
	where
		I: IntoIterator<Item = &'a Record>,
	{
		let mut catalog = Self::new();
		let mut skipped = Vec::new();

		for record in records {
			match FlagDefinition::try_from(record) {
				Ok(flag) => catalog.insert(flag),
				Err(e) => skipped.push(e),
			}
		}

		(catalog, skipped)
	}

	pub fn insert(&mut self, flag: FlagDefinition) {
		self.flags.insert(flag.name.clone(), flag);
	}

	pub fn get(&self, name: &str) -> Option<&FlagDefinition> {
		self.flags.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.flags.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.flags.len()
	}

	pub fn is_empty(&self) -> bool {
		self.flags.is_empty()
	}

	/// Flag names in sorted order.
	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.flags.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}

	pub fn iter(&self) -> impl Iterator<Item = &FlagDefinition> {
		self.flags.values()
	}
}

impl FromIterator<FlagDefinition> for FlagCatalog {
	fn from_iter<T: IntoIterator<Item = FlagDefinition>>(iter: T) -> Self {
		let mut catalog = Self::new();
		for flag in iter {
			catalog.insert(flag);
		}
		catalog
	}
}
