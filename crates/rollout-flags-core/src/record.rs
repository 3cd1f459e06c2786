// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Typed record model shared with the remote record store.
//!
//! A [`Record`] is a typed bag of named [`FieldValue`]s identified by an
//! opaque [`RecordId`]. Schema-specific accessors live next to the schemas
//! (see [`crate::flag`] and [`crate::identity`]).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Opaque identifier of a record in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for RecordId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for RecordId {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

impl From<String> for RecordId {
	fn from(s: String) -> Self {
		Self(s)
	}
}

/// Identifier of a record zone. `None` in query scopes means the global zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub String);

impl std::fmt::Display for ZoneId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ZoneId {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

/// A single typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
	String(String),
	Int64(i64),
	Double(f64),
	Bool(bool),
	Timestamp(DateTime<Utc>),
	Reference(RecordId),
}

impl FieldValue {
	/// Short name of the value's type, used in error messages.
	pub fn type_name(&self) -> &'static str {
		match self {
			FieldValue::String(_) => "string",
			FieldValue::Int64(_) => "int64",
			FieldValue::Double(_) => "double",
			FieldValue::Bool(_) => "bool",
			FieldValue::Timestamp(_) => "timestamp",
			FieldValue::Reference(_) => "reference",
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			FieldValue::String(s) => Some(s),
			_ => None,
		}
	}

	/// Numeric view; integers widen to `f64`.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			FieldValue::Int64(n) => Some(*n as f64),
			FieldValue::Double(n) => Some(*n),
			_ => None,
		}
	}
}

impl From<&str> for FieldValue {
	fn from(s: &str) -> Self {
		FieldValue::String(s.to_string())
	}
}

impl From<String> for FieldValue {
	fn from(s: String) -> Self {
		FieldValue::String(s)
	}
}

impl From<f64> for FieldValue {
	fn from(n: f64) -> Self {
		FieldValue::Double(n)
	}
}

impl From<i64> for FieldValue {
	fn from(n: i64) -> Self {
		FieldValue::Int64(n)
	}
}

impl From<bool> for FieldValue {
	fn from(b: bool) -> Self {
		FieldValue::Bool(b)
	}
}

/// A record as stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
	pub id: RecordId,
	pub record_type: String,
	#[serde(default)]
	pub fields: BTreeMap<String, FieldValue>,
	/// Server-assigned version tag; `None` until first saved.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub change_tag: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub modified_at: Option<DateTime<Utc>>,
}

impl Record {
	pub fn new(id: impl Into<RecordId>, record_type: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			record_type: record_type.into(),
			fields: BTreeMap::new(),
			change_tag: None,
			modified_at: None,
		}
	}

	pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
		self.set(name, value);
		self
	}

	pub fn get(&self, name: &str) -> Option<&FieldValue> {
		self.fields.get(name)
	}

	pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
		self.fields.insert(name.into(), value.into());
	}

	pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
		self.fields.remove(name)
	}

	/// Reads a required string field.
	pub fn get_str(&self, name: &str) -> Result<&str, ParseError> {
		let value = self.require(name)?;
		value.as_str().ok_or_else(|| self.malformed(name, value))
	}

	/// Reads a required numeric field.
	pub fn get_number(&self, name: &str) -> Result<f64, ParseError> {
		let value = self.require(name)?;
		value.as_f64().ok_or_else(|| self.malformed(name, value))
	}

	fn require(&self, name: &str) -> Result<&FieldValue, ParseError> {
		self.fields.get(name).ok_or_else(|| ParseError::MissingField {
			record_id: self.id.clone(),
			field: name.to_string(),
		})
	}

	fn malformed(&self, name: &str, value: &FieldValue) -> ParseError {
		ParseError::MalformedField {
			record_id: self.id.clone(),
			field: name.to_string(),
			reason: format!("unexpected {} value", value.type_name()),
		}
	}
}

/// Filter applied by a [`Query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
	/// Matches every record of the queried type.
	All,
	/// Matches records whose field equals the given value.
	Equals { field: String, value: FieldValue },
}

impl Predicate {
	pub fn matches(&self, record: &Record) -> bool {
		match self {
			Predicate::All => true,
			Predicate::Equals { field, value } => record.get(field) == Some(value),
		}
	}
}

/// A typed query over one record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
	pub record_type: String,
	pub predicate: Predicate,
}

impl Query {
	/// Query for every record of `record_type`.
	pub fn all(record_type: impl Into<String>) -> Self {
		Self {
			record_type: record_type.into(),
			predicate: Predicate::All,
		}
	}

	pub fn matches(&self, record: &Record) -> bool {
		record.record_type == self.record_type && self.predicate.matches(record)
	}
}
