// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Errors raised while reading typed schema fields out of records.

use thiserror::Error;

use crate::record::RecordId;

/// Failure to interpret a record as one of the known schemas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	/// A required field is not present on the record.
	#[error("record {record_id} is missing field '{field}'")]
	MissingField { record_id: RecordId, field: String },

	/// A field is present but holds a value of the wrong type or shape.
	#[error("record {record_id} has malformed field '{field}': {reason}")]
	MalformedField {
		record_id: RecordId,
		field: String,
		reason: String,
	},

	/// The user record carries no usable feature-flagging identifier.
	///
	/// Recoverable: the identity resolver provisions a fresh identifier.
	#[error("record {record_id} has no feature-flagging identifier")]
	MissingIdentifier { record_id: RecordId },
}

impl ParseError {
	/// Returns true if this error can be recovered from by provisioning an identifier.
	pub fn is_missing_identifier(&self) -> bool {
		matches!(self, ParseError::MissingIdentifier { .. })
	}
}

/// Result type alias for schema parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_missing_identifier_is_recoverable() {
		let err = ParseError::MissingIdentifier {
			record_id: RecordId::from("user_1"),
		};
		assert!(err.is_missing_identifier());
	}

	#[test]
	fn test_missing_field_is_not_recoverable() {
		let err = ParseError::MissingField {
			record_id: RecordId::from("flag_1"),
			field: "rollout".to_string(),
		};
		assert!(!err.is_missing_identifier());
		assert_eq!(err.to_string(), "record flag_1 is missing field 'rollout'");
	}
}
