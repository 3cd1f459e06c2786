// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the flags SDK.
//!
//! All errors are `Clone`: a pipeline's outcome is computed once and handed
//! to every caller that asks for it.

use rollout_flags_core::{ParseError, RecordId};
use thiserror::Error;

/// Failures reported by a record store or container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
	/// The requested record does not exist.
	#[error("record not found: {id}")]
	NotFound { id: RecordId },

	/// Temporary server-side or network condition; the same request may succeed later.
	#[error("transient store error: {message}")]
	Transient {
		message: String,
		retry_after_secs: Option<u64>,
	},

	/// The session is missing or no longer valid.
	#[error("not authenticated with the record store")]
	Unauthenticated,

	/// The store replied with something this client could not interpret.
	#[error("internal store error: {message}")]
	Internal { message: String },
}

impl StoreError {
	pub fn transient(message: impl Into<String>) -> Self {
		StoreError::Transient {
			message: message.into(),
			retry_after_secs: None,
		}
	}

	pub fn internal(message: impl Into<String>) -> Self {
		StoreError::Internal {
			message: message.into(),
		}
	}

	/// Returns true if a caller-level retry has a chance of succeeding.
	pub fn is_retryable(&self) -> bool {
		matches!(self, StoreError::Transient { .. })
	}
}

/// Errors surfaced by flag evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagsError {
	#[error(transparent)]
	Store(#[from] StoreError),

	/// A record required for evaluation could not be interpreted.
	#[error(transparent)]
	Parse(#[from] ParseError),

	/// A background pipeline stopped before producing a value.
	#[error("{pipeline} pipeline aborted: {reason}")]
	PipelineAborted {
		pipeline: &'static str,
		reason: String,
	},

	/// A client was built with missing or invalid settings.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),
}

impl FlagsError {
	/// Returns true if rebuilding the coordinator may produce a different outcome.
	pub fn is_retryable(&self) -> bool {
		match self {
			FlagsError::Store(e) => e.is_retryable(),
			FlagsError::Parse(_) | FlagsError::InvalidConfig(_) => false,
			FlagsError::PipelineAborted { .. } => true,
		}
	}
}

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, FlagsError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
