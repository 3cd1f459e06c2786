// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Percentage-rollout feature flags backed by a remote record store.
//!
//! Flag definitions and a per-user feature-flagging identifier live in a
//! remote record store. A [`FlagCoordinator`] loads both once, in the
//! background, and answers "is this flag on for me?" by hashing the flag's
//! instance id together with the user's identifier.
//!
//! # Features
//!
//! - **Deterministic rollouts**: the same user always lands in the same bucket
//!   for a given flag instance
//! - **Identifier provisioning**: users without an identifier get one
//!   generated and saved on first use
//! - **One fetch per coordinator**: every evaluation reuses the cached catalog
//!   and identity
//! - **Pluggable store**: anything implementing [`RecordStore`] and
//!   [`Container`]; an HTTP adapter and an in-memory fake are included
//!
//! # Example
//!
//! ```ignore
//! use rollout_flags::{FlagCoordinator, HttpRecordStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = HttpRecordStore::builder()
//!         .base_url("https://records.example.com/api")
//!         .auth_token("session_token")
//!         .build()?;
//!
//!     let flags = FlagCoordinator::new(store)?;
//!
//!     if flags.is_enabled("new_checkout").await? {
//!         println!("new checkout flow");
//!     }
//!
//!     Ok(())
//! }
//! ```

mod catalog;
mod config;
mod coordinator;
mod error;
mod http;
mod identity;
pub mod memory;
mod pipeline;
mod store;

pub use catalog::load_flag_catalog;
pub use config::CoordinatorConfig;
pub use coordinator::{EvaluationReason, FlagCoordinator, FlagEvaluation};
pub use error::{FlagsError, Result, StoreError, StoreResult};
pub use http::{HttpRecordStore, HttpRecordStoreBuilder, HttpStoreConfig};
pub use identity::resolve_user_identity;
pub use memory::{MemoryContainer, MemoryRecordStore};
pub use pipeline::Pipeline;
pub use store::{Container, RecordStore};

// Re-export core types for convenience
pub use rollout_flags_core::{
	should_be_active, user_feature_flag_hash, FeatureFlaggingId, FieldValue, FlagCatalog,
	FlagDefinition, FlagUuid, ParseError, Predicate, Query, Record, RecordId, RolloutHash,
	UserIdentity, ZoneId,
};
