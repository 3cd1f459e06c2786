// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag evaluation for the signed-in user.

use std::sync::Arc;

use rollout_flags_core::{
	should_be_active, user_feature_flag_hash, FlagCatalog, FlagDefinition, UserIdentity,
};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::catalog::load_flag_catalog;
use crate::config::CoordinatorConfig;
use crate::error::{FlagsError, Result};
use crate::identity::resolve_user_identity;
use crate::pipeline::Pipeline;
use crate::store::Container;

/// Why a flag evaluated the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvaluationReason {
	/// No flag with this name is in the catalog.
	UnknownFlag,
	/// The user's percentile is below the flag's rollout.
	InRollout { percentile: f64, rollout: f64 },
	/// The user's percentile is at or above the flag's rollout.
	OutOfRollout { percentile: f64, rollout: f64 },
}

/// Outcome of evaluating one flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagEvaluation {
	pub flag_name: String,
	pub enabled: bool,
	pub reason: EvaluationReason,
}

impl FlagEvaluation {
	fn evaluate(name: &str, flag: Option<&FlagDefinition>, identity: &UserIdentity) -> Self {
		let Some(flag) = flag else {
			return Self {
				flag_name: name.to_string(),
				enabled: false,
				reason: EvaluationReason::UnknownFlag,
			};
		};

		let hash = user_feature_flag_hash(flag.uuid, identity.feature_flagging_id);
		let enabled = should_be_active(hash, flag.rollout);
		let percentile = hash.percentile();
		let reason = if enabled {
			EvaluationReason::InRollout {
				percentile,
				rollout: flag.rollout,
			}
		} else {
			EvaluationReason::OutOfRollout {
				percentile,
				rollout: flag.rollout,
			}
		};

		Self {
			flag_name: name.to_string(),
			enabled,
			reason,
		}
	}
}

struct CoordinatorInner {
	identity: Pipeline<UserIdentity>,
	catalog: Pipeline<FlagCatalog>,
	config: CoordinatorConfig,
}

/// Evaluates percentage-rollout flags for the signed-in user.
///
/// Construction starts two background pipelines: one resolves (or
/// provisions) the user's feature-flagging identifier, the other loads the
/// flag catalog. Each runs exactly once; every evaluation reuses their
/// outcomes, including failures. Build a new coordinator to retry.
///
/// Clones share the same pipelines. The pipelines are aborted when the last
/// clone is dropped.
///
/// # Example
///
/// ```ignore
/// use rollout_flags::{FlagCoordinator, HttpRecordStore};
///
/// let store = HttpRecordStore::builder()
///     .base_url("https://records.example.com/api")
///     .auth_token(token)
///     .build()?;
/// let flags = FlagCoordinator::new(store)?;
///
/// if flags.is_enabled("new_checkout").await? {
///     // ...
/// }
/// ```
#[derive(Clone)]
pub struct FlagCoordinator {
	inner: Arc<CoordinatorInner>,
}

impl FlagCoordinator {
	/// Creates a coordinator with the default schema names.
	///
	/// Must be called from within a tokio runtime.
	pub fn new<C>(container: C) -> Result<Self>
	where
		C: Container + 'static,
	{
		Self::with_config(container, CoordinatorConfig::default())
	}

	/// Creates a coordinator with custom schema names.
	pub fn with_config<C>(container: C, config: CoordinatorConfig) -> Result<Self>
	where
		C: Container + 'static,
	{
		let handle = Handle::try_current().map_err(|e| {
			FlagsError::InvalidConfig(format!("flag coordinator requires a tokio runtime: {e}"))
		})?;

		let container = Arc::new(container);
		let store = container.flagging_store();

		let identity = {
			let container = container.clone();
			let store = store.clone();
			let config = config.clone();
			Pipeline::spawn("identity", &handle, async move {
				resolve_user_identity(&*container, &*store, &config).await
			})
		};

		let catalog = {
			let config = config.clone();
			Pipeline::spawn("catalog", &handle, async move {
				load_flag_catalog(&*store, &config).await
			})
		};

		info!(
			flag_record_type = %config.flag_record_type,
			identity_field = %config.identity_field,
			"Flag coordinator started"
		);

		Ok(Self {
			inner: Arc::new(CoordinatorInner {
				identity,
				catalog,
				config,
			}),
		})
	}

	/// Returns whether `flag_name` is active for the current user.
	///
	/// Unknown flags are inactive. Fails if either pipeline failed.
	pub async fn is_enabled(&self, flag_name: &str) -> Result<bool> {
		Ok(self.evaluate(flag_name).await?.enabled)
	}

	/// Evaluates `flag_name` and reports why it came out the way it did.
	pub async fn evaluate(&self, flag_name: &str) -> Result<FlagEvaluation> {
		let (catalog, identity) = self.join().await?;
		let evaluation = FlagEvaluation::evaluate(flag_name, catalog.get(flag_name), &identity);

		debug!(
			flag_name,
			enabled = evaluation.enabled,
			reason = ?evaluation.reason,
			"Flag evaluated"
		);

		Ok(evaluation)
	}

	/// Names of all flags active for the current user, sorted.
	pub async fn enabled_flags(&self) -> Result<Vec<String>> {
		let (catalog, identity) = self.join().await?;
		Ok(catalog
			.names()
			.into_iter()
			.filter(|name| FlagEvaluation::evaluate(name, catalog.get(name), &identity).enabled)
			.map(str::to_string)
			.collect())
	}

	/// The resolved user identity.
	pub async fn user_identity(&self) -> Result<UserIdentity> {
		Ok(*self.inner.identity.get().await?)
	}

	/// The loaded flag catalog.
	pub async fn catalog(&self) -> Result<Arc<FlagCatalog>> {
		self.inner.catalog.get().await
	}

	/// True once both pipelines have completed and been observed.
	pub fn is_ready(&self) -> bool {
		self.inner.catalog.peek().is_some() && self.inner.identity.peek().is_some()
	}

	pub fn config(&self) -> &CoordinatorConfig {
		&self.inner.config
	}

	async fn join(&self) -> Result<(Arc<FlagCatalog>, Arc<UserIdentity>)> {
		tokio::try_join!(self.inner.catalog.get(), self.inner.identity.get())
	}
}

impl std::fmt::Debug for FlagCoordinator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FlagCoordinator")
			.field("identity", &self.inner.identity)
			.field("catalog", &self.inner.catalog)
			.field("config", &self.inner.config)
			.finish()
	}
}
