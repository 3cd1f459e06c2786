// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use rollout_flags_core::{FlagCatalog, Query};
use tracing::{info, instrument, warn};

use crate::config::CoordinatorConfig;
use crate::error::Result;
use crate::store::RecordStore;

/// Loads every flag definition from the store with a single query.
///
/// Records that do not parse as flags are skipped with a warning; only a
/// failure of the query itself fails the load.
#[instrument(skip_all, fields(record_type = %config.flag_record_type))]
pub async fn load_flag_catalog(
	store: &dyn RecordStore,
	config: &CoordinatorConfig,
) -> Result<FlagCatalog> {
	let query = Query::all(config.flag_record_type.as_str());
	let records = store.query(&query, config.catalog_zone.as_ref()).await?;

	let (catalog, skipped) = FlagCatalog::from_records(&records);
	for error in &skipped {
		warn!(error = %error, "Skipping unparsable flag record");
	}

	info!(
		flags = catalog.len(),
		skipped = skipped.len(),
		"Loaded flag catalog"
	);

	Ok(catalog)
}
