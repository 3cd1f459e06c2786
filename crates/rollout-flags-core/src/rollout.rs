// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deterministic percentage bucketing.
//!
//! A user's bucket for a flag is derived from MurmurHash3 (x64, 128-bit,
//! seed 0) over the 16 bytes of the flag's [`FlagUuid`] followed by the 16
//! bytes of the user's [`FeatureFlaggingId`]. The top 53 bits of the hash are
//! mapped onto `[0, 100)`; a user is in the rollout when that percentile is
//! below the flag's rollout percentage.

use std::io::Cursor;

use murmur3::murmur3_x64_128;

use crate::flag::FlagUuid;
use crate::identity::FeatureFlaggingId;

const MANTISSA_BITS: u32 = 53;

/// Hash of a (flag, user) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RolloutHash(pub u128);

impl RolloutHash {
	/// Position of this hash in `[0, 100)`.
	pub fn percentile(&self) -> f64 {
		let top = (self.0 >> (128 - MANTISSA_BITS)) as u64;
		top as f64 / (1u64 << MANTISSA_BITS) as f64 * 100.0
	}
}

impl std::fmt::Display for RolloutHash {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:032x}", self.0)
	}
}

/// Combines a flag instance and a user into their rollout hash.
pub fn user_feature_flag_hash(flag: FlagUuid, user: FeatureFlaggingId) -> RolloutHash {
	let mut input = [0u8; 32];
	input[..16].copy_from_slice(flag.as_bytes());
	input[16..].copy_from_slice(user.as_bytes());

	let hash = murmur3_x64_128(&mut Cursor::new(&input[..]), 0).unwrap_or(0);
	RolloutHash(hash)
}

/// Returns true if `hash` falls inside a rollout of `rollout` percent.
///
/// `rollout` is clamped to `[0, 100]`; NaN counts as 0.
pub fn should_be_active(hash: RolloutHash, rollout: f64) -> bool {
	if rollout.is_nan() || rollout <= 0.0 {
		return false;
	}
	if rollout >= 100.0 {
		return true;
	}
	hash.percentile() < rollout
}


#[cfg(test)]
mod proptest_tests {
	use super::*;
	use proptest::prelude::*;
	use uuid::Uuid;

	proptest! {
		#[test]
		fn decision_is_deterministic(f in any::<u128>(), u in any::<u128>(), rollout in 0.0f64..=100.0) {
			let hash = user_feature_flag_hash(FlagUuid(Uuid::from_u128(f)), FeatureFlaggingId(Uuid::from_u128(u)));
			let again = user_feature_flag_hash(FlagUuid(Uuid::from_u128(f)), FeatureFlaggingId(Uuid::from_u128(u)));
			prop_assert_eq!(should_be_active(hash, rollout), should_be_active(again, rollout));
		}

		#[test]
		fn decision_is_monotonic(f in any::<u128>(), u in any::<u128>(), low in 0.0f64..=100.0, delta in 0.0f64..=100.0) {
			let hash = user_feature_flag_hash(FlagUuid(Uuid::from_u128(f)), FeatureFlaggingId(Uuid::from_u128(u)));
			if should_be_active(hash, low) {
				prop_assert!(should_be_active(hash, low + delta));
			}
		}

		#[test]
		fn percentile_in_range(h in any::<u128>()) {
			let p = RolloutHash(h).percentile();
			prop_assert!((0.0..100.0).contains(&p));
		}

		#[test]
		fn zero_never_includes(f in any::<u128>(), u in any::<u128>()) {
			let hash = user_feature_flag_hash(FlagUuid(Uuid::from_u128(f)), FeatureFlaggingId(Uuid::from_u128(u)));
			prop_assert!(!should_be_active(hash, 0.0));
		}

		#[test]
		fn hundred_always_includes(f in any::<u128>(), u in any::<u128>()) {
			let hash = user_feature_flag_hash(FlagUuid(Uuid::from_u128(f)), FeatureFlaggingId(Uuid::from_u128(u)));
			prop_assert!(should_be_active(hash, 100.0));
		}
	}
}
