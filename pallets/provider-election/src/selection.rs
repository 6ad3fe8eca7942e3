//! Stake-weighted draw over a round's active providers.
//!
//! The seed mixes the caller and the block height through blake2. Anyone who
//! knows both can compute it ahead of time, so the draw must not be relied on
//! where callers are adversarial.

use crate::types::{ActiveProviderSet, ResourceCategory};
use codec::Encode;
use sp_io::hashing::blake2_256;
use sp_runtime::{traits::AtLeast32BitUnsigned, SaturatedConversion};

/// Deterministic seed for `caller` at `height`.
pub fn draw_seed<AccountId: Encode, BlockNumber: Encode>(caller: &AccountId, height: BlockNumber) -> u128 {
	let hash = blake2_256(&(caller, height).encode());
	let mut bytes = [0u8; 16];
	bytes.copy_from_slice(&hash[..16]);
	u128::from_le_bytes(bytes)
}

/// Picks one member of `set` whose `category` price is at most `max_price`,
/// with probability proportional to its stake among those that qualify.
/// Members rejected by `is_available` take no part in the draw.
pub fn select_weighted<AccountId, Balance>(
	set: &ActiveProviderSet<AccountId, Balance>,
	max_price: Balance,
	category: ResourceCategory,
	seed: u128,
	is_available: impl Fn(&AccountId) -> bool,
) -> Option<AccountId>
where
	AccountId: Clone,
	Balance: AtLeast32BitUnsigned + Copy,
{
	let qualifying: sp_std::vec::Vec<_> = set
		.members
		.iter()
		.filter(|member| member.params.price_for(category) <= max_price)
		.filter(|member| is_available(&member.account))
		.collect();

	let total = qualifying
		.iter()
		.fold(0u128, |acc, member| acc.saturating_add(member.stake.saturated_into::<u128>()));
	if total == 0 {
		return None;
	}

	let target = seed % total;
	let mut cumulative = 0u128;
	for member in qualifying {
		cumulative = cumulative.saturating_add(member.stake.saturated_into::<u128>());
		if cumulative > target {
			return Some(member.account.clone());
		}
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{ActiveMember, ProviderParams};

	fn member(account: u64, stake: u128, compute: u128, storage: u128) -> ActiveMember<u64, u128> {
		ActiveMember {
			account,
			stake,
			params: ProviderParams {
				price_per_storage: storage,
				price_per_compute: compute,
				block_reward_cut: 10,
				fee_share: 10,
			},
		}
	}

	fn set_of(members: Vec<ActiveMember<u64, u128>>) -> ActiveProviderSet<u64, u128> {
		let total_stake = members.iter().map(|m| m.stake).sum();
		ActiveProviderSet { total_stake, members }
	}

	#[test]
	fn seed_depends_on_caller_and_height() {
		assert_eq!(draw_seed(&1u64, 10u64), draw_seed(&1u64, 10u64));
		assert_ne!(draw_seed(&1u64, 10u64), draw_seed(&2u64, 10u64));
		assert_ne!(draw_seed(&1u64, 10u64), draw_seed(&1u64, 11u64));
	}

	#[test]
	fn empty_set_selects_nobody() {
		let set = set_of(vec![]);
		assert_eq!(select_weighted(&set, 100, ResourceCategory::Compute, 7, |_| true), None);
	}

	#[test]
	fn cumulative_walk_maps_seed_to_member() {
		let set = set_of(vec![member(1, 1, 0, 0), member(2, 10, 0, 0), member(3, 30, 0, 0)]);
		let pick = |seed| select_weighted(&set, 0, ResourceCategory::Compute, seed, |_| true);
		assert_eq!(pick(0), Some(1));
		assert_eq!(pick(1), Some(2));
		assert_eq!(pick(10), Some(2));
		assert_eq!(pick(11), Some(3));
		assert_eq!(pick(40), Some(3));
		// seeds wrap around the qualifying total
		assert_eq!(pick(41), Some(1));
	}

	#[test]
	fn price_ceiling_filters_before_weighting() {
		let set = set_of(vec![member(1, 1, 10, 0), member(2, 10, 12, 0), member(3, 30, 14, 0)]);
		for seed in 0..100u128 {
			assert_eq!(select_weighted(&set, 11, ResourceCategory::Compute, seed, |_| true), Some(1));
			assert_eq!(select_weighted(&set, 9, ResourceCategory::Compute, seed, |_| true), None);
		}
		// equal price qualifies
		assert_eq!(select_weighted(&set, 10, ResourceCategory::Compute, 5, |_| true), Some(1));
	}

	#[test]
	fn category_picks_matching_price() {
		let set = set_of(vec![member(1, 5, 100, 1), member(2, 5, 1, 100)]);
		for seed in 0..20u128 {
			assert_eq!(select_weighted(&set, 10, ResourceCategory::Storage, seed, |_| true), Some(1));
			assert_eq!(select_weighted(&set, 10, ResourceCategory::Compute, seed, |_| true), Some(2));
		}
	}

	#[test]
	fn unavailable_members_are_skipped() {
		let set = set_of(vec![member(1, 50, 0, 0), member(2, 1, 0, 0)]);
		for seed in 0..20u128 {
			assert_eq!(select_weighted(&set, 0, ResourceCategory::Compute, seed, |who| *who != 1), Some(2));
		}
		assert_eq!(select_weighted(&set, 0, ResourceCategory::Compute, 3, |_| false), None);
	}

	#[test]
	fn draws_follow_stake_weights() {
		let set = set_of(vec![member(1, 1, 0, 0), member(2, 10, 0, 0), member(3, 30, 0, 0)]);
		let trials = 2_000u64;
		let mut counts = [0u64; 3];
		for height in 0..trials {
			let seed = draw_seed(&42u64, height);
			match select_weighted(&set, 0, ResourceCategory::Compute, seed, |_| true) {
				Some(who) => counts[(who - 1) as usize] += 1,
				None => panic!("active set is not empty"),
			}
		}
		let expected = [1.0 / 41.0, 10.0 / 41.0, 30.0 / 41.0];
		for (count, expected) in counts.iter().zip(expected.iter()) {
			let frequency = *count as f64 / trials as f64;
			assert!((frequency - expected).abs() < 0.05, "{} vs {}", frequency, expected);
		}
	}
}
