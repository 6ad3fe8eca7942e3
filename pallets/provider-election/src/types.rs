use codec::{Decode, Encode};
use frame_support::pallet_prelude::RuntimeDebug;
use scale_info::TypeInfo;
use sp_std::prelude::*;

pub use rpc_primitives_provider_election::{DelegatorStatus, ProviderStatus, ResourceCategory};

/// Upper bound for `block_reward_cut` and `fee_share`, both expressed in percent.
pub const MAX_PERCENT: u8 = 100;

/// Prices and revenue split a provider advertises.
#[derive(Clone, Encode, Decode, RuntimeDebug, TypeInfo, PartialEq, Eq, Default)]
pub struct ProviderParams<Balance> {
	pub price_per_storage: Balance,
	pub price_per_compute: Balance,
	// percentage of the block reward kept by the provider
	pub block_reward_cut: u8,
	// percentage of fees shared with delegators
	pub fee_share: u8,
}

impl<Balance: Copy> ProviderParams<Balance> {
	pub fn price_for(&self, category: ResourceCategory) -> Balance {
		match category {
			ResourceCategory::Compute => self.price_per_compute,
			ResourceCategory::Storage => self.price_per_storage,
		}
	}

	pub fn is_valid(&self) -> bool {
		self.block_reward_cut <= MAX_PERCENT && self.fee_share <= MAX_PERCENT
	}
}

/// Bonding state of an account. A missing entry means the account is unbonded.
#[derive(Clone, Encode, Decode, RuntimeDebug, TypeInfo, PartialEq, Eq)]
pub enum DelegatorState<AccountId, Balance, BlockNumber> {
	Bonded { target: AccountId, amount: Balance },
	Unbonding { amount: Balance, release_at: BlockNumber },
}

impl<AccountId, Balance, BlockNumber> DelegatorState<AccountId, Balance, BlockNumber> {
	pub fn status(&self) -> DelegatorStatus {
		match self {
			Self::Bonded { .. } => DelegatorStatus::Bonded,
			Self::Unbonding { .. } => DelegatorStatus::Unbonding,
		}
	}
}

#[derive(Clone, Encode, Decode, RuntimeDebug, TypeInfo, PartialEq, Eq, Default)]
pub struct RoundInfo<BlockNumber> {
	// zero until the first round has been started
	pub number: u64,
	pub start_height: BlockNumber,
}

/// A provider as it was locked in at the start of a round.
#[derive(Clone, Encode, Decode, RuntimeDebug, TypeInfo, PartialEq, Eq)]
pub struct ActiveMember<AccountId, Balance> {
	pub account: AccountId,
	pub params: ProviderParams<Balance>,
	pub stake: Balance,
}

/// Snapshot of the top ranked providers for one round, in ranking order.
#[derive(Clone, Encode, Decode, RuntimeDebug, TypeInfo, PartialEq, Eq)]
pub struct ActiveProviderSet<AccountId, Balance> {
	pub total_stake: Balance,
	pub members: Vec<ActiveMember<AccountId, Balance>>,
}

impl<AccountId: PartialEq, Balance> ActiveProviderSet<AccountId, Balance> {
	pub fn contains(&self, who: &AccountId) -> bool {
		self.members.iter().any(|member| &member.account == who)
	}

	pub fn is_empty(&self) -> bool {
		self.members.is_empty()
	}
}

#[derive(Clone, Copy, Encode, Decode, RuntimeDebug, TypeInfo, PartialEq, Eq)]
pub enum ElectionParameter {
	ElectionPeriodLength,
	RateLockDeadline,
	UnbondingDelay,
	PoolCapacity,
	NumberOfActiveProviders,
}
