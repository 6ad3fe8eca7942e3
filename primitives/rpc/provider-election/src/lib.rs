#![cfg_attr(not(feature = "std"), no_std)]
use sp_api::decl_runtime_apis;

use parity_scale_codec::{Decode, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};
use sp_runtime::{AccountId32, RuntimeDebug};
use sp_std::vec::Vec;

/// Kind of work a provider is priced for.
#[derive(
	Clone, Copy, Encode, Decode, MaxEncodedLen, TypeInfo, Serialize, Deserialize, PartialEq, Eq, RuntimeDebug,
)]
pub enum ResourceCategory {
	Compute,
	Storage,
}

#[derive(
	Clone,
	Copy,
	Default,
	Encode,
	Decode,
	MaxEncodedLen,
	TypeInfo,
	Serialize,
	Deserialize,
	PartialEq,
	Eq,
	RuntimeDebug,
)]
pub enum ProviderStatus {
	#[default]
	Unregistered,
	Registered,
}

#[derive(
	Clone,
	Copy,
	Default,
	Encode,
	Decode,
	MaxEncodedLen,
	TypeInfo,
	Serialize,
	Deserialize,
	PartialEq,
	Eq,
	RuntimeDebug,
)]
pub enum DelegatorStatus {
	/// No bond and nothing left to withdraw.
	#[default]
	Unbonded,
	Bonded,
	/// Unbonded, tokens waiting in custody for the release height.
	Unbonding,
}

/// Flattened view of a pool entry, highest stake first.
#[derive(Clone, Encode, Decode, TypeInfo, Serialize, Deserialize, PartialEq, Eq, RuntimeDebug)]
pub struct RankedProvider {
	pub account: AccountId32,
	pub stake: u128,
}

decl_runtime_apis! {
	pub trait ProviderElectionRuntimeApi {
		fn provider_status(account: AccountId32) -> ProviderStatus;
		fn delegator_status(account: AccountId32) -> DelegatorStatus;
		fn provider_stake(account: AccountId32) -> u128;
		fn active_provider_addresses() -> Vec<AccountId32>;
		fn ranked_providers() -> Vec<RankedProvider>;
		fn current_round() -> u64;
		fn select_provider(caller: AccountId32, max_price: u128, category: ResourceCategory) -> Option<AccountId32>;
	}
}
