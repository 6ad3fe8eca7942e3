pub use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use sp_runtime::AccountId32;
use sp_std::vec::Vec;

use rpc_primitives_provider_election::{DelegatorStatus, ProviderStatus, RankedProvider, ResourceCategory};

/// Read-only view over the provider election state at the best block.
#[rpc(server)]
pub trait ProviderElectionApi {
	#[method(name = "providerElection_providerStatus")]
	fn provider_status(&self, account: AccountId32) -> RpcResult<ProviderStatus>;

	#[method(name = "providerElection_delegatorStatus")]
	fn delegator_status(&self, account: AccountId32) -> RpcResult<DelegatorStatus>;

	#[method(name = "providerElection_providerStake")]
	fn provider_stake(&self, account: AccountId32) -> RpcResult<u128>;

	#[method(name = "providerElection_activeProviders")]
	fn active_provider_addresses(&self) -> RpcResult<Vec<AccountId32>>;

	/// Pool members in descending stake order.
	#[method(name = "providerElection_rankedProviders")]
	fn ranked_providers(&self) -> RpcResult<Vec<RankedProvider>>;

	#[method(name = "providerElection_currentRound")]
	fn current_round(&self) -> RpcResult<u64>;

	/// Dry-runs the weighted draw for `caller` against the best block.
	#[method(name = "providerElection_selectProvider")]
	fn select_provider(
		&self,
		caller: AccountId32,
		max_price: u128,
		category: ResourceCategory,
	) -> RpcResult<Option<AccountId32>>;
}
