use jsonrpsee::core::RpcResult;
use jsonrpsee::types::error::{ErrorObject, ErrorObjectOwned, INTERNAL_ERROR_CODE};
use rpc_primitives_provider_election::ProviderElectionRuntimeApi;
use rpc_primitives_provider_election::{DelegatorStatus, ProviderStatus, RankedProvider, ResourceCategory};
use sp_api::ProvideRuntimeApi;
use sp_blockchain::HeaderBackend;
use sp_runtime::traits::Block as BlockT;
use sp_runtime::AccountId32;
use sp_std::vec::Vec;
use std::sync::Arc;

pub use rpc_core_provider_election::ProviderElectionApiServer;

fn internal_err<T: ToString>(message: T) -> ErrorObjectOwned {
	ErrorObject::owned(INTERNAL_ERROR_CODE, message.to_string(), None::<()>)
}

/// Provider election API implementation.
pub struct ProviderElectionImpl<B: BlockT, C> {
	client: Arc<C>,
	_phantom_data: std::marker::PhantomData<B>,
}

impl<B: BlockT, C> ProviderElectionImpl<B, C> {
	pub fn new(client: Arc<C>) -> Self {
		Self { client, _phantom_data: Default::default() }
	}
}

impl<B, C> ProviderElectionApiServer for ProviderElectionImpl<B, C>
where
	B: BlockT,
	C: ProvideRuntimeApi<B> + 'static,
	C::Api: ProviderElectionRuntimeApi<B>,
	C: HeaderBackend<B> + Send + Sync,
{
	fn provider_status(&self, account: AccountId32) -> RpcResult<ProviderStatus> {
		let api = self.client.runtime_api();
		let best_hash = self.client.info().best_hash;

		api.provider_status(best_hash, account)
			.map_err(|err| internal_err(format!("fetch provider status failed: {:?}", err)))
	}

	fn delegator_status(&self, account: AccountId32) -> RpcResult<DelegatorStatus> {
		let api = self.client.runtime_api();
		let best_hash = self.client.info().best_hash;

		api.delegator_status(best_hash, account)
			.map_err(|err| internal_err(format!("fetch delegator status failed: {:?}", err)))
	}

	fn provider_stake(&self, account: AccountId32) -> RpcResult<u128> {
		let api = self.client.runtime_api();
		let best_hash = self.client.info().best_hash;

		api.provider_stake(best_hash, account)
			.map_err(|err| internal_err(format!("fetch provider stake failed: {:?}", err)))
	}

	fn active_provider_addresses(&self) -> RpcResult<Vec<AccountId32>> {
		let api = self.client.runtime_api();
		let best_hash = self.client.info().best_hash;

		api.active_provider_addresses(best_hash)
			.map_err(|err| internal_err(format!("fetch active providers failed: {:?}", err)))
	}

	fn ranked_providers(&self) -> RpcResult<Vec<RankedProvider>> {
		let api = self.client.runtime_api();
		let best_hash = self.client.info().best_hash;

		api.ranked_providers(best_hash)
			.map_err(|err| internal_err(format!("fetch ranked providers failed: {:?}", err)))
	}

	fn current_round(&self) -> RpcResult<u64> {
		let api = self.client.runtime_api();
		let best_hash = self.client.info().best_hash;

		api.current_round(best_hash)
			.map_err(|err| internal_err(format!("fetch current round failed: {:?}", err)))
	}

	fn select_provider(
		&self,
		caller: AccountId32,
		max_price: u128,
		category: ResourceCategory,
	) -> RpcResult<Option<AccountId32>> {
		let api = self.client.runtime_api();
		let best_hash = self.client.info().best_hash;

		api.select_provider(best_hash, caller, max_price, category)
			.map_err(|err| internal_err(format!("select provider failed: {:?}", err)))
	}
}
