use crate::types::ResourceCategory;

/// Entry point for pallets that hand out work to elected providers.
pub trait ProviderSelector<AccountId, Balance> {
	fn select_provider(caller: &AccountId, max_price: Balance, category: ResourceCategory) -> Option<AccountId>;

	fn is_active_provider(who: &AccountId) -> bool;
}
