use crate as pallet_provider_election;
use frame_support::{derive_impl, parameter_types, traits::Hooks, PalletId};
use frame_system::EnsureRoot;
use sp_runtime::{traits::IdentityLookup, BuildStorage};

pub type AccountId = u64;
pub type Balance = u128;
pub type BlockNumber = u64;

pub const INITIAL_BALANCE: Balance = 1_000_000;
// funded with less than anyone needs to bond
pub const POOR: AccountId = 99;

pub const ELECTION_PERIOD: BlockNumber = 20;
pub const RATE_LOCK_DEADLINE: BlockNumber = 5;
pub const UNBONDING_DELAY: BlockNumber = 10;
pub const POOL_CAPACITY: u32 = 5;
pub const ACTIVE_PROVIDERS: u32 = 3;

// Configure a mock runtime to test the pallet
frame_support::construct_runtime!(
	pub enum Test
	{
		System: frame_system,
		Balances: pallet_balances,
		ProviderElection: pallet_provider_election,
	}
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
	type Block = frame_system::mocking::MockBlock<Test>;
	type AccountId = AccountId;
	type AccountData = pallet_balances::AccountData<Balance>;
	type Lookup = IdentityLookup<Self::AccountId>;
}

parameter_types! {
	pub static ExistentialDeposit: Balance = 1;
}

#[derive_impl(pallet_balances::config_preludes::TestDefaultConfig)]
impl pallet_balances::Config for Test {
	type Balance = Balance;
	type AccountStore = System;
	type ExistentialDeposit = ExistentialDeposit;
}

parameter_types! {
	pub const ProviderElectionPalletId: PalletId = PalletId(*b"prvelect");
	pub const ActiveSetHistoryDepth: u64 = 3;
}

impl pallet_provider_election::Config for Test {
	type RuntimeEvent = RuntimeEvent;
	type Currency = Balances;
	type PalletId = ProviderElectionPalletId;
	type ControllerOrigin = EnsureRoot<AccountId>;
	type ActiveSetHistoryDepth = ActiveSetHistoryDepth;
	type WeightInfo = ();
}

pub fn custody_account() -> AccountId {
	pallet_provider_election::Pallet::<Test>::account_id()
}

pub fn new_test_ext() -> sp_io::TestExternalities {
	new_test_ext_with_existential_deposit(1)
}

pub fn new_test_ext_with_existential_deposit(ed: Balance) -> sp_io::TestExternalities {
	ExistentialDeposit::set(&ed);
	let mut t = frame_system::GenesisConfig::<Test>::default().build_storage().unwrap();

	let mut balances: Vec<(AccountId, Balance)> = (1..=10).map(|who| (who, INITIAL_BALANCE)).collect();
	balances.push((POOR, 10));
	pallet_balances::GenesisConfig::<Test> { balances }.assimilate_storage(&mut t).unwrap();

	pallet_provider_election::GenesisConfig::<Test> {
		election_period_length: ELECTION_PERIOD,
		rate_lock_deadline: RATE_LOCK_DEADLINE,
		unbonding_delay: UNBONDING_DELAY,
		pool_capacity: POOL_CAPACITY,
		number_of_active_providers: ACTIVE_PROVIDERS,
	}
	.assimilate_storage(&mut t)
	.unwrap();

	let mut ext: sp_io::TestExternalities = t.into();
	ext.execute_with(|| System::set_block_number(1));
	ext
}

pub fn run_to_block(n: BlockNumber) {
	while System::block_number() < n {
		let next = System::block_number() + 1;
		System::set_block_number(next);
		ProviderElection::on_initialize(next);
	}
}

/// Moves to the first block at which the current round can be closed and starts the next one.
pub fn start_next_round() {
	run_to_block(ProviderElection::round_boundary());
	assert!(ProviderElection::advance_round(RuntimeOrigin::signed(1)).is_ok());
}

/// Self-bonds `stake` and registers `who` with the given compute and storage prices.
pub fn register(who: AccountId, stake: Balance, compute_price: Balance, storage_price: Balance) {
	assert!(ProviderElection::bond(RuntimeOrigin::signed(who), who, stake).is_ok());
	assert!(ProviderElection::register_provider(
		RuntimeOrigin::signed(who),
		storage_price,
		compute_price,
		10,
		20
	)
	.is_ok());
}
