//! Benchmarking setup for pallet-provider-election
#![cfg(feature = "runtime-benchmarks")]

use super::*;
use crate::Pallet as ProviderElection;
use frame_benchmarking::v2::*;
use frame_support::{
	assert_ok,
	traits::{Currency, EnsureOrigin},
};
use frame_system::{pallet_prelude::BlockNumberFor, RawOrigin};
use sp_runtime::traits::Saturating;
use sp_std::vec::Vec;

const SEED: u32 = 0;
const POOL_SIZE: u32 = 20;

fn create_funded_user<T: Config>(name: &'static str, index: u32) -> T::AccountId {
	let user: T::AccountId = account(name, index, SEED);
	T::Currency::make_free_balance_be(&user, stake::<T>(1_000_000_000));
	user
}

fn stake<T: Config>(units: u32) -> BalanceOf<T> {
	T::Currency::minimum_balance().max(1u32.into()).saturating_mul(units.into())
}

/// Opens round 1 at the current block with a long election period.
fn open_round<T: Config>() {
	ElectionPeriodLength::<T>::put(BlockNumberFor::<T>::from(1_000u32));
	RateLockDeadline::<T>::put(BlockNumberFor::<T>::from(10u32));
	CurrentRound::<T>::put(RoundInfo { number: 1, start_height: frame_system::Pallet::<T>::block_number() });
}

fn setup_provider<T: Config>(index: u32, units: u32) -> T::AccountId {
	let provider = create_funded_user::<T>("provider", index);
	assert_ok!(ProviderElection::<T>::bond(
		RawOrigin::Signed(provider.clone()).into(),
		provider.clone(),
		stake::<T>(units)
	));
	assert_ok!(ProviderElection::<T>::register_provider(
		RawOrigin::Signed(provider.clone()).into(),
		stake::<T>(1),
		stake::<T>(1),
		10,
		20
	));
	provider
}

/// Fills the pool to capacity and makes the top entries active for a new round.
fn populated_round<T: Config>() -> Vec<T::AccountId> {
	open_round::<T>();
	Pool::<T>::put(ProviderPool::new(POOL_SIZE));
	NumberOfActiveProviders::<T>::put(POOL_SIZE);
	let providers: Vec<T::AccountId> = (0..POOL_SIZE).map(|i| setup_provider::<T>(i, 10 + i)).collect();

	let boundary = ProviderElection::<T>::round_boundary();
	frame_system::Pallet::<T>::set_block_number(boundary);
	assert_ok!(ProviderElection::<T>::do_advance_round());
	providers
}

#[benchmarks]
mod benchmarks {
	use super::*;

	#[benchmark]
	fn bond() {
		open_round::<T>();
		let provider = setup_provider::<T>(0, 10);
		let delegator = create_funded_user::<T>("delegator", 0);
		let amount = stake::<T>(5);

		#[extrinsic_call]
		bond(RawOrigin::Signed(delegator.clone()), provider.clone(), amount);

		assert_eq!(ProviderElection::<T>::provider_stake(&provider), stake::<T>(15));
	}

	#[benchmark]
	fn unbond() {
		open_round::<T>();
		let provider = setup_provider::<T>(0, 10);

		#[extrinsic_call]
		unbond(RawOrigin::Signed(provider.clone()));

		assert_eq!(ProviderElection::<T>::provider_status(&provider), ProviderStatus::Unregistered);
		assert_eq!(ProviderElection::<T>::delegator_status(&provider), DelegatorStatus::Unbonding);
	}

	#[benchmark]
	fn rebond() {
		open_round::<T>();
		let provider = setup_provider::<T>(0, 10);
		let delegator = create_funded_user::<T>("delegator", 0);
		assert_ok!(ProviderElection::<T>::bond(
			RawOrigin::Signed(delegator.clone()).into(),
			delegator.clone(),
			stake::<T>(5)
		));
		assert_ok!(ProviderElection::<T>::unbond(RawOrigin::Signed(delegator.clone()).into()));

		#[extrinsic_call]
		rebond(RawOrigin::Signed(delegator.clone()), provider.clone());

		assert_eq!(ProviderElection::<T>::provider_stake(&provider), stake::<T>(15));
	}

	#[benchmark]
	fn withdraw() {
		let delegator = create_funded_user::<T>("delegator", 0);
		assert_ok!(ProviderElection::<T>::bond(
			RawOrigin::Signed(delegator.clone()).into(),
			delegator.clone(),
			stake::<T>(5)
		));
		assert_ok!(ProviderElection::<T>::unbond(RawOrigin::Signed(delegator.clone()).into()));
		let release_at =
			frame_system::Pallet::<T>::block_number().saturating_add(UnbondingDelay::<T>::get());
		frame_system::Pallet::<T>::set_block_number(release_at);

		#[extrinsic_call]
		withdraw(RawOrigin::Signed(delegator.clone()));

		assert_eq!(ProviderElection::<T>::delegator_status(&delegator), DelegatorStatus::Unbonded);
	}

	#[benchmark]
	fn register_provider() {
		open_round::<T>();
		Pool::<T>::put(ProviderPool::new(POOL_SIZE));
		NumberOfActiveProviders::<T>::put(1u32);
		for i in 0..POOL_SIZE {
			setup_provider::<T>(i, 10 + i);
		}
		// outranks everyone, so the lowest entry gets evicted
		let caller = create_funded_user::<T>("caller", 0);
		assert_ok!(ProviderElection::<T>::bond(
			RawOrigin::Signed(caller.clone()).into(),
			caller.clone(),
			stake::<T>(1_000)
		));
		let price = stake::<T>(1);

		#[extrinsic_call]
		register_provider(RawOrigin::Signed(caller.clone()), price, price, 10, 20);

		assert_eq!(Pool::<T>::get().first(), Some(&caller));
		assert_eq!(Pool::<T>::get().len(), POOL_SIZE);
	}

	#[benchmark]
	fn resign() {
		open_round::<T>();
		let provider = setup_provider::<T>(0, 10);

		#[extrinsic_call]
		resign(RawOrigin::Signed(provider.clone()));

		assert!(!Pool::<T>::get().contains(&provider));
	}

	#[benchmark]
	fn advance_round() {
		open_round::<T>();
		Pool::<T>::put(ProviderPool::new(POOL_SIZE));
		NumberOfActiveProviders::<T>::put(POOL_SIZE);
		for i in 0..POOL_SIZE {
			setup_provider::<T>(i, 10 + i);
		}
		frame_system::Pallet::<T>::set_block_number(ProviderElection::<T>::round_boundary());
		let caller: T::AccountId = whitelisted_caller();

		#[extrinsic_call]
		advance_round(RawOrigin::Signed(caller));

		assert_eq!(ProviderElection::<T>::active_provider_addresses().len() as u32, POOL_SIZE);
	}

	#[benchmark]
	fn set_election_period_length() -> Result<(), BenchmarkError> {
		let origin = T::ControllerOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;
		let length: BlockNumberFor<T> = 500u32.into();

		#[extrinsic_call]
		_(origin as T::RuntimeOrigin, length);

		assert_eq!(ElectionPeriodLength::<T>::get(), length);
		Ok(())
	}

	#[benchmark]
	fn set_rate_lock_deadline() -> Result<(), BenchmarkError> {
		ElectionPeriodLength::<T>::put(BlockNumberFor::<T>::from(1_000u32));
		let origin = T::ControllerOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;
		let deadline: BlockNumberFor<T> = 50u32.into();

		#[extrinsic_call]
		_(origin as T::RuntimeOrigin, deadline);

		assert_eq!(RateLockDeadline::<T>::get(), deadline);
		Ok(())
	}

	#[benchmark]
	fn set_unbonding_delay() -> Result<(), BenchmarkError> {
		let origin = T::ControllerOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;
		let delay: BlockNumberFor<T> = 50u32.into();

		#[extrinsic_call]
		_(origin as T::RuntimeOrigin, delay);

		assert_eq!(UnbondingDelay::<T>::get(), delay);
		Ok(())
	}

	#[benchmark]
	fn set_pool_capacity() -> Result<(), BenchmarkError> {
		open_round::<T>();
		Pool::<T>::put(ProviderPool::new(POOL_SIZE));
		NumberOfActiveProviders::<T>::put(1u32);
		for i in 0..POOL_SIZE {
			setup_provider::<T>(i, 10 + i);
		}
		let origin = T::ControllerOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;

		#[extrinsic_call]
		_(origin as T::RuntimeOrigin, 1u32);

		assert_eq!(Pool::<T>::get().len(), 1);
		Ok(())
	}

	#[benchmark]
	fn set_number_of_active_providers() -> Result<(), BenchmarkError> {
		Pool::<T>::put(ProviderPool::new(POOL_SIZE));
		let origin = T::ControllerOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;

		#[extrinsic_call]
		_(origin as T::RuntimeOrigin, POOL_SIZE);

		assert_eq!(NumberOfActiveProviders::<T>::get(), POOL_SIZE);
		Ok(())
	}

	#[benchmark]
	fn declare_unavailable() {
		let providers = populated_round::<T>();
		let provider = providers[providers.len() - 1].clone();

		#[extrinsic_call]
		declare_unavailable(RawOrigin::Signed(provider.clone()));

		assert!(UnavailableProviders::<T>::contains_key(&provider));
	}

	#[benchmark]
	fn declare_available() {
		let providers = populated_round::<T>();
		let provider = providers[providers.len() - 1].clone();
		assert_ok!(ProviderElection::<T>::declare_unavailable(RawOrigin::Signed(provider.clone()).into()));

		#[extrinsic_call]
		declare_available(RawOrigin::Signed(provider.clone()));

		assert!(!UnavailableProviders::<T>::contains_key(&provider));
	}

	#[benchmark]
	fn request_provider() {
		populated_round::<T>();
		let caller: T::AccountId = whitelisted_caller();
		let max_price = stake::<T>(1);

		#[extrinsic_call]
		request_provider(RawOrigin::Signed(caller), max_price, ResourceCategory::Compute);
	}

	impl_benchmark_test_suite!(ProviderElection, crate::mock::new_test_ext(), crate::mock::Test);
}
