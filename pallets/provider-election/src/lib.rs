// We make sure this pallet uses `no_std` for compiling to Wasm.
#![cfg_attr(not(feature = "std"), no_std)]

pub use pallet::*;

#[cfg(test)]
mod mock;


#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;
pub mod provider_pool;
pub mod selection;
pub mod traits;
mod types;
pub mod weights;
pub use provider_pool::{PoolError, ProviderPool};
pub use traits::ProviderSelector;
pub use types::*;
pub use weights::*;

pub const LOG_TARGET: &str = "runtime::provider-election";

#[frame_support::pallet]
pub mod pallet {
	use super::*;
	use frame_support::{
		pallet_prelude::*,
		traits::{Currency, ExistenceRequirement},
		PalletId,
	};
	use frame_system::pallet_prelude::*;
	use sp_runtime::{
		traits::{AccountIdConversion, One, Saturating, Zero},
		SaturatedConversion,
	};
	use sp_std::vec::Vec;

	pub type BalanceOf<T> =
		<<T as Config>::Currency as Currency<<T as frame_system::Config>::AccountId>>::Balance;

	pub type DelegatorStateOf<T> =
		DelegatorState<<T as frame_system::Config>::AccountId, BalanceOf<T>, BlockNumberFor<T>>;

	pub type ActiveProviderSetOf<T> =
		ActiveProviderSet<<T as frame_system::Config>::AccountId, BalanceOf<T>>;

	pub type ProviderPoolOf<T> = ProviderPool<<T as frame_system::Config>::AccountId, BalanceOf<T>>;

	#[pallet::pallet]
	#[pallet::without_storage_info]
	pub struct Pallet<T>(_);

	#[pallet::config]
	pub trait Config: frame_system::Config {
		type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

		/// Token ledger bonded amounts are moved through.
		type Currency: Currency<Self::AccountId>;

		/// The pallet's id, used for deriving the account holding bonded tokens.
		#[pallet::constant]
		type PalletId: Get<PalletId>;

		/// Origin allowed to change election parameters.
		type ControllerOrigin: EnsureOrigin<Self::RuntimeOrigin>;

		/// How many rounds of active sets are kept in storage.
		#[pallet::constant]
		type ActiveSetHistoryDepth: Get<u64>;

		type WeightInfo: WeightInfo;
	}

	#[pallet::storage]
	pub type ElectionPeriodLength<T: Config> = StorageValue<_, BlockNumberFor<T>, ValueQuery>;

	/// Blocks before the end of a round during which provider parameters are frozen.
	#[pallet::storage]
	pub type RateLockDeadline<T: Config> = StorageValue<_, BlockNumberFor<T>, ValueQuery>;

	#[pallet::storage]
	pub type UnbondingDelay<T: Config> = StorageValue<_, BlockNumberFor<T>, ValueQuery>;

	#[pallet::storage]
	pub type NumberOfActiveProviders<T> = StorageValue<_, u32, ValueQuery>;

	#[pallet::storage]
	pub type CurrentRound<T: Config> = StorageValue<_, RoundInfo<BlockNumberFor<T>>, ValueQuery>;

	/// Registered providers ranked by stake. Also carries the pool capacity.
	#[pallet::storage]
	#[pallet::getter(fn provider_pool)]
	pub type Pool<T: Config> = StorageValue<_, ProviderPoolOf<T>, ValueQuery>;

	/// Parameters of every registered provider.
	#[pallet::storage]
	pub type Providers<T: Config> =
		StorageMap<_, Blake2_128Concat, T::AccountId, ProviderParams<BalanceOf<T>>, OptionQuery>;

	/// Sum of all bonds pointing at an account, registered or not.
	#[pallet::storage]
	pub type TotalBonded<T: Config> =
		StorageMap<_, Blake2_128Concat, T::AccountId, BalanceOf<T>, ValueQuery>;

	#[pallet::storage]
	pub type Delegators<T: Config> =
		StorageMap<_, Blake2_128Concat, T::AccountId, DelegatorStateOf<T>, OptionQuery>;

	#[pallet::storage]
	pub type ActiveSets<T: Config> =
		StorageMap<_, Blake2_128Concat, u64, ActiveProviderSetOf<T>, OptionQuery>; // round number -> snapshot

	// active providers that opted out of selection for the current round
	#[pallet::storage]
	pub type UnavailableProviders<T: Config> =
		StorageMap<_, Blake2_128Concat, T::AccountId, bool, ValueQuery>;

	#[pallet::genesis_config]
	pub struct GenesisConfig<T: Config> {
		pub election_period_length: BlockNumberFor<T>,
		pub rate_lock_deadline: BlockNumberFor<T>,
		pub unbonding_delay: BlockNumberFor<T>,
		pub pool_capacity: u32,
		pub number_of_active_providers: u32,
	}

	impl<T: Config> Default for GenesisConfig<T> {
		fn default() -> Self {
			Self {
				election_period_length: 100u32.into(),
				rate_lock_deadline: 10u32.into(),
				unbonding_delay: 100u32.into(),
				pool_capacity: 100,
				number_of_active_providers: 20,
			}
		}
	}

	#[pallet::genesis_build]
	impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
		fn build(&self) {
			assert!(
				self.rate_lock_deadline < self.election_period_length,
				"rate lock deadline must fall inside the election period"
			);
			assert!(
				self.number_of_active_providers <= self.pool_capacity,
				"active set cannot be larger than the provider pool"
			);
			ElectionPeriodLength::<T>::put(self.election_period_length);
			RateLockDeadline::<T>::put(self.rate_lock_deadline);
			UnbondingDelay::<T>::put(self.unbonding_delay);
			NumberOfActiveProviders::<T>::put(self.number_of_active_providers);
			Pool::<T>::put(ProviderPool::new(self.pool_capacity));
			Pallet::<T>::endow_custody();
		}
	}

	#[pallet::event]
	#[pallet::generate_deposit(pub(super) fn deposit_event)]
	pub enum Event<T: Config> {
		ProviderAdded { provider: T::AccountId, params: ProviderParams<BalanceOf<T>> },
		ProviderUpdated { provider: T::AccountId, params: ProviderParams<BalanceOf<T>> },
		ProviderResigned { provider: T::AccountId },
		/// Dropped from the pool after its bonded stake fell to zero.
		ProviderDeregistered { provider: T::AccountId },
		/// Pushed out of the pool by a higher stake or a smaller capacity.
		ProviderEvicted { provider: T::AccountId },
		DelegatorBonded { delegator: T::AccountId, provider: T::AccountId, amount: BalanceOf<T> },
		DelegatorUnbonded { delegator: T::AccountId, provider: T::AccountId, amount: BalanceOf<T> },
		Withdrawn { delegator: T::AccountId, amount: BalanceOf<T> },
		RoundAdvanced { round: u64, start_height: BlockNumberFor<T>, active_providers: u32 },
		ParameterChanged { parameter: ElectionParameter, old: u64, new: u64 },
		ProviderUnavailable { provider: T::AccountId, round: u64 },
		ProviderAvailable { provider: T::AccountId, round: u64 },
		ProviderSelected { requester: T::AccountId, provider: Option<T::AccountId> },
	}

	#[pallet::error]
	pub enum Error<T> {
		/// Price, fee or configuration value out of range.
		InvalidParameter,
		NotRegistered,
		AlreadyPresent,
		NotFound,
		/// The current round has not reached its last block yet.
		RoundNotElapsed,
		/// Provider parameters are frozen until the next round starts.
		LockPeriodActive,
		/// The pool is at capacity and the stake does not beat its lowest entry.
		PoolFull,
		ZeroAmount,
		AlreadyBonded,
		/// The account's bonding state does not allow this call.
		WrongState,
		/// Unbonded tokens are still locked.
		TooEarly,
		/// Bonds may only point at a registered provider or the caller itself.
		InvalidTarget,
		TransferFailed,
		/// Registration needs stake bonded to the caller.
		NotSelfBonded,
		/// No round has been started yet.
		RoundNotInitialized,
		ActiveProvidersNotConfigured,
		/// Active set size would exceed the pool capacity.
		ActiveSetTooLarge,
		NotActiveProvider,
		AlreadyUnavailable,
		NotUnavailable,
	}

	impl<T: Config> From<PoolError> for Error<T> {
		fn from(err: PoolError) -> Self {
			match err {
				PoolError::AlreadyPresent => Error::<T>::AlreadyPresent,
				PoolError::NotFound => Error::<T>::NotFound,
				PoolError::PoolFull => Error::<T>::PoolFull,
				PoolError::ZeroStake => Error::<T>::ZeroAmount,
			}
		}
	}

	#[pallet::hooks]
	impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
		fn integrity_test() {
			assert!(T::ActiveSetHistoryDepth::get() > 0, "at least the current active set must be kept");
		}

		#[cfg(feature = "try-runtime")]
		fn try_state(_n: BlockNumberFor<T>) -> Result<(), sp_runtime::TryRuntimeError> {
			Self::do_try_state()
		}
	}

	#[pallet::call]
	impl<T: Config> Pallet<T> {
		/// Bond `amount` to `target`. The caller may bond to itself or to a registered provider.
		#[pallet::call_index(0)]
		#[pallet::weight(T::WeightInfo::bond())]
		pub fn bond(origin: OriginFor<T>, target: T::AccountId, amount: BalanceOf<T>) -> DispatchResult {
			let who = ensure_signed(origin)?;
			ensure!(!amount.is_zero(), Error::<T>::ZeroAmount);
			match Delegators::<T>::get(&who) {
				None => {},
				Some(DelegatorState::Bonded { .. }) => return Err(Error::<T>::AlreadyBonded.into()),
				Some(DelegatorState::Unbonding { .. }) => return Err(Error::<T>::WrongState.into()),
			}
			ensure!(Self::is_valid_target(&who, &target), Error::<T>::InvalidTarget);

			T::Currency::transfer(&who, &Self::account_id(), amount, ExistenceRequirement::KeepAlive)
				.map_err(|_| Error::<T>::TransferFailed)?;

			Delegators::<T>::insert(&who, DelegatorState::Bonded { target: target.clone(), amount });
			Self::increase_stake(&target, amount)?;

			Self::deposit_event(Event::DelegatorBonded { delegator: who, provider: target, amount });
			Ok(())
		}

		#[pallet::call_index(1)]
		#[pallet::weight(T::WeightInfo::unbond())]
		pub fn unbond(origin: OriginFor<T>) -> DispatchResult {
			let who = ensure_signed(origin)?;
			let Some(DelegatorState::Bonded { target, amount }) = Delegators::<T>::get(&who) else {
				return Err(Error::<T>::WrongState.into());
			};

			// a provider pulling its own bond leaves the pool
			if target == who && Providers::<T>::contains_key(&who) {
				Self::deregister(&who);
				Self::deposit_event(Event::ProviderResigned { provider: who.clone() });
			}
			Self::decrease_stake(&target, amount)?;

			let release_at =
				frame_system::Pallet::<T>::block_number().saturating_add(UnbondingDelay::<T>::get());
			Delegators::<T>::insert(&who, DelegatorState::Unbonding { amount, release_at });

			Self::deposit_event(Event::DelegatorUnbonded { delegator: who, provider: target, amount });
			Ok(())
		}

		/// Point unbonding tokens at `target` again without waiting for the release height.
		#[pallet::call_index(2)]
		#[pallet::weight(T::WeightInfo::rebond())]
		pub fn rebond(origin: OriginFor<T>, target: T::AccountId) -> DispatchResult {
			let who = ensure_signed(origin)?;
			let Some(DelegatorState::Unbonding { amount, .. }) = Delegators::<T>::get(&who) else {
				return Err(Error::<T>::WrongState.into());
			};
			ensure!(Self::is_valid_target(&who, &target), Error::<T>::InvalidTarget);

			Delegators::<T>::insert(&who, DelegatorState::Bonded { target: target.clone(), amount });
			Self::increase_stake(&target, amount)?;

			Self::deposit_event(Event::DelegatorBonded { delegator: who, provider: target, amount });
			Ok(())
		}

		#[pallet::call_index(3)]
		#[pallet::weight(T::WeightInfo::withdraw())]
		pub fn withdraw(origin: OriginFor<T>) -> DispatchResult {
			let who = ensure_signed(origin)?;
			let Some(DelegatorState::Unbonding { amount, release_at }) = Delegators::<T>::get(&who)
			else {
				return Err(Error::<T>::WrongState.into());
			};
			ensure!(frame_system::Pallet::<T>::block_number() >= release_at, Error::<T>::TooEarly);

			T::Currency::transfer(&Self::account_id(), &who, amount, ExistenceRequirement::KeepAlive)
				.map_err(|e| {
					log::error!(target: LOG_TARGET, "❌ Failed to release {:?} to {:?}: {:?}", amount, who, e);
					Error::<T>::TransferFailed
				})?;
			Delegators::<T>::remove(&who);

			Self::deposit_event(Event::Withdrawn { delegator: who, amount });
			Ok(())
		}

		/// Register as a provider, or update the parameters of an existing registration.
		#[pallet::call_index(4)]
		#[pallet::weight(T::WeightInfo::register_provider())]
		pub fn register_provider(
			origin: OriginFor<T>,
			price_per_storage: BalanceOf<T>,
			price_per_compute: BalanceOf<T>,
			block_reward_cut: u8,
			fee_share: u8,
		) -> DispatchResult {
			let who = ensure_signed(origin)?;
			let params = ProviderParams { price_per_storage, price_per_compute, block_reward_cut, fee_share };
			ensure!(params.is_valid(), Error::<T>::InvalidParameter);
			ensure!(CurrentRound::<T>::get().number > 0, Error::<T>::RoundNotInitialized);
			ensure!(
				!Self::is_lock_period(frame_system::Pallet::<T>::block_number()),
				Error::<T>::LockPeriodActive
			);
			let stake = TotalBonded::<T>::get(&who);
			ensure!(!stake.is_zero(), Error::<T>::NotSelfBonded);

			if Providers::<T>::contains_key(&who) {
				Providers::<T>::insert(&who, params.clone());
				Self::deposit_event(Event::ProviderUpdated { provider: who, params });
				return Ok(());
			}

			let evicted = Pool::<T>::try_mutate(|pool| pool.insert(who.clone(), stake).map_err(Error::<T>::from))?;
			if let Some(evicted) = evicted {
				Self::on_evicted(&evicted);
			}
			Providers::<T>::insert(&who, params.clone());

			log::info!(target: LOG_TARGET, "✅ Provider {:?} registered with stake {:?}", who, stake);
			Self::deposit_event(Event::ProviderAdded { provider: who, params });
			Ok(())
		}

		#[pallet::call_index(5)]
		#[pallet::weight(T::WeightInfo::resign())]
		pub fn resign(origin: OriginFor<T>) -> DispatchResult {
			let who = ensure_signed(origin)?;
			ensure!(Providers::<T>::contains_key(&who), Error::<T>::NotRegistered);
			Self::deregister(&who);
			Self::deposit_event(Event::ProviderResigned { provider: who });
			Ok(())
		}

		/// Start the next round once the current one has run its course. Anyone may call this.
		#[pallet::call_index(6)]
		#[pallet::weight(T::WeightInfo::advance_round())]
		pub fn advance_round(origin: OriginFor<T>) -> DispatchResult {
			ensure_signed(origin)?;
			Self::do_advance_round()
		}

		#[pallet::call_index(7)]
		#[pallet::weight(T::WeightInfo::set_election_period_length())]
		pub fn set_election_period_length(origin: OriginFor<T>, length: BlockNumberFor<T>) -> DispatchResult {
			T::ControllerOrigin::ensure_origin(origin)?;
			ensure!(length > RateLockDeadline::<T>::get(), Error::<T>::InvalidParameter);

			let old = ElectionPeriodLength::<T>::get();
			ElectionPeriodLength::<T>::put(length);
			Self::parameter_changed(
				ElectionParameter::ElectionPeriodLength,
				old.saturated_into(),
				length.saturated_into(),
			);
			Ok(())
		}

		#[pallet::call_index(8)]
		#[pallet::weight(T::WeightInfo::set_rate_lock_deadline())]
		pub fn set_rate_lock_deadline(origin: OriginFor<T>, deadline: BlockNumberFor<T>) -> DispatchResult {
			T::ControllerOrigin::ensure_origin(origin)?;
			ensure!(deadline < ElectionPeriodLength::<T>::get(), Error::<T>::InvalidParameter);

			let old = RateLockDeadline::<T>::get();
			RateLockDeadline::<T>::put(deadline);
			Self::parameter_changed(
				ElectionParameter::RateLockDeadline,
				old.saturated_into(),
				deadline.saturated_into(),
			);
			Ok(())
		}

		#[pallet::call_index(9)]
		#[pallet::weight(T::WeightInfo::set_unbonding_delay())]
		pub fn set_unbonding_delay(origin: OriginFor<T>, delay: BlockNumberFor<T>) -> DispatchResult {
			T::ControllerOrigin::ensure_origin(origin)?;

			let old = UnbondingDelay::<T>::get();
			UnbondingDelay::<T>::put(delay);
			Self::parameter_changed(ElectionParameter::UnbondingDelay, old.saturated_into(), delay.saturated_into());
			Ok(())
		}

		/// Change the pool capacity. Shrinking it evicts the lowest ranked providers.
		#[pallet::call_index(10)]
		#[pallet::weight(T::WeightInfo::set_pool_capacity())]
		pub fn set_pool_capacity(origin: OriginFor<T>, capacity: u32) -> DispatchResult {
			T::ControllerOrigin::ensure_origin(origin)?;
			ensure!(capacity >= NumberOfActiveProviders::<T>::get(), Error::<T>::ActiveSetTooLarge);

			let (old, evicted) = Pool::<T>::mutate(|pool| {
				let old = pool.max_size();
				(old, pool.set_max_size(capacity))
			});
			for provider in evicted.iter() {
				Self::on_evicted(provider);
			}
			Self::parameter_changed(ElectionParameter::PoolCapacity, old.into(), capacity.into());
			Ok(())
		}

		#[pallet::call_index(11)]
		#[pallet::weight(T::WeightInfo::set_number_of_active_providers())]
		pub fn set_number_of_active_providers(origin: OriginFor<T>, count: u32) -> DispatchResult {
			T::ControllerOrigin::ensure_origin(origin)?;
			ensure!(count <= Pool::<T>::get().max_size(), Error::<T>::ActiveSetTooLarge);

			let old = NumberOfActiveProviders::<T>::get();
			NumberOfActiveProviders::<T>::put(count);
			Self::parameter_changed(ElectionParameter::NumberOfActiveProviders, old.into(), count.into());
			Ok(())
		}

		/// Stop receiving work for the rest of the current round.
		#[pallet::call_index(12)]
		#[pallet::weight(T::WeightInfo::declare_unavailable())]
		pub fn declare_unavailable(origin: OriginFor<T>) -> DispatchResult {
			let who = ensure_signed(origin)?;
			ensure!(Self::is_active_provider(&who), Error::<T>::NotActiveProvider);
			ensure!(!UnavailableProviders::<T>::contains_key(&who), Error::<T>::AlreadyUnavailable);

			UnavailableProviders::<T>::insert(&who, true);
			let round = CurrentRound::<T>::get().number;
			Self::deposit_event(Event::ProviderUnavailable { provider: who, round });
			Ok(())
		}

		#[pallet::call_index(13)]
		#[pallet::weight(T::WeightInfo::declare_available())]
		pub fn declare_available(origin: OriginFor<T>) -> DispatchResult {
			let who = ensure_signed(origin)?;
			ensure!(UnavailableProviders::<T>::contains_key(&who), Error::<T>::NotUnavailable);

			UnavailableProviders::<T>::remove(&who);
			let round = CurrentRound::<T>::get().number;
			Self::deposit_event(Event::ProviderAvailable { provider: who, round });
			Ok(())
		}

		/// Draw a provider for the caller and publish the outcome.
		#[pallet::call_index(14)]
		#[pallet::weight(T::WeightInfo::request_provider())]
		pub fn request_provider(
			origin: OriginFor<T>,
			max_price: BalanceOf<T>,
			category: ResourceCategory,
		) -> DispatchResult {
			let who = ensure_signed(origin)?;
			let provider = Self::select_provider(&who, max_price, category);
			Self::deposit_event(Event::ProviderSelected { requester: who, provider });
			Ok(())
		}
	}

	impl<T: Config> Pallet<T> {
		/// Account holding all bonded tokens.
		pub fn account_id() -> T::AccountId {
			T::PalletId::get().into_account_truncating()
		}

		/// Tokens held for bonds, excluding the existential deposit that keeps the account alive.
		pub fn custody_balance() -> BalanceOf<T> {
			T::Currency::free_balance(&Self::account_id()).saturating_sub(T::Currency::minimum_balance())
		}

		/// Funds the custody account with the existential deposit and pins it with a provider
		/// reference. Payouts use `KeepAlive`, so bonded tokens never fall below that floor.
		pub(crate) fn endow_custody() {
			let custody = Self::account_id();
			let ed = T::Currency::minimum_balance();
			let missing = ed.saturating_sub(T::Currency::free_balance(&custody));
			if !missing.is_zero() {
				let _ = T::Currency::deposit_creating(&custody, missing);
			}
			frame_system::Pallet::<T>::inc_providers(&custody);
		}

		pub fn provider_status(who: &T::AccountId) -> ProviderStatus {
			if Providers::<T>::contains_key(who) {
				ProviderStatus::Registered
			} else {
				ProviderStatus::Unregistered
			}
		}

		pub fn delegator_status(who: &T::AccountId) -> DelegatorStatus {
			Delegators::<T>::get(who).map(|state| state.status()).unwrap_or_default()
		}

		pub fn provider_stake(who: &T::AccountId) -> BalanceOf<T> {
			TotalBonded::<T>::get(who)
		}

		pub fn current_round_number() -> u64 {
			CurrentRound::<T>::get().number
		}

		pub fn active_set() -> Option<ActiveProviderSetOf<T>> {
			ActiveSets::<T>::get(Self::current_round_number())
		}

		pub fn active_provider_addresses() -> Vec<T::AccountId> {
			Self::active_set()
				.map(|set| set.members.into_iter().map(|member| member.account).collect())
				.unwrap_or_default()
		}

		pub fn ranked_providers() -> Vec<(T::AccountId, BalanceOf<T>)> {
			let pool = Pool::<T>::get();
			pool.top(pool.len())
		}

		pub fn is_active_provider(who: &T::AccountId) -> bool {
			Self::active_set().map(|set| set.contains(who)).unwrap_or(false)
		}

		/// Whether provider parameters are frozen at height `now`.
		pub fn is_lock_period(now: BlockNumberFor<T>) -> bool {
			let round = CurrentRound::<T>::get();
			let lock_start = round
				.start_height
				.saturating_add(ElectionPeriodLength::<T>::get())
				.saturating_sub(RateLockDeadline::<T>::get());
			now >= lock_start
		}

		/// First height at which the current round may be closed.
		pub fn round_boundary() -> BlockNumberFor<T> {
			CurrentRound::<T>::get()
				.start_height
				.saturating_add(ElectionPeriodLength::<T>::get())
				.saturating_sub(One::one())
		}

		/// Stake-weighted draw among the active providers pricing `category` at or below
		/// `max_price`. The outcome is fixed for a given caller and block.
		pub fn select_provider(
			caller: &T::AccountId,
			max_price: BalanceOf<T>,
			category: ResourceCategory,
		) -> Option<T::AccountId> {
			let set = Self::active_set().filter(|set| !set.is_empty())?;
			let seed = selection::draw_seed(caller, frame_system::Pallet::<T>::block_number());
			selection::select_weighted(&set, max_price, category, seed, |who| {
				!UnavailableProviders::<T>::contains_key(who)
			})
		}

		pub fn do_advance_round() -> DispatchResult {
			let active = NumberOfActiveProviders::<T>::get();
			ensure!(active > 0, Error::<T>::ActiveProvidersNotConfigured);
			let now = frame_system::Pallet::<T>::block_number();
			ensure!(now >= Self::round_boundary(), Error::<T>::RoundNotElapsed);

			let pool = Pool::<T>::get();
			let members: Vec<ActiveMember<T::AccountId, BalanceOf<T>>> = pool
				.iter()
				.take(active as usize)
				.filter_map(|(account, stake)| {
					Providers::<T>::get(account)
						.map(|params| ActiveMember { account: account.clone(), params, stake })
				})
				.collect();
			let total_stake = members
				.iter()
				.fold(BalanceOf::<T>::zero(), |total, member| total.saturating_add(member.stake));
			let active_providers = members.len() as u32;

			let round = CurrentRound::<T>::get().number.saturating_add(1);
			ActiveSets::<T>::insert(round, ActiveProviderSet { total_stake, members });
			let depth = T::ActiveSetHistoryDepth::get().max(1);
			if round > depth {
				ActiveSets::<T>::remove(round - depth);
			}
			CurrentRound::<T>::put(RoundInfo { number: round, start_height: now });
			let _ = UnavailableProviders::<T>::clear(u32::MAX, None);

			log::info!(
				target: LOG_TARGET,
				"✅ Round {} started at {:?} with {} active providers",
				round,
				now,
				active_providers
			);
			Self::deposit_event(Event::RoundAdvanced { round, start_height: now, active_providers });
			Ok(())
		}

		fn is_valid_target(who: &T::AccountId, target: &T::AccountId) -> bool {
			target == who || Providers::<T>::contains_key(target)
		}

		fn increase_stake(target: &T::AccountId, amount: BalanceOf<T>) -> DispatchResult {
			let total = TotalBonded::<T>::get(target).saturating_add(amount);
			if Providers::<T>::contains_key(target) {
				// registered providers are always pooled; eviction unregisters
				Pool::<T>::try_mutate(|pool| pool.update(target, total).map_err(Error::<T>::from))?;
			}
			TotalBonded::<T>::insert(target, total);
			Ok(())
		}

		fn decrease_stake(target: &T::AccountId, amount: BalanceOf<T>) -> DispatchResult {
			let total = TotalBonded::<T>::get(target).saturating_sub(amount);
			if total.is_zero() {
				TotalBonded::<T>::remove(target);
			} else {
				TotalBonded::<T>::insert(target, total);
			}

			if Providers::<T>::contains_key(target) {
				if total.is_zero() {
					Self::deregister(target);
					Self::deposit_event(Event::ProviderDeregistered { provider: target.clone() });
				} else {
					Pool::<T>::try_mutate(|pool| pool.update(target, total).map_err(Error::<T>::from))?;
				}
			}
			Ok(())
		}

		fn deregister(who: &T::AccountId) {
			Pool::<T>::mutate(|pool| {
				let _ = pool.remove(who);
			});
			Providers::<T>::remove(who);
			UnavailableProviders::<T>::remove(who);

			log::info!(target: LOG_TARGET, "Provider {:?} deregistered", who);
		}

		// already unlinked from the pool by the caller
		fn on_evicted(who: &T::AccountId) {
			Providers::<T>::remove(who);
			UnavailableProviders::<T>::remove(who);

			log::debug!(target: LOG_TARGET, "Provider {:?} evicted from the pool", who);
			Self::deposit_event(Event::ProviderEvicted { provider: who.clone() });
		}

		fn parameter_changed(parameter: ElectionParameter, old: u64, new: u64) {
			Self::deposit_event(Event::ParameterChanged { parameter, old, new });
		}

		/// Checks that the pool, the provider registry and the bond totals agree.
		#[cfg(any(feature = "try-runtime", test))]
		pub fn do_try_state() -> Result<(), sp_runtime::TryRuntimeError> {
			let pool = Pool::<T>::get();
			ensure!(pool.len() <= pool.max_size(), "pool holds more entries than its capacity");
			ensure!(
				NumberOfActiveProviders::<T>::get() <= pool.max_size(),
				"active set larger than the pool capacity"
			);

			let ranked: Vec<(T::AccountId, BalanceOf<T>)> = pool.top(pool.len());
			ensure!(ranked.len() as u32 == pool.len(), "pool links are broken");
			ensure!(ranked.windows(2).all(|pair| pair[0].1 >= pair[1].1), "pool is not sorted by stake");
			for (account, stake) in ranked.iter() {
				ensure!(Providers::<T>::contains_key(account), "pool entry is not a registered provider");
				ensure!(TotalBonded::<T>::get(account) == *stake, "pool stake differs from bonded total");
			}
			ensure!(
				Providers::<T>::iter_keys().all(|provider| pool.contains(&provider)),
				"registered provider missing from the pool"
			);

			let mut bonded: sp_std::collections::btree_map::BTreeMap<T::AccountId, BalanceOf<T>> =
				Default::default();
			for (_, state) in Delegators::<T>::iter() {
				if let DelegatorState::Bonded { target, amount } = state {
					let entry = bonded.entry(target).or_insert_with(Zero::zero);
					*entry = entry.saturating_add(amount);
				}
			}
			ensure!(
				TotalBonded::<T>::iter().all(|(account, total)| bonded.get(&account) == Some(&total)),
				"bonded total without matching bonds"
			);
			ensure!(
				bonded.iter().all(|(account, total)| TotalBonded::<T>::get(account) == *total),
				"bonds missing from the bonded totals"
			);

			let owed = Delegators::<T>::iter_values().fold(BalanceOf::<T>::zero(), |owed, state| {
				let amount = match state {
					DelegatorState::Bonded { amount, .. } | DelegatorState::Unbonding { amount, .. } => amount,
				};
				owed.saturating_add(amount)
			});
			ensure!(
				T::Currency::free_balance(&Self::account_id())
					>= owed.saturating_add(T::Currency::minimum_balance()),
				"custody account does not cover bonded and unbonding tokens"
			);
			Ok(())
		}
	}

	impl<T: Config> ProviderSelector<T::AccountId, BalanceOf<T>> for Pallet<T> {
		fn select_provider(
			caller: &T::AccountId,
			max_price: BalanceOf<T>,
			category: ResourceCategory,
		) -> Option<T::AccountId> {
			Pallet::<T>::select_provider(caller, max_price, category)
		}

		fn is_active_provider(who: &T::AccountId) -> bool {
			Pallet::<T>::is_active_provider(who)
		}
	}
}
