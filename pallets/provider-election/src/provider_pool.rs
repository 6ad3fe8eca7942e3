//! Bounded pool of providers kept sorted by stake, highest first.
//!
//! Entries live in a map keyed by account and are chained through `prev`/`next`
//! keys, so reordering one entry only touches its neighbours. Equal stakes keep
//! arrival order: an entry never overtakes one it ties with.

use codec::{Decode, Encode};
use frame_support::pallet_prelude::RuntimeDebug;
use scale_info::TypeInfo;
use sp_runtime::traits::Zero;
use sp_std::{collections::btree_map::BTreeMap, prelude::*};

#[derive(Clone, Copy, RuntimeDebug, PartialEq, Eq)]
pub enum PoolError {
	AlreadyPresent,
	NotFound,
	/// Pool is at capacity and the stake does not beat the lowest entry.
	PoolFull,
	ZeroStake,
}

#[derive(Clone, Encode, Decode, RuntimeDebug, TypeInfo, PartialEq, Eq)]
pub struct PoolNode<AccountId, Balance> {
	pub stake: Balance,
	pub prev: Option<AccountId>,
	pub next: Option<AccountId>,
}

#[derive(Clone, Encode, Decode, RuntimeDebug, TypeInfo, PartialEq, Eq)]
pub struct ProviderPool<AccountId: Ord, Balance> {
	nodes: BTreeMap<AccountId, PoolNode<AccountId, Balance>>,
	head: Option<AccountId>,
	tail: Option<AccountId>,
	max_size: u32,
}

impl<AccountId: Ord, Balance> Default for ProviderPool<AccountId, Balance> {
	fn default() -> Self {
		Self { nodes: BTreeMap::new(), head: None, tail: None, max_size: 0 }
	}
}

impl<AccountId, Balance> ProviderPool<AccountId, Balance>
where
	AccountId: Ord + Clone,
	Balance: Ord + Copy + Zero,
{
	pub fn new(max_size: u32) -> Self {
		Self { max_size, ..Default::default() }
	}

	pub fn len(&self) -> u32 {
		self.nodes.len() as u32
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn max_size(&self) -> u32 {
		self.max_size
	}

	pub fn is_full(&self) -> bool {
		self.len() >= self.max_size
	}

	pub fn contains(&self, who: &AccountId) -> bool {
		self.nodes.contains_key(who)
	}

	pub fn get(&self, who: &AccountId) -> Option<Balance> {
		self.nodes.get(who).map(|node| node.stake)
	}

	pub fn first(&self) -> Option<&AccountId> {
		self.head.as_ref()
	}

	pub fn last(&self) -> Option<&AccountId> {
		self.tail.as_ref()
	}

	/// Adds `who` with `stake`. When the pool is full the lowest entry is pushed
	/// out and returned, provided `stake` is strictly greater than its stake.
	pub fn insert(&mut self, who: AccountId, stake: Balance) -> Result<Option<AccountId>, PoolError> {
		if self.contains(&who) {
			return Err(PoolError::AlreadyPresent);
		}
		if stake.is_zero() {
			return Err(PoolError::ZeroStake);
		}

		let mut evicted = None;
		if self.is_full() {
			let lowest = self.tail.clone().ok_or(PoolError::PoolFull)?;
			match self.get(&lowest) {
				Some(lowest_stake) if stake > lowest_stake => {
					self.unlink(&lowest);
					evicted = Some(lowest);
				},
				_ => return Err(PoolError::PoolFull),
			}
		}

		self.link(who, stake);
		Ok(evicted)
	}

	/// Moves `who` to the position matching `stake`. A zero stake removes it.
	pub fn update(&mut self, who: &AccountId, stake: Balance) -> Result<(), PoolError> {
		if !self.contains(who) {
			return Err(PoolError::NotFound);
		}
		if stake.is_zero() {
			return self.remove(who).map(|_| ());
		}

		self.unlink(who);
		self.link(who.clone(), stake);
		Ok(())
	}

	pub fn remove(&mut self, who: &AccountId) -> Result<Balance, PoolError> {
		self.unlink(who).map(|node| node.stake).ok_or(PoolError::NotFound)
	}

	/// Changes the capacity, returning the accounts pushed out to fit it,
	/// lowest stake first.
	pub fn set_max_size(&mut self, max_size: u32) -> Vec<AccountId> {
		self.max_size = max_size;
		let mut evicted = Vec::new();
		while self.len() > self.max_size {
			let Some(lowest) = self.tail.clone() else { break };
			self.unlink(&lowest);
			evicted.push(lowest);
		}
		evicted
	}

	pub fn iter(&self) -> PoolIter<'_, AccountId, Balance> {
		PoolIter { pool: self, cursor: self.head.as_ref() }
	}

	/// Up to `count` entries from the top of the pool.
	pub fn top(&self, count: u32) -> Vec<(AccountId, Balance)> {
		self.iter().take(count as usize).map(|(who, stake)| (who.clone(), stake)).collect()
	}

	// first entry ranked strictly below `stake`; the new entry goes in front of it
	fn position_for(&self, stake: Balance) -> Option<AccountId> {
		let mut cursor = self.head.as_ref();
		while let Some(key) = cursor {
			let node = self.nodes.get(key)?;
			if node.stake < stake {
				return Some(key.clone());
			}
			cursor = node.next.as_ref();
		}
		None
	}

	fn link(&mut self, who: AccountId, stake: Balance) {
		match self.position_for(stake) {
			Some(next) => {
				let prev = self.nodes.get(&next).and_then(|node| node.prev.clone());
				if let Some(node) = self.nodes.get_mut(&next) {
					node.prev = Some(who.clone());
				}
				match &prev {
					Some(key) => {
						if let Some(node) = self.nodes.get_mut(key) {
							node.next = Some(who.clone());
						}
					},
					None => self.head = Some(who.clone()),
				}
				self.nodes.insert(who, PoolNode { stake, prev, next: Some(next) });
			},
			None => {
				let prev = self.tail.take();
				match &prev {
					Some(key) => {
						if let Some(node) = self.nodes.get_mut(key) {
							node.next = Some(who.clone());
						}
					},
					None => self.head = Some(who.clone()),
				}
				self.tail = Some(who.clone());
				self.nodes.insert(who, PoolNode { stake, prev, next: None });
			},
		}
	}

	fn unlink(&mut self, who: &AccountId) -> Option<PoolNode<AccountId, Balance>> {
		let node = self.nodes.remove(who)?;
		match &node.prev {
			Some(key) => {
				if let Some(prev) = self.nodes.get_mut(key) {
					prev.next = node.next.clone();
				}
			},
			None => self.head = node.next.clone(),
		}
		match &node.next {
			Some(key) => {
				if let Some(next) = self.nodes.get_mut(key) {
					next.prev = node.prev.clone();
				}
			},
			None => self.tail = node.prev.clone(),
		}
		Some(node)
	}
}

/// Walks the pool from the highest stake to the lowest.
pub struct PoolIter<'a, AccountId: Ord, Balance> {
	pool: &'a ProviderPool<AccountId, Balance>,
	cursor: Option<&'a AccountId>,
}

impl<'a, AccountId: Ord, Balance: Copy> Iterator for PoolIter<'a, AccountId, Balance> {
	type Item = (&'a AccountId, Balance);

	fn next(&mut self) -> Option<Self::Item> {
		let key = self.cursor?;
		let node = self.pool.nodes.get(key)?;
		self.cursor = node.next.as_ref();
		Some((key, node.stake))
	}
}
