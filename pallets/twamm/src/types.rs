use frame::prelude::*;
use polkadot_sdk::sp_runtime::traits::{AtLeast32BitUnsigned, Saturating, UniqueSaturatedInto};

pub use primitives::Balance;

pub type PoolId = u32;
pub type OrderId = u64;

/// Which asset an order sells.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  PartialEq,
  TypeInfo,
  MaxEncodedLen,
)]
pub enum OrderDirection {
  /// Sells asset0, buys asset1.
  ZeroForOne,
  /// Sells asset1, buys asset0.
  OneForZero,
}

impl OrderDirection {
  pub const BOTH: [OrderDirection; 2] = [OrderDirection::ZeroForOne, OrderDirection::OneForZero];

  pub fn opposite(self) -> Self {
    match self {
      OrderDirection::ZeroForOne => OrderDirection::OneForZero,
      OrderDirection::OneForZero => OrderDirection::ZeroForOne,
    }
  }
}

/// Capacity in which a caller acts on an order, resolved once per call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Authority {
  Owner,
  Delegate,
}

/// A pool instance: the two reserves the engine trades against and its
/// settlement watermark.
#[derive(
  Clone,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  PartialEq,
  TypeInfo,
  MaxEncodedLen,
)]
pub struct PoolInfo<AssetId, BlockNumber> {
  pub asset0: AssetId,
  pub asset1: AssetId,
  pub reserve0: Balance,
  pub reserve1: Balance,
  pub last_virtual_order_block: BlockNumber,
  pub paused: bool,
}

impl<AssetId: Copy, BlockNumber> PoolInfo<AssetId, BlockNumber> {
  /// `(sold, bought)` assets for an order in `direction`.
  pub fn assets_for(&self, direction: OrderDirection) -> (AssetId, AssetId) {
    match direction {
      OrderDirection::ZeroForOne => (self.asset0, self.asset1),
      OrderDirection::OneForZero => (self.asset1, self.asset0),
    }
  }
}

/// Rate changes scheduled for one direction at one boundary block.
///
/// Once settlement crosses the block, `reward_factor` records the direction's
/// accumulator at that instant. The record lives until no order needs it.
#[derive(
  Clone,
  Debug,
  Default,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  PartialEq,
  TypeInfo,
  MaxEncodedLen,
)]
pub struct SalesRateBoundary {
  pub starting_rate: Balance,
  pub expiring_rate: Balance,
  pub reward_factor: Option<u128>,
  pub references: u32,
}

impl SalesRateBoundary {
  pub fn is_crossed(&self) -> bool {
    self.reward_factor.is_some()
  }

  /// Nothing scheduled here and nobody waiting on a snapshot.
  pub fn is_vacant(&self) -> bool {
    self.references == 0 && self.starting_rate == 0 && self.expiring_rate == 0
  }
}

/// A long-term order.
///
/// `deposit` and `proceeds` are exact as of `checkpoint`; everything after that
/// is implied by the pool aggregate and applied lazily.
#[derive(
  Clone,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  PartialEq,
  TypeInfo,
  MaxEncodedLen,
)]
pub struct Order<AccountId, BlockNumber> {
  pub pool_id: PoolId,
  pub owner: AccountId,
  pub delegate: Option<AccountId>,
  pub direction: OrderDirection,
  pub sales_rate: Balance,
  pub deposit: Balance,
  pub proceeds: Balance,
  pub start: BlockNumber,
  pub expiry: BlockNumber,
  pub paused: bool,
  pub checkpoint: BlockNumber,
  /// Reward factor at `checkpoint`. `None` until the start boundary is crossed.
  pub reward_factor_checkpoint: Option<u128>,
}

impl<AccountId, BlockNumber> Order<AccountId, BlockNumber>
where
  AccountId: PartialEq,
  BlockNumber: AtLeast32BitUnsigned + Copy,
{
  pub fn authority_of(&self, who: &AccountId) -> Option<Authority> {
    if *who == self.owner {
      Some(Authority::Owner)
    } else if self.delegate.as_ref() == Some(who) {
      Some(Authority::Delegate)
    } else {
      None
    }
  }

  /// Delegates may only pay out to the owner.
  pub fn may_pay(&self, authority: Authority, dest: &AccountId) -> bool {
    match authority {
      Authority::Owner => true,
      Authority::Delegate => *dest == self.owner,
    }
  }

  /// Part of `deposit` the order would still sell from `now` until expiry if it
  /// ran unpaused.
  pub fn scheduled_sales(&self, now: BlockNumber) -> Option<Balance> {
    let from = now.max(self.start);
    if from >= self.expiry {
      return Some(0);
    }
    let blocks: u128 = (self.expiry - from).unique_saturated_into();
    self.sales_rate.checked_mul(blocks)
  }

  /// Deposit that no schedule will ever sell: leftovers from pauses and
  /// extensions that did not buy a whole interval.
  pub fn idle_deposit(&self, now: BlockNumber) -> Option<Balance> {
    self
      .scheduled_sales(now)
      .map(|scheduled| self.deposit.saturating_sub(scheduled))
  }

  /// Fully expired with nothing left to sell.
  pub fn is_spent(&self, now: BlockNumber) -> bool {
    now >= self.expiry && self.deposit == 0
  }

  /// Whether the order's rate currently sits in the aggregate (or is scheduled
  /// to join it at `start`), as seen from the settlement watermark.
  pub fn is_contributing(&self, watermark: BlockNumber) -> bool {
    !self.paused && watermark < self.expiry
  }

  pub fn is_pending(&self, watermark: BlockNumber) -> bool {
    watermark < self.start
  }

  pub fn blocks_between(from: BlockNumber, to: BlockNumber) -> u128 {
    to.saturating_sub(from).unique_saturated_into()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn order(start: u64, expiry: u64, rate: Balance, deposit: Balance) -> Order<u64, u64> {
    Order {
      pool_id: 0,
      owner: 1,
      delegate: Some(2),
      direction: OrderDirection::ZeroForOne,
      sales_rate: rate,
      deposit,
      proceeds: 0,
      start,
      expiry,
      paused: false,
      checkpoint: start,
      reward_factor_checkpoint: None,
    }
  }

  #[test]
  fn authority_resolution() {
    let o = order(10, 20, 1, 10);
    assert_eq!(o.authority_of(&1), Some(Authority::Owner));
    assert_eq!(o.authority_of(&2), Some(Authority::Delegate));
    assert_eq!(o.authority_of(&3), None);
  }

  #[test]
  fn delegate_pays_only_owner() {
    let o = order(10, 20, 1, 10);
    assert!(o.may_pay(Authority::Owner, &3));
    assert!(o.may_pay(Authority::Delegate, &1));
    assert!(!o.may_pay(Authority::Delegate, &2));
    assert!(!o.may_pay(Authority::Delegate, &3));
  }

  #[test]
  fn idle_deposit_counts_paused_blocks() {
    // 10/block over [10, 20), paused for 3 blocks: 30 can never be sold.
    let o = order(10, 20, 10, 100);
    assert_eq!(o.scheduled_sales(5), Some(100));
    assert_eq!(o.idle_deposit(5), Some(0));

    let mut o = o;
    o.deposit = 70 + 30;
    assert_eq!(o.scheduled_sales(13), Some(70));
    assert_eq!(o.idle_deposit(13), Some(30));
    assert_eq!(o.scheduled_sales(25), Some(0));
  }

  #[test]
  fn direction_opposite() {
    assert_eq!(OrderDirection::ZeroForOne.opposite(), OrderDirection::OneForZero);
    assert_eq!(OrderDirection::OneForZero.opposite(), OrderDirection::ZeroForOne);
  }
}
