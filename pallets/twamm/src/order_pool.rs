//! Per-direction order pool aggregate.
//!
//! The aggregate never iterates orders. Rate changes sit in a sparse
//! block -> `SalesRateBoundary` map and are applied when settlement crosses the
//! block; proceeds accrue into a reward factor each order reads lazily.

use crate::{
  pallet::{BoundaryQueue, Config, Error, OrderPools, Pallet, SalesRateBoundaries},
  types::*,
};
use frame::prelude::*;
use polkadot_sdk::sp_runtime::{Rounding, helpers_128bit::multiply_by_rational_with_rounding};

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
pub struct OrderPool {
  /// Summed sales rate of every started, unpaused, unexpired order.
  pub sales_rate: Balance,
  /// Proceeds per unit of sales rate, scaled by `RewardFactorPrecision`.
  pub reward_factor: u128,
  /// Credited to orders, not yet paid out.
  pub unclaimed_proceeds: Balance,
  /// Everything settlement ever produced for this direction.
  pub total_proceeds: Balance,
}

impl OrderPool {
  pub fn add_rate(&mut self, rate: Balance) -> Option<()> {
    self.sales_rate = self.sales_rate.checked_add(rate)?;
    Some(())
  }

  pub fn remove_rate(&mut self, rate: Balance) {
    self.sales_rate = self
      .sales_rate
      .checked_sub(rate)
      .expect("aggregate rate includes the rate of every contributing order; qed");
  }

  pub fn credit_proceeds(&mut self, amount: Balance) -> Option<()> {
    self.unclaimed_proceeds = self.unclaimed_proceeds.checked_add(amount)?;
    self.total_proceeds = self.total_proceeds.checked_add(amount)?;
    Some(())
  }

  /// Spreads `amount` over the current sales rate, rounding down. A direction
  /// with no rate is skipped.
  pub fn advance_reward_factor(&mut self, amount: Balance, precision: Balance) -> Option<()> {
    if self.sales_rate == 0 {
      return Some(());
    }
    let delta =
      multiply_by_rational_with_rounding(amount, precision, self.sales_rate, Rounding::Down)?;
    self.reward_factor = self.reward_factor.checked_add(delta)?;
    Some(())
  }

  pub fn claim(&mut self, amount: Balance) -> Option<()> {
    self.unclaimed_proceeds = self.unclaimed_proceeds.checked_sub(amount)?;
    Some(())
  }

  /// Proceeds earned by `rate` while the reward factor moved from `from` to `to`.
  pub fn accrued(rate: Balance, from: u128, to: u128, precision: Balance) -> Option<Balance> {
    let delta = to.checked_sub(from)?;
    multiply_by_rational_with_rounding(rate, delta, precision, Rounding::Down)
  }
}

impl<T: Config> Pallet<T> {
  /// Adds a started order's rate to the aggregate and books its removal at
  /// `expiry`.
  pub(crate) fn add_active(
    pool_id: PoolId,
    direction: OrderDirection,
    rate: Balance,
    expiry: BlockNumberFor<T>,
  ) -> DispatchResult {
    OrderPools::<T>::try_mutate(pool_id, direction, |aggregate| {
      aggregate.add_rate(rate).ok_or(Error::<T>::ArithmeticOverflow)
    })?;
    Self::mutate_boundary(pool_id, direction, expiry, |boundary| {
      boundary.expiring_rate = boundary
        .expiring_rate
        .checked_add(rate)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      Ok(())
    })
  }

  pub(crate) fn remove_active(
    pool_id: PoolId,
    direction: OrderDirection,
    rate: Balance,
    expiry: BlockNumberFor<T>,
  ) -> DispatchResult {
    OrderPools::<T>::mutate(pool_id, direction, |aggregate| aggregate.remove_rate(rate));
    Self::mutate_boundary(pool_id, direction, expiry, |boundary| {
      boundary.expiring_rate = boundary
        .expiring_rate
        .checked_sub(rate)
        .expect("expiry bucket holds the rate of every contributing order expiring there; qed");
      Ok(())
    })
  }

  /// Books a not-yet-started order: its rate joins the aggregate at `start` and
  /// leaves it at `expiry`.
  pub(crate) fn schedule_pending(
    pool_id: PoolId,
    direction: OrderDirection,
    rate: Balance,
    start: BlockNumberFor<T>,
    expiry: BlockNumberFor<T>,
  ) -> DispatchResult {
    Self::mutate_boundary(pool_id, direction, start, |boundary| {
      boundary.starting_rate = boundary
        .starting_rate
        .checked_add(rate)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      Ok(())
    })?;
    Self::mutate_boundary(pool_id, direction, expiry, |boundary| {
      boundary.expiring_rate = boundary
        .expiring_rate
        .checked_add(rate)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      Ok(())
    })
  }

  pub(crate) fn unschedule_pending(
    pool_id: PoolId,
    direction: OrderDirection,
    rate: Balance,
    start: BlockNumberFor<T>,
    expiry: BlockNumberFor<T>,
  ) -> DispatchResult {
    Self::mutate_boundary(pool_id, direction, start, |boundary| {
      boundary.starting_rate = boundary
        .starting_rate
        .checked_sub(rate)
        .expect("start bucket holds the rate of every pending order starting there; qed");
      Ok(())
    })?;
    Self::mutate_boundary(pool_id, direction, expiry, |boundary| {
      boundary.expiring_rate = boundary
        .expiring_rate
        .checked_sub(rate)
        .expect("expiry bucket holds the rate of every contributing order expiring there; qed");
      Ok(())
    })
  }

  /// Re-books a contributing order's expiry. The aggregate rate is untouched.
  pub(crate) fn move_expiry(
    pool_id: PoolId,
    direction: OrderDirection,
    rate: Balance,
    from: BlockNumberFor<T>,
    to: BlockNumberFor<T>,
  ) -> DispatchResult {
    Self::mutate_boundary(pool_id, direction, to, |boundary| {
      boundary.expiring_rate = boundary
        .expiring_rate
        .checked_add(rate)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      Ok(())
    })?;
    Self::mutate_boundary(pool_id, direction, from, |boundary| {
      boundary.expiring_rate = boundary
        .expiring_rate
        .checked_sub(rate)
        .expect("expiry bucket holds the rate of every contributing order expiring there; qed");
      Ok(())
    })
  }

  /// Marks that an order will need the reward-factor snapshot taken at `block`.
  pub(crate) fn retain_boundary(
    pool_id: PoolId,
    direction: OrderDirection,
    block: BlockNumberFor<T>,
  ) -> DispatchResult {
    Self::mutate_boundary(pool_id, direction, block, |boundary| {
      boundary.references = boundary
        .references
        .checked_add(1)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      Ok(())
    })
  }

  pub(crate) fn release_boundary(
    pool_id: PoolId,
    direction: OrderDirection,
    block: BlockNumberFor<T>,
  ) -> DispatchResult {
    Self::mutate_boundary(pool_id, direction, block, |boundary| {
      boundary.references = boundary
        .references
        .checked_sub(1)
        .ok_or(Error::<T>::InconsistentBoundary)?;
      Ok(())
    })
  }

  /// Reward factor recorded when settlement crossed `block`.
  pub(crate) fn boundary_snapshot(
    pool_id: PoolId,
    direction: OrderDirection,
    block: BlockNumberFor<T>,
  ) -> Result<u128, DispatchError> {
    SalesRateBoundaries::<T>::get((pool_id, direction), block)
      .and_then(|boundary| boundary.reward_factor)
      .ok_or_else(|| Error::<T>::InconsistentBoundary.into())
  }

  /// Loads (or creates and enqueues) a boundary, applies `f`, and drops the
  /// record once nothing needs it any more.
  fn mutate_boundary(
    pool_id: PoolId,
    direction: OrderDirection,
    block: BlockNumberFor<T>,
    f: impl FnOnce(&mut SalesRateBoundary) -> DispatchResult,
  ) -> DispatchResult {
    let key = (pool_id, direction);
    let mut boundary = match SalesRateBoundaries::<T>::get(key, block) {
      Some(boundary) => boundary,
      None => {
        Self::enqueue_boundary(pool_id, block)?;
        SalesRateBoundary::default()
      }
    };
    f(&mut boundary)?;

    let crossed = boundary.is_crossed();
    if (crossed && boundary.references == 0) || (!crossed && boundary.is_vacant()) {
      SalesRateBoundaries::<T>::remove(key, block);
      if !crossed && !SalesRateBoundaries::<T>::contains_key((pool_id, direction.opposite()), block) {
        Self::dequeue_boundary(pool_id, block);
      }
    } else {
      SalesRateBoundaries::<T>::insert(key, block, boundary);
    }
    Ok(())
  }

  fn enqueue_boundary(pool_id: PoolId, block: BlockNumberFor<T>) -> DispatchResult {
    BoundaryQueue::<T>::try_mutate(pool_id, |queue| {
      if let Err(position) = queue.binary_search(&block) {
        queue
          .try_insert(position, block)
          .map_err(|_| Error::<T>::TooManyBoundaries)?;
      }
      Ok(())
    })
  }

  fn dequeue_boundary(pool_id: PoolId, block: BlockNumberFor<T>) {
    BoundaryQueue::<T>::mutate(pool_id, |queue| {
      if let Ok(position) = queue.binary_search(&block) {
        queue.remove(position);
      }
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const PRECISION: Balance = 1_000_000_000_000;

  #[test]
  fn reward_factor_rounds_down() {
    let mut pool = OrderPool {
      sales_rate: 3,
      ..Default::default()
    };
    pool.advance_reward_factor(10, PRECISION).unwrap();
    assert_eq!(pool.reward_factor, 3_333_333_333_333);
    // Each unit of rate gets 3.333.., three units get 9 after flooring.
    assert_eq!(OrderPool::accrued(3, 0, pool.reward_factor, PRECISION), Some(9));
  }

  #[test]
  fn zero_rate_direction_is_skipped() {
    let mut pool = OrderPool::default();
    assert_eq!(pool.advance_reward_factor(500, PRECISION), Some(()));
    assert_eq!(pool.reward_factor, 0);
  }

  #[test]
  fn credit_and_claim_track_unclaimed() {
    let mut pool = OrderPool::default();
    pool.credit_proceeds(100).unwrap();
    pool.claim(60).unwrap();
    assert_eq!(pool.unclaimed_proceeds, 40);
    assert_eq!(pool.total_proceeds, 100);
    assert_eq!(pool.claim(41), None);
  }

  #[test]
  fn accrued_rejects_decreasing_factor() {
    assert_eq!(OrderPool::accrued(1, 10, 5, PRECISION), None);
  }

  #[test]
  #[should_panic(expected = "aggregate rate includes the rate of every contributing order")]
  fn removing_more_rate_than_present_aborts() {
    let mut pool = OrderPool {
      sales_rate: 5,
      ..Default::default()
    };
    pool.remove_rate(6);
  }
}
