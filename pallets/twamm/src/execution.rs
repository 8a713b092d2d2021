//! Virtual order execution.
//!
//! `settle` replays every block between a pool's watermark and `now` in as few
//! oracle calls as the boundary queue allows: rates are constant between two
//! consecutive boundaries, so each such stretch is priced as one segment with
//! both directions netted in the same trade.

use crate::{
  LOG_TARGET, TradeOracle, TradeOutcome,
  pallet::{BoundaryQueue, Config, Error, Event, OrderPools, Pallet, PoolInfoOf, Pools, SalesRateBoundaries},
  order_pool::OrderPool,
  types::*,
};
use frame::prelude::*;
use polkadot_sdk::{frame_support::transactional, sp_runtime::traits::UniqueSaturatedInto};

impl<T: Config> Pallet<T> {
  /// Advances the pool's virtual orders to `now` and returns the updated pool.
  ///
  /// A no-op when `now` is not past the watermark or the pool is paused. Runs in
  /// its own storage layer: if any segment fails nothing is written and the
  /// watermark stays put.
  #[transactional]
  pub(crate) fn settle(pool_id: PoolId, now: BlockNumberFor<T>) -> Result<PoolInfoOf<T>, DispatchError> {
    let mut pool = Pools::<T>::get(pool_id).ok_or(Error::<T>::PoolNotFound)?;
    let from = pool.last_virtual_order_block;
    if pool.paused || now <= from {
      return Ok(pool);
    }

    let mut aggregates = [
      OrderPools::<T>::get(pool_id, OrderDirection::ZeroForOne),
      OrderPools::<T>::get(pool_id, OrderDirection::OneForZero),
    ];
    let queue = BoundaryQueue::<T>::get(pool_id);
    let crossed = queue.iter().take_while(|block| **block <= now).count();

    let mut cursor = from;
    let mut segments = 0u32;
    for boundary in queue.iter().take(crossed).copied() {
      segments = segments.saturating_add(Self::execute_segment(&mut pool, &mut aggregates, cursor, boundary)?);
      cursor = boundary;
      Self::cross_boundary(pool_id, boundary, &mut aggregates)?;
    }
    segments = segments.saturating_add(Self::execute_segment(&mut pool, &mut aggregates, cursor, now)?);

    if crossed > 0 {
      let mut remaining = queue.into_inner();
      let remaining = remaining.split_off(crossed);
      BoundaryQueue::<T>::insert(pool_id, BoundedVec::truncate_from(remaining));
    }
    let [zero_for_one, one_for_zero] = aggregates;
    OrderPools::<T>::insert(pool_id, OrderDirection::ZeroForOne, zero_for_one);
    OrderPools::<T>::insert(pool_id, OrderDirection::OneForZero, one_for_zero);
    pool.last_virtual_order_block = now;
    Pools::<T>::insert(pool_id, pool.clone());

    log::debug!(
      target: LOG_TARGET,
      "pool {} settled {:?}..{:?}: {} segment(s), {} boundary(ies) crossed",
      pool_id,
      from,
      now,
      segments,
      crossed,
    );
    Self::deposit_event(Event::VirtualOrdersExecuted {
      pool_id,
      from,
      to: now,
      segments,
    });
    Ok(pool)
  }

  /// Prices `[from, to)` and books the proceeds. Returns the number of oracle
  /// calls made (0 when nothing was for sale).
  fn execute_segment(
    pool: &mut PoolInfoOf<T>,
    aggregates: &mut [OrderPool; 2],
    from: BlockNumberFor<T>,
    to: BlockNumberFor<T>,
  ) -> Result<u32, DispatchError> {
    if to <= from {
      return Ok(0);
    }
    let blocks: u128 = (to - from).unique_saturated_into();
    let amount_in0 = aggregates[0]
      .sales_rate
      .checked_mul(blocks)
      .ok_or(Error::<T>::ArithmeticOverflow)?;
    let amount_in1 = aggregates[1]
      .sales_rate
      .checked_mul(blocks)
      .ok_or(Error::<T>::ArithmeticOverflow)?;
    if amount_in0 == 0 && amount_in1 == 0 {
      return Ok(0);
    }

    let outcome = T::PricingOracle::trade(amount_in0, amount_in1, pool.reserve0, pool.reserve1)
      .map_err(|e| {
        log::warn!(
          target: LOG_TARGET,
          "oracle rejected segment {:?}..{:?} (in {}/{}): {:?}",
          from,
          to,
          amount_in0,
          amount_in1,
          e,
        );
        Error::<T>::SettlementFailed
      })?;
    Self::ensure_valid_outcome(&outcome, amount_in0, amount_in1, pool)?;

    let precision = T::RewardFactorPrecision::get();
    for (aggregate, amount_out) in aggregates
      .iter_mut()
      .zip([outcome.amount_out0, outcome.amount_out1])
    {
      aggregate
        .credit_proceeds(amount_out)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      aggregate
        .advance_reward_factor(amount_out, precision)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
    }
    pool.reserve0 = outcome.reserve0;
    pool.reserve1 = outcome.reserve1;
    Ok(1)
  }

  fn ensure_valid_outcome(
    outcome: &TradeOutcome,
    amount_in0: Balance,
    amount_in1: Balance,
    pool: &PoolInfoOf<T>,
  ) -> DispatchResult {
    let balanced = outcome.conserves(amount_in0, amount_in1, pool.reserve0, pool.reserve1);
    let unowed = (amount_in0 == 0 && outcome.amount_out0 != 0) || (amount_in1 == 0 && outcome.amount_out1 != 0);
    if !balanced || unowed {
      log::warn!(
        target: LOG_TARGET,
        "oracle outcome {:?} does not balance inputs {}/{} against reserves {}/{}",
        outcome,
        amount_in0,
        amount_in1,
        pool.reserve0,
        pool.reserve1,
      );
      return Err(Error::<T>::SettlementFailed.into());
    }
    Ok(())
  }

  /// Applies the rate deltas scheduled at `block` and snapshots the reward
  /// factors for orders that start or expire there.
  fn cross_boundary(
    pool_id: PoolId,
    block: BlockNumberFor<T>,
    aggregates: &mut [OrderPool; 2],
  ) -> DispatchResult {
    for (aggregate, direction) in aggregates.iter_mut().zip(OrderDirection::BOTH) {
      let key = (pool_id, direction);
      let Some(mut boundary) = SalesRateBoundaries::<T>::get(key, block) else {
        continue;
      };
      aggregate.remove_rate(boundary.expiring_rate);
      aggregate
        .add_rate(boundary.starting_rate)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      log::debug!(
        target: LOG_TARGET,
        "pool {} {:?} boundary {:?}: -{} +{} -> rate {}",
        pool_id,
        direction,
        block,
        boundary.expiring_rate,
        boundary.starting_rate,
        aggregate.sales_rate,
      );
      if boundary.references == 0 {
        SalesRateBoundaries::<T>::remove(key, block);
      } else {
        boundary.reward_factor = Some(aggregate.reward_factor);
        SalesRateBoundaries::<T>::insert(key, block, boundary);
      }
    }
    Ok(())
  }
}
