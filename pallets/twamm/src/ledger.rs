//! Order ledger: lookup, authorization and lazy per-order accounting.

use crate::{
  order_pool::OrderPool,
  pallet::{Config, Error, Event, OrderOf, OrderPools, Orders, Pallet},
  types::*,
};
use frame::prelude::*;
use polkadot_sdk::sp_runtime::ArithmeticError;

impl<T: Config> Pallet<T> {
  /// Loads an order and resolves the capacity `who` acts in.
  pub(crate) fn authorized_order(
    order_id: OrderId,
    who: &T::AccountId,
  ) -> Result<(OrderOf<T>, Authority), DispatchError> {
    let order = Orders::<T>::get(order_id).ok_or(Error::<T>::OrderNotFound)?;
    let authority = order.authority_of(who).ok_or(Error::<T>::Unauthorized)?;
    Ok((order, authority))
  }

  /// Brings `deposit` and `proceeds` up to `watermark`, which must not be ahead
  /// of the pool's settlement.
  ///
  /// Paused and pending orders are left alone. The first sync past `start`
  /// picks up the start snapshot as baseline; the first sync past `expiry`
  /// closes the order out against the expiry snapshot. Each releases its
  /// boundary.
  pub(crate) fn sync_order(order: &mut OrderOf<T>, watermark: BlockNumberFor<T>) -> DispatchResult {
    if order.paused || watermark < order.start {
      return Ok(());
    }
    let (pool_id, direction) = (order.pool_id, order.direction);

    let baseline = match order.reward_factor_checkpoint {
      Some(reward_factor) => reward_factor,
      None => {
        let reward_factor = Self::boundary_snapshot(pool_id, direction, order.start)?;
        Self::release_boundary(pool_id, direction, order.start)?;
        order.reward_factor_checkpoint = Some(reward_factor);
        reward_factor
      }
    };

    let end = watermark.min(order.expiry);
    if end <= order.checkpoint {
      return Ok(());
    }
    let reward_factor = if end == order.expiry {
      let reward_factor = Self::boundary_snapshot(pool_id, direction, order.expiry)?;
      Self::release_boundary(pool_id, direction, order.expiry)?;
      reward_factor
    } else {
      OrderPools::<T>::get(pool_id, direction).reward_factor
    };

    let sold = order
      .sales_rate
      .checked_mul(OrderOf::<T>::blocks_between(order.checkpoint, end))
      .ok_or(Error::<T>::ArithmeticOverflow)?;
    let earned = OrderPool::accrued(
      order.sales_rate,
      baseline,
      reward_factor,
      T::RewardFactorPrecision::get(),
    )
    .ok_or(Error::<T>::ArithmeticOverflow)?;

    order.deposit = order.deposit.checked_sub(sold).ok_or(ArithmeticError::Underflow)?;
    order.proceeds = order
      .proceeds
      .checked_add(earned)
      .ok_or(Error::<T>::ArithmeticOverflow)?;
    order.checkpoint = end;
    order.reward_factor_checkpoint = Some(reward_factor);
    Ok(())
  }

  /// Removes an order and lets go of any boundary snapshot it still held.
  pub(crate) fn destroy_order(order_id: OrderId, order: &OrderOf<T>) -> DispatchResult {
    if order.reward_factor_checkpoint.is_none() {
      Self::release_boundary(order.pool_id, order.direction, order.start)?;
    }
    if order.checkpoint < order.expiry {
      Self::release_boundary(order.pool_id, order.direction, order.expiry)?;
    }
    Orders::<T>::remove(order_id);
    Self::deposit_event(Event::OrderDestroyed { order_id });
    Ok(())
  }
}
