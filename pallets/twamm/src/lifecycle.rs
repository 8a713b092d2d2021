//! Order lifecycle: the custody-facing entry points.
//!
//! Every operation settles the pool before touching an order or an aggregate.
//! Exits (cancel, withdraw) also work on a paused pool, against the state frozen
//! at its watermark.

use crate::{
  AssetOps, clock,
  pallet::{Config, Error, Event, NextOrderId, OrderOf, OrderPools, Orders, Pallet, PoolInfoOf, Pools},
  types::*,
};
use frame::prelude::*;
use polkadot_sdk::{
  frame_support::{
    storage::{TransactionOutcome, with_transaction},
    transactional,
  },
  sp_runtime::traits::{CheckedAdd, UniqueSaturatedInto},
};

impl<T: Config> Pallet<T> {
  /// Places a long-term order selling `amount` over `intervals` block intervals
  /// and escrows the amount from `owner`.
  #[transactional]
  pub fn on_deposit(
    pool_id: PoolId,
    direction: OrderDirection,
    amount: Balance,
    intervals: u32,
    owner: T::AccountId,
    delegate: Option<T::AccountId>,
  ) -> Result<OrderId, DispatchError> {
    ensure!(amount > 0 && intervals > 0, Error::<T>::InvalidAmount);
    ensure!(intervals <= T::MaxOrderIntervals::get(), Error::<T>::TooManyIntervals);
    let pool = Self::settle_open_pool(pool_id)?;
    let now = pool.last_virtual_order_block;

    let interval = T::OrderBlockInterval::get();
    let span = clock::interval_span(intervals, interval).ok_or(Error::<T>::ArithmeticOverflow)?;
    let start = clock::next_boundary(now, interval);
    let expiry = start.checked_add(&span).ok_or(Error::<T>::ArithmeticOverflow)?;
    let blocks: u128 = span.unique_saturated_into();
    ensure!(amount % blocks == 0, Error::<T>::InvalidAmount);
    let sales_rate = amount / blocks;

    let order_id = NextOrderId::<T>::get();
    let next = order_id.checked_add(1).ok_or(Error::<T>::ArithmeticOverflow)?;

    Self::schedule_pending(pool_id, direction, sales_rate, start, expiry)?;
    Self::retain_boundary(pool_id, direction, start)?;
    Self::retain_boundary(pool_id, direction, expiry)?;

    let (sold, _) = pool.assets_for(direction);
    T::AssetOps::transfer(&owner, &Self::account_id(), sold, amount)?;

    Orders::<T>::insert(
      order_id,
      Order {
        pool_id,
        owner: owner.clone(),
        delegate,
        direction,
        sales_rate,
        deposit: amount,
        proceeds: 0,
        start,
        expiry,
        paused: false,
        checkpoint: start,
        reward_factor_checkpoint: None,
      },
    );
    NextOrderId::<T>::put(next);

    Self::deposit_event(Event::OrderPlaced {
      order_id,
      pool_id,
      owner,
      direction,
      amount,
      sales_rate,
      start,
      expiry,
    });
    Ok(order_id)
  }

  /// Takes a running order out of the aggregate. Its unsold deposit stays
  /// escrowed and its expiry does not move.
  #[transactional]
  pub fn on_pause(order_id: OrderId, who: &T::AccountId) -> DispatchResult {
    let (mut order, _) = Self::authorized_order(order_id, who)?;
    let pool = Self::settle_open_pool(order.pool_id)?;
    let now = pool.last_virtual_order_block;
    ensure!(!order.paused, Error::<T>::AlreadyPaused);
    ensure!(now >= order.start, Error::<T>::OrderNotStarted);
    ensure!(now < order.expiry, Error::<T>::OrderExpired);

    Self::sync_order(&mut order, now)?;
    Self::remove_active(order.pool_id, order.direction, order.sales_rate, order.expiry)?;
    order.paused = true;

    let deposit = order.deposit;
    Orders::<T>::insert(order_id, order);
    Self::deposit_event(Event::OrderPaused { order_id, deposit });
    Ok(())
  }

  #[transactional]
  pub fn on_resume(order_id: OrderId, who: &T::AccountId) -> DispatchResult {
    let (mut order, _) = Self::authorized_order(order_id, who)?;
    let pool = Self::settle_open_pool(order.pool_id)?;
    let now = pool.last_virtual_order_block;
    ensure!(order.paused, Error::<T>::NotPaused);
    ensure!(now < order.expiry, Error::<T>::OrderExpired);

    Self::add_active(order.pool_id, order.direction, order.sales_rate, order.expiry)?;
    order.paused = false;
    order.checkpoint = now;
    order.reward_factor_checkpoint =
      Some(OrderPools::<T>::get(order.pool_id, order.direction).reward_factor);

    Orders::<T>::insert(order_id, order);
    Self::deposit_event(Event::OrderResumed { order_id });
    Ok(())
  }

  /// Adds `extra_amount` from `who` to the order's deposit and pushes its expiry
  /// out by every whole interval the idle deposit can now pay for at the
  /// existing rate. Whatever does not fill an interval stays deposited.
  #[transactional]
  pub fn on_extend(order_id: OrderId, who: &T::AccountId, extra_amount: Balance) -> DispatchResult {
    ensure!(extra_amount > 0, Error::<T>::InvalidAmount);
    let (mut order, _) = Self::authorized_order(order_id, who)?;
    let pool = Self::settle_open_pool(order.pool_id)?;
    let now = pool.last_virtual_order_block;
    ensure!(now < order.expiry, Error::<T>::OrderExpired);

    Self::sync_order(&mut order, now)?;
    let idle = order
      .idle_deposit(now)
      .ok_or(Error::<T>::ArithmeticOverflow)?;
    let budget = idle
      .checked_add(extra_amount)
      .ok_or(Error::<T>::ArithmeticOverflow)?;

    let interval = T::OrderBlockInterval::get();
    let interval_blocks: u128 = interval.unique_saturated_into();
    let interval_cost = order
      .sales_rate
      .checked_mul(interval_blocks)
      .ok_or(Error::<T>::ArithmeticOverflow)?;
    let added_intervals: u32 = (budget / interval_cost)
      .try_into()
      .map_err(|_| Error::<T>::TooManyIntervals)?;

    let current_intervals: u128 = OrderOf::<T>::blocks_between(order.start, order.expiry) / interval_blocks;
    ensure!(
      current_intervals.saturating_add(added_intervals.into()) <= T::MaxOrderIntervals::get().into(),
      Error::<T>::TooManyIntervals
    );

    if added_intervals > 0 {
      let span =
        clock::interval_span(added_intervals, interval).ok_or(Error::<T>::ArithmeticOverflow)?;
      let expiry = order
        .expiry
        .checked_add(&span)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      if !order.paused {
        Self::move_expiry(order.pool_id, order.direction, order.sales_rate, order.expiry, expiry)?;
      }
      Self::retain_boundary(order.pool_id, order.direction, expiry)?;
      Self::release_boundary(order.pool_id, order.direction, order.expiry)?;
      order.expiry = expiry;
    }
    order.deposit = order
      .deposit
      .checked_add(extra_amount)
      .ok_or(Error::<T>::ArithmeticOverflow)?;

    let (sold, _) = pool.assets_for(order.direction);
    T::AssetOps::transfer(who, &Self::account_id(), sold, extra_amount)?;

    let expiry = order.expiry;
    Orders::<T>::insert(order_id, order);
    Self::deposit_event(Event::OrderExtended {
      order_id,
      extra_amount,
      added_intervals,
      expiry,
    });
    Ok(())
  }

  /// Closes an order: refunds the unsold deposit and pays out proceeds to
  /// `dest`. Returns `(refund, proceeds)`.
  #[transactional]
  pub fn on_cancel(
    order_id: OrderId,
    who: &T::AccountId,
    dest: T::AccountId,
  ) -> Result<(Balance, Balance), DispatchError> {
    let (mut order, authority) = Self::authorized_order(order_id, who)?;
    ensure!(order.may_pay(authority, &dest), Error::<T>::Unauthorized);
    let pool = Self::settle_unless_paused(order.pool_id)?;
    let watermark = pool.last_virtual_order_block;

    Self::sync_order(&mut order, watermark)?;
    if order.is_contributing(watermark) {
      if order.is_pending(watermark) {
        Self::unschedule_pending(
          order.pool_id,
          order.direction,
          order.sales_rate,
          order.start,
          order.expiry,
        )?;
      } else {
        Self::remove_active(order.pool_id, order.direction, order.sales_rate, order.expiry)?;
      }
    }

    let (refund, proceeds) = (order.deposit, order.proceeds);
    Self::pay_out(&pool, &order, &dest, refund, proceeds)?;
    Self::destroy_order(order_id, &order)?;

    Self::deposit_event(Event::OrderCancelled {
      order_id,
      dest,
      refund,
      proceeds,
    });
    Ok((refund, proceeds))
  }

  /// Pays out the order's accumulated proceeds to `dest`. An expired order with
  /// nothing left to sell is finalized here.
  #[transactional]
  pub fn on_withdraw(
    order_id: OrderId,
    who: &T::AccountId,
    dest: T::AccountId,
  ) -> Result<Balance, DispatchError> {
    let (mut order, authority) = Self::authorized_order(order_id, who)?;
    ensure!(order.may_pay(authority, &dest), Error::<T>::Unauthorized);
    let pool = Self::settle_unless_paused(order.pool_id)?;
    let watermark = pool.last_virtual_order_block;

    Self::sync_order(&mut order, watermark)?;
    let proceeds = order.proceeds;
    Self::pay_out(&pool, &order, &dest, 0, proceeds)?;
    order.proceeds = 0;

    if proceeds > 0 {
      Self::deposit_event(Event::ProceedsWithdrawn {
        order_id,
        dest,
        amount: proceeds,
      });
    }
    if !order.paused && order.is_spent(watermark) {
      Self::destroy_order(order_id, &order)?;
    } else {
      Orders::<T>::insert(order_id, order);
    }
    Ok(proceeds)
  }

  /// The order as it would read after settling its pool to the current block.
  /// Nothing is written.
  pub fn quote_order(order_id: OrderId) -> Result<OrderOf<T>, DispatchError> {
    with_transaction(|| {
      let quote = (|| -> Result<OrderOf<T>, DispatchError> {
        let mut order = Self::get_order(order_id)?;
        let pool = Self::settle_unless_paused(order.pool_id)?;
        Self::sync_order(&mut order, pool.last_virtual_order_block)?;
        Ok(order)
      })();
      TransactionOutcome::Rollback(quote)
    })
  }

  /// Settles a pool that must not be paused.
  fn settle_open_pool(pool_id: PoolId) -> Result<PoolInfoOf<T>, DispatchError> {
    let pool = Pools::<T>::get(pool_id).ok_or(Error::<T>::PoolNotFound)?;
    ensure!(!pool.paused, Error::<T>::PoolPaused);
    Self::settle(pool_id, Self::now())
  }

  /// Settles unless the pool is paused, in which case its frozen state is
  /// returned as is.
  fn settle_unless_paused(pool_id: PoolId) -> Result<PoolInfoOf<T>, DispatchError> {
    let pool = Pools::<T>::get(pool_id).ok_or(Error::<T>::PoolNotFound)?;
    if pool.paused {
      return Ok(pool);
    }
    Self::settle(pool_id, Self::now())
  }

  /// Releases `refund` of the sold asset and `proceeds` of the bought asset from
  /// the vault.
  fn pay_out(
    pool: &PoolInfoOf<T>,
    order: &OrderOf<T>,
    dest: &T::AccountId,
    refund: Balance,
    proceeds: Balance,
  ) -> DispatchResult {
    let (sold, bought) = pool.assets_for(order.direction);
    let vault = Self::account_id();
    if proceeds > 0 {
      OrderPools::<T>::try_mutate(order.pool_id, order.direction, |aggregate| {
        aggregate.claim(proceeds).ok_or(Error::<T>::ArithmeticOverflow)
      })?;
      T::AssetOps::transfer(&vault, dest, bought, proceeds)?;
    }
    if refund > 0 {
      T::AssetOps::transfer(&vault, dest, sold, refund)?;
    }
    Ok(())
  }
}
