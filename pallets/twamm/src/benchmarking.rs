#![cfg(feature = "runtime-benchmarks")]

use crate::*;
use frame::prelude::*;
use polkadot_sdk::frame_benchmarking::v2::*;
use polkadot_sdk::frame_support::traits::EnsureOrigin;
use polkadot_sdk::frame_system::RawOrigin;
use polkadot_sdk::sp_runtime::traits::{One, UniqueSaturatedInto};

const RESERVE: Balance = 1_000_000_000_000;
const RATE: Balance = 1_000;

#[benchmarks]
mod benches {
  use super::*;

  fn setup_pool<T: Config>() -> PoolId {
    let (asset0, asset1) = T::BenchmarkHelper::pool_assets();
    let vault = Pallet::<T>::account_id();
    T::BenchmarkHelper::fund(&vault, asset0, RESERVE).unwrap();
    T::BenchmarkHelper::fund(&vault, asset1, RESERVE).unwrap();
    Pallet::<T>::register_pool(asset0, asset1, RESERVE, RESERVE).unwrap()
  }

  fn amount_for<T: Config>(intervals: u32) -> Balance {
    let span = clock::interval_span(intervals, T::OrderBlockInterval::get()).unwrap();
    RATE.saturating_mul(span.unique_saturated_into())
  }

  fn fund_seller<T: Config>(who: &T::AccountId, amount: Balance) {
    let (asset0, _) = T::BenchmarkHelper::pool_assets();
    T::BenchmarkHelper::fund(who, asset0, amount).unwrap();
  }

  fn place<T: Config>(pool_id: PoolId, owner: &T::AccountId, intervals: u32) -> OrderId {
    let amount = amount_for::<T>(intervals);
    fund_seller::<T>(owner, amount);
    Pallet::<T>::on_deposit(
      pool_id,
      OrderDirection::ZeroForOne,
      amount,
      intervals,
      owner.clone(),
      None,
    )
    .unwrap()
  }

  /// Moves to one block into the order so it has both sold and earned.
  fn run_into<T: Config>(order_id: OrderId) {
    let start = Orders::<T>::get(order_id).unwrap().start;
    frame_system::Pallet::<T>::set_block_number(start + One::one());
  }

  #[benchmark]
  fn place_order() {
    frame_system::Pallet::<T>::set_block_number(One::one());
    let pool_id = setup_pool::<T>();
    let caller: T::AccountId = whitelisted_caller();
    let amount = amount_for::<T>(2);
    fund_seller::<T>(&caller, amount);
    let order_id = NextOrderId::<T>::get();
    #[extrinsic_call]
    place_order(
      RawOrigin::Signed(caller),
      pool_id,
      OrderDirection::ZeroForOne,
      amount,
      2,
      None,
    );
    assert!(Orders::<T>::contains_key(order_id));
  }

  #[benchmark]
  fn pause_order() {
    frame_system::Pallet::<T>::set_block_number(One::one());
    let pool_id = setup_pool::<T>();
    let caller: T::AccountId = whitelisted_caller();
    let order_id = place::<T>(pool_id, &caller, 2);
    run_into::<T>(order_id);
    #[extrinsic_call]
    pause_order(RawOrigin::Signed(caller), order_id);
    assert!(Orders::<T>::get(order_id).unwrap().paused);
  }

  #[benchmark]
  fn resume_order() {
    frame_system::Pallet::<T>::set_block_number(One::one());
    let pool_id = setup_pool::<T>();
    let caller: T::AccountId = whitelisted_caller();
    let order_id = place::<T>(pool_id, &caller, 2);
    run_into::<T>(order_id);
    Pallet::<T>::on_pause(order_id, &caller).unwrap();
    #[extrinsic_call]
    resume_order(RawOrigin::Signed(caller), order_id);
    assert!(!Orders::<T>::get(order_id).unwrap().paused);
  }

  #[benchmark]
  fn extend_order() {
    frame_system::Pallet::<T>::set_block_number(One::one());
    let pool_id = setup_pool::<T>();
    let caller: T::AccountId = whitelisted_caller();
    let order_id = place::<T>(pool_id, &caller, 2);
    run_into::<T>(order_id);
    let expiry = Orders::<T>::get(order_id).unwrap().expiry;
    let extra = amount_for::<T>(1);
    fund_seller::<T>(&caller, extra);
    #[extrinsic_call]
    extend_order(RawOrigin::Signed(caller), order_id, extra);
    assert!(Orders::<T>::get(order_id).unwrap().expiry > expiry);
  }

  #[benchmark]
  fn cancel_order() {
    frame_system::Pallet::<T>::set_block_number(One::one());
    let pool_id = setup_pool::<T>();
    let caller: T::AccountId = whitelisted_caller();
    let order_id = place::<T>(pool_id, &caller, 2);
    run_into::<T>(order_id);
    #[extrinsic_call]
    cancel_order(RawOrigin::Signed(caller.clone()), order_id, caller.clone());
    assert!(!Orders::<T>::contains_key(order_id));
  }

  #[benchmark]
  fn withdraw_proceeds() {
    frame_system::Pallet::<T>::set_block_number(One::one());
    let pool_id = setup_pool::<T>();
    let caller: T::AccountId = whitelisted_caller();
    let order_id = place::<T>(pool_id, &caller, 2);
    run_into::<T>(order_id);
    #[extrinsic_call]
    withdraw_proceeds(RawOrigin::Signed(caller.clone()), order_id, caller.clone());
    assert_eq!(Orders::<T>::get(order_id).unwrap().proceeds, 0);
  }

  #[benchmark]
  fn set_pool_paused() -> Result<(), BenchmarkError> {
    frame_system::Pallet::<T>::set_block_number(One::one());
    let pool_id = setup_pool::<T>();
    let origin =
      T::AdminOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;
    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, pool_id, true);
    assert!(Pools::<T>::get(pool_id).unwrap().paused);
    Ok(())
  }

  /// Crosses `b` boundaries in one settlement: a shared start plus `b - 1`
  /// distinct expiries.
  #[benchmark]
  fn execute_virtual_orders(b: Linear<2, { T::MaxScheduledBoundaries::get() }>) {
    frame_system::Pallet::<T>::set_block_number(One::one());
    let pool_id = setup_pool::<T>();
    let caller: T::AccountId = whitelisted_caller();
    let longest = b.saturating_sub(1).min(T::MaxOrderIntervals::get());
    for intervals in 1..=longest {
      place::<T>(pool_id, &caller, intervals);
    }
    let last = BoundaryQueue::<T>::get(pool_id)
      .last()
      .copied()
      .unwrap();
    frame_system::Pallet::<T>::set_block_number(last + One::one());
    #[extrinsic_call]
    execute_virtual_orders(RawOrigin::Signed(caller), pool_id);
    assert!(BoundaryQueue::<T>::get(pool_id).is_empty());
  }

  #[cfg(test)]
  use crate::mock::{Test, new_test_ext};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
