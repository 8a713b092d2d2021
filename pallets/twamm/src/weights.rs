#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use core::marker::PhantomData;
use polkadot_sdk::frame_support::{
  traits::Get,
  weights::{constants::RocksDbWeight, Weight},
};

/// Lifecycle weights exclude settlement; callers add
/// `execute_virtual_orders(MaxScheduledBoundaries)` on top.
pub trait WeightInfo {
  fn place_order() -> Weight;
  fn pause_order() -> Weight;
  fn resume_order() -> Weight;
  fn extend_order() -> Weight;
  fn cancel_order() -> Weight;
  fn withdraw_proceeds() -> Weight;
  fn set_pool_paused() -> Weight;
  fn execute_virtual_orders(boundaries: u32) -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config> WeightInfo for SubstrateWeight<T> {
  // Orders, NextOrderId, Pools, 2x SalesRateBoundaries, BoundaryQueue, 2x custody
  fn place_order() -> Weight {
    Weight::from_parts(45_000_000, 4200)
      .saturating_add(T::DbWeight::get().reads(6))
      .saturating_add(T::DbWeight::get().writes(6))
  }
  fn pause_order() -> Weight {
    Weight::from_parts(30_000_000, 3600)
      .saturating_add(T::DbWeight::get().reads(5))
      .saturating_add(T::DbWeight::get().writes(3))
  }
  fn resume_order() -> Weight {
    Weight::from_parts(30_000_000, 3600)
      .saturating_add(T::DbWeight::get().reads(4))
      .saturating_add(T::DbWeight::get().writes(3))
  }
  fn extend_order() -> Weight {
    Weight::from_parts(50_000_000, 4600)
      .saturating_add(T::DbWeight::get().reads(8))
      .saturating_add(T::DbWeight::get().writes(7))
  }
  fn cancel_order() -> Weight {
    Weight::from_parts(55_000_000, 4600)
      .saturating_add(T::DbWeight::get().reads(8))
      .saturating_add(T::DbWeight::get().writes(8))
  }
  fn withdraw_proceeds() -> Weight {
    Weight::from_parts(40_000_000, 4000)
      .saturating_add(T::DbWeight::get().reads(6))
      .saturating_add(T::DbWeight::get().writes(5))
  }
  fn set_pool_paused() -> Weight {
    Weight::from_parts(12_000_000, 1600)
      .saturating_add(T::DbWeight::get().reads(1))
      .saturating_add(T::DbWeight::get().writes(1))
  }
  // Pools, BoundaryQueue, 2x OrderPools, plus both directions' boundary per crossing
  fn execute_virtual_orders(boundaries: u32) -> Weight {
    let b = u64::from(boundaries);
    Weight::from_parts(
      25_000_000u64.saturating_add(b.saturating_mul(9_000_000)),
      3000u64.saturating_add(b.saturating_mul(160)),
    )
    .saturating_add(T::DbWeight::get().reads(4u64.saturating_add(b.saturating_mul(2))))
    .saturating_add(T::DbWeight::get().writes(4u64.saturating_add(b.saturating_mul(2))))
  }
}

impl WeightInfo for () {
  fn place_order() -> Weight { Weight::from_parts(45_000_000, 4200) }
  fn pause_order() -> Weight { Weight::from_parts(30_000_000, 3600) }
  fn resume_order() -> Weight { Weight::from_parts(30_000_000, 3600) }
  fn extend_order() -> Weight { Weight::from_parts(50_000_000, 4600) }
  fn cancel_order() -> Weight { Weight::from_parts(55_000_000, 4600) }
  fn withdraw_proceeds() -> Weight { Weight::from_parts(40_000_000, 4000) }
  fn set_pool_paused() -> Weight { Weight::from_parts(12_000_000, 1600) }
  fn execute_virtual_orders(boundaries: u32) -> Weight {
    let b = u64::from(boundaries);
    Weight::from_parts(25_000_000u64.saturating_add(b.saturating_mul(9_000_000)), 3000)
  }
}
