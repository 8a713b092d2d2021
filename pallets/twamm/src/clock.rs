//! Block interval clock.
//!
//! Order starts and expiries always sit on multiples of the order block
//! interval (OBI). Callers guarantee a non-zero interval; the pallet checks it in
//! `integrity_test`.

use polkadot_sdk::sp_runtime::traits::{AtLeast32BitUnsigned, CheckedMul, Saturating};

/// Rounds `block` down to the boundary at or before it.
pub fn floor_to_interval<B: AtLeast32BitUnsigned + Copy>(block: B, interval: B) -> B {
  block - block % interval
}

/// First boundary strictly after `block`.
pub fn next_boundary<B: AtLeast32BitUnsigned + Copy>(block: B, interval: B) -> B {
  floor_to_interval(block, interval).saturating_add(interval)
}

/// Length in blocks of `intervals` whole intervals, `None` on overflow.
pub fn interval_span<B: AtLeast32BitUnsigned + Copy>(intervals: u32, interval: B) -> Option<B> {
  interval.checked_mul(&B::from(intervals))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn floor_snaps_down() {
    assert_eq!(floor_to_interval(0u64, 10), 0);
    assert_eq!(floor_to_interval(9u64, 10), 0);
    assert_eq!(floor_to_interval(10u64, 10), 10);
    assert_eq!(floor_to_interval(27u64, 10), 20);
  }

  #[test]
  fn next_boundary_is_strictly_after() {
    assert_eq!(next_boundary(0u64, 10), 10);
    assert_eq!(next_boundary(1u64, 10), 10);
    assert_eq!(next_boundary(10u64, 10), 20);
    assert_eq!(next_boundary(19u32, 10), 20);
  }

  #[test]
  fn next_boundary_saturates() {
    assert_eq!(next_boundary(u32::MAX, 10), u32::MAX);
  }

  #[test]
  fn spans() {
    assert_eq!(interval_span(5, 10u64), Some(50));
    assert_eq!(interval_span(u32::MAX, 2u32), None);
  }
}
