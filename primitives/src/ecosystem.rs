//! Ecosystem Constants for the Long-Term Order Engine
//!
//! Pallet identifiers and the default parameters runtime configurations plug into
//! `pallet-twamm`. Runtimes may override any of them through the pallet's `Config`.

/// Balance type alias for consistency across the workspace
pub type Balance = u128;

/// Pallet identifiers for deriving pallet-owned accounts.
///
/// These IDs are used by Polkadot SDK's `PalletId::into_account_truncating()`
/// to deterministically generate the vault account holding reserves and escrowed deposits.
pub mod pallet_ids {
  /// Long-term order engine pallet ID
  pub const TWAMM_PALLET_ID: &[u8; 8] = b"py/twamm";
}

/// Engine parameters.
pub mod params {
  use super::Balance;

  /// Fixed-point scale of the per-direction reward factor (10^12).
  ///
  /// Proceeds per unit of sales rate are stored multiplied by this value and
  /// rounded down, so orders can only ever be under-credited by dust.
  pub const PRECISION: Balance = 1_000_000_000_000;

  /// Order block interval: order starts and expiries snap to multiples of this.
  pub const ORDER_BLOCK_INTERVAL: u32 = 10;

  /// Upper bound on the lifetime of a single order, in intervals.
  pub const MAX_ORDER_INTERVALS: u32 = 1_000;

  /// Upper bound on distinct uncrossed start/expiry boundaries per pool.
  ///
  /// Bounds the work a single settlement can be asked to do. Uncrossed
  /// boundaries all lie on the next `MAX_ORDER_INTERVALS + 1` interval marks, so
  /// this covers every order a pool can hold at once.
  pub const MAX_SCHEDULED_BOUNDARIES: u32 = MAX_ORDER_INTERVALS + 1;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pallet_ids_are_correct_length() {
    assert_eq!(pallet_ids::TWAMM_PALLET_ID.len(), 8);
  }

  #[test]
  fn precision_is_standard() {
    assert_eq!(params::PRECISION, 1_000_000_000_000);
  }

  #[test]
  fn boundary_cap_covers_every_reachable_interval_mark() {
    assert!(params::MAX_SCHEDULED_BOUNDARIES > params::MAX_ORDER_INTERVALS);
  }

  #[test]
  fn longest_order_fits_in_block_numbers() {
    let blocks = (params::MAX_ORDER_INTERVALS as u64) * (params::ORDER_BLOCK_INTERVAL as u64);
    assert!(blocks < u32::MAX as u64);
  }
}
