use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

/// Asset identifier shared by the order engine and its custody adapters.
///
/// - `Native`: the chain's native token (managed by pallet-balances).
/// - `Local(u32)`: a locally issued asset (managed by pallet-assets).
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub enum AssetKind {
  /// Native token managed by pallet-balances
  #[default]
  Native,
  /// Local asset managed by pallet-assets
  Local(u32),
}

impl From<u32> for AssetKind {
  fn from(asset_id: u32) -> Self {
    AssetKind::Local(asset_id)
  }
}

impl AssetKind {
  pub fn is_native(&self) -> bool {
    matches!(self, AssetKind::Native)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn native_sorts_before_local() {
    assert!(AssetKind::Native < AssetKind::Local(0));
    assert!(AssetKind::Local(1) < AssetKind::Local(2));
  }

  #[test]
  fn local_from_u32() {
    assert_eq!(AssetKind::from(42), AssetKind::Local(42));
    assert!(AssetKind::Native.is_native());
    assert!(!AssetKind::Local(42).is_native());
  }
}
