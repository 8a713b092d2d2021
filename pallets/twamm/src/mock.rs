use crate as pallet_twamm;
use crate::{AssetOps, TradeOracle, TradeOutcome};
use frame::prelude::*;
use polkadot_sdk::{
  frame_support::{
    PalletId, construct_runtime,
    traits::{ConstU32, ConstU128, Currency, ExistenceRequirement, Get},
  },
  frame_system::EnsureRoot,
  sp_runtime::{
    BuildStorage, TokenError,
    traits::{BlakeTwo256, IdentityLookup},
  },
};
use primitives::{AssetKind, params, pallet_ids};

use alloc::vec;
use core::cell::RefCell;

type Block = polkadot_sdk::frame_system::mocking::MockBlock<Test>;
pub type AccountId = u64;
pub type Balance = u128;

pub const ALICE: AccountId = 1;
pub const BOB: AccountId = 2;
pub const CHARLIE: AccountId = 3;

pub const ASSET0: AssetKind = AssetKind::Native;
pub const ASSET1: AssetKind = AssetKind::Local(1);
pub const POOL: u32 = 0;

pub const INITIAL_RESERVE: Balance = 1_000_000_000;
pub const TEST_INITIAL_BALANCE: Balance = 10_000_000_000_000;

construct_runtime!(
  pub enum Test {
    System: polkadot_sdk::frame_system,
    Balances: polkadot_sdk::pallet_balances,
    Twamm: pallet_twamm,
  }
);

impl polkadot_sdk::frame_system::Config for Test {
  type BaseCallFilter = polkadot_sdk::frame_support::traits::Everything;
  type BlockWeights = ();
  type BlockLength = ();
  type DbWeight = ();
  type RuntimeOrigin = RuntimeOrigin;
  type RuntimeCall = RuntimeCall;
  type Nonce = u64;
  type Hash = polkadot_sdk::sp_core::H256;
  type Hashing = BlakeTwo256;
  type AccountId = AccountId;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Block = Block;
  type RuntimeEvent = RuntimeEvent;
  type BlockHashCount = polkadot_sdk::frame_support::traits::ConstU64<250>;
  type Version = ();
  type PalletInfo = PalletInfo;
  type AccountData = polkadot_sdk::pallet_balances::AccountData<Balance>;
  type OnNewAccount = ();
  type OnKilledAccount = ();
  type SystemWeightInfo = ();
  type SS58Prefix = ();
  type OnSetCode = ();
  type MaxConsumers = ConstU32<16>;
  type RuntimeTask = ();
  type ExtensionsWeightInfo = ();
  type SingleBlockMigrations = ();
  type MultiBlockMigrator = ();
  type PreInherents = ();
  type PostInherents = ();
  type PostTransactions = ();
}

impl polkadot_sdk::pallet_balances::Config for Test {
  type MaxLocks = ConstU32<50>;
  type MaxReserves = ();
  type ReserveIdentifier = [u8; 8];
  type Balance = Balance;
  type RuntimeEvent = RuntimeEvent;
  type DustRemoval = ();
  type ExistentialDeposit = ConstU128<1>;
  type AccountStore = System;
  type WeightInfo = ();
  type FreezeIdentifier = ();
  type MaxFreezes = ();
  type RuntimeHoldReason = RuntimeHoldReason;
  type RuntimeFreezeReason = RuntimeFreezeReason;
  type DoneSlashHandler = ();
}

pub struct TwammPalletId;
impl Get<PalletId> for TwammPalletId {
  fn get() -> PalletId {
    PalletId(*pallet_ids::TWAMM_PALLET_ID)
  }
}

pub struct OrderBlockInterval;
impl Get<u64> for OrderBlockInterval {
  fn get() -> u64 {
    params::ORDER_BLOCK_INTERVAL.into()
  }
}

pub struct RewardFactorPrecision;
impl Get<Balance> for RewardFactorPrecision {
  fn get() -> Balance {
    params::PRECISION
  }
}

thread_local! {
  static ASSET_BALANCES: RefCell<alloc::collections::BTreeMap<(AccountId, AssetKind), Balance>> =
    RefCell::new(alloc::collections::BTreeMap::new());

  static ORACLE_CALLS: RefCell<u32> = const { RefCell::new(0) };

  static ORACLE_DOWN: RefCell<bool> = const { RefCell::new(false) };
}

pub fn reset_mock_adapters() {
  ASSET_BALANCES.with(|b| b.borrow_mut().clear());
  ORACLE_CALLS.with(|c| *c.borrow_mut() = 0);
  ORACLE_DOWN.with(|d| *d.borrow_mut() = false);
}

pub fn set_asset_balance(who: AccountId, asset: AssetKind, amount: Balance) {
  ASSET_BALANCES.with(|b| {
    b.borrow_mut().insert((who, asset), amount);
  });
}

pub fn balance_of(who: AccountId, asset: AssetKind) -> Balance {
  match asset {
    AssetKind::Native => <Balances as Currency<AccountId>>::free_balance(&who),
    _ => ASSET_BALANCES.with(|b| b.borrow().get(&(who, asset)).copied().unwrap_or(0)),
  }
}

pub fn oracle_calls() -> u32 {
  ORACLE_CALLS.with(|c| *c.borrow())
}

pub fn set_oracle_down(down: bool) {
  ORACLE_DOWN.with(|d| *d.borrow_mut() = down);
}

pub struct MockAssetOps;

impl AssetOps<AccountId, AssetKind> for MockAssetOps {
  fn transfer(
    from: &AccountId,
    to: &AccountId,
    asset: AssetKind,
    amount: Balance,
  ) -> Result<(), DispatchError> {
    match asset {
      AssetKind::Native => <Balances as Currency<AccountId>>::transfer(
        from,
        to,
        amount,
        ExistenceRequirement::AllowDeath,
      ),
      _ => ASSET_BALANCES.with(|b| {
        let mut map = b.borrow_mut();
        let src = map.get(&(*from, asset)).copied().unwrap_or(0);
        if src < amount {
          return Err(DispatchError::Token(TokenError::FundsUnavailable));
        }
        map.insert((*from, asset), src - amount);
        let dst = map.get(&(*to, asset)).copied().unwrap_or(0);
        map.insert((*to, asset), dst + amount);
        Ok(())
      }),
    }
  }
}

/// Constant-product pricing that first matches opposing flow at the spot price
/// and only swaps the net remainder against the curve.
pub struct MockOracle;

impl TradeOracle for MockOracle {
  fn trade(
    amount_in0: Balance,
    amount_in1: Balance,
    reserve0: Balance,
    reserve1: Balance,
  ) -> Result<TradeOutcome, DispatchError> {
    if ORACLE_DOWN.with(|d| *d.borrow()) {
      return Err(DispatchError::Other("OracleDown"));
    }
    if reserve0 == 0 || reserve1 == 0 {
      return Err(DispatchError::Other("EmptyReserves"));
    }
    ORACLE_CALLS.with(|c| *c.borrow_mut() += 1);

    let in1_as0 = amount_in1 * reserve0 / reserve1;
    if amount_in0 > 0 && amount_in0 >= in1_as0 {
      let net0 = amount_in0 - in1_as0;
      let net_out1 = net0 * reserve1 / (reserve0 + net0);
      Ok(TradeOutcome {
        amount_out0: amount_in1 + net_out1,
        amount_out1: in1_as0,
        reserve0: reserve0 + net0,
        reserve1: reserve1 - net_out1,
      })
    } else {
      let in0_as1 = amount_in0 * reserve1 / reserve0;
      let net1 = amount_in1 - in0_as1;
      let net_out0 = net1 * reserve0 / (reserve1 + net1);
      Ok(TradeOutcome {
        amount_out0: in0_as1,
        amount_out1: amount_in0 + net_out0,
        reserve0: reserve0 - net_out0,
        reserve1: reserve1 + net1,
      })
    }
  }
}

#[cfg(feature = "runtime-benchmarks")]
pub struct MockBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl crate::BenchmarkHelper<AccountId, AssetKind> for MockBenchmarkHelper {
  fn pool_assets() -> (AssetKind, AssetKind) {
    (AssetKind::Local(10), AssetKind::Local(11))
  }

  fn fund(who: &AccountId, asset: AssetKind, amount: Balance) -> Result<(), DispatchError> {
    match asset {
      AssetKind::Native => {
        let _ = <Balances as Currency<AccountId>>::deposit_creating(who, amount);
      }
      _ => {
        let current = balance_of(*who, asset);
        set_asset_balance(*who, asset, current.saturating_add(amount));
      }
    }
    Ok(())
  }
}

impl pallet_twamm::Config for Test {
  type AssetId = AssetKind;
  type AssetOps = MockAssetOps;
  type PricingOracle = MockOracle;
  type AdminOrigin = EnsureRoot<AccountId>;
  type PalletId = TwammPalletId;
  type OrderBlockInterval = OrderBlockInterval;
  type MaxOrderIntervals = ConstU32<15>;
  type MaxScheduledBoundaries = ConstU32<16>;
  type RewardFactorPrecision = RewardFactorPrecision;
  type WeightInfo = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = MockBenchmarkHelper;
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let mut t = polkadot_sdk::frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();

  polkadot_sdk::pallet_balances::GenesisConfig::<Test> {
    balances: vec![
      (ALICE, TEST_INITIAL_BALANCE),
      (BOB, TEST_INITIAL_BALANCE),
      (CHARLIE, TEST_INITIAL_BALANCE),
    ],
    dev_accounts: None,
  }
  .assimilate_storage(&mut t)
  .unwrap();

  pallet_twamm::GenesisConfig::<Test> {
    pools: vec![(ASSET0, ASSET1, INITIAL_RESERVE, INITIAL_RESERVE)],
    _marker: Default::default(),
  }
  .assimilate_storage(&mut t)
  .unwrap();

  let mut ext = polkadot_sdk::sp_io::TestExternalities::new(t);
  ext.execute_with(|| {
    reset_mock_adapters();
    let vault = Twamm::account_id();
    let _ = <Balances as Currency<AccountId>>::deposit_creating(&vault, INITIAL_RESERVE);
    set_asset_balance(vault, ASSET1, INITIAL_RESERVE);
    for who in [ALICE, BOB, CHARLIE] {
      set_asset_balance(who, ASSET1, TEST_INITIAL_BALANCE);
    }
    System::set_block_number(1);
  });
  ext
}
