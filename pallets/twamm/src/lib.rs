//! Long-Term Order (TWAMM) Pallet
//!
//! Sells large orders into a two-asset pool at a constant per-block rate. Orders
//! are virtual: nothing happens per block. Whenever anyone touches a pool, the
//! pallet settles every block since the last settlement in a handful of segments,
//! one per boundary where an aggregate sales rate changes. Each order later reads
//! its share from a per-direction reward factor.
//!
//! Orders can be paused, resumed, extended, cancelled and drained of proceeds at
//! any time. A pool-wide pause freezes settlement; exits keep working against the
//! frozen state.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod adapters;
pub use adapters::{AssetOps, TradeOracle, TradeOutcome};

pub mod clock;

pub mod types;
pub use types::*;

mod execution;
mod ledger;
mod lifecycle;
mod order_pool;

pub mod weights;
pub use weights::WeightInfo;

pub use order_pool::OrderPool;

pub(crate) const LOG_TARGET: &str = "runtime::twamm";

#[cfg(test)]
mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper<AccountId, AssetId> {
  /// Assets of the pool benchmarks register.
  fn pool_assets() -> (AssetId, AssetId);

  /// Credits `who` with `amount` of `asset`.
  fn fund(
    who: &AccountId,
    asset: AssetId,
    amount: Balance,
  ) -> Result<(), polkadot_sdk::sp_runtime::DispatchError>;
}

#[frame::pallet]
pub mod pallet {
  use super::{AssetOps, LOG_TARGET, OrderPool, TradeOracle, WeightInfo, types::*};
  use alloc::vec::Vec;
  use frame::prelude::*;
  use polkadot_sdk::{
    frame_support::{PalletId, traits::EnsureOrigin},
    sp_runtime::traits::{AccountIdConversion, Zero},
  };

  pub type OrderOf<T> =
    Order<<T as frame_system::Config>::AccountId, BlockNumberFor<T>>;
  pub type PoolInfoOf<T> = PoolInfo<<T as Config>::AssetId, BlockNumberFor<T>>;
  pub type BoundaryQueueOf<T> = BoundedVec<BlockNumberFor<T>, <T as Config>::MaxScheduledBoundaries>;

  #[pallet::config]
  pub trait Config: frame_system::Config {
    type AssetId: Parameter + Member + Copy + MaybeSerializeDeserialize + MaxEncodedLen;

    /// Moves tokens in and out of the vault account.
    type AssetOps: AssetOps<Self::AccountId, Self::AssetId>;

    /// Prices each settlement segment.
    type PricingOracle: TradeOracle;

    /// May pause and unpause whole pools.
    type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    #[pallet::constant]
    type PalletId: Get<PalletId>;

    /// Order block interval. Order starts and expiries are multiples of it.
    #[pallet::constant]
    type OrderBlockInterval: Get<BlockNumberFor<Self>>;

    #[pallet::constant]
    type MaxOrderIntervals: Get<u32>;

    /// Distinct uncrossed boundaries a pool may hold. Must exceed
    /// `MaxOrderIntervals`, or a full queue could refuse valid orders.
    #[pallet::constant]
    type MaxScheduledBoundaries: Get<u32>;

    /// Fixed-point scale of the reward factor.
    #[pallet::constant]
    type RewardFactorPrecision: Get<Balance>;

    type WeightInfo: WeightInfo;

    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: crate::BenchmarkHelper<Self::AccountId, Self::AssetId>;
  }

  #[pallet::pallet]
  #[pallet::storage_version(STORAGE_VERSION)]
  pub struct Pallet<T>(_);

  const STORAGE_VERSION: StorageVersion = StorageVersion::new(1);

  #[pallet::storage]
  #[pallet::getter(fn next_pool_id)]
  pub type NextPoolId<T> = StorageValue<_, PoolId, ValueQuery>;

  #[pallet::storage]
  #[pallet::getter(fn pools)]
  pub type Pools<T: Config> = StorageMap<_, Blake2_128Concat, PoolId, PoolInfoOf<T>, OptionQuery>;

  /// Per-direction aggregate of every order in a pool.
  #[pallet::storage]
  pub type OrderPools<T> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    PoolId,
    Twox64Concat,
    OrderDirection,
    OrderPool,
    ValueQuery,
  >;

  /// Sales-rate deltas and reward-factor snapshots keyed by boundary block.
  #[pallet::storage]
  pub type SalesRateBoundaries<T: Config> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    (PoolId, OrderDirection),
    Twox64Concat,
    BlockNumberFor<T>,
    SalesRateBoundary,
    OptionQuery,
  >;

  /// Uncrossed boundary blocks per pool, ascending.
  #[pallet::storage]
  pub type BoundaryQueue<T: Config> =
    StorageMap<_, Blake2_128Concat, PoolId, BoundaryQueueOf<T>, ValueQuery>;

  #[pallet::storage]
  #[pallet::getter(fn next_order_id)]
  pub type NextOrderId<T> = StorageValue<_, OrderId, ValueQuery>;

  #[pallet::storage]
  #[pallet::getter(fn orders)]
  pub type Orders<T: Config> = StorageMap<_, Blake2_128Concat, OrderId, OrderOf<T>, OptionQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    PoolRegistered {
      pool_id: PoolId,
      asset0: T::AssetId,
      asset1: T::AssetId,
    },
    PoolPauseSet {
      pool_id: PoolId,
      paused: bool,
    },
    /// Settlement advanced a pool's watermark.
    VirtualOrdersExecuted {
      pool_id: PoolId,
      from: BlockNumberFor<T>,
      to: BlockNumberFor<T>,
      segments: u32,
    },
    OrderPlaced {
      order_id: OrderId,
      pool_id: PoolId,
      owner: T::AccountId,
      direction: OrderDirection,
      amount: Balance,
      sales_rate: Balance,
      start: BlockNumberFor<T>,
      expiry: BlockNumberFor<T>,
    },
    OrderPaused {
      order_id: OrderId,
      deposit: Balance,
    },
    OrderResumed {
      order_id: OrderId,
    },
    OrderExtended {
      order_id: OrderId,
      extra_amount: Balance,
      added_intervals: u32,
      expiry: BlockNumberFor<T>,
    },
    OrderCancelled {
      order_id: OrderId,
      dest: T::AccountId,
      refund: Balance,
      proceeds: Balance,
    },
    ProceedsWithdrawn {
      order_id: OrderId,
      dest: T::AccountId,
      amount: Balance,
    },
    OrderDestroyed {
      order_id: OrderId,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// Caller is neither owner nor delegate, or a delegate tried to pay out to
    /// someone other than the owner.
    Unauthorized,
    OrderNotFound,
    PoolNotFound,
    /// Operation needs an unexpired order.
    OrderExpired,
    /// Order has not reached its start block yet.
    OrderNotStarted,
    AlreadyPaused,
    NotPaused,
    PoolPaused,
    /// Zero or non-divisible amount, or zero intervals.
    InvalidAmount,
    TooManyIntervals,
    /// The pool's boundary queue is full.
    TooManyBoundaries,
    ArithmeticOverflow,
    /// The pricing oracle rejected a segment or returned an unbalanced outcome.
    SettlementFailed,
    /// A crossed boundary lost its reward-factor snapshot.
    InconsistentBoundary,
    /// Both sides of a pool must be different assets.
    IdenticalAssets,
  }

  #[pallet::hooks]
  impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
    fn integrity_test() {
      assert!(
        !T::OrderBlockInterval::get().is_zero(),
        "OrderBlockInterval must be non-zero"
      );
      assert!(
        T::MaxOrderIntervals::get() > 0,
        "MaxOrderIntervals must be non-zero"
      );
      // Uncrossed boundaries sit on the interval marks in
      // (now, next_boundary(now) + MaxOrderIntervals * OBI].
      assert!(
        T::MaxScheduledBoundaries::get() > T::MaxOrderIntervals::get(),
        "MaxScheduledBoundaries must hold a boundary on every reachable interval mark"
      );
      assert!(
        T::RewardFactorPrecision::get() > 0,
        "RewardFactorPrecision must be non-zero"
      );
    }
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Escrows `amount` of the sell asset and sells it evenly over `intervals`
    /// block intervals starting at the next boundary.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::place_order().saturating_add(Pallet::<T>::settle_weight()))]
    pub fn place_order(
      origin: OriginFor<T>,
      pool_id: PoolId,
      direction: OrderDirection,
      amount: Balance,
      intervals: u32,
      delegate: Option<T::AccountId>,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::on_deposit(pool_id, direction, amount, intervals, who, delegate)?;
      Ok(())
    }

    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::pause_order().saturating_add(Pallet::<T>::settle_weight()))]
    pub fn pause_order(origin: OriginFor<T>, order_id: OrderId) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::on_pause(order_id, &who)
    }

    #[pallet::call_index(2)]
    #[pallet::weight(T::WeightInfo::resume_order().saturating_add(Pallet::<T>::settle_weight()))]
    pub fn resume_order(origin: OriginFor<T>, order_id: OrderId) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::on_resume(order_id, &who)
    }

    /// Adds `extra_amount` to the order and lengthens it by every whole interval
    /// the idle deposit plus `extra_amount` can pay for. The caller funds it.
    #[pallet::call_index(3)]
    #[pallet::weight(T::WeightInfo::extend_order().saturating_add(Pallet::<T>::settle_weight()))]
    pub fn extend_order(
      origin: OriginFor<T>,
      order_id: OrderId,
      extra_amount: Balance,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::on_extend(order_id, &who, extra_amount)
    }

    #[pallet::call_index(4)]
    #[pallet::weight(T::WeightInfo::cancel_order().saturating_add(Pallet::<T>::settle_weight()))]
    pub fn cancel_order(
      origin: OriginFor<T>,
      order_id: OrderId,
      dest: T::AccountId,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::on_cancel(order_id, &who, dest)?;
      Ok(())
    }

    #[pallet::call_index(5)]
    #[pallet::weight(T::WeightInfo::withdraw_proceeds().saturating_add(Pallet::<T>::settle_weight()))]
    pub fn withdraw_proceeds(
      origin: OriginFor<T>,
      order_id: OrderId,
      dest: T::AccountId,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::on_withdraw(order_id, &who, dest)?;
      Ok(())
    }

    /// Freezes or unfreezes virtual-order progress in a pool. Pausing settles up
    /// to the current block first when it can.
    #[pallet::call_index(6)]
    #[pallet::weight(T::WeightInfo::set_pool_paused().saturating_add(Pallet::<T>::settle_weight()))]
    pub fn set_pool_paused(origin: OriginFor<T>, pool_id: PoolId, paused: bool) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      if paused {
        // A pool whose oracle keeps failing still has to be pausable; it then
        // freezes at its last good watermark.
        if let Err(e) = Self::settle(pool_id, Self::now()) {
          log::warn!(target: LOG_TARGET, "pool {} paused without settling: {:?}", pool_id, e);
        }
      }
      Pools::<T>::try_mutate(pool_id, |maybe_pool| -> DispatchResult {
        let pool = maybe_pool.as_mut().ok_or(Error::<T>::PoolNotFound)?;
        pool.paused = paused;
        Ok(())
      })?;
      Self::deposit_event(Event::PoolPauseSet { pool_id, paused });
      Ok(())
    }

    /// Settles a pool up to the current block. Anyone may call it.
    #[pallet::call_index(7)]
    #[pallet::weight(T::WeightInfo::execute_virtual_orders(T::MaxScheduledBoundaries::get()))]
    pub fn execute_virtual_orders(origin: OriginFor<T>, pool_id: PoolId) -> DispatchResult {
      ensure_signed(origin)?;
      let pool = Pools::<T>::get(pool_id).ok_or(Error::<T>::PoolNotFound)?;
      ensure!(!pool.paused, Error::<T>::PoolPaused);
      Self::settle(pool_id, Self::now())?;
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    /// Vault account holding reserves, escrowed deposits and unclaimed proceeds.
    pub fn account_id() -> T::AccountId {
      T::PalletId::get().into_account_truncating()
    }

    pub(crate) fn now() -> BlockNumberFor<T> {
      frame_system::Pallet::<T>::block_number()
    }

    pub(crate) fn settle_weight() -> Weight {
      T::WeightInfo::execute_virtual_orders(T::MaxScheduledBoundaries::get())
    }

    /// Records a new pool. Custody of the initial reserves is the caller's
    /// responsibility; the vault must already hold them.
    pub fn register_pool(
      asset0: T::AssetId,
      asset1: T::AssetId,
      reserve0: Balance,
      reserve1: Balance,
    ) -> Result<PoolId, DispatchError> {
      ensure!(asset0 != asset1, Error::<T>::IdenticalAssets);
      let pool_id = NextPoolId::<T>::get();
      let next = pool_id.checked_add(1).ok_or(Error::<T>::ArithmeticOverflow)?;
      Pools::<T>::insert(
        pool_id,
        PoolInfo {
          asset0,
          asset1,
          reserve0,
          reserve1,
          last_virtual_order_block: Self::now(),
          paused: false,
        },
      );
      NextPoolId::<T>::put(next);
      Self::deposit_event(Event::PoolRegistered {
        pool_id,
        asset0,
        asset1,
      });
      Ok(pool_id)
    }

    pub fn get_order(order_id: OrderId) -> Result<OrderOf<T>, DispatchError> {
      Orders::<T>::get(order_id).ok_or_else(|| Error::<T>::OrderNotFound.into())
    }

    /// Active sales rate of one direction as of the pool's watermark.
    pub fn order_amounts(pool_id: PoolId, direction: OrderDirection) -> Balance {
      OrderPools::<T>::get(pool_id, direction).sales_rate
    }

    /// Proceeds credited to one direction and not yet withdrawn.
    pub fn proceed_amounts(pool_id: PoolId, direction: OrderDirection) -> Balance {
      OrderPools::<T>::get(pool_id, direction).unclaimed_proceeds
    }

    /// Everything ever credited to one direction, withdrawn or not.
    pub fn total_proceeds(pool_id: PoolId, direction: OrderDirection) -> Balance {
      OrderPools::<T>::get(pool_id, direction).total_proceeds
    }

    pub fn reserves(pool_id: PoolId) -> Option<(Balance, Balance)> {
      Pools::<T>::get(pool_id).map(|pool| (pool.reserve0, pool.reserve1))
    }

    pub fn last_virtual_order_block(pool_id: PoolId) -> Option<BlockNumberFor<T>> {
      Pools::<T>::get(pool_id).map(|pool| pool.last_virtual_order_block)
    }
  }

  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    /// `(asset0, asset1, reserve0, reserve1)` per pool, ids assigned in order.
    pub pools: Vec<(T::AssetId, T::AssetId, Balance, Balance)>,
    #[serde(skip)]
    pub _marker: core::marker::PhantomData<T>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      for (asset0, asset1, reserve0, reserve1) in self.pools.iter() {
        Pallet::<T>::register_pool(*asset0, *asset1, *reserve0, *reserve1)
          .expect("genesis pools must pair distinct assets");
      }
      frame_system::Pallet::<T>::inc_providers(&Pallet::<T>::account_id());
    }
  }
}
