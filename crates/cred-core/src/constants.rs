//! Protocol constants. All grain amounts in attograin (1 GRAIN = 10^18 attograin).

/// Decimal places carried by [`Grain`](crate::grain::Grain).
pub const GRAIN_DECIMALS: u32 = 18;

/// One whole grain, in attograin.
pub const ONE_GRAIN: u128 = 1_000_000_000_000_000_000;

pub const MS_PER_DAY: i64 = 86_400_000;
pub const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;

/// Upper bound on the number of intervals `Intervals::weekly` will build
/// (about 20,000 years of weeks).
pub const MAX_WEEKLY_INTERVALS: i64 = 1 << 20;

/// Teleportation mass sent from every node to the seed nodes.
pub const DEFAULT_ALPHA: f64 = 0.1;
/// Retention mass forwarded along a participant's epoch chain.
pub const DEFAULT_BETA: f64 = 0.4;
pub const DEFAULT_GAMMA_FORWARD: f64 = 0.1;
pub const DEFAULT_GAMMA_BACKWARD: f64 = 0.1;

/// L1 convergence threshold for power iteration.
pub const DEFAULT_EPSILON: f64 = 1e-7;
pub const DEFAULT_MAX_ITERATIONS: usize = 255;

/// Maximum deviation from 1.0 tolerated when re-summing a transition row.
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// Resolution used when quantizing real-valued weights into integer shares.
///
/// 2^53 is the largest power of two below which every integer is exactly
/// representable as an `f64`, so quantization never rounds the largest weight.
pub const SHARE_PRECISION: u128 = 1 << 53;

/// Default number of trailing intervals the IMMEDIATE policy looks at.
pub const DEFAULT_IMMEDIATE_LOOKBACK: usize = 1;
/// Default per-week discount applied by the RECENT policy.
pub const DEFAULT_RECENT_WEEKLY_DECAY: f64 = 0.5;

/// Address prefix reserved for synthetic Markov nodes.
pub const CORE_ADDRESS_PREFIX: [&str; 2] = ["cred", "core"];
pub const SEED_ADDRESS_PART: &str = "SEED";
pub const EPOCH_ADDRESS_PART: &str = "EPOCH";
