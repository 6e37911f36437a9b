pub mod block;
pub mod model;

pub use block::{Block, BlockHeader, Reward, RewardType, SignedBlock};
pub use model::Blockchain;

/// Balance amounts in indivisible units.
pub type Coin = u64;

/// Minimum seconds between a block and its parent.
pub const BLOCK_MINE_DELAY: i64 = 60;

/// Consensus delta window and thresholds.
pub const DELTA_STEP: u64 = 10;
pub const DELTA_MAX: u64 = 120_000_000;
pub const DELTA_UP: u64 = 100_000_000;
pub const DELTA_DOWN: u64 = 80_000_000;

/// Upper bound of the hash distance between a signer and a block hash.
pub const DIST_MAX: u64 = 4_294_967_296;

/// Headers and blocks per sync request (corners included).
pub const HEADER_TR_LENGTH: u64 = 49;
pub const BLOCK_TR_LENGTH: u64 = 9;

/// Maximum blocks buffered before a sync span is applied.
pub const BLOCK_INSERT_LENGTH: usize = 50;

pub const BLOCK_MAX_TRANSACTIONS: usize = 1000;

/// Transaction maximum lifetime in seconds.
pub const TRANSACTION_LIFETIME: i64 = 86_400;

/// Maximum clock shift tolerated between nodes, in seconds.
pub const NODES_TIME_SHIFT: i64 = 60;

pub const MINE_AMOUNT_THRESHOLD: Coin = 1;
pub const MINER_REWARD: Coin = 1;

/// Sync step and whole-session timeouts, in seconds.
pub const SYNC_STEP_TIMEOUT: i64 = 30;
pub const SYNC_SESSION_TIMEOUT: i64 = 300;

/// Ticks an outstanding request may stay unanswered.
pub const PACKET_EXPIRY_STEPS: u32 = 10;

/// Flood limit for locally originated broadcasts.
pub const BROADCAST_ECHOES: u32 = 2;
