//! Pure consensus rules: mining weight, constant steps, header linkage and
//! the mandatory reward set.

pub mod delta;
pub mod headers;
pub mod rewards;

pub use delta::{calc_delta, distance, next_consensus_const};
pub use headers::{check_const_history, check_header_sequence, check_headers};
pub use rewards::{check_rewards, grant_rewards};
