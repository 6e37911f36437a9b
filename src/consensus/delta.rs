use crate::blockchain::{BlockHeader, Coin, DIST_MAX};
use crate::config::ChainConfig;
use crate::wallet::sha256;

fn prefix_u32(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 4];
    for (dst, src) in buf.iter_mut().zip(bytes) {
        *dst = *src;
    }
    u32::from_be_bytes(buf) as u64
}

/// Pseudo-random distance in `[1, DIST_MAX]` between a signer and the
/// block it extends.
pub fn distance(address: &str, prev_hash: &str) -> u64 {
    let key = prefix_u32(&sha256(address.as_bytes()));
    // a prev_hash that is not hex falls back to hashing its text
    let block = match hex::decode(prev_hash) {
        Ok(bytes) => prefix_u32(&bytes),
        Err(_) => prefix_u32(&sha256(prev_hash.as_bytes())),
    };
    (key ^ block) + 1
}

/// Mining weight of `address` holding `balance` when extending the block
/// hashed `prev_hash` under `c_const`. Non-decreasing in `balance`,
/// clamped at `delta_max`.
pub fn calc_delta(
    address: &str,
    balance: Coin,
    prev_hash: &str,
    c_const: u64,
    config: &ChainConfig,
) -> u64 {
    let dist = distance(address, prev_hash) as u128;
    let divisor = dist * c_const.max(1) as u128;
    let delta = balance as u128 * DIST_MAX as u128 / divisor;
    delta.min(config.delta_max as u128) as u64
}

/// Constant for a candidate block with weight `delta`.
///
/// `ancestors` walks back from the parent, newest first. The parent's
/// constant doubles when the candidate and `delta_step` consecutive
/// non-genesis ancestors carrying that same constant were all above
/// `delta_up`; it halves (never below 1) when they were all below
/// `delta_down`.
pub fn next_consensus_const<'a>(
    delta: u64,
    mut ancestors: impl Iterator<Item = &'a BlockHeader>,
    config: &ChainConfig,
) -> u64 {
    let Some(parent) = ancestors.next() else {
        return 1;
    };
    let base = parent.c_const;
    let rising = delta > config.delta_up;
    let falling = delta < config.delta_down && base > 1;
    if !rising && !falling {
        return base;
    }

    let window = std::iter::once(parent)
        .chain(ancestors)
        .take(config.delta_step as usize);
    let mut run = 0u64;
    for header in window {
        let in_band = if rising {
            header.delta > config.delta_up
        } else {
            header.delta < config.delta_down
        };
        if header.block_number == 0 || header.c_const != base || !in_band {
            break;
        }
        run += 1;
    }

    if run < config.delta_step.max(1) {
        base
    } else if rising {
        base.saturating_mul(2)
    } else {
        base / 2
    }
}
