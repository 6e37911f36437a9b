use super::next_consensus_const;
use crate::blockchain::BlockHeader;
use crate::config::ChainConfig;
use crate::error::{ChainError, Result};

/// Validate `next` as the direct child of `prev`: consecutive number,
/// strictly growing `c_sum` equal to `prev.c_sum + next.delta`, constant
/// kept, doubled or halved, and signed at least `block_mine_delay` seconds
/// after the parent.
pub fn check_headers(next: &BlockHeader, prev: &BlockHeader, config: &ChainConfig) -> Result<()> {
    let number = next.block_number;
    if prev.block_number.checked_add(1) != Some(number) {
        return Err(ChainError::wrong_data(format!(
            "header {number} does not follow {}",
            prev.block_number
        )));
    }
    if next.c_sum <= prev.c_sum || prev.c_sum.checked_add(next.delta) != Some(next.c_sum) {
        return Err(ChainError::wrong_data(format!(
            "header {number}: c_sum {} != {} + {}",
            next.c_sum, prev.c_sum, next.delta
        )));
    }
    let c = prev.c_const;
    let const_ok = next.c_const == c
        || Some(next.c_const) == c.checked_mul(2)
        || (c > 1 && next.c_const == c / 2);
    if !const_ok {
        return Err(ChainError::wrong_data(format!(
            "header {number}: c_const {} after {c}",
            next.c_const
        )));
    }
    if next.time_signed < prev.time_signed.saturating_add(config.block_mine_delay) {
        return Err(ChainError::wrong_data(format!(
            "header {number}: signed at {} after parent at {}, minimum delay {}s",
            next.time_signed, prev.time_signed, config.block_mine_delay
        )));
    }
    Ok(())
}

/// Pairwise [`check_headers`] over headers given oldest first.
pub fn check_header_sequence(headers: &[BlockHeader], config: &ChainConfig) -> Result<()> {
    headers
        .windows(2)
        .try_for_each(|pair| check_headers(&pair[1], &pair[0], config))
}

/// Recompute the constant of every candidate header from its predecessors
/// and require it to match.
///
/// `base` are local headers up to and including the last common block,
/// oldest first; `candidates` continue from it, oldest first.
pub fn check_const_history(
    base: &[BlockHeader],
    candidates: &[BlockHeader],
    config: &ChainConfig,
) -> Result<()> {
    let combined: Vec<&BlockHeader> = base.iter().chain(candidates).collect();
    for index in base.len().max(1)..combined.len() {
        let header = combined[index];
        let expected =
            next_consensus_const(header.delta, combined[..index].iter().rev().copied(), config);
        if header.c_const != expected {
            return Err(ChainError::wrong_data(format!(
                "header {}: c_const {} but history gives {expected}",
                header.block_number, header.c_const
            )));
        }
    }
    Ok(())
}
