//! # Sequential Seal Numbers
//!
//! Bulk generation produces `count` sequential barcode numbers from a
//! base such as `SN-1001` or `F0070012`. The numeric suffix is
//! incremented; zero padding is preserved (`SN-0099` → `SN-0100`). The
//! caller is responsible for the atomic duplicate check against
//! storage — this module only derives the candidate set.

use thiserror::Error;

/// Upper bound for a single generation batch. Matches the request
/// validation limit in the API layer.
pub const MAX_BATCH: u32 = 10_000;

/// Rejection of a bulk-generation request before any number is derived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberingError {
    /// The batch count was zero.
    #[error("batch count must be greater than zero")]
    EmptyBatch,

    /// The batch count exceeded [`MAX_BATCH`].
    #[error("batch count {count} exceeds the maximum of {MAX_BATCH}")]
    BatchTooLarge { count: u32 },

    /// The base number has no trailing digits to increment.
    #[error("base number {base:?} has no numeric suffix")]
    NoNumericSuffix { base: String },

    /// The numeric suffix cannot be represented (or the batch would
    /// overflow it).
    #[error("numeric suffix of {base:?} overflows when extended by {count} numbers")]
    SuffixOverflow { base: String, count: u32 },
}

/// Derive `count` sequential seal numbers starting at `base`.
///
/// The first number in the result is `base` itself. Width of the
/// numeric suffix is kept (left-padded with zeros) and widens
/// naturally once the sequence outgrows it: `A-998`, `A-999`, `A-1000`.
pub fn sequential_numbers(base: &str, count: u32) -> Result<Vec<String>, NumberingError> {
    if count == 0 {
        return Err(NumberingError::EmptyBatch);
    }
    if count > MAX_BATCH {
        return Err(NumberingError::BatchTooLarge { count });
    }

    let base = base.trim();
    let digits_start = base
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    let (prefix, suffix) = base.split_at(digits_start);
    if suffix.is_empty() {
        return Err(NumberingError::NoNumericSuffix {
            base: base.to_string(),
        });
    }

    let width = suffix.len();
    let start: u64 = suffix
        .parse()
        .map_err(|_| NumberingError::SuffixOverflow {
            base: base.to_string(),
            count,
        })?;
    let end = start
        .checked_add(u64::from(count) - 1)
        .ok_or_else(|| NumberingError::SuffixOverflow {
            base: base.to_string(),
            count,
        })?;

    Ok((start..=end)
        .map(|n| format!("{prefix}{n:0width$}"))
        .collect())
}
