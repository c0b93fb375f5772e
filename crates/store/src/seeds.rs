//! Parsing of stringified random-seed lists stored as attributes.

use crate::error::{Result, StoreError};

/// Parse a seed list such as `"[33255, 727602]"`, `"[1 2 3]"` or `"42"`.
pub fn parse_seed_list(text: &str) -> Result<Vec<i64>> {
    let trimmed = text.trim();
    let inner = match (trimmed.strip_prefix('['), trimmed.strip_suffix(']')) {
        (Some(_), Some(_)) => &trimmed[1..trimmed.len() - 1],
        (None, None) => trimmed,
        _ => {
            return Err(StoreError::Validation(format!(
                "unbalanced brackets in seed list '{text}'"
            )))
        }
    };

    let seeds = inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse::<i64>().map_err(|_| {
                StoreError::Validation(format!("invalid seed '{token}' in '{text}'"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if seeds.is_empty() {
        return Err(StoreError::Validation(format!("empty seed list '{text}'")));
    }
    Ok(seeds)
}
