//! Ether <-> wei conversion for item prices.

use anyhow::Result;
use ethers::types::U256;
use ethers::utils::format_ether;

use crate::types::MarketError;

/// Decimal places of one ether
const ETHER_DECIMALS: usize = 18;

/// Parse a user-entered ether amount ("0.25") into wei.
///
/// Accepts digits with at most one `.` and no more than 18 fractional
/// digits. Anything else, or an amount that does not fit in 256 bits of
/// wei, is an `InvalidPrice`.
pub fn parse_price(text: &str) -> Result<U256> {
    let invalid = || MarketError::InvalidPrice(text.to_string());
    let trimmed = text.trim();

    let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty())
        || !digits_only(whole)
        || !digits_only(frac)
        || frac.len() > ETHER_DECIMALS
    {
        return Err(invalid().into());
    }

    let whole = match whole {
        "" => U256::zero(),
        digits => U256::from_dec_str(digits).map_err(|_| invalid())?,
    };
    let frac = match frac {
        "" => U256::zero(),
        digits => {
            let padded = format!("{:0<width$}", digits, width = ETHER_DECIMALS);
            U256::from_dec_str(&padded).map_err(|_| invalid())?
        }
    };

    whole
        .checked_mul(U256::exp10(ETHER_DECIMALS))
        .and_then(|wei| wei.checked_add(frac))
        .ok_or_else(|| invalid().into())
}

/// Format wei as ether with trailing zeros trimmed, keeping one decimal
/// (1e18 -> "1.0", 1.5e18 -> "1.5")
pub fn format_price(wei: U256) -> String {
    let full = format_ether(wei);

    match full.split_once('.') {
        Some((whole, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                format!("{}.0", whole)
            } else {
                format!("{}.{}", whole, frac)
            }
        }
        None => format!("{}.0", full),
    }
}
