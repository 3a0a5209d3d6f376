//! Native-unit amount parsing
//!
//! One native unit is 10^9 smallest units. Amounts are parsed from decimal
//! text without going through floating point.

pub const UNITS_PER_COIN: u64 = 1_000_000_000;
const DECIMALS: usize = 9;

/// Parse a decimal amount of native units ("0.05", "12", "1.5") into
/// smallest units
pub fn to_nano(input: &str) -> Result<u64, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty amount".to_string());
    }
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(format!("invalid amount '{}'", input));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid amount '{}'", input));
    }
    if frac.len() > DECIMALS {
        return Err(format!("amount '{}' has more than {} decimals", input, DECIMALS));
    }

    let whole_units: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| format!("amount '{}' too large", input))?
    };
    let frac_units: u64 = if frac.is_empty() {
        0
    } else {
        format!("{:0<width$}", frac, width = DECIMALS)
            .parse()
            .map_err(|_| format!("invalid amount '{}'", input))?
    };

    whole_units
        .checked_mul(UNITS_PER_COIN)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(|| format!("amount '{}' too large", input))
}

/// Format smallest units as a decimal native amount (trailing zeros trimmed)
pub fn from_nano(amount: u64) -> String {
    let whole = amount / UNITS_PER_COIN;
    let frac = amount % UNITS_PER_COIN;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:09}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
