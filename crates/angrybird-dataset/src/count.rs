//! Rendered engagement counts ("12.3K", "1,204", "4M") to integers.

/// Parse an abbreviated count. Anything unreadable is 0.
pub fn parse_count(text: &str) -> u64 {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return 0;
    }

    let (number, multiplier) = match cleaned.chars().last() {
        Some('k') | Some('K') => (&cleaned[..cleaned.len() - 1], 1_000.0),
        Some('m') | Some('M') => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        Some('b') | Some('B') => (&cleaned[..cleaned.len() - 1], 1_000_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };

    match number.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => (n * multiplier).round() as u64,
        _ => 0,
    }
}

/// Non-negative integer from a float cell; fractional values round.
pub fn count_from_f64(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}
