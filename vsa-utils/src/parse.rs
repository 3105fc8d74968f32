/// Parse a duration like `30s`, `10m`, `2h`, `1d`, `1w`, `1h30m`, or plain seconds (`600`).
///
/// Units may be chained but a bare number is only accepted on its own. Zero is rejected.
pub fn parse_duration_seconds(raw: &str) -> Option<u64> {
    let compact: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    if compact.bytes().all(|byte| byte.is_ascii_digit()) {
        return compact.parse::<u64>().ok().filter(|seconds| *seconds > 0);
    }

    let mut total_seconds = 0_u64;
    let mut digits = String::new();

    for ch in compact.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }

        let multiplier = match ch.to_ascii_lowercase() {
            's' => 1_u64,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 60 * 60 * 24,
            'w' => 60 * 60 * 24 * 7,
            _ => return None,
        };

        let number = digits.parse::<u64>().ok()?;
        digits.clear();
        total_seconds = total_seconds.checked_add(number.checked_mul(multiplier)?)?;
    }

    // Trailing digits without a unit, e.g. `1h30`.
    if !digits.is_empty() {
        return None;
    }

    (total_seconds > 0).then_some(total_seconds)
}

/// Accept `<@123>`, `<@!123>`, or a bare snowflake.
pub fn parse_user_id(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
        .map(|rest| rest.trim_start_matches('!'))
        .unwrap_or(trimmed);

    inner.parse::<u64>().ok().filter(|id| *id > 0)
}
