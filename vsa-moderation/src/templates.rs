/// Format seconds for punishment notices (e.g. `1d 2h`, `45m`, `30s`).
///
/// Zero means the action has no end and reads as `permanent`. Seconds are only shown
/// when no larger unit is present.
pub fn human_duration(total_seconds: u64) -> String {
    if total_seconds == 0 {
        return "permanent".to_owned();
    }

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 && parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }

    if parts.is_empty() {
        "0s".to_owned()
    } else {
        parts.join(" ")
    }
}

/// Substitute `{KEY}` placeholders. Unknown placeholders stay as written.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let Some(close) = after_open.find('}') else {
            rendered.push_str(&rest[open..]);
            return rendered;
        };

        let key = &after_open[..close];
        match values.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => rendered.push_str(value),
            None => rendered.push_str(&rest[open..open + close + 2]),
        }
        rest = &after_open[close + 1..];
    }

    rendered.push_str(rest);
    rendered
}

#[cfg(test)]
mod tests {
    use super::{human_duration, render_template};

    #[test]
    fn human_duration_formatting() {
        assert_eq!(human_duration(0), "permanent");
        assert_eq!(human_duration(45), "45s");
        assert_eq!(human_duration(600), "10m");
        assert_eq!(human_duration(3_725), "1h 2m");
        assert_eq!(human_duration(90_061), "1d 1h 1m");
        assert_eq!(human_duration(86_400), "1d");
    }

    #[test]
    fn renders_known_placeholders_only() {
        let rendered = render_template(
            "{ACTION} for {DURATION} ({UNKNOWN}) {ACTION}",
            &[("ACTION", "TIMEOUT"), ("DURATION", "10m")],
        );
        assert_eq!(rendered, "TIMEOUT for 10m ({UNKNOWN}) TIMEOUT");
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let rendered = render_template(
            "Reason: {REASON} | {TARGET",
            &[("REASON", "said {TARGET}"), ("TARGET", "<@1>")],
        );
        assert_eq!(rendered, "Reason: said {TARGET} | {TARGET");
    }
}
