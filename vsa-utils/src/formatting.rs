/// Marker appended to text cut to fit a Discord length limit.
pub const TRUNCATION_MARKER: &str = "\n… (truncated)";

/// Convert internal action identifiers to user-facing names.
pub fn action_display_name(action: &str) -> String {
    match action {
        "warn" => "Warn".to_owned(),
        "timeout" => "Timeout".to_owned(),
        "tempban" => "Temp Ban".to_owned(),
        "ban" => "Ban".to_owned(),
        "unban" => "Unban".to_owned(),
        "auto_unban" => "Auto Unban".to_owned(),
        other => {
            let normalized = other.trim();
            if normalized.is_empty() {
                return "Unknown".to_owned();
            }

            normalized
                .split('_')
                .filter(|part| !part.is_empty())
                .map(|part| {
                    let mut chars = part.chars();
                    match chars.next() {
                        Some(first) => format!(
                            "{}{}",
                            first.to_uppercase(),
                            chars.as_str().to_ascii_lowercase()
                        ),
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

/// Points are shown with two decimals everywhere (`3.00`).
pub fn format_points(points: f64) -> String {
    format!("{points:.2}")
}

/// Break `@` so user-supplied text cannot ping anyone.
pub fn sanitize_mentions(text: &str) -> String {
    text.replace('@', "@\u{200B}")
}

/// Cut `text` to at most `max_chars` characters, marker included.
pub fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }

    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.chars().count());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
