use poise::serenity_prelude as serenity;

use crate::formatting::truncate_with_marker;

/// Discord rejects embed field values longer than this.
pub const FIELD_VALUE_LIMIT: usize = 1024;
/// Plain message content is kept below Discord's 2000 character cap.
pub const MESSAGE_CONTENT_LIMIT: usize = 1900;

/// Embed with the standard title/description layout.
pub fn build_embed(title: &str, description: impl Into<String>, color: u32) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title.to_owned())
        .color(color)
        .description(description)
}

/// Field value cut to fit, with a dash for empty input.
pub fn field_value(text: &str) -> String {
    if text.trim().is_empty() {
        return "—".to_owned();
    }
    truncate_with_marker(text, FIELD_VALUE_LIMIT)
}

/// Bulleted `• **label**: count` lines.
pub fn count_lines<L: AsRef<str>>(rows: &[(L, usize)]) -> String {
    rows.iter()
        .map(|(label, count)| format!("• **{}**: {}", label.as_ref(), count))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{FIELD_VALUE_LIMIT, count_lines, field_value};

    #[test]
    fn field_values_fit() {
        assert_eq!(field_value("  "), "—");
        assert_eq!(field_value("ok"), "ok");
        assert_eq!(
            field_value(&"a".repeat(FIELD_VALUE_LIMIT * 2)).chars().count(),
            FIELD_VALUE_LIMIT
        );
    }

    #[test]
    fn count_lines_are_bulleted() {
        let rows = vec![("WARN", 3), ("BAN", 1)];
        assert_eq!(count_lines(&rows), "• **WARN**: 3\n• **BAN**: 1");
    }
}
