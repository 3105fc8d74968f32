//! Prohibited-phrase matching for the chat filter.
//!
//! Phrases are compiled into case-insensitive patterns that tolerate simple leet
//! substitutions and up to two separator characters between letters, so `f.u.c.k y0u`
//! still matches `fuck you`. Content is NFKD-folded with combining marks and zero-width
//! characters dropped before matching, so `fúck yóu` matches too. Matches must sit on ASCII
//! alphanumeric boundaries.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use tokio::time::Instant;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::config::FilteredChatConfig;

/// Longer messages are not scanned.
pub const MAX_CHECK_LEN: usize = 4096;
pub const MAX_PHRASES: usize = 200;
pub const MAX_PHRASE_LEN: usize = 64;
pub const DEFAULT_PHRASES: &[&str] = &["fuck you"];

pub const CHANNEL_WARNING_COOLDOWN: Duration = Duration::from_secs(15);
pub const DM_NOTICE_COOLDOWN: Duration = Duration::from_secs(30);

/// Reason code the filter punishes with.
pub const FILTER_REASON_CODE: &str = "harassment";

const SEPARATOR: &str = "[^a-zA-Z0-9]{0,2}";
const ZERO_WIDTH: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}', '\u{2060}'];
const SNIPPET_CONTEXT_WORDS: usize = 5;
const MASK: &str = "[BLACKLISTED WORD]";

/// Split a comma, semicolon or newline separated phrase list.
///
/// Blank entries are dropped, each phrase is cut to [`MAX_PHRASE_LEN`] characters and at
/// most [`MAX_PHRASES`] are kept.
pub fn parse_phrase_list(raw: &str) -> Vec<String> {
    raw.split([',', ';', '\n'])
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .map(|phrase| phrase.chars().take(MAX_PHRASE_LEN).collect::<String>())
        .take(MAX_PHRASES)
        .collect()
}

fn leet_class(ch: char) -> String {
    match ch.to_ascii_lowercase() {
        'a' => "[a@4]".to_owned(),
        'e' => "[e3]".to_owned(),
        'i' => "[i1!]".to_owned(),
        'o' => "[o0]".to_owned(),
        's' => "[s$5]".to_owned(),
        't' => "[t7]".to_owned(),
        'b' => "[b8]".to_owned(),
        'g' => "[g9]".to_owned(),
        _ => regex::escape(ch.encode_utf8(&mut [0; 4])),
    }
}

fn phrase_pattern(phrase: &str) -> Option<String> {
    let folded: String = phrase.chars().flat_map(fold_char).collect();
    let cleaned = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return None;
    }

    let parts: Vec<String> = cleaned
        .chars()
        .map(|ch| {
            if ch == ' ' {
                SEPARATOR.to_owned()
            } else {
                leet_class(ch)
            }
        })
        .collect();

    Some(parts.join(SEPARATOR))
}

fn is_boundary(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .is_none_or(|ch| !ch.is_ascii_alphanumeric());
    let after_ok = text[end..]
        .chars()
        .next()
        .is_none_or(|ch| !ch.is_ascii_alphanumeric());
    before_ok && after_ok
}

/// Compatibility decomposition of `ch` without combining marks or zero-width characters.
fn fold_char(ch: char) -> impl Iterator<Item = char> {
    std::iter::once(ch)
        .nfkd()
        .filter(|folded| !is_combining_mark(*folded) && !ZERO_WIDTH.contains(folded))
}

/// Folded content, plus the byte range in `content` of the character every folded byte came
/// from.
fn fold_content(content: &str) -> (String, Vec<(usize, usize)>) {
    let mut folded = String::with_capacity(content.len());
    let mut sources = Vec::with_capacity(content.len());

    for (index, ch) in content.char_indices() {
        let source = (index, index + ch.len_utf8());
        for out in fold_char(ch) {
            sources.extend(std::iter::repeat_n(source, out.len_utf8()));
            folded.push(out);
        }
    }

    (folded, sources)
}

#[derive(Debug)]
struct CompiledPhrase {
    phrase: String,
    regex: Regex,
}

#[derive(Debug, Default)]
pub struct PhraseMatcher {
    phrases: Vec<CompiledPhrase>,
}

impl PhraseMatcher {
    pub fn new(phrases: &[String]) -> Result<Self, regex::Error> {
        let mut compiled = Vec::with_capacity(phrases.len());
        for phrase in phrases {
            let Some(pattern) = phrase_pattern(phrase) else {
                continue;
            };
            let regex = RegexBuilder::new(&pattern).case_insensitive(true).build()?;
            compiled.push(CompiledPhrase {
                phrase: phrase.clone(),
                regex,
            });
        }

        Ok(Self { phrases: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    /// First prohibited phrase in `content`, as a byte range of `content`.
    pub fn find(&self, content: &str) -> Option<(String, usize, usize)> {
        let (folded, sources) = fold_content(content);

        self.phrases.iter().find_map(|compiled| {
            compiled
                .regex
                .find_iter(&folded)
                .find(|found| {
                    !found.is_empty() && is_boundary(&folded, found.start(), found.end())
                })
                .map(|found| {
                    let (start, _) = sources[found.start()];
                    let (_, end) = sources[found.end() - 1];
                    // Trailing marks of a decomposed last letter belong to the match.
                    let end = end
                        + content[end..]
                            .chars()
                            .take_while(|ch| is_combining_mark(*ch))
                            .map(char::len_utf8)
                            .sum::<usize>();
                    (compiled.phrase.clone(), start, end)
                })
        })
    }
}

/// Context around a match with the match itself masked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub text: String,
    pub hidden_before: usize,
    pub hidden_after: usize,
}

impl Snippet {
    pub fn new(content: &str, start: usize, end: usize) -> Self {
        let before = &content[..start];
        let after = &content[end..];

        let left: Vec<&str> = before.split_whitespace().collect();
        let left = &left[left.len().saturating_sub(SNIPPET_CONTEXT_WORDS)..];
        let right: Vec<&str> = after
            .split_whitespace()
            .take(SNIPPET_CONTEXT_WORDS)
            .collect();

        let hidden_before = before.chars().count();
        let hidden_after = after.chars().count();

        let mut parts = Vec::new();
        if hidden_before > 0 {
            parts.push("…".to_owned());
        }
        if !left.is_empty() {
            parts.push(left.join(" "));
        }
        parts.push(MASK.to_owned());
        if !right.is_empty() {
            parts.push(right.join(" "));
        }
        if hidden_after > 0 {
            parts.push("…".to_owned());
        }

        Self {
            text: parts.join(" "),
            hidden_before,
            hidden_after,
        }
    }

    fn quoted(&self) -> String {
        format!(
            "> ({} chars)… {} …(+{} chars)",
            self.hidden_before, self.text, self.hidden_after
        )
    }
}

pub fn channel_warning(user_mention: &str, snippet: &Snippet) -> String {
    format!(
        "{user_mention} **Prohibited language detected.** Your message was removed.\n{}\n\
         If you believe this is a mistake, please contact staff.",
        snippet.quoted()
    )
}

pub fn dm_notice(display_name: &str, channel_id: u64, snippet: &Snippet) -> String {
    format!(
        "Hi {display_name}, your message in <#{channel_id}> was removed for prohibited language.\n{}\n\
         If this was an error, please contact the moderators.",
        snippet.quoted()
    )
}

/// Per-user rate limit.
#[derive(Debug)]
pub struct Cooldown {
    period: Duration,
    last: Mutex<HashMap<u64, Instant>>,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last: Mutex::new(HashMap::new()),
        }
    }

    /// `true` if `user_id` is outside its cooldown; the cooldown restarts.
    pub fn try_claim(&self, user_id: u64) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

        if last
            .get(&user_id)
            .is_some_and(|at| now.duration_since(*at) < self.period)
        {
            return false;
        }

        last.retain(|_, at| now.duration_since(*at) < self.period);
        last.insert(user_id, now);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterHit {
    pub phrase: String,
    pub snippet: Snippet,
}

#[derive(Debug)]
pub struct ChatFilter {
    enabled: bool,
    punishments_mode: bool,
    omit_channel_ids: HashSet<u64>,
    matcher: PhraseMatcher,
    pub channel_warnings: Cooldown,
    pub dm_notices: Cooldown,
}

impl ChatFilter {
    /// Falls back to [`DEFAULT_PHRASES`] when enabled without any phrases.
    pub fn new(config: &FilteredChatConfig, phrases: &[String]) -> Result<Self, regex::Error> {
        let matcher = if config.enable_feature && phrases.is_empty() {
            let defaults: Vec<String> = DEFAULT_PHRASES.iter().map(|p| (*p).to_owned()).collect();
            PhraseMatcher::new(&defaults)?
        } else {
            PhraseMatcher::new(phrases)?
        };

        Ok(Self {
            enabled: config.enable_feature,
            punishments_mode: config.punishments_mode,
            omit_channel_ids: config.omit_channels_id.iter().copied().collect(),
            matcher,
            channel_warnings: Cooldown::new(CHANNEL_WARNING_COOLDOWN),
            dm_notices: Cooldown::new(DM_NOTICE_COOLDOWN),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn punishments_mode(&self) -> bool {
        self.punishments_mode
    }

    pub fn phrase_count(&self) -> usize {
        self.matcher.len()
    }

    /// Scan a guild message. `None` when the filter is off, the channel is omitted, the
    /// content is empty or too long, or nothing matches.
    pub fn check(&self, channel_id: u64, content: &str) -> Option<FilterHit> {
        if !self.enabled
            || self.matcher.is_empty()
            || self.omit_channel_ids.contains(&channel_id)
            || content.is_empty()
            || content.chars().count() > MAX_CHECK_LEN
        {
            return None;
        }

        let (phrase, start, end) = self.matcher.find(content)?;
        Some(FilterHit {
            phrase,
            snippet: Snippet::new(content, start, end),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn matcher(phrases: &[&str]) -> PhraseMatcher {
        let phrases: Vec<String> = phrases.iter().map(|p| (*p).to_owned()).collect();
        PhraseMatcher::new(&phrases).unwrap()
    }

    fn enabled_config() -> FilteredChatConfig {
        FilteredChatConfig {
            enable_feature: true,
            omit_channels_id: vec![99],
            punishments_mode: true,
        }
    }

    #[test]
    fn phrase_list_is_split_and_capped() {
        let phrases = parse_phrase_list(" foo , bar;;baz\n\n");
        assert_eq!(phrases, vec!["foo", "bar", "baz"]);

        let long = "x".repeat(100);
        assert_eq!(parse_phrase_list(&long)[0].chars().count(), MAX_PHRASE_LEN);

        let many = vec!["w"; 300].join(",");
        assert_eq!(parse_phrase_list(&many).len(), MAX_PHRASES);
    }

    #[test]
    fn matches_obfuscated_phrases() {
        let matcher = matcher(&["fuck you"]);
        assert!(matcher.find("well FUCK YOU then").is_some());
        assert!(matcher.find("f.u.c.k y0u").is_some());
        assert!(matcher.find("f__uck   you").is_some());
        assert!(matcher.find("f___uck you").is_none());
        assert!(matcher.find("fu\u{200B}ck you").is_some());
    }

    #[test]
    fn leet_substitutions_match() {
        let matcher = matcher(&["bastion"]);
        assert!(matcher.find("8@5710n").is_some());
        assert!(matcher.find("b4sti0n!").is_some());
    }

    #[test]
    fn respects_word_boundaries() {
        let matcher = matcher(&["ass"]);
        assert!(matcher.find("you ass").is_some());
        assert!(matcher.find("class pass").is_none());
        assert!(matcher.find("assets").is_none());
        assert!(matcher.find("(ass)").is_some());
    }

    #[test]
    fn accented_letters_fold_to_plain_phrase() {
        let matcher = matcher(&["fuck you"]);
        assert!(matcher.find("fuck you").is_some());

        let precomposed = "well fúck yóu then";
        let (_, start, end) = matcher.find(precomposed).unwrap();
        assert_eq!(&precomposed[start..end], "fúck yóu");

        let decomposed = "fu\u{301}ck yo\u{301}u\u{301}!";
        let (_, start, end) = matcher.find(decomposed).unwrap();
        assert_eq!(&decomposed[start..end], "fu\u{301}ck yo\u{301}u\u{301}");

        // Fullwidth forms decompose to ASCII.
        assert!(matcher.find("ｆｕｃｋ ｙｏｕ").is_some());
        assert!(matcher.find("fúcky").is_none());
    }

    #[test]
    fn accented_phrases_match_plain_content() {
        let matcher = matcher(&["crétin"]);
        assert!(matcher.find("what a cretin").is_some());
        assert!(matcher.find("what a CRÉTIN").is_some());
    }

    #[test]
    fn match_span_maps_back_to_original() {
        let matcher = matcher(&["bad"]);
        let content = "a\u{200B}b bad\u{200B} end";
        let (phrase, start, end) = matcher.find(content).unwrap();
        assert_eq!(phrase, "bad");
        assert_eq!(&content[start..end], "bad");
    }

    #[test]
    fn snippet_masks_match_with_context() {
        let content = "one two three four five six seven BAD eight nine";
        let start = content.find("BAD").unwrap();
        let snippet = Snippet::new(content, start, start + 3);

        assert_eq!(
            snippet.text,
            "… three four five six seven [BLACKLISTED WORD] eight nine …"
        );
        assert_eq!(snippet.hidden_before, start);
        assert_eq!(snippet.hidden_after, " eight nine".len());

        let whole = Snippet::new("bad", 0, 3);
        assert_eq!(whole.text, MASK);
        assert_eq!((whole.hidden_before, whole.hidden_after), (0, 0));
    }

    #[test]
    fn filter_guards() {
        let filter = ChatFilter::new(&enabled_config(), &[]).unwrap();
        assert_eq!(filter.phrase_count(), DEFAULT_PHRASES.len());
        assert!(filter.check(1, "fuck you").is_some());
        assert!(filter.check(99, "fuck you").is_none());
        assert!(filter.check(1, "").is_none());

        let oversized = format!("fuck you {}", "a".repeat(MAX_CHECK_LEN));
        assert!(filter.check(1, &oversized).is_none());

        let disabled = ChatFilter::new(&FilteredChatConfig::default(), &[]).unwrap();
        assert_eq!(disabled.phrase_count(), 0);
        assert!(disabled.check(1, "fuck you").is_none());
    }

    #[test]
    fn messages_quote_snippet() {
        let snippet = Snippet::new("hey bad", 4, 7);
        let warning = channel_warning("<@1>", &snippet);
        assert!(warning.starts_with("<@1> **Prohibited language detected.**"));
        assert!(warning.contains("> (4 chars)… … hey [BLACKLISTED WORD] …(+0 chars)"));

        let notice = dm_notice("Sam", 5, &snippet);
        assert!(notice.contains("<#5>"));
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_blocks_repeat_claims() {
        let cooldown = Cooldown::new(Duration::from_secs(15));
        assert!(cooldown.try_claim(1));
        assert!(!cooldown.try_claim(1));
        assert!(cooldown.try_claim(2));

        tokio::time::advance(Duration::from_secs(15)).await;
        assert!(cooldown.try_claim(1));
    }
}
