//! Prefix/command matcher (spec.md §4.2).

use regex::Regex;

use crate::event::{Event, EventKind};
use crate::registry::PrefixPolicy;

/// Reduces `event.content` to a command token according to `policy`,
/// mutating `event.aux` on success. Returns whether the prefix/command
/// matched at all.
pub fn apply_prefix(event: &mut Event, policy: &PrefixPolicy, own_nickname: &str, global_prefix: &str) -> bool {
    match policy {
        PrefixPolicy::Direct => true,
        PrefixPolicy::Prefixed { fallback_to_nickname } => {
            if !global_prefix.is_empty() && event.content.starts_with(global_prefix) {
                event.content = event.content[global_prefix.len()..].to_string();
                true
            } else if *fallback_to_nickname || global_prefix.is_empty() {
                strip_nickname_prefix(event, own_nickname)
            } else {
                false
            }
        }
        PrefixPolicy::Nickname => strip_nickname_prefix(event, own_nickname),
    }
}

fn strip_nickname_prefix(event: &mut Event, own_nickname: &str) -> bool {
    if event.kind == EventKind::Query {
        // Nickname prefix is not required for direct messages (spec.md §4.2).
        return true;
    }

    let content = event.content.strip_prefix('@').unwrap_or(&event.content);
    if let Some(rest) = content.strip_prefix(own_nickname) {
        let mut chars = rest.chars();
        match chars.next() {
            Some(':') | Some(',') => {
                event.content = chars.as_str().trim_start().to_string();
                true
            }
            Some(c) if c.is_whitespace() => {
                event.content = chars.as_str().trim_start().to_string();
                true
            }
            _ => false,
        }
    } else {
        false
    }
}

/// Case-insensitively compares the first whitespace-delimited token of
/// `content` against each command word; sets `event.aux` to the matched
/// token (original casing preserved) on success.
pub fn match_command_words(event: &mut Event, words: &[String]) -> bool {
    let first_token = event.content.split_whitespace().next().unwrap_or("");
    for word in words {
        if first_token.eq_ignore_ascii_case(word) {
            event.aux = Some(first_token.to_string());
            return true;
        }
    }
    false
}

/// Matches `event.content` (untokenised) against a regex, setting
/// `event.aux` to the first capture group or, absent one, the full match.
/// On regex execution failure (e.g. a catastrophic expression), the
/// handler is simply skipped (spec.md §4.1(c) "on exceptions, skip that
/// expression").
pub fn match_regex(event: &mut Event, regex: &Regex) -> bool {
    let Some(captures) = regex.captures(&event.content) else {
        return false;
    };
    let matched = captures
        .get(1)
        .or_else(|| captures.get(0))
        .map(|m| m.as_str().to_string());
    event.aux = matched;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_words_match_case_insensitively() {
        let words = vec!["help".to_string()];
        for variant in ["help", "HELP", "HeLp"] {
            let mut event = Event::new(EventKind::Chan, variant);
            assert!(match_command_words(&mut event, &words));
            assert_eq!(event.aux.as_deref(), Some(variant));
        }
    }

    #[test]
    fn direct_policy_accepts_empty_content() {
        let mut event = Event::new(EventKind::Chan, "");
        assert!(apply_prefix(&mut event, &PrefixPolicy::Direct, "bot", "!"));
    }

    #[test]
    fn prefixed_with_empty_global_prefix_falls_through_to_nickname() {
        let mut event = Event::new(EventKind::Chan, "bot: hello");
        let matched = apply_prefix(&mut event, &PrefixPolicy::Prefixed { fallback_to_nickname: false }, "bot", "");
        assert!(matched);
        assert_eq!(event.content, "hello");
    }

    #[test]
    fn nickname_policy_not_required_for_query_events() {
        let mut event = Event::new(EventKind::Query, "just text");
        assert!(apply_prefix(&mut event, &PrefixPolicy::Nickname, "bot", "!"));
        assert_eq!(event.content, "just text");
    }

    #[test]
    fn regex_sets_aux_to_first_capture_group() {
        let regex = Regex::new(r"add (\w+)").unwrap();
        let mut event = Event::new(EventKind::Chan, "whitelist add alice");
        assert!(match_regex(&mut event, &regex));
        assert_eq!(event.aux.as_deref(), Some("alice"));
    }
}
