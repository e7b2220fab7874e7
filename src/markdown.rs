//! Plain-text rendering of assistant replies for surfaces that cannot show markdown.

use std::sync::LazyLock;

use regex::Regex;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

fn rule(pattern: &str, replacement: &'static str) -> Rule {
    Rule {
        pattern: Regex::new(pattern).expect("static markdown pattern"),
        replacement,
    }
}

static INLINE_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(r"\*\*([^*\n]+)\*\*", "$1"),
        rule(r"__([^_\n]+)__", "$1"),
        rule(r"\*([^*\n]+)\*", "$1"),
    ]
});

static UNDERSCORE_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_([^_\n]+)_").expect("static markdown pattern"));

static BLOCK_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(r"~~([^~\n]+)~~", "$1"),
        rule(r"`([^`\n]+)`", "$1"),
        rule(r"(?m)^#{1,6}[ \t]+", ""),
        rule(r"(?m)^[ \t]*[-*+][ \t]+", "• "),
        rule(r"(?m)^[ \t]*\d+\.[ \t]+", ""),
        rule(r"!\[([^\]]*)\]\([^)]+\)", "$1"),
        rule(r"\[([^\]]+)\]\([^)]+\)", "$1"),
        rule(r"(?m)^[-*]{3,}[ \t]*$", ""),
        rule(r"(?m)^>[ \t]*", ""),
        rule(r"\n{3,}", "\n\n"),
    ]
});

/// Strips markdown markup and keeps the readable text.
pub fn clean_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = text.to_string();
    for rule in INLINE_RULES.iter() {
        out = rule.pattern.replace_all(&out, rule.replacement).into_owned();
    }
    out = strip_underscore_emphasis(&out);
    for rule in BLOCK_RULES.iter() {
        out = rule.pattern.replace_all(&out, rule.replacement).into_owned();
    }
    out.trim().to_string()
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `_text_` → `text`, but only where neither underscore touches a word
/// character, so `snake_case_names` survive.
fn strip_underscore_emphasis(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut search = 0;

    while let Some(caps) = UNDERSCORE_EMPHASIS.captures_at(text, search) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else { break };
        let before_ok = !text[..whole.start()].chars().next_back().is_some_and(is_word);
        let after_ok = !text[whole.end()..].chars().next().is_some_and(is_word);

        if before_ok && after_ok {
            out.push_str(&text[copied..whole.start()]);
            out.push_str(inner.as_str());
            copied = whole.end();
            search = whole.end();
        } else {
            search = whole.start() + 1;
        }
    }
    out.push_str(&text[copied..]);
    out
}
