//! Outbound text shaping.
//!
//! Assistant output is markdown-flavoured; the chat endpoint receives it as
//! plain text, so the common markup is reduced to readable plain text and
//! long replies are split under the endpoint's per-message ceiling.

use std::sync::OnceLock;

use regex::{Captures, Regex};

struct MarkupPatterns {
    code_block: Regex,
    stray_fence: Regex,
    heading: Regex,
    bullet: Regex,
    inline: Regex,
}

fn patterns() -> &'static MarkupPatterns {
    static PATTERNS: OnceLock<MarkupPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| MarkupPatterns {
        code_block: Regex::new(
            r"(?ms)^[ \t]*```[\w+-]*[ \t]*\n(?P<code>.*?)^[ \t]*```[ \t]*(?:\n|\z)",
        )
        .unwrap(),
        stray_fence: Regex::new(r"(?m)^[ \t]*```[\w+-]*[ \t]*\n?").unwrap(),
        heading: Regex::new(r"(?m)^#{1,6}[ \t]+").unwrap(),
        bullet: Regex::new(r"(?m)^([ \t]*)[*-][ \t]+").unwrap(),
        inline: Regex::new(concat!(
            r"(?m)`(?P<code>[^`\n]+)`",
            r"|\[(?P<label>[^\]\n]+)\]\((?P<url>https?://[^)\s]+)\)",
            r#"|(?P<lead>^|[\s(\["'])\*\*(?P<bold>[^*\s](?:[^*\n]*[^*\s])?)\*\*"#,
            r"|(?P<tag></?(?:b|i|u|s|em|strong|code|pre)>)",
        ))
        .unwrap(),
    })
}

/// Reduce markdown and simple HTML markup to plain text.
///
/// Fences and heading markers are dropped, code keeps its content
/// verbatim, `**bold**` between word boundaries keeps its content, links
/// become `text (url)` and list bullets become `•`. Underscores are never
/// treated as emphasis so names like `__init__` survive.
pub fn strip_markup(text: &str) -> String {
    let p = patterns();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in p.code_block.captures_iter(text) {
        let (Some(block), Some(code)) = (caps.get(0), caps.name("code")) else {
            continue;
        };
        out.push_str(&strip_prose(p, &text[last..block.start()]));
        out.push_str(code.as_str());
        last = block.end();
    }
    out.push_str(&strip_prose(p, &text[last..]));
    out
}

fn strip_prose(p: &MarkupPatterns, text: &str) -> String {
    let text = p.stray_fence.replace_all(text, "");
    let text = p.heading.replace_all(&text, "");
    let text = p.bullet.replace_all(&text, "${1}• ");
    let hay: &str = &text;
    p.inline
        .replace_all(hay, |caps: &Captures<'_>| inline_replacement(hay, caps))
        .into_owned()
}

fn inline_replacement(hay: &str, caps: &Captures<'_>) -> String {
    if let Some(code) = caps.name("code") {
        return code.as_str().to_string();
    }
    if let (Some(label), Some(url)) = (caps.name("label"), caps.name("url")) {
        return format!("{} ({})", label.as_str(), url.as_str());
    }
    if let Some(bold) = caps.name("bold") {
        let end = caps.get(0).map_or(hay.len(), |m| m.end());
        if closes_emphasis(hay[end..].chars().next()) {
            let lead = caps.name("lead").map_or("", |m| m.as_str());
            return format!("{}{}", lead, bold.as_str());
        }
    }
    if caps.name("tag").is_some() {
        return String::new();
    }
    caps.get(0).map_or_else(String::new, |m| m.as_str().to_string())
}

fn closes_emphasis(next: Option<char>) -> bool {
    next.map_or(true, |c| {
        c.is_whitespace() || matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | ']' | '\'' | '"')
    })
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// A chunk ends at the last newline inside the window when there is one;
/// the newlines at the break are dropped. Without a usable newline the
/// chunk is cut hard at `max_chars`.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let Some((limit, _)) = rest.char_indices().nth(max_chars) else {
            chunks.push(rest.to_string());
            break;
        };

        let cut = match rest[..limit].rfind('\n') {
            Some(idx) if idx > 0 => idx,
            _ => limit,
        };
        chunks.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start_matches('\n');
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = split_message("0123456789", 4000);
        assert_eq!(chunks, vec!["0123456789"]);
    }

    #[test]
    fn test_chunks_respect_limit_and_rejoin() {
        let lines: Vec<String> = (0..300)
            .map(|i| format!("line {} {}", i, "x".repeat(i % 37)))
            .collect();
        let text = lines.join("\n");

        let chunks = split_message(&text, 200);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 200));
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_hard_cut_without_newlines() {
        let text = "a".repeat(25);
        let chunks = split_message(&text, 10);

        assert_eq!(chunks, vec!["a".repeat(10), "a".repeat(10), "a".repeat(5)]);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "日本語".repeat(5);
        let chunks = split_message(&text, 4);

        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_strip_markup() {
        let text = "# Result\n**Done**: see `main.rs`\n```rust\nfn main() {}\n```\n- first\n* second\nDocs: [guide](https://example.com/g)";
        let plain = strip_markup(text);

        assert_eq!(
            plain,
            "Result\nDone: see main.rs\nfn main() {}\n• first\n• second\nDocs: guide (https://example.com/g)"
        );
    }

    #[test]
    fn test_strip_html_tags() {
        assert_eq!(strip_markup("<b>bold</b> and <code>x</code>"), "bold and x");
        // Comparisons are not tags
        assert_eq!(strip_markup("a < b > c"), "a < b > c");
    }

    #[test]
    fn test_code_identifiers_survive() {
        let text = "Edit src/__init__.py and call __main__ with *args, **kwargs and **x**";

        assert_eq!(
            strip_markup(text),
            "Edit src/__init__.py and call __main__ with *args, **kwargs and x"
        );
        assert_eq!(strip_markup("x**y**z"), "x**y**z");
    }

    #[test]
    fn test_code_is_left_verbatim() {
        let text = "run `a**b**c` and\n```\n**not bold** - x\n# not a heading\n```\nafter";

        assert_eq!(
            strip_markup(text),
            "run a**b**c and\n**not bold** - x\n# not a heading\nafter"
        );
    }
}
