//! Text cleanup helpers shared by the drafting and fallback paths

use std::sync::LazyLock;

use regex::Regex;

/// Maximum slug length in characters
pub const MAX_SLUG_LEN: usize = 80;

/// Markup rewrites, applied in order
const MARKUP_PATTERNS: [(&str, &str); 13] = [
    // Fenced code blocks carry nothing worth publishing
    (r"(?s)```.*?```", ""),
    (r"(?is)<(script|style)[^>]*>.*?</(script|style)>", ""),
    (r"(?i)<br\s*/?>|</p>", "\n\n"),
    (r"<[^>]+>", ""),
    // Images vanish, links keep their label
    (r"!\[[^\]]*\]\([^)]*\)", ""),
    (r"\[([^\]]+)\]\([^)]*\)", "$1"),
    (r"(?m)^[ \t]{0,3}#{1,6}[ \t]*", ""),
    (r"(?m)^[ \t]*>[ \t]?", ""),
    (r"(?m)^[ \t]*([-*_][ \t]*){3,}$", ""),
    (r"(?m)^[ \t]*([-*+]|\d+[.)])[ \t]+", ""),
    (r"\*\*([^*]+)\*\*|__([^_]+)__", "$1$2"),
    (r"\*([^*\n]+)\*", "$1"),
    (r"`([^`]*)`", "$1"),
];

static MARKUP_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    MARKUP_PATTERNS
        .iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), *replacement))
        .collect()
});

static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Remove markdown and HTML from model output, keeping paragraph breaks
pub fn strip_markup(text: &str) -> String {
    let mut text = text.replace("\r\n", "\n");
    for (re, replacement) in MARKUP_RULES.iter() {
        text = re.replace_all(&text, *replacement).into_owned();
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");

    let text = text
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_RUN_RE.replace_all(&text, "\n\n").trim().to_string()
}

/// Whitespace-delimited word count
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Append paragraphs in order until `content` reaches `min_words`
///
/// Stops early once the minimum is met; if the paragraphs run out first the
/// content is returned as far as it got.
pub fn ensure_min_words(content: &str, min_words: usize, paragraphs: &[String]) -> String {
    let mut out = content.trim().to_string();
    let mut words = word_count(&out);

    for paragraph in paragraphs {
        if words >= min_words {
            break;
        }
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(paragraph);
        words += word_count(paragraph);
    }

    out
}

/// URL slug: lowercase ASCII alphanumerics, other runs collapse to `-`
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        "article".to_string()
    } else {
        slug
    }
}

/// Split prose into sentences on `.`, `!` or `?` followed by whitespace
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        let at_boundary = matches!(ch, '.' | '!' | '?')
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if at_boundary {
            let sentence = current.split_whitespace().collect::<Vec<_>>().join(" ");
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }

    let rest = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !rest.is_empty() {
        sentences.push(rest);
    }

    sentences
}

/// First `max_sentences` sentences, capped at `max_chars`
pub fn summarize(content: &str, max_sentences: usize, max_chars: usize) -> String {
    let summary = split_sentences(content)
        .into_iter()
        .take(max_sentences)
        .collect::<Vec<_>>()
        .join(" ");
    truncate_words(&summary, max_chars)
}

/// Truncate on a word boundary, marking the cut with `...`
pub fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let budget = max_chars.saturating_sub(3);
    let mut out = String::new();
    for word in text.split_whitespace() {
        let needed = if out.is_empty() { 0 } else { 1 } + word.chars().count();
        if out.chars().count() + needed > budget {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }

    if out.is_empty() {
        out = text.chars().take(budget).collect();
    }
    let trimmed = out.trim_end_matches([',', ';', ':', '.', ' ']).len();
    out.truncate(trimmed);
    out.push_str("...");
    out
}

/// Split a leading `TITLE: ...` line off model output
///
/// Returns the title (if the first non-empty line carried one) and the
/// remaining body.
pub fn extract_title(text: &str) -> (Option<String>, String) {
    let trimmed = text.trim_start();
    let (first, rest) = match trimmed.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (trimmed, ""),
    };

    let marker = first
        .trim()
        .trim_start_matches('#')
        .trim()
        .trim_start_matches("**")
        .trim();
    let title = match marker.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("title:") => &marker[6..],
        _ => return (None, text.trim().to_string()),
    };

    let title = title
        .trim()
        .trim_matches(|c: char| c == '*' || c == '"' || c == '\'' || c.is_whitespace())
        .to_string();

    if title.is_empty() {
        (None, rest.trim().to_string())
    } else {
        (Some(title), rest.trim().to_string())
    }
}
