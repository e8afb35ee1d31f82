//! Prompt builders for drafting, rewriting and metadata extraction

use pulse_core::{InstrumentKind, InstrumentSnapshot, TopicCategory};

use crate::types::{ResearchContext, RetrievedFact};

/// Maximum facts embedded in a drafting prompt
pub const MAX_PROMPT_FACTS: usize = 10;

pub fn build_article_prompt(
    context: &ResearchContext,
    category: TopicCategory,
    min_words: usize,
) -> String {
    let subject = context.subject_name();

    format!(
        r#"Write a news article for retail investors about: {topic}

## Style
- Lead with a hook: the single most important development about {subject}, stated in the first sentence.
- Explain why it matters, then give context, then what to watch next.
- Neutral and factual; attribute claims to their sources. Category: {category}.

## Facts (use only these; do not invent numbers)
{facts}

## Market Data
{snapshot}

## Requirements
- At least {min_words} words.
- Plain text only: no markdown, no HTML, no bullet lists, no headings.
- Separate paragraphs with a blank line.
- The first line must be the headline in the form: TITLE: <headline>"#,
        topic = context.topic,
        subject = subject,
        category = category,
        facts = format_facts(&context.facts),
        snapshot = format_snapshot(context.snapshot.as_ref()),
        min_words = min_words,
    )
}

pub fn build_humanize_prompt(title: &str, content: &str, min_words: usize) -> String {
    format!(
        r#"Rewrite the article below so it reads like a human reporter wrote it: vary sentence length, cut filler and repetition, keep every fact and figure unchanged.

Keep it at least {min_words} words, plain text, paragraphs separated by a blank line. Do not add a title line.

Title: {title}

{content}"#
    )
}

pub fn build_metadata_prompt(title: &str, content: &str) -> String {
    format!(
        r#"Read the article and reply with exactly these sections, plain text, no markdown:

TLDR:
- <key point> (3 to 4 points)
FAQ:
Q: <question a reader would ask>
A: <answer taken from the article>
(3 to 5 question/answer pairs)
TAGS: <comma separated keywords>
ENTITIES: <comma separated companies, tickers, metals, people, institutions>
TOPICS: <comma separated broad topics>

Title: {title}

{content}"#
    )
}

/// Numbered fact list with source attribution
pub fn format_facts(facts: &[RetrievedFact]) -> String {
    if facts.is_empty() {
        return "No supporting snippets were retrieved. Write from the topic and market data only, without speculation.".to_string();
    }

    facts
        .iter()
        .take(MAX_PROMPT_FACTS)
        .enumerate()
        .map(|(i, fact)| format!("{}. {} (source: {})", i + 1, fact.snippet(), fact.source_label()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_snapshot(snapshot: Option<&InstrumentSnapshot>) -> String {
    let Some(s) = snapshot else {
        return "No live market data available.".to_string();
    };

    let unit = match s.kind {
        InstrumentKind::Stock => "share price",
        InstrumentKind::Metal => "spot price",
    };
    let mut lines = vec![
        format!("- {} {}: {}", s.symbol, unit, format_price(s.price)),
        format!(
            "- Change: {} ({})",
            format_signed(s.change),
            format_change_percent(s.change_percent)
        ),
    ];
    if let Some(cap) = s.market_cap {
        lines.push(format!("- Market cap: {}", format_market_cap(cap)));
    }
    lines.join("\n")
}

pub fn format_price(price: f64) -> String {
    format!("${:.2}", price)
}

pub fn format_signed(value: f64) -> String {
    if value >= 0.0 {
        format!("+{:.2}", value)
    } else {
        format!("{:.2}", value)
    }
}

pub fn format_change_percent(percent: f64) -> String {
    if percent >= 0.0 {
        format!("+{:.2}%", percent)
    } else {
        format!("{:.2}%", percent)
    }
}

pub fn format_market_cap(cap: f64) -> String {
    if cap >= 1_000_000_000_000.0 {
        format!("${:.2}T", cap / 1_000_000_000_000.0)
    } else if cap >= 1_000_000_000.0 {
        format!("${:.1}B", cap / 1_000_000_000.0)
    } else if cap >= 1_000_000.0 {
        format!("${:.1}M", cap / 1_000_000.0)
    } else {
        format!("${:.0}", cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(text: &str, domain: &str) -> RetrievedFact {
        RetrievedFact {
            id: text.to_string(),
            title: text.to_string(),
            text: text.to_string(),
            source_url: format!("https://{}/a", domain),
            source_domain: Some(domain.to_string()),
            scraped_at: None,
            similarity: 0.9,
        }
    }

    #[test]
    fn test_format_market_cap() {
        assert_eq!(format_market_cap(2_500_000_000_000.0), "$2.50T");
        assert_eq!(format_market_cap(1_500_000_000.0), "$1.5B");
        assert_eq!(format_market_cap(50_000_000.0), "$50.0M");
        assert_eq!(format_market_cap(500.0), "$500");
    }

    #[test]
    fn test_format_change_percent() {
        assert_eq!(format_change_percent(1.234), "+1.23%");
        assert_eq!(format_change_percent(-0.5), "-0.50%");
    }

    #[test]
    fn test_format_facts_caps_and_attributes() {
        let facts: Vec<_> = (0..12).map(|i| fact(&format!("fact {}", i), "reuters.com")).collect();
        let formatted = format_facts(&facts);
        assert_eq!(formatted.lines().count(), MAX_PROMPT_FACTS);
        assert!(formatted.starts_with("1. fact 0 (source: reuters.com)"));
    }

    #[test]
    fn test_article_prompt_requirements() {
        let context = ResearchContext {
            topic: "XYZ — Latest Market Updates".to_string(),
            subject: Some("XYZ".to_string()),
            facts: vec![fact("XYZ beats estimates", "reuters.com")],
            related_articles: vec![],
            snapshot: Some(InstrumentSnapshot {
                symbol: "XYZ".to_string(),
                kind: InstrumentKind::Stock,
                price: 101.5,
                change: -1.2,
                change_percent: -1.17,
                market_cap: None,
            }),
        };
        let prompt = build_article_prompt(&context, TopicCategory::Stocks, 500);
        assert!(prompt.contains("At least 500 words"));
        assert!(prompt.contains("TITLE:"));
        assert!(prompt.contains("XYZ beats estimates (source: reuters.com)"));
        assert!(prompt.contains("$101.50"));
        assert!(prompt.contains("-1.17%"));
    }
}
