//! Article metadata: tolerant parsing of model output plus a deterministic backstop

use std::collections::HashMap;

use pulse_core::{Faq, TopicCategory};

use crate::cleanup::{split_sentences, summarize};
use crate::types::{ArticleMetadata, ParsedMetadata};

pub const MIN_TLDR: usize = 3;
pub const MAX_TLDR: usize = 4;
pub const MIN_FAQS: usize = 3;
pub const MAX_FAQS: usize = 5;
const MAX_TAGS: usize = 10;
const MAX_ENTITIES: usize = 10;
const MAX_TOPICS: usize = 8;
const KEYWORD_COUNT: usize = 6;

const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "also", "analysts", "around", "because",
    "been", "before", "being", "between", "both", "could", "does", "doing", "during", "each",
    "even", "every", "from", "further", "have", "having", "here", "into", "just", "latest",
    "like", "many", "market", "markets", "more", "most", "much", "must", "news", "only", "other",
    "over", "said", "same", "says", "should", "since", "some", "still", "such", "than", "that",
    "their", "them", "then", "there", "these", "they", "this", "those", "through", "today",
    "under", "until", "update", "updates", "very", "want", "were", "what", "when", "where",
    "whether", "which", "while", "will", "with", "within", "would", "year", "years", "your",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Tldr,
    Faq,
    Tags,
    Entities,
    Topics,
}

fn section_header(line: &str) -> Option<(Section, &str)> {
    let (head, rest) = line.split_once(':')?;
    let head = head.trim().trim_matches('*').trim().to_ascii_uppercase();
    let section = match head.as_str() {
        "TLDR" | "TL;DR" | "TL DR" | "SUMMARY" => Section::Tldr,
        "FAQ" | "FAQS" => Section::Faq,
        "TAGS" | "KEYWORDS" => Section::Tags,
        "ENTITIES" => Section::Entities,
        "TOPICS" => Section::Topics,
        _ => return None,
    };
    Some((section, rest.trim().trim_start_matches('*').trim()))
}

fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
        .unwrap_or(line);
    // Numbered bullets: "1. text" or "1) text"
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim();
        }
    }
    line.trim()
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split([',', ';'])
        .map(|v| strip_bullet(v).trim_matches(|c: char| c == '"' || c == '#').trim().to_string())
        .filter(|v| !v.is_empty())
}

fn qa_line<'a>(line: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    let line = strip_bullet(line).trim_start_matches("**");
    prefixes.iter().find_map(|p| {
        let head = line.get(..p.len())?;
        if head.eq_ignore_ascii_case(p) {
            Some(line[p.len()..].trim_start_matches("**").trim())
        } else {
            None
        }
    })
}

/// Parse the line-oriented metadata block returned by the model
///
/// Unknown lines are ignored. Returns [`ParsedMetadata::Fallback`] when
/// nothing usable was found.
pub fn parse_metadata(raw: &str) -> ParsedMetadata {
    let mut meta = ArticleMetadata::default();
    let mut section: Option<Section> = None;
    let mut pending_question: Option<String> = None;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((next, inline)) = section_header(line) {
            section = Some(next);
            pending_question = None;
            if !inline.is_empty() {
                match next {
                    Section::Tldr => meta.tldr.push(strip_bullet(inline).to_string()),
                    Section::Tags => meta.tags.extend(split_list(inline)),
                    Section::Entities => meta.entities.extend(split_list(inline)),
                    Section::Topics => meta.topics.extend(split_list(inline)),
                    Section::Faq => {}
                }
            }
            continue;
        }

        match section {
            Some(Section::Tldr) => {
                let point = strip_bullet(line);
                if !point.is_empty() {
                    meta.tldr.push(point.to_string());
                }
            }
            Some(Section::Faq) => {
                if let Some(q) = qa_line(line, &["Q:", "Question:"]) {
                    pending_question = Some(q.to_string()).filter(|q| !q.is_empty());
                } else if let Some(a) = qa_line(line, &["A:", "Answer:"]) {
                    if let Some(question) = pending_question.take() {
                        if !a.is_empty() {
                            meta.faqs.push(Faq {
                                question,
                                answer: a.to_string(),
                            });
                        }
                    }
                }
            }
            Some(Section::Tags) => meta.tags.extend(split_list(line)),
            Some(Section::Entities) => meta.entities.extend(split_list(line)),
            Some(Section::Topics) => meta.topics.extend(split_list(line)),
            None => {}
        }
    }

    if meta.is_empty() {
        ParsedMetadata::Fallback
    } else {
        ParsedMetadata::Parsed(meta)
    }
}

/// Deterministic metadata derived from the article text alone
pub fn fallback_metadata(
    title: &str,
    content: &str,
    subject: &str,
    instruments: &[String],
    category: TopicCategory,
) -> ArticleMetadata {
    let mut tldr: Vec<String> = split_sentences(content).into_iter().take(MAX_TLDR).collect();
    let defaults = [
        format!("{} is trending across financial news and social channels.", subject),
        format!("Investors are watching how the latest developments affect {}.", subject),
        format!("Confirmation from official sources will shape the next move in {}.", subject),
    ];
    for point in defaults {
        if tldr.len() >= MIN_TLDR {
            break;
        }
        tldr.push(point);
    }

    let faqs = vec![
        Faq {
            question: format!("What is happening with {}?", subject),
            answer: summarize(content, 2, 300),
        },
        Faq {
            question: format!("Why is {} in the news now?", subject),
            answer: format!(
                "Coverage of {} has picked up across several outlets and social channels, which \
                 usually signals a development investors consider material.",
                subject
            ),
        },
        Faq {
            question: format!("What should investors watch next for {}?", subject),
            answer: "Official statements, regulatory filings, trading volume and analyst \
                     reactions over the coming sessions."
                .to_string(),
        },
    ];

    let keywords = top_keywords(&format!("{}\n{}", title, content), KEYWORD_COUNT);

    let mut tags: Vec<String> = instruments.to_vec();
    tags.extend(keywords.iter().cloned());

    let mut entities: Vec<String> = instruments.to_vec();
    entities.extend(capitalized_terms(content, 5));
    if entities.is_empty() {
        entities.push(subject.to_string());
    }

    let mut topics = vec![category.as_str().to_string(), subject.to_string()];
    topics.extend(keywords.into_iter().take(3));

    ArticleMetadata {
        tldr,
        faqs,
        tags: dedup_ci(tags, MAX_TAGS),
        entities: dedup_ci(entities, MAX_ENTITIES),
        topics: dedup_ci(topics, MAX_TOPICS),
    }
}

/// Field-by-field merge preferring parsed values, topped up from the fallback
pub fn merge(parsed: ParsedMetadata, fallback: ArticleMetadata) -> ArticleMetadata {
    let parsed = match parsed {
        ParsedMetadata::Parsed(meta) => meta,
        ParsedMetadata::Fallback => return clamp(fallback),
    };

    let mut tldr = parsed.tldr;
    for point in fallback.tldr {
        if tldr.len() >= MIN_TLDR {
            break;
        }
        if !tldr.iter().any(|p| p.eq_ignore_ascii_case(&point)) {
            tldr.push(point);
        }
    }

    let mut faqs = parsed.faqs;
    for faq in fallback.faqs {
        if faqs.len() >= MIN_FAQS {
            break;
        }
        if !faqs.iter().any(|f| f.question.eq_ignore_ascii_case(&faq.question)) {
            faqs.push(faq);
        }
    }

    let pick = |parsed: Vec<String>, fallback: Vec<String>| {
        if parsed.is_empty() {
            fallback
        } else {
            parsed
        }
    };

    clamp(ArticleMetadata {
        tldr,
        faqs,
        tags: pick(parsed.tags, fallback.tags),
        entities: pick(parsed.entities, fallback.entities),
        topics: pick(parsed.topics, fallback.topics),
    })
}

fn clamp(mut meta: ArticleMetadata) -> ArticleMetadata {
    meta.tldr.truncate(MAX_TLDR);
    meta.faqs.truncate(MAX_FAQS);
    meta.tags = dedup_ci(meta.tags, MAX_TAGS);
    meta.entities = dedup_ci(meta.entities, MAX_ENTITIES);
    meta.topics = dedup_ci(meta.topics, MAX_TOPICS);
    meta
}

fn dedup_ci(values: Vec<String>, limit: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.trim().to_string();
        if value.is_empty() || out.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
            continue;
        }
        out.push(value);
        if out.len() == limit {
            break;
        }
    }
    out
}

fn is_stopword(word: &str) -> bool {
    STOPWORDS.binary_search(&word).is_ok()
}

/// Most frequent non-stopword terms, ties broken alphabetically
pub fn top_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if word.chars().count() < 4 || word.chars().all(|c| c.is_ascii_digit()) || is_stopword(&word)
        {
            continue;
        }
        *counts.entry(word).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(w, _)| w).collect()
}

/// Capitalised words that recur mid-sentence, most frequent first
fn capitalized_terms(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for sentence in split_sentences(text) {
        // Sentence-initial words are capitalised regardless
        for word in sentence.split_whitespace().skip(1) {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            let starts_upper = word.chars().next().is_some_and(|c| c.is_uppercase());
            if !starts_upper || word.chars().count() < 3 || is_stopword(&word.to_lowercase()) {
                continue;
            }
            *counts.entry(word.to_string()).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().filter(|(_, n)| *n >= 2).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(w, _)| w).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = "Gold prices climbed to a record on Monday. Traders cited Federal Reserve \
        rate cut bets. Central banks kept buying gold bullion. The Federal Reserve meets next \
        week. Silver followed gold higher.";

    #[test]
    fn test_stopwords_sorted() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn test_parse_metadata() {
        let raw = "**TLDR:**\n- Gold hit a record.\n- Rate cuts are priced in.\n- Central banks are buying.\n\nFAQ:\nQ: Why is gold rising?\nA: Rate cut bets.\nQ: Who is buying?\nA: Central banks.\nTAGS: gold, bullion, rates\nENTITIES: Federal Reserve, gold\nTOPICS: metals, monetary policy";
        let ParsedMetadata::Parsed(meta) = parse_metadata(raw) else {
            panic!("expected parsed metadata");
        };
        assert_eq!(meta.tldr.len(), 3);
        assert_eq!(meta.tldr[0], "Gold hit a record.");
        assert_eq!(meta.faqs.len(), 2);
        assert_eq!(meta.faqs[1].answer, "Central banks.");
        assert_eq!(meta.tags, vec!["gold", "bullion", "rates"]);
        assert_eq!(meta.entities, vec!["Federal Reserve", "gold"]);
        assert_eq!(meta.topics, vec!["metals", "monetary policy"]);
    }

    #[test]
    fn test_parse_garbage_is_fallback() {
        assert_eq!(parse_metadata("I cannot help with that."), ParsedMetadata::Fallback);
        assert_eq!(parse_metadata(""), ParsedMetadata::Fallback);
    }

    #[test]
    fn test_answer_without_question_ignored() {
        let ParsedMetadata::Parsed(meta) = parse_metadata("FAQ:\nA: orphan\nTAGS: x") else {
            panic!("expected parsed metadata");
        };
        assert!(meta.faqs.is_empty());
    }

    #[test]
    fn test_fallback_metadata() {
        let meta = fallback_metadata(
            "Gold hits record",
            CONTENT,
            "Gold",
            &["gold".to_string()],
            TopicCategory::Metals,
        );
        assert_eq!(meta.tldr.len(), MAX_TLDR);
        assert_eq!(meta.faqs.len(), 3);
        assert_eq!(meta.tags[0], "gold");
        assert!(meta.entities.contains(&"Federal".to_string()));
        assert_eq!(meta.topics[0], "metals");
    }

    #[test]
    fn test_fallback_metadata_pads_short_content() {
        let meta = fallback_metadata("t", "One sentence only.", "XYZ", &[], TopicCategory::Stocks);
        assert_eq!(meta.tldr.len(), MIN_TLDR);
        assert!(!meta.entities.is_empty());
        assert!(!meta.tags.is_empty() || !meta.topics.is_empty());
    }

    #[test]
    fn test_merge_tops_up_and_clamps() {
        let fallback =
            fallback_metadata("Gold", CONTENT, "Gold", &["gold".to_string()], TopicCategory::Metals);
        let parsed = ArticleMetadata {
            tldr: vec!["Only one point.".to_string()],
            faqs: (0..7)
                .map(|i| Faq {
                    question: format!("q{}", i),
                    answer: "a".to_string(),
                })
                .collect(),
            tags: vec![],
            entities: vec!["Gold".to_string(), "gold".to_string()],
            topics: vec![],
        };
        let merged = merge(ParsedMetadata::Parsed(parsed), fallback.clone());
        assert_eq!(merged.tldr.len(), MIN_TLDR);
        assert_eq!(merged.tldr[0], "Only one point.");
        assert_eq!(merged.faqs.len(), MAX_FAQS);
        assert_eq!(merged.tags, fallback.tags);
        assert_eq!(merged.entities, vec!["Gold"]);

        let merged = merge(ParsedMetadata::Fallback, fallback.clone());
        assert_eq!(merged, fallback);
    }
}
