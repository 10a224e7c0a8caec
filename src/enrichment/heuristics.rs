//! Local stand-ins for every enrichment capability.
//!
//! These never fail and never leave the process; the pipeline uses them when
//! no capability is configured or every configured one failed.

use crate::client::{Article, Sentiment};
use crate::enrichment::ExtractedInfo;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Category used when neither the provider nor a model supplied one
pub const DEFAULT_CATEGORY: &str = "general";

const MAX_ENTITIES: usize = 10;
const MAX_TOPICS: usize = 5;
const SUMMARY_CHARS: usize = 280;

const STOPWORDS: &[&str] = &[
    "about", "after", "again", "against", "also", "because", "been", "before", "being", "between",
    "could", "does", "doing", "during", "each", "from", "further", "have", "having", "here",
    "into", "more", "most", "other", "over", "said", "same", "says", "should", "some", "such",
    "than", "that", "their", "them", "then", "there", "these", "they", "this", "those", "through",
    "under", "until", "very", "were", "what", "when", "where", "which", "while", "with", "would",
    "your", "will", "just", "only", "year", "years",
];

/// Sentence starters that look like proper nouns but are not; stripped from the
/// front of a match
const ENTITY_NOISE: &[&str] = &["The", "A", "An", "In", "On", "At", "It", "This", "That", "But"];

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Z][a-zA-Z0-9&'-]+(?:\s+[A-Z][a-zA-Z0-9&'-]+)*\b").expect("entity regex")
    })
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?u)\b\w+\b").expect("word regex"))
}

/// Lowercase words of `text`
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    word_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
}

/// Summary: the description, else the opening of the body, else the title
#[must_use]
pub fn summarize(article: &Article) -> String {
    let description = article.description.trim();
    if !description.is_empty() {
        return description.to_string();
    }

    let body = article.body().trim();
    if body.is_empty() {
        return article.title.clone();
    }
    if body.chars().count() <= SUMMARY_CHARS {
        return body.to_string();
    }
    let clipped: String = body.chars().take(SUMMARY_CHARS).collect();
    match clipped.rfind(' ') {
        Some(cut) => format!("{}...", &clipped[..cut]),
        None => format!("{clipped}..."),
    }
}

/// Category: the provider's, else [`DEFAULT_CATEGORY`]
#[must_use]
pub fn categorize(article: &Article) -> String {
    article
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map_or_else(|| DEFAULT_CATEGORY.to_string(), str::to_lowercase)
}

/// Capitalized word runs, in order of first appearance
#[must_use]
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    entity_regex()
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .split_whitespace()
                .skip_while(|w| ENTITY_NOISE.contains(w))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|e| e.len() > 2 && seen.insert(e.clone()))
        .take(MAX_ENTITIES)
        .collect()
}

/// Most frequent meaningful words, ties broken alphabetically
#[must_use]
pub fn extract_topics(text: &str) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in words(text) {
        if word.len() > 4 && !STOPWORDS.contains(&word.as_str()) && !word.chars().all(char::is_numeric)
        {
            *counts.entry(word).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(MAX_TOPICS).map(|(w, _)| w).collect()
}

/// Importance in `[0, 10]` from how much material the article carries
#[must_use]
pub fn importance(article: &Article, entity_count: usize) -> f64 {
    let mut score = 5.0;
    if article.content.as_deref().is_some_and(|c| c.len() > 200) {
        score += 1.0;
    }
    if article.image_url.is_some() {
        score += 1.0;
    }
    score += (entity_count as f64 * 0.5).min(2.0);
    score.clamp(0.0, 10.0)
}

/// Everything the extraction stage produces, computed locally
#[must_use]
pub fn extract_info(article: &Article) -> ExtractedInfo {
    let text = article.analysis_text();
    let entities = extract_entities(&text);
    let importance = importance(article, entities.len());
    ExtractedInfo {
        topics: extract_topics(&text),
        entities,
        sentiment: Sentiment::neutral(),
        importance,
    }
}

/// Relevance in `[0, 10]`: share of context words found in the text
#[must_use]
pub fn score_relevance(text: &str, context: &str) -> f64 {
    let terms: HashSet<String> = words(context).filter(|w| w.len() > 2).collect();
    if terms.is_empty() {
        return 5.0;
    }
    let present: HashSet<String> = words(text).collect();
    let matched = terms.iter().filter(|t| present.contains(*t)).count();
    (5.0 + 5.0 * matched as f64 / terms.len() as f64).clamp(0.0, 10.0)
}

/// Jaccard overlap of the lowercase title words longer than three characters
#[must_use]
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let set = |s: &str| -> HashSet<String> { words(s).filter(|w| w.chars().count() > 3).collect() };
    let (a, b) = (set(a), set(b));
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prefers_description() {
        let article = Article::new("t", "https://x/1", "Title").with_description("Short desc");
        assert_eq!(summarize(&article), "Short desc");

        let body = "word ".repeat(100);
        let article = Article::new("t", "https://x/2", "Title").with_content(body);
        let summary = summarize(&article);
        assert!(summary.ends_with("..."));
        assert!(summary.chars().count() <= SUMMARY_CHARS + 3);

        let bare = Article::new("t", "https://x/3", "Only title");
        assert_eq!(summarize(&bare), "Only title");
    }

    #[test]
    fn test_categorize_falls_back_to_general() {
        let article = Article::new("t", "https://x/1", "Title").with_category("Business");
        assert_eq!(categorize(&article), "business");
        assert_eq!(categorize(&Article::new("t", "https://x/2", "Title")), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_entities_skip_sentence_noise() {
        let entities =
            extract_entities("The European Central Bank met in Frankfurt. The Bank held rates.");
        assert_eq!(entities, vec!["European Central Bank", "Frankfurt", "Bank"]);
    }

    #[test]
    fn test_topics_rank_by_frequency() {
        let topics = extract_topics("inflation rises; inflation worries markets while markets rally");
        assert_eq!(topics[0], "inflation");
        assert_eq!(topics[1], "markets");
        assert!(!topics.contains(&"while".to_string()));
    }

    #[test]
    fn test_relevance_bounds() {
        assert!((score_relevance("anything", "") - 5.0).abs() < f64::EPSILON);
        assert!((score_relevance("technology stocks", "technology") - 10.0).abs() < f64::EPSILON);
        assert!((score_relevance("football final", "technology") - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_title_similarity() {
        let a = "Federal Reserve raises interest rates again";
        let b = "Federal Reserve raises interest rates";
        assert!(title_similarity(a, b) > 0.6);
        assert!(title_similarity(a, "Local team wins championship") < 0.1);
        assert!(title_similarity("a b c", "d e f").abs() < f64::EPSILON);
    }

    #[test]
    fn test_importance_is_bounded() {
        let article = Article::new("t", "https://x/1", "Title")
            .with_content("x".repeat(300))
            .with_image_url("https://img/1.jpg");
        let score = importance(&article, 20);
        assert!((score - 9.0).abs() < f64::EPSILON);
    }
}
