//! Knowledge Store
//!
//! In-memory document set behind the `search_knowledge` tool. Scoring is
//! deliberately plain keyword matching (term frequency with a title
//! boost); this is not vector search and is not meant to become one.

use std::collections::HashMap;

/// A document in the knowledge store.
#[derive(Debug, Clone)]
pub struct KnowledgeDoc {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// A scored search hit.
#[derive(Debug, Clone)]
pub struct KnowledgeHit {
    pub doc_id: String,
    pub title: String,
    pub score: f64,
    /// Content window around the first matching term
    pub snippet: String,
}

/// Title matches count this much more than content matches.
const TITLE_BOOST: f64 = 2.0;

/// Characters of context kept around the first match.
const SNIPPET_RADIUS: usize = 120;

/// Keyword-scored document store.
#[derive(Debug, Default)]
pub struct KnowledgeStore {
    docs: Vec<KnowledgeDoc>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document. Ids are not checked for uniqueness; later
    /// documents simply rank independently.
    pub fn add_doc(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.docs.push(KnowledgeDoc {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Search by keyword overlap, best matches first.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<KnowledgeHit> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<KnowledgeHit> = self
            .docs
            .iter()
            .filter_map(|doc| {
                let content_lower = doc.content.to_lowercase();
                let title_lower = doc.title.to_lowercase();
                let content_counts = term_counts(&content_lower);

                let mut score = 0.0;
                let mut first_match: Option<usize> = None;
                for term in &terms {
                    let in_content = content_counts.get(term.as_str()).copied().unwrap_or(0);
                    let in_title = title_lower.matches(term.as_str()).count();
                    score += in_content as f64 + TITLE_BOOST * in_title as f64;
                    if in_content > 0 && first_match.is_none() {
                        first_match = content_lower.find(term.as_str());
                    }
                }
                if score == 0.0 {
                    return None;
                }
                Some(KnowledgeHit {
                    doc_id: doc.id.clone(),
                    title: doc.title.clone(),
                    score,
                    snippet: snippet_around(&doc.content, first_match.unwrap_or(0)),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        hits
    }
}

fn term_counts(text: &str) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for word in text.split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        if !word.is_empty() {
            *counts.entry(word).or_insert(0) += 1;
        }
    }
    counts
}

fn snippet_around(content: &str, byte_pos: usize) -> String {
    // The match position came from a lowercased copy; clamp it to a char
    // boundary of the original before slicing.
    let mut byte_pos = byte_pos.min(content.len());
    while byte_pos > 0 && !content.is_char_boundary(byte_pos) {
        byte_pos -= 1;
    }
    let start = content[..byte_pos.min(content.len())]
        .char_indices()
        .rev()
        .take(SNIPPET_RADIUS)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = content[byte_pos.min(content.len())..]
        .char_indices()
        .take(SNIPPET_RADIUS)
        .last()
        .map(|(i, c)| byte_pos + i + c.len_utf8())
        .unwrap_or(content.len());
    content[start..end].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> KnowledgeStore {
        let mut store = KnowledgeStore::new();
        store.add_doc(
            "doc-1",
            "Quarterly retention report",
            "Customer retention improved in Q3. Retention drivers include onboarding changes.",
        );
        store.add_doc(
            "doc-2",
            "Infrastructure notes",
            "Database migrations and deployment runbooks.",
        );
        store
    }

    #[test]
    fn test_search_ranks_matching_doc_first() {
        let hits = store().search("retention", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, "doc-1");
        assert!(hits[0].score > 0.0);
        assert!(hits[0].snippet.to_lowercase().contains("retention"));
    }

    #[test]
    fn test_title_boost_outranks_content_matches() {
        let mut store = KnowledgeStore::new();
        store.add_doc("a", "deploy", "nothing relevant");
        store.add_doc("b", "misc", "deploy appears once here");
        let hits = store.search("deploy", 5);
        assert_eq!(hits[0].doc_id, "a");
    }

    #[test]
    fn test_no_match_returns_empty() {
        assert!(store().search("zebra", 5).is_empty());
        assert!(store().search("", 5).is_empty());
        assert!(store().search("!!!", 5).is_empty());
    }

    #[test]
    fn test_top_k_truncates() {
        let mut store = KnowledgeStore::new();
        for i in 0..10 {
            store.add_doc(format!("d{}", i), "apples", "apples everywhere");
        }
        assert_eq!(store.search("apples", 3).len(), 3);
    }
}
