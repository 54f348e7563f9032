//! Run coalescing for highlighter economy.
//!
//! Consecutive refined tokens sharing content type and link tag become a
//! single highlighter range, minimizing downstream highlighter churn. The
//! original per-print fragments are preserved inside each run so listeners
//! still observe every `(text, content_type)` pair in emission order.

use crate::content::{ContentType, LinkTag};
use crate::normalize::RefinedToken;

/// A merged run of adjacent same-tagged tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoalescedRun {
    pub content_type: ContentType,
    pub link: Option<LinkTag>,
    /// Original fragments, in emission order. One highlighter covers all.
    pub parts: Vec<RefinedToken>,
}

impl CoalescedRun {
    /// Total character length of the run.
    pub fn len(&self) -> usize {
        self.parts.iter().map(|p| p.text.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Merges adjacent tokens with identical content type and link tag.
pub fn coalesce(tokens: Vec<RefinedToken>) -> Vec<CoalescedRun> {
    let mut runs: Vec<CoalescedRun> = Vec::new();
    for token in tokens {
        match runs.last_mut() {
            Some(run) if run.content_type == token.content_type && run.link == token.link => {
                run.parts.push(token);
            }
            _ => runs.push(CoalescedRun {
                content_type: token.content_type,
                link: token.link,
                parts: vec![token],
            }),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str, content_type: ContentType, link: Option<LinkTag>) -> RefinedToken {
        RefinedToken {
            text: text.to_string(),
            content_type,
            link,
        }
    }

    #[test]
    fn merges_adjacent_same_tag() {
        let runs = coalesce(vec![
            tok("a", ContentType::Normal, None),
            tok("b", ContentType::Normal, None),
            tok("c", ContentType::Error, None),
        ]);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].len(), 2);
        assert_eq!(runs[0].parts.len(), 2);
        assert_eq!(runs[1].parts[0].text, "c");
    }

    #[test]
    fn link_tag_breaks_a_run() {
        let runs = coalesce(vec![
            tok("a", ContentType::Normal, Some(LinkTag(1))),
            tok("b", ContentType::Normal, Some(LinkTag(2))),
        ]);
        assert_eq!(runs.len(), 2);
    }

    #[test]
    fn parts_keep_emission_order() {
        let runs = coalesce(vec![
            tok("first", ContentType::Normal, None),
            tok("second", ContentType::Normal, None),
            tok("third", ContentType::Normal, None),
        ]);
        assert_eq!(runs.len(), 1);
        let texts: Vec<&str> = runs[0].parts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[test]
    fn empty_input_yields_no_runs() {
        assert!(coalesce(Vec::new()).is_empty());
    }
}
