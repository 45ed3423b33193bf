use std::sync::Arc;

use crate::summary::links::{KeywordLinkTable, LinkStyle};

/// Accumulates streamed summary fragments and keeps a link-annotated rendering.
///
/// Raw text is kept separately from the annotated output, so links are only
/// ever computed over model text. Once a position is far enough from the end
/// of the buffer that no phrase starting there could still grow, its output
/// is committed and never scanned again; each update only re-annotates the
/// short uncommitted tail.
pub struct IncrementalAnnotator {
    table: Arc<KeywordLinkTable>,
    style: LinkStyle,
    raw: String,
    committed: String,
    committed_raw: usize,
}

impl IncrementalAnnotator {
    pub fn new(table: Arc<KeywordLinkTable>, style: LinkStyle) -> Self {
        Self {
            table,
            style,
            raw: String::new(),
            committed: String::new(),
            committed_raw: 0,
        }
    }

    /// Append a fragment and commit whatever can no longer change.
    pub fn push(&mut self, fragment: &str) {
        self.raw.push_str(fragment);
        let horizon = self
            .raw
            .len()
            .saturating_sub(self.table.max_phrase_len().saturating_sub(1));
        self.commit_until(horizon);
    }

    /// The accumulated text so far, annotated as if the stream ended here.
    pub fn render(&self) -> String {
        let mut out = self.committed.clone();
        out.push_str(
            &self
                .table
                .annotate(&self.raw[self.committed_raw..], self.style),
        );
        out.trim().to_string()
    }

    /// Annotate the remaining tail and return the final summary.
    pub fn finish(&mut self) -> String {
        self.commit_until(self.raw.len());
        self.committed.trim().to_string()
    }

    /// Raw model text received so far.
    #[cfg(test)]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    fn commit_until(&mut self, horizon: usize) {
        let mut pos = self.committed_raw;
        while pos < horizon {
            let Some(ch) = self.raw[pos..].chars().next() else {
                break;
            };
            pos += self
                .table
                .step(&self.raw, pos, ch, self.style, &mut self.committed);
        }
        self.committed_raw = pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotator() -> IncrementalAnnotator {
        IncrementalAnnotator::new(Arc::new(KeywordLinkTable::builtin()), LinkStyle::Markdown)
    }

    #[test]
    fn test_phrase_split_across_fragments_is_linked() {
        let mut a = annotator();
        for part in ["Signs of Cotton PB", "W Damage Sym", "ptom are visible."] {
            a.push(part);
        }
        let out = a.finish();
        let url = KeywordLinkTable::builtin()
            .url_for("Cotton PBW Damage Symptom")
            .unwrap()
            .to_string();
        assert_eq!(
            out,
            format!("Signs of [Cotton PBW Damage Symptom]({url}) are visible.")
        );
    }

    #[test]
    fn test_render_matches_full_annotation_at_every_step() {
        let table = KeywordLinkTable::builtin();
        let text = "  Whitefly and whiteflies spread. Cotton Whitefly damage symptoms and \
                    Pink Bollworm (PBW) damage; Moth of Yellow Stem borer on paddy crop.  ";
        let mut a = annotator();
        let mut so_far = String::new();
        for ch in text.chars() {
            let fragment = ch.to_string();
            a.push(&fragment);
            so_far.push_str(&fragment);
            assert_eq!(
                a.render(),
                table.annotate(&so_far, LinkStyle::Markdown).trim()
            );
        }
        assert_eq!(a.finish(), table.annotate(text, LinkStyle::Markdown).trim());
        assert_eq!(a.raw(), text);
    }

    #[test]
    fn test_short_match_waits_for_possible_longer_phrase() {
        let mut a = annotator();
        a.push("Whitefly");
        // "Whitefly damage symptoms" could still follow, so nothing is committed
        assert_eq!(a.committed_raw, 0);
        a.push(" damage symptoms were seen across the whole field this season");
        let out = a.finish();
        assert!(out.starts_with("[Whitefly damage symptoms]("));
    }

    #[test]
    fn test_commits_stable_prefix() {
        let mut a = annotator();
        a.push(&"x".repeat(200));
        let max = KeywordLinkTable::builtin().max_phrase_len();
        assert_eq!(a.committed_raw, 200 - (max - 1));
    }

    #[test]
    fn test_empty_table_commits_everything() {
        let mut a = IncrementalAnnotator::new(
            Arc::new(KeywordLinkTable::new(Vec::<(String, String)>::new())),
            LinkStyle::Markdown,
        );
        a.push("plain text");
        assert_eq!(a.committed_raw, "plain text".len());
        assert_eq!(a.render(), "plain text");
    }

    #[test]
    fn test_finish_trims_whitespace() {
        let mut a = annotator();
        a.push("\n  Thrips  \n");
        assert!(a.finish().starts_with("[Thrips]("));
    }
}
