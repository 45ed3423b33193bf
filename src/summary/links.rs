//! Keyword-to-hyperlink table applied to generated summaries.
//!
//! Phrases are matched case-sensitively as literal substrings using a
//! leftmost-longest scan: at each position the longest phrase that starts
//! there wins, and matched text is never scanned again. Overlapping phrases
//! such as "Whitefly" and "Cotton Whitefly damage symptom" therefore cannot
//! produce nested or broken links, whatever order the table was written in.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// How a matched phrase is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStyle {
    /// `[phrase](url)`
    #[default]
    Markdown,
    /// `<a href="url" style="text-decoration: underline;">phrase</a>`
    Html,
}

impl LinkStyle {
    pub fn render(self, phrase: &str, url: &str) -> String {
        match self {
            LinkStyle::Markdown => format!("[{phrase}]({url})"),
            LinkStyle::Html => {
                format!(r#"<a href="{url}" style="text-decoration: underline;">{phrase}</a>"#)
            }
        }
    }
}

impl FromStr for LinkStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(LinkStyle::Markdown),
            "html" => Ok(LinkStyle::Html),
            other => anyhow::bail!("Unknown link style: {other}"),
        }
    }
}

/// Google Drive file ids of the reference images, keyed by the phrase that links to them.
const BUILTIN_LINKS: &[(&str, &str)] = &[
    ("Thrips", "1Tnps02E_hBCgrdiS3etVV_J3hjT0xEyf"),
    ("Whitefly", "15GYYUISigHrHrsBgYAKpoZxA6r0iDrlA"),
    ("White Fly", "15GYYUISigHrHrsBgYAKpoZxA6r0iDrlA"),
    ("whiteflies", "15GYYUISigHrHrsBgYAKpoZxA6r0iDrlA"),
    ("PBW", "1q4m7tiVgwD3NJynFYKmhrRbSKtJOwsVe"),
    ("Pink Bollworm", "1q4m7tiVgwD3NJynFYKmhrRbSKtJOwsVe"),
    ("pink bollworms", "1q4m7tiVgwD3NJynFYKmhrRbSKtJOwsVe"),
    ("Cotton PBW Larva", "1l8HOlfZNbce_qHbaZujXO4KB_ug_SZZ3"),
    ("Cotton Whitefly damage symptom", "1o9NIiU0nEHDQF6t0fnIuNgv1suFpUME7"),
    ("Cotton Whitefly damage symptoms", "1o9NIiU0nEHDQF6t0fnIuNgv1suFpUME7"),
    ("damage symptoms of Cotton Whitefly", "1o9NIiU0nEHDQF6t0fnIuNgv1suFpUME7"),
    ("Whitefly damage symptoms", "1o9NIiU0nEHDQF6t0fnIuNgv1suFpUME7"),
    ("Fall Army worm", "1VxQ3IRVa78fIQE1sS8eLLQCaqLZQtZ2f"),
    ("Fall Army Worm", "1VxQ3IRVa78fIQE1sS8eLLQCaqLZQtZ2f"),
    ("Fall Armyworm", "1VxQ3IRVa78fIQE1sS8eLLQCaqLZQtZ2f"),
    ("FF adult on Mango", "11qedO5ek3yBkwcOabgSlHmFZWSDoyCo_"),
    ("FF damage to Indian crops", "11qedO5ek3yBkwcOabgSlHmFZWSDoyCo_"),
    ("fruit flies on mangoes", "11qedO5ek3yBkwcOabgSlHmFZWSDoyCo_"),
    ("FF Egg laying", "1BVaNTtlG9Y7nSiOUqAS7yhfVnjDLPMkr"),
    ("FF fruit damage", "1oSRuO3M2D1wfiTPqA9VSxzSgambN7BXF"),
    ("FF Larve damage", "1Nr_ZwQEAIlgWoNjIEuXW_LG5yu_s7eHT"),
    ("FF Oozing", "1Sht1JZGlg_SqUWo0rN1stPL1FGqUYGtZ"),
    ("FF Puncture", "1cBvmJFCmRveDTwiP6FEHO_leylieq9rR"),
    ("Fruit Fly", "1cBvmJFCmRveDTwiP6FEHO_leylieq9rR"),
    ("Fruitfly in Mango fruit", "16zarIaupOIWAK2GrpBmQy214MqLfML53"),
    ("Fruitfly in Mango leaf", "1de4XhE1RQ5GKvOZcmkoz9Yi-q1JlQo1w"),
    (
        "bore hole caused by larva of Yellow stem borer",
        "1guo1cO2f1IjRPztTiZS9OemjFLq8KTiP",
    ),
    ("bore hole of YSB larva", "1_k0msr8JRUp5uUUKh5dVBHepLNzb-Oyd"),
    ("larva of Yellow stem borer", "1L9WOrmqUPOUrzib17USsXrBWU6EcgYxX"),
    (
        "Moth of Yellow Stem borer on paddy crop",
        "12J37UHo_P5zPWAn4zU3zw35nDdzsIp1K",
    ),
    ("Moth of Yellow Stem borer", "1St9fNNmMy1Sy_p_W6hTtjqhHF2UbGyfb"),
    (
        "RICE- Yellow stem borer- Scirpophaga incertulas",
        "1dw5hlAwPQFk5WodHbY72FkWwLDmdmCMr",
    ),
    ("Cotton PBW Damage Symptom", "1q4m7tiVgwD3NJynFYKmhrRbSKtJOwsVe"),
    (
        "symptoms for Pink Bollworm (PBW) damage",
        "1q4m7tiVgwD3NJynFYKmhrRbSKtJOwsVe",
    ),
    (
        "symptoms of Cotton Whitefly damage",
        "1q4m7tiVgwD3NJynFYKmhrRbSKtJOwsVe",
    ),
    (
        "Cotton PBW (Pink Bollworm) Damage Symptoms",
        "1q4m7tiVgwD3NJynFYKmhrRbSKtJOwsVe",
    ),
    (
        "Cotton PBW (Pink Bollworm) Damage Symptom",
        "1q4m7tiVgwD3NJynFYKmhrRbSKtJOwsVe",
    ),
];

fn drive_url(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{file_id}/view?usp=share_link")
}

/// Static phrase → URL mapping, kept sorted longest phrase first.
#[derive(Debug, Clone)]
pub struct KeywordLinkTable {
    entries: Vec<(String, String)>,
    max_phrase_len: usize,
}

impl KeywordLinkTable {
    /// Build a table. Phrases are trimmed; empty phrases are dropped and a
    /// repeated phrase keeps its last URL.
    pub fn new<P, U>(pairs: impl IntoIterator<Item = (P, U)>) -> Self
    where
        P: Into<String>,
        U: Into<String>,
    {
        let mut by_phrase: BTreeMap<String, String> = BTreeMap::new();
        for (phrase, url) in pairs {
            let phrase = phrase.into().trim().to_string();
            if phrase.is_empty() {
                continue;
            }
            by_phrase.insert(phrase, url.into());
        }

        let mut entries: Vec<(String, String)> = by_phrase.into_iter().collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        let max_phrase_len = entries.first().map(|(p, _)| p.len()).unwrap_or(0);

        Self {
            entries,
            max_phrase_len,
        }
    }

    /// The pest and disease reference images shipped with the app.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_LINKS
                .iter()
                .map(|(phrase, file_id)| (*phrase, drive_url(file_id))),
        )
    }

    /// Load a JSON object of `"phrase": "url"` pairs.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read link table {}", path.display()))?;
        let pairs: BTreeMap<String, String> =
            serde_json::from_str(&data).context("Link table must be a JSON object of strings")?;
        Ok(Self::new(pairs))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Byte length of the longest phrase.
    pub fn max_phrase_len(&self) -> usize {
        self.max_phrase_len
    }

    #[cfg(test)]
    pub fn url_for(&self, phrase: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == phrase)
            .map(|(_, u)| u.as_str())
    }

    /// Longest phrase starting at byte offset `pos` of `text`.
    pub fn longest_match_at(&self, text: &str, pos: usize) -> Option<(&str, &str)> {
        let rest = text.get(pos..)?;
        self.entries
            .iter()
            .find(|(phrase, _)| rest.starts_with(phrase.as_str()))
            .map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Link every phrase occurrence in `text`.
    pub fn annotate(&self, text: &str, style: LinkStyle) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        while let Some(ch) = text[pos..].chars().next() {
            pos += self.step(text, pos, ch, style, &mut out);
        }
        out
    }

    /// Emit either the phrase match or the single char at `pos`; returns bytes consumed.
    pub(crate) fn step(
        &self,
        text: &str,
        pos: usize,
        ch: char,
        style: LinkStyle,
        out: &mut String,
    ) -> usize {
        match self.longest_match_at(text, pos) {
            Some((phrase, url)) => {
                out.push_str(&style.render(phrase, url));
                phrase.len()
            }
            None => {
                out.push(ch);
                ch.len_utf8()
            }
        }
    }
}

impl Default for KeywordLinkTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Substitute phrases one at a time in table order, the way a naive
    /// `str::replace` loop over a flat map would.
    fn replace_in_order(pairs: &[(&str, &str)], text: &str) -> String {
        let mut result = text.to_string();
        for (phrase, url) in pairs {
            result = result.replace(phrase, &LinkStyle::Markdown.render(phrase, url));
        }
        result
    }

    #[test]
    fn test_links_exact_phrase() {
        let table = KeywordLinkTable::builtin();
        let out = table.annotate("Look for Thrips on the leaves.", LinkStyle::Markdown);
        assert_eq!(
            out,
            format!(
                "Look for [Thrips]({}) on the leaves.",
                drive_url("1Tnps02E_hBCgrdiS3etVV_J3hjT0xEyf")
            )
        );
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let table = KeywordLinkTable::builtin();
        let text = "thrips are small";
        assert_eq!(table.annotate(text, LinkStyle::Markdown), text);
    }

    #[test]
    fn test_table_order_substitution_corrupts_overlapping_phrases() {
        let short_first = [("Whitefly", "https://a"), ("Cotton Whitefly damage symptom", "https://b")];
        let long_first = [("Cotton Whitefly damage symptom", "https://b"), ("Whitefly", "https://a")];
        let text = "See Cotton Whitefly damage symptom here";

        // Short phrase first: the long phrase never gets its link
        assert_eq!(
            replace_in_order(&short_first, text),
            "See Cotton [Whitefly](https://a) damage symptom here"
        );
        // Long phrase first: the short phrase is relinked inside the first link
        assert_eq!(
            replace_in_order(&long_first, text),
            "See [Cotton [Whitefly](https://a) damage symptom](https://b) here"
        );

        // The table gives the same, correct answer for either input order
        let expected = "See [Cotton Whitefly damage symptom](https://b) here";
        assert_eq!(
            KeywordLinkTable::new(short_first).annotate(text, LinkStyle::Markdown),
            expected
        );
        assert_eq!(
            KeywordLinkTable::new(long_first).annotate(text, LinkStyle::Markdown),
            expected
        );
    }

    #[test]
    fn test_longest_match_prefers_plural() {
        let table = KeywordLinkTable::builtin();
        let out = table.annotate("Cotton Whitefly damage symptoms appear", LinkStyle::Markdown);
        assert!(out.starts_with("[Cotton Whitefly damage symptoms]("));
        assert!(out.ends_with(") appear"));
    }

    #[test]
    fn test_nested_phrase_inside_longer_match_is_not_relinked() {
        let table = KeywordLinkTable::builtin();
        let out = table.annotate("Cotton PBW (Pink Bollworm) Damage Symptom", LinkStyle::Markdown);
        assert_eq!(out.matches("](").count(), 1);
        assert!(out.starts_with("[Cotton PBW (Pink Bollworm) Damage Symptom]("));
    }

    #[test]
    fn test_annotate_is_not_reapplied_to_links() {
        let table = KeywordLinkTable::new([("PBW", "https://x/PBW")]);
        let out = table.annotate("PBW", LinkStyle::Markdown);
        assert_eq!(out, "[PBW](https://x/PBW)");
    }

    #[test]
    fn test_html_style() {
        let table = KeywordLinkTable::new([("Fruit Fly", "https://f")]);
        let out = table.annotate("A Fruit Fly.", LinkStyle::Html);
        assert_eq!(
            out,
            r#"A <a href="https://f" style="text-decoration: underline;">Fruit Fly</a>."#
        );
    }

    #[test]
    fn test_handles_multibyte_text() {
        let table = KeywordLinkTable::new([("PBW", "https://p")]);
        let out = table.annotate("गुलाबी PBW सुंडी", LinkStyle::Markdown);
        assert_eq!(out, "गुलाबी [PBW](https://p) सुंडी");
    }

    #[test]
    fn test_builtin_table_is_sorted_longest_first() {
        let table = KeywordLinkTable::builtin();
        assert_eq!(table.len(), BUILTIN_LINKS.len());
        assert_eq!(
            table.max_phrase_len(),
            "RICE- Yellow stem borer- Scirpophaga incertulas".len()
        );
        assert!(table
            .entries
            .windows(2)
            .all(|w| w[0].0.len() >= w[1].0.len()));
    }

    #[test]
    fn test_new_trims_and_drops_empty_phrases() {
        let table = KeywordLinkTable::new([(" PBW ", "u1"), ("  ", "u2"), ("PBW", "u3")]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.url_for("PBW"), Some("u3"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.json");
        std::fs::write(&path, r#"{"Thrips": "https://t", "Mealybug": "https://m"}"#).unwrap();
        let table = KeywordLinkTable::from_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.url_for("Mealybug"), Some("https://m"));
    }

    #[test]
    fn test_from_file_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.json");
        std::fs::write(&path, r#"["Thrips"]"#).unwrap();
        assert!(KeywordLinkTable::from_file(&path).is_err());
    }

    #[test]
    fn test_link_style_parse() {
        assert_eq!("HTML".parse::<LinkStyle>().unwrap(), LinkStyle::Html);
        assert_eq!("markdown".parse::<LinkStyle>().unwrap(), LinkStyle::Markdown);
        assert!("bbcode".parse::<LinkStyle>().is_err());
    }
}
