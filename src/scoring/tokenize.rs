//! Segment tokenizers applied before BLEU n-gram counting.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// How hypothesis and reference text is split into BLEU tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum BleuTokenizer {
    /// mteval-v13a: punctuation split off, numbers kept together
    #[default]
    #[serde(rename = "13a")]
    #[value(name = "13a")]
    Mteval13a,

    /// One token per non-whitespace character, for unsegmented CJK text
    #[serde(rename = "char")]
    #[value(name = "char")]
    Char,

    /// Whitespace split only
    #[serde(rename = "none")]
    #[value(name = "none")]
    Whitespace,
}

impl BleuTokenizer {
    pub fn tokenize(self, line: &str) -> Vec<String> {
        match self {
            BleuTokenizer::Mteval13a  => tokenize_13a(line),
            BleuTokenizer::Char       => line.chars().filter(|c| !c.is_whitespace()).map(String::from).collect(),
            BleuTokenizer::Whitespace => line.split_whitespace().map(String::from).collect(),
        }
    }
}

impl std::fmt::Display for BleuTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BleuTokenizer::Mteval13a  => "13a",
            BleuTokenizer::Char       => "char",
            BleuTokenizer::Whitespace => "none",
        };
        f.write_str(name)
    }
}

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\{-~\[-`\x20-&\(-\+:-@/])").expect("Invalid 13a punctuation regex"));
static PERIOD_BEFORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^0-9])([\.,])").expect("Invalid 13a period regex"));
static PERIOD_AFTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\.,])([^0-9])").expect("Invalid 13a period regex"));
static DIGIT_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9])(-)").expect("Invalid 13a dash regex"));

fn tokenize_13a(line: &str) -> Vec<String> {
    let mut text = line
        .replace("<skipped>", "")
        .replace("-\n", "")
        .replace('\n', " ");
    if text.contains('&') {
        text = text
            .replace("&quot;", "\"")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">");
    }

    let text = format!(" {text} ");
    let text = PUNCTUATION.replace_all(&text, " ${1} ");
    let text = PERIOD_BEFORE.replace_all(&text, "${1} ${2} ");
    let text = PERIOD_AFTER.replace_all(&text, " ${1} ${2}");
    let text = DIGIT_DASH.replace_all(&text, "${1} ${2} ");

    text.split_whitespace().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_13a_splits_punctuation() {
        assert_eq!(
            BleuTokenizer::Mteval13a.tokenize("Hello, world! (yes)"),
            ["Hello", ",", "world", "!", "(", "yes", ")"]
        );
    }

    #[test]
    fn test_13a_keeps_numbers_together() {
        assert_eq!(BleuTokenizer::Mteval13a.tokenize("costs 3.50 now."), ["costs", "3.50", "now", "."]);
        assert_eq!(BleuTokenizer::Mteval13a.tokenize("1,000"), ["1,000"]);
        assert_eq!(BleuTokenizer::Mteval13a.tokenize("2010-2011"), ["2010", "-", "2011"]);
    }

    #[test]
    fn test_13a_unescapes_entities() {
        assert_eq!(BleuTokenizer::Mteval13a.tokenize("a &amp; b"), ["a", "&", "b"]);
    }

    #[test]
    fn test_char_tokenizer_drops_spaces() {
        assert_eq!(BleuTokenizer::Char.tokenize("오늘은 추워요"), ["오", "늘", "은", "추", "워", "요"]);
    }
}
