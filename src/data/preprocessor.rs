// ============================================================
// Layer 4 — Sentence Preprocessor
// ============================================================
// Normalises raw corpus sentences before they are written to
// the split files and tokenised.
//
// Corpus rows scraped from subtitles and web pages often carry:
//   - Ideographic spaces (U+3000) from Japanese text
//   - Non-breaking and zero-width spaces
//   - Embedded line breaks and tabs
//   - Control characters
//
// Cleaning steps (applied in order):
//   1. Map whitespace variants, tabs and line breaks to a plain space
//   2. Drop remaining control characters and the byte order mark
//   3. Collapse runs of spaces and trim both ends
//
// Every sentence comes out as a single line, which keeps one
// row per pair in the split files.

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean one sentence. Returns an owned single-line String.
    pub fn clean(&self, text: &str) -> String {
        let mut out        = String::with_capacity(text.len());
        let mut last_space = true;

        for c in text.chars() {
            let c = match c {
                '\t' | '\n' | '\r' => ' ',
                '\u{00A0}' | '\u{3000}' | '\u{200B}' => ' ',
                '\u{FEFF}' => continue,
                c if c.is_control() => continue,
                c => c,
            };

            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        out.trim_end().to_string()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
