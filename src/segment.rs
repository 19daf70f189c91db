//! Paragraph segmentation for the reading view.
//!
//! Raw text is split on blank lines into segments with stable indices. The
//! split keeps intentional blank paragraphs as empty segments, so an anchor
//! saved against segment 7 still points at the same paragraph after reload.
//! Each segment also carries markup where every word is wrapped in a lookup
//! span keyed by its lowercase form.

use crate::config::Language;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static ENGLISH_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z]+(?:'[A-Za-z]+)?").expect("english word pattern should compile")
});
static UNICODE_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\p{L}+(?:-\p{L}+)*(?:'\p{L}+)?").expect("unicode word pattern should compile")
});

/// One addressable paragraph of the compiled text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    pub raw_text: String,
    pub rendered_markup: String,
    /// Lookup keys of the word spans, in reading order.
    pub words: Vec<String>,
}

impl Segment {
    pub fn is_empty(&self) -> bool {
        self.raw_text.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Segmenter {
    language: Language,
}

impl Segmenter {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn segment(&self, raw_text: &str) -> Vec<Segment> {
        split_paragraphs(raw_text)
            .into_iter()
            .enumerate()
            .map(|(index, raw_text)| {
                let (rendered_markup, words) = self.wrap_words(&raw_text);
                Segment {
                    index,
                    raw_text,
                    rendered_markup,
                    words,
                }
            })
            .collect()
    }

    fn word_pattern(&self) -> &'static Regex {
        match self.language {
            Language::En => &ENGLISH_WORD,
            Language::De | Language::Fr => &UNICODE_WORD,
        }
    }

    fn wrap_words(&self, text: &str) -> (String, Vec<String>) {
        let mut markup = String::with_capacity(text.len() * 2);
        let mut words = Vec::new();
        let mut last = 0usize;

        for token in self.word_pattern().find_iter(text) {
            if token.start() > last {
                markup.push_str(&escape_html(&text[last..token.start()]));
            }
            let key = word_key(token.as_str());
            markup.push_str("<span class=\"word\" data-w=\"");
            markup.push_str(&escape_html(&key));
            markup.push_str("\">");
            markup.push_str(&escape_html(token.as_str()));
            markup.push_str("</span>");
            words.push(key);
            last = token.end();
        }
        if last < text.len() {
            markup.push_str(&escape_html(&text[last..]));
        }

        (markup, words)
    }
}

/// Normalized lookup key for a clicked or searched word.
pub fn word_key(word: &str) -> String {
    word.nfc().collect::<String>().to_lowercase()
}

/// Split text into paragraphs on blank lines. A blank line with nothing
/// buffered becomes an empty paragraph, including a trailing one.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    if text.is_empty() {
        return paragraphs;
    }
    let mut buffer: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            if buffer.is_empty() {
                paragraphs.push(String::new());
            } else {
                paragraphs.push(buffer.join("\n"));
                buffer.clear();
            }
        } else {
            buffer.push(line);
        }
    }

    if !buffer.is_empty() {
        paragraphs.push(buffer.join("\n"));
    }

    paragraphs
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_segments() {
        assert!(Segmenter::default().segment("").is_empty());
    }

    #[test]
    fn blank_lines_close_paragraphs_and_keep_empty_ones() {
        let segments = Segmenter::default().segment("one\ntwo\n\n\nthree\n   \nfour");
        let texts: Vec<&str> = segments.iter().map(|s| s.raw_text.as_str()).collect();
        assert_eq!(texts, vec!["one\ntwo", "", "three", "four"]);
        let indices: Vec<usize> = segments.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert!(segments[1].is_empty());
        assert_eq!(segments[1].rendered_markup, "");
    }

    #[test]
    fn leading_blank_line_is_an_addressable_segment() {
        let segments = Segmenter::default().segment("\nfirst");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].raw_text, "");
        assert_eq!(segments[1].raw_text, "first");
    }

    #[test]
    fn trailing_blank_line_is_kept() {
        let segmenter = Segmenter::default();
        let texts = |text: &str| {
            segmenter
                .segment(text)
                .into_iter()
                .map(|s| s.raw_text)
                .collect::<Vec<_>>()
        };
        assert_eq!(texts("a\n\n"), vec!["a", ""]);
        assert_eq!(texts("a\n"), vec!["a"]);
        assert_eq!(texts("a\r\n\r\n"), vec!["a", ""]);
    }

    #[test]
    fn crlf_input_matches_lf_input() {
        let segmenter = Segmenter::default();
        let lf = segmenter.segment("a\nb\n\nc");
        let crlf = segmenter.segment("a\r\nb\r\n\r\nc");
        assert_eq!(lf, crlf);
    }

    #[test]
    fn resegmenting_is_deterministic() {
        let text = "Alpha beta.\n\nGamma <delta> & \"epsilon\".\n\n\nZeta's end";
        let segmenter = Segmenter::default();
        assert_eq!(segmenter.segment(text), segmenter.segment(text));
    }

    #[test]
    fn words_become_lookup_spans_and_the_rest_is_escaped() {
        let segments = Segmenter::default().segment("Don't <stop> & Go");
        let seg = &segments[0];
        assert_eq!(seg.words, vec!["don't", "stop", "go"]);
        assert_eq!(
            seg.rendered_markup,
            "<span class=\"word\" data-w=\"don't\">Don't</span> &lt;\
             <span class=\"word\" data-w=\"stop\">stop</span>&gt; &amp; \
             <span class=\"word\" data-w=\"go\">Go</span>"
        );
    }

    #[test]
    fn unicode_languages_keep_accented_and_hyphenated_words() {
        let segments = Segmenter::new(Language::Fr).segment("L'été est-il Déjà là?");
        assert_eq!(segments[0].words, vec!["l'été", "est-il", "déjà", "là"]);

        let english = Segmenter::new(Language::En).segment("Déjà");
        assert_eq!(english[0].words, vec!["d", "j"]);
    }

    #[test]
    fn word_key_normalizes_composed_forms() {
        assert_eq!(word_key("Cafe\u{301}"), word_key("CAFÉ"));
    }
}
