//! Opaque word tokenizer boundary (§1, §4.9 of the spec): turns raw text
//! into `(terms, char_begin, char_end)`, offsets in characters (not bytes).

use unicode_segmentation::UnicodeSegmentation;

pub struct TokenizedText {
    pub terms: Vec<String>,
    pub char_begin: Vec<u32>,
    pub char_end: Vec<u32>,
}

impl TokenizedText {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> TokenizedText;
}

/// Default tokenizer: splits on Unicode word boundaries, keeping only
/// boundaries that contain at least one alphanumeric character (discarding
/// pure punctuation/whitespace boundaries), reporting character offsets.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeTokenizer;

impl Tokenizer for UnicodeTokenizer {
    fn tokenize(&self, text: &str) -> TokenizedText {
        let mut terms = Vec::new();
        let mut char_begin = Vec::new();
        let mut char_end = Vec::new();

        // `split_word_bound_indices` reports byte offsets; build a lookup from
        // byte offset to char offset for the (char-boundary-aligned) offsets
        // the iterator actually produces.
        let mut char_idx_at_byte = vec![0u32; text.len() + 1];
        let mut running = 0u32;
        for (byte_idx, _ch) in text.char_indices() {
            char_idx_at_byte[byte_idx] = running;
            running += 1;
        }
        char_idx_at_byte[text.len()] = running;

        for (byte_start, word) in text.split_word_bound_indices() {
            if !word.chars().any(|c| c.is_alphanumeric()) {
                continue;
            }

            let byte_end = byte_start + word.len();
            let begin = char_idx_at_byte[byte_start];
            let end = char_idx_at_byte[byte_end];

            terms.push(word.to_lowercase());
            char_begin.push(begin);
            char_end.push(end);
        }

        TokenizedText {
            terms,
            char_begin,
            char_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_simple_sentence() {
        let tok = UnicodeTokenizer;
        let result = tok.tokenize("The quick, brown fox!");

        assert_eq!(result.terms, vec!["the", "quick", "brown", "fox"]);
        assert_eq!(result.char_begin[0], 0);
        assert_eq!(result.char_end[0], 3);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn skips_pure_punctuation_boundaries() {
        let tok = UnicodeTokenizer;
        let result = tok.tokenize("a--b");

        assert_eq!(result.terms, vec!["a", "b"]);
    }
}
