//! The candidate-pair record format passed between `pairs`, `merge`, and
//! `scores` (§6): one record per line, `[[docA docB] [[token totalFreq tfA
//! tfB] ...]]`. A minimal EDN-like bracketed tuple syntax, not JSON, matching
//! the textual shape the distilled spec gives verbatim.

use std::fmt;

use crate::index::DocId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub token: String,
    pub total_freq: u32,
    pub tf_a: u32,
    pub tf_b: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairRecord {
    pub doc_a: DocId,
    pub doc_b: DocId,
    pub features: Vec<Feature>,
}

impl PairRecord {
    /// `docA < docB` is an invariant of every well-formed record (§3); this
    /// lets callers assert it rather than re-deriving the ordering.
    pub fn pair_key(&self) -> (DocId, DocId) {
        (self.doc_a, self.doc_b)
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }
}

impl fmt::Display for PairRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[[{} {}] [", self.doc_a, self.doc_b)?;
        for (i, feat) in self.features.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(
                f,
                "[\"{}\" {} {} {}]",
                escape(&feat.token),
                feat.total_freq,
                feat.tf_a,
                feat.tf_b
            )?;
        }
        write!(f, "]]")
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[derive(Debug)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed pair record: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

/// A tiny hand-rolled tokenizer/parser for the bracketed tuple grammar.
/// There is no need for a general EDN library here: the grammar is exactly
/// `[`, `]`, whitespace-separated integers, and double-quoted strings.
struct Tokens<'a> {
    rest: &'a str,
}

enum Tok<'a> {
    LBracket,
    RBracket,
    Int(i64),
    Str(String),
    #[allow(dead_code)]
    Ignore(&'a str),
}

impl<'a> Tokens<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s.trim() }
    }

    fn next(&mut self) -> Result<Option<Tok<'a>>, ParseError> {
        self.rest = self.rest.trim_start();

        if self.rest.is_empty() {
            return Ok(None);
        }

        let mut chars = self.rest.char_indices();
        let (_, first) = chars.next().unwrap();

        match first {
            '[' => {
                self.rest = &self.rest[1..];
                Ok(Some(Tok::LBracket))
            }
            ']' => {
                self.rest = &self.rest[1..];
                Ok(Some(Tok::RBracket))
            }
            '"' => {
                let mut out = String::new();
                let mut iter = self.rest[1..].char_indices();
                let mut consumed = 1;

                loop {
                    match iter.next() {
                        Some((i, '\\')) => {
                            if let Some((j, escaped)) = iter.next() {
                                out.push(escaped);
                                consumed = j + escaped.len_utf8() + 1;
                            } else {
                                return Err(ParseError("unterminated escape".to_string()));
                            }
                            let _ = i;
                        }
                        Some((i, '"')) => {
                            consumed = i + 2;
                            break;
                        }
                        Some((i, c)) => {
                            out.push(c);
                            consumed = i + c.len_utf8() + 1;
                        }
                        None => return Err(ParseError("unterminated string".to_string())),
                    }
                }

                self.rest = &self.rest[consumed..];
                Ok(Some(Tok::Str(out)))
            }
            c if c == '-' || c.is_ascii_digit() => {
                let end = self.rest[1..]
                    .find(|c: char| !c.is_ascii_digit())
                    .map(|i| i + 1)
                    .unwrap_or(self.rest.len());
                let (num_str, rest) = self.rest.split_at(end);
                let n: i64 = num_str
                    .parse()
                    .map_err(|_| ParseError(format!("bad integer: {num_str}")))?;
                self.rest = rest;
                Ok(Some(Tok::Int(n)))
            }
            other => Err(ParseError(format!("unexpected character: {other}"))),
        }
    }
}

fn expect_lbracket(toks: &mut Tokens) -> Result<(), ParseError> {
    match toks.next()? {
        Some(Tok::LBracket) => Ok(()),
        _ => Err(ParseError("expected '['".to_string())),
    }
}

fn expect_rbracket(toks: &mut Tokens) -> Result<(), ParseError> {
    match toks.next()? {
        Some(Tok::RBracket) => Ok(()),
        _ => Err(ParseError("expected ']'".to_string())),
    }
}

fn expect_int(toks: &mut Tokens) -> Result<i64, ParseError> {
    match toks.next()? {
        Some(Tok::Int(n)) => Ok(n),
        _ => Err(ParseError("expected integer".to_string())),
    }
}

fn expect_str(toks: &mut Tokens) -> Result<String, ParseError> {
    match toks.next()? {
        Some(Tok::Str(s)) => Ok(s),
        _ => Err(ParseError("expected string".to_string())),
    }
}

/// Parses one line into a `PairRecord`. A blank line is an error — callers
/// are expected to filter blank lines before calling this, matching the
/// "malformed record line is fatal" rule in §7.
pub fn parse_pair_record(line: &str) -> Result<PairRecord, ParseError> {
    let mut toks = Tokens::new(line);

    expect_lbracket(&mut toks)?; // outer
    expect_lbracket(&mut toks)?; // [docA docB]
    let doc_a = expect_int(&mut toks)? as DocId;
    let doc_b = expect_int(&mut toks)? as DocId;
    expect_rbracket(&mut toks)?;

    expect_lbracket(&mut toks)?; // feature list
    let mut features = Vec::new();

    loop {
        self_peek_rbracket_or_feature(&mut toks, &mut features)?;
        if features.is_empty() {
            break;
        }
        match toks.rest.trim_start().chars().next() {
            Some('[') => continue,
            _ => break,
        }
    }

    expect_rbracket(&mut toks)?; // feature list close
    expect_rbracket(&mut toks)?; // outer close

    Ok(PairRecord {
        doc_a,
        doc_b,
        features,
    })
}

fn self_peek_rbracket_or_feature(
    toks: &mut Tokens,
    features: &mut Vec<Feature>,
) -> Result<(), ParseError> {
    toks.rest = toks.rest.trim_start();

    if toks.rest.starts_with(']') {
        return Ok(());
    }

    expect_lbracket(toks)?;
    let token = expect_str(toks)?;
    let total_freq = expect_int(toks)? as u32;
    let tf_a = expect_int(toks)? as u32;
    let tf_b = expect_int(toks)? as u32;
    expect_rbracket(toks)?;

    features.push(Feature {
        token,
        total_freq,
        tf_a,
        tf_b,
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_single_feature_record() {
        let record = PairRecord {
            doc_a: 3,
            doc_b: 7,
            features: vec![Feature {
                token: String::new(),
                total_freq: 5,
                tf_a: 3,
                tf_b: 2,
            }],
        };

        let line = record.to_string();
        let parsed = parse_pair_record(&line).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn parses_multi_feature_record() {
        let line = r#"[[1 2] [["" 5 3 2] ["" 2 1 1]]]"#;
        let parsed = parse_pair_record(line).unwrap();

        assert_eq!(parsed.doc_a, 1);
        assert_eq!(parsed.doc_b, 2);
        assert_eq!(parsed.features.len(), 2);
        assert_eq!(parsed.features[1].total_freq, 2);
    }

    #[test]
    fn parses_record_with_empty_feature_list() {
        let line = "[[1 2] []]";
        let parsed = parse_pair_record(line).unwrap();
        assert!(parsed.features.is_empty());
    }

    #[test]
    fn rejects_malformed_line() {
        assert!(parse_pair_record("not a record").is_err());
        assert!(parse_pair_record("[[1 2]").is_err());
    }
}
