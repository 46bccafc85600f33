//! Anchor-chained passage discovery and Smith-Waterman-Gotoh local alignment
//! (§4.4, §4.6). Shared by `PairAligner` (anchors recomputed directly from the
//! two documents' token streams) and `QuoteHunter` (anchors recomputed from
//! index hits against a reference text).

use tracing::warn;

/// A passage-level local alignment result: the token spans that were aligned
/// plus the gapped character strings the SWG step produced for them.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub sequence1: String,
    pub sequence2: String,
    pub start1: u32,
    pub start2: u32,
    pub end1: u32,
    pub end2: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentStats {
    pub matches: u32,
    pub gaps: u32,
    pub swscore: f64,
}

impl Alignment {
    pub fn zero_span() -> Self {
        Self {
            sequence1: String::new(),
            sequence2: String::new(),
            start1: 0,
            start2: 0,
            end1: 0,
            end2: 0,
        }
    }

    pub fn match_len1(&self) -> u32 {
        self.end1 - self.start1
    }

    pub fn match_len2(&self) -> u32 {
        self.end2 - self.start2
    }

    /// `matches` (count of equal non-gap char positions), `gaps` (count of
    /// gap runs) and `swscore` are recomputed from the final gapped strings
    /// rather than threaded separately through the recursion, so stats are
    /// always consistent with what was actually emitted.
    pub fn stats(&self, scorer: &SubstitutionMatrix) -> AlignmentStats {
        let chars1: Vec<char> = self.sequence1.chars().collect();
        let chars2: Vec<char> = self.sequence2.chars().collect();

        let mut matches = 0u32;
        let mut gaps = 0u32;
        let mut in_gap = false;
        let mut swscore = 0.0f64;

        for (a, b) in chars1.iter().zip(chars2.iter()) {
            if *a == '-' || *b == '-' {
                if !in_gap {
                    gaps += 1;
                    in_gap = true;
                }
                continue;
            }

            in_gap = false;

            if a == b {
                matches += 1;
            }

            swscore += scorer.score(*a, *b);
        }

        AlignmentStats {
            matches,
            gaps,
            swscore,
        }
    }
}

/// Identity substitution matrix over alphanumeric characters: matching
/// alphanumerics score `+1`, mismatching alphanumerics score `-1`.
/// Non-alphanumeric characters (punctuation retained from the joined token
/// text) are scored neutrally so they neither reward nor strongly punish
/// an alignment that passes through them.
pub struct SubstitutionMatrix;

impl SubstitutionMatrix {
    pub fn score(&self, a: char, b: char) -> f64 {
        if a.is_alphanumeric() && b.is_alphanumeric() {
            if a == b {
                1.0
            } else {
                -1.0
            }
        } else if a == b {
            0.0
        } else {
            -0.5
        }
    }
}

/// A safety bound on the SWG dynamic-programming table size, standing in
/// for the source's `catch OutOfMemoryError`: beyond this many cells we
/// refuse to run full alignment and report degradation instead.
const MAX_ALIGN_CELLS: usize = 4_000_000;

/// Result of a single SWG run: the gapped output strings, plus the
/// (char-offset, exclusive) bounds within the *original* `seq1`/`seq2` that
/// the local alignment actually covers. Local alignment trims any
/// non-matching prefix/suffix entirely (it never appears in the gapped
/// output at all), so recovering those bounds requires the traceback's
/// start/end rows, not just re-scanning the gapped strings.
#[derive(Debug, Clone, PartialEq)]
pub struct SwgResult {
    pub sequence1: String,
    pub sequence2: String,
    pub char_start1: usize,
    pub char_end1: usize,
    pub char_start2: usize,
    pub char_end2: usize,
}

/// Gotoh affine-gap local alignment over two character sequences.
/// `gap_open` is the cost to open a new gap, `gap_extend` the cost per
/// additional residue of an already-open gap.
pub fn swg_align(
    seq1: &str,
    seq2: &str,
    gap_open: f64,
    gap_extend: f64,
    scorer: &SubstitutionMatrix,
) -> Option<SwgResult> {
    let a: Vec<char> = seq1.chars().collect();
    let b: Vec<char> = seq2.chars().collect();
    let n = a.len();
    let m = b.len();

    if n == 0 || m == 0 {
        return Some(SwgResult {
            sequence1: String::new(),
            sequence2: String::new(),
            char_start1: 0,
            char_end1: 0,
            char_start2: 0,
            char_end2: 0,
        });
    }

    if n.saturating_mul(m) > MAX_ALIGN_CELLS {
        return None;
    }

    const NEG_INF: f64 = f64::NEG_INFINITY / 2.0;

    let rows = n + 1;
    let cols = m + 1;
    let mut h = vec![0.0f64; rows * cols];
    let mut ix = vec![NEG_INF; rows * cols]; // gap in seq2 (consuming seq1)
    let mut iy = vec![NEG_INF; rows * cols]; // gap in seq1 (consuming seq2)

    let idx = |i: usize, j: usize| i * cols + j;

    let mut best = 0.0f64;
    let mut best_i = 0usize;
    let mut best_j = 0usize;

    for i in 1..=n {
        for j in 1..=m {
            let diag = h[idx(i - 1, j - 1)]
                .max(ix[idx(i - 1, j - 1)])
                .max(iy[idx(i - 1, j - 1)])
                + scorer.score(a[i - 1], b[j - 1]);

            ix[idx(i, j)] = (h[idx(i - 1, j)] - gap_open).max(ix[idx(i - 1, j)] - gap_extend);
            iy[idx(i, j)] = (h[idx(i, j - 1)] - gap_open).max(iy[idx(i, j - 1)] - gap_extend);

            let cell = diag.max(ix[idx(i, j)]).max(iy[idx(i, j)]).max(0.0);
            h[idx(i, j)] = cell;

            if cell > best {
                best = cell;
                best_i = i;
                best_j = j;
            }
        }
    }

    // Traceback from the best-scoring cell to the first zero.
    let mut out1 = Vec::new();
    let mut out2 = Vec::new();
    let (mut i, mut j) = (best_i, best_j);

    while i > 0 && j > 0 && h[idx(i, j)] > 0.0 {
        let diag = h[idx(i - 1, j - 1)]
            .max(ix[idx(i - 1, j - 1)])
            .max(iy[idx(i - 1, j - 1)])
            + scorer.score(a[i - 1], b[j - 1]);

        if (h[idx(i, j)] - diag).abs() < 1e-9 {
            out1.push(a[i - 1]);
            out2.push(b[j - 1]);
            i -= 1;
            j -= 1;
        } else if (h[idx(i, j)] - ix[idx(i, j)]).abs() < 1e-9 {
            out1.push(a[i - 1]);
            out2.push('-');
            i -= 1;
        } else {
            out1.push('-');
            out2.push(b[j - 1]);
            j -= 1;
        }
    }

    out1.reverse();
    out2.reverse();

    Some(SwgResult {
        sequence1: out1.into_iter().collect(),
        sequence2: out2.into_iter().collect(),
        char_start1: i,
        char_end1: best_i,
        char_start2: j,
        char_end2: best_j,
    })
}

/// A raw n-gram match between the two documents being compared: token
/// position `pos1` in document 1 aligns with `pos2` in document 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub pos1: u32,
    pub pos2: u32,
}

/// Finds every shared n-gram of width `ngram` between `w1` and `w2`,
/// returning one `Hit` per matching position pair. This is the "feature
/// matches, each carrying positions in each document" the anchor chainer
/// consumes (§4.4 step 2) — recomputed directly from the token streams
/// rather than threaded through the pair record, since the enumerator's
/// emitted records carry only aggregate counts, not positions (§4.2 step 5).
pub fn local_ngram_matches(w1: &[String], w2: &[String], ngram: usize) -> Vec<Hit> {
    use std::collections::HashMap;

    if ngram == 0 || w1.len() < ngram || w2.len() < ngram {
        return Vec::new();
    }

    let mut by_key: HashMap<String, Vec<u32>> = HashMap::new();

    for pos in 0..=(w2.len() - ngram) {
        let key = w2[pos..pos + ngram].join("~");
        by_key.entry(key).or_default().push(pos as u32);
    }

    let mut hits = Vec::new();

    for pos in 0..=(w1.len() - ngram) {
        let key = w1[pos..pos + ngram].join("~");

        if let Some(positions) = by_key.get(&key) {
            for &pos2 in positions {
                hits.push(Hit {
                    pos1: pos as u32,
                    pos2,
                });
            }
        }
    }

    hits
}

/// A token span pair bounding one dense chain of hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub start1: u32,
    pub end1: u32,
    pub start2: u32,
    pub end2: u32,
}

/// Chains hits into one or more passages: sorted by `pos1`, a new passage
/// starts whenever the gap to the next hit (in either document's position
/// space) exceeds `max_gap`, or the chain would require `pos2` to move
/// backwards (non-monotonic hits cannot belong to the same colinear
/// passage). `ngram` extends each hit's contribution by its width so spans
/// cover the full matched n-gram, not just its start position.
pub fn chain_hits(hits: &[Hit], max_gap: u32, ngram: u32) -> Vec<TokenSpan> {
    if hits.is_empty() {
        return Vec::new();
    }

    let mut sorted = hits.to_vec();
    sorted.sort_by_key(|h| (h.pos1, h.pos2));

    let mut spans = Vec::new();
    let mut chain: Vec<Hit> = vec![sorted[0]];

    for hit in &sorted[1..] {
        let last = chain.last().unwrap();
        let gap1 = hit.pos1.saturating_sub(last.pos1);
        let monotonic = hit.pos2 >= last.pos2;

        if !monotonic || gap1 > max_gap {
            spans.push(span_of(&chain, ngram));
            chain = vec![*hit];
        } else {
            chain.push(*hit);
        }
    }

    spans.push(span_of(&chain, ngram));
    spans
}

fn span_of(chain: &[Hit], ngram: u32) -> TokenSpan {
    let start1 = chain.iter().map(|h| h.pos1).min().unwrap();
    let end1 = chain.iter().map(|h| h.pos1).max().unwrap() + ngram;
    let start2 = chain.iter().map(|h| h.pos2).min().unwrap();
    let end2 = chain.iter().map(|h| h.pos2).max().unwrap() + ngram;

    TokenSpan {
        start1,
        end1,
        start2,
        end2,
    }
}

/// Runs SWG over the joined text of the given token span and builds the
/// resulting `Alignment`. Returns `None` if the span is too large to align
/// (the per-passage analogue of the pair-level memory-exhaustion guard).
pub fn align_span(w1: &[String], w2: &[String], span: TokenSpan) -> Option<Alignment> {
    let text1 = w1[span.start1 as usize..span.end1.min(w1.len() as u32) as usize].join(" ");
    let text2 = w2[span.start2 as usize..span.end2.min(w2.len() as u32) as usize].join(" ");

    let result = swg_align(&text1, &text2, 5.0, 0.5, &SubstitutionMatrix)?;

    let (local_start1, local_end1) =
        token_bounds_from_char_bounds(&text1, result.char_start1, result.char_end1);
    let (local_start2, local_end2) =
        token_bounds_from_char_bounds(&text2, result.char_start2, result.char_end2);

    Some(Alignment {
        sequence1: result.sequence1,
        sequence2: result.sequence2,
        start1: span.start1 + local_start1,
        start2: span.start2 + local_start2,
        end1: span.start1 + local_end1,
        end2: span.start2 + local_end2,
    })
}

/// Maps a `[char_start, char_end)` bound within a space-joined token string
/// back to the `[token_start, token_end)` bound it falls within, by counting
/// space characters consumed on each side — the technique described in
/// §4.6 step 6 for mapping aligned character ranges back to word offsets.
fn token_bounds_from_char_bounds(text: &str, char_start: usize, char_end: usize) -> (u32, u32) {
    if char_end <= char_start {
        return (0, 0);
    }

    let start_tok = text.chars().take(char_start).filter(|&c| c == ' ').count() as u32;
    let last_char_idx = char_end - 1;
    let end_tok = text.chars().take(last_char_idx).filter(|&c| c == ' ').count() as u32 + 1;

    (start_tok, end_tok)
}

/// Outcome of aligning one candidate pair. Replaces the source's
/// exception-as-control-flow pattern with an explicit tagged result: a
/// `Degraded` outcome always reports *why*, it never silently swallows the
/// failure the way the source's `catch Exception` in `approx-pass` does.
#[derive(Debug, Clone, PartialEq)]
pub enum AlignmentOutcome {
    Ok(Vec<Alignment>),
    Degraded {
        passages: Vec<Alignment>,
        reason: String,
    },
    Empty,
}

const DEFAULT_ANCHOR_NGRAM: usize = 5;
const MAX_CHAIN_GAP: u32 = 100;

/// Aligns one candidate pair's full token streams per §4.4: anchor-chained
/// passages when `ngram > 0`, or a single full-document SWG alignment when
/// `ngram == 0` (falling back to the anchor passages if that alignment is
/// too large to run, and to an empty result if even those are unavailable).
pub fn align_pair(w1: &[String], w2: &[String], ngram: usize) -> AlignmentOutcome {
    let anchor_ngram = if ngram == 0 { DEFAULT_ANCHOR_NGRAM } else { ngram };
    let hits = local_ngram_matches(w1, w2, anchor_ngram);
    let anchor_spans = chain_hits(&hits, MAX_CHAIN_GAP, anchor_ngram as u32);
    let anchor_passages: Vec<Alignment> = anchor_spans
        .into_iter()
        .filter_map(|span| align_span(w1, w2, span))
        .collect();

    if ngram == 0 {
        let whole1 = w1.join(" ");
        let whole2 = w2.join(" ");

        match swg_align(&whole1, &whole2, 5.0, 0.5, &SubstitutionMatrix) {
            Some(result) => {
                let (start1, end1) =
                    token_bounds_from_char_bounds(&whole1, result.char_start1, result.char_end1);
                let (start2, end2) =
                    token_bounds_from_char_bounds(&whole2, result.char_start2, result.char_end2);

                AlignmentOutcome::Ok(vec![Alignment {
                    sequence1: result.sequence1,
                    sequence2: result.sequence2,
                    start1,
                    start2,
                    end1,
                    end2,
                }])
            }
            None => {
                warn!(reason = "swg-cells-exceeded", "full alignment degraded to anchor passages");

                if anchor_passages.is_empty() {
                    AlignmentOutcome::Empty
                } else {
                    AlignmentOutcome::Degraded {
                        passages: anchor_passages,
                        reason: "swg-cells-exceeded".to_string(),
                    }
                }
            }
        }
    } else if anchor_passages.is_empty() {
        AlignmentOutcome::Empty
    } else {
        AlignmentOutcome::Ok(anchor_passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(|w| w.to_string()).collect()
    }

    #[test]
    fn identical_passages_align_perfectly() {
        let text = "the quick brown fox jumps over the lazy dog again and again and again";
        let w1 = words(text);
        let w2 = words(text);

        match align_pair(&w1, &w2, 5) {
            AlignmentOutcome::Ok(passages) => {
                assert_eq!(passages.len(), 1);
                let stats = passages[0].stats(&SubstitutionMatrix);
                assert_eq!(stats.gaps, 0);
                assert_eq!(passages[0].sequence1, passages[0].sequence2);
            }
            other => panic!("expected Ok, got {other:?}"),
        }
    }

    #[test]
    fn disjoint_texts_yield_empty() {
        let w1 = words("alpha beta gamma delta epsilon");
        let w2 = words("zeta eta theta iota kappa");

        assert_eq!(align_pair(&w1, &w2, 5), AlignmentOutcome::Empty);
    }

    #[test]
    fn full_alignment_mode_has_nonnegative_match_len() {
        let w1 = words("the quick brown fox");
        let w2 = words("a quick brown fox ran");

        match align_pair(&w1, &w2, 0) {
            AlignmentOutcome::Ok(passages) => {
                assert_eq!(passages.len(), 1);
                assert!(passages[0].match_len1() <= w1.len() as u32);
            }
            other => panic!("expected Ok, got {other:?}"),
        }
    }

    #[test]
    fn chain_hits_splits_on_large_gaps() {
        let hits = vec![
            Hit { pos1: 0, pos2: 0 },
            Hit { pos1: 1, pos2: 1 },
            Hit {
                pos1: 1000,
                pos2: 1000,
            },
        ];

        let spans = chain_hits(&hits, 100, 1);
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn swg_align_handles_empty_input() {
        let result = swg_align("", "abc", 5.0, 0.5, &SubstitutionMatrix).unwrap();
        assert_eq!(result.sequence1, "");
        assert_eq!(result.sequence2, "");
    }
}
