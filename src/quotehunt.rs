//! Reference-text mode (§4.6): aligns one or more reference documents
//! against the corpus index directly, without a precomputed pair stream.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::align::{swg_align, SubstitutionMatrix};
use crate::index::{DocId, IndexStore, Metadata};
use crate::tokenizer::Tokenizer;

/// One reference document: its external name and raw text.
#[derive(Debug, Clone)]
pub struct ReferenceDoc {
    pub name: String,
    pub text: String,
}

/// A reference token carries back a pointer to the document and position it
/// came from, since reference input may span several documents concatenated
/// end to end (§4.6 step 1).
#[derive(Debug, Clone)]
struct ReferenceToken {
    term: String,
    ref_name: String,
}

pub struct QuoteHunterConfig {
    pub ngram: usize,
    pub max_count: u32,
    pub max_gap: u32,
    pub min_score: f64,
    pub bad_docs: std::collections::HashSet<DocId>,
}

impl Default for QuoteHunterConfig {
    fn default() -> Self {
        Self {
            ngram: 5,
            max_count: 1000,
            max_gap: 200,
            min_score: 0.0,
            bad_docs: std::collections::HashSet::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct PageHit {
    ref_pos: u32,
    df: u32,
    corpus_positions: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct QuoteHit {
    pub page: DocId,
    pub page_name: String,
    pub date: Option<String>,
    pub title: Option<String>,
    pub language: Option<String>,
    pub url: Option<String>,
    pub score: f64,
    pub matches: u32,
    pub gaps: u32,
    pub swscore: f64,
    pub cites: Vec<String>,
    pub text1: String,
    pub align1: String,
    pub align2: String,
}

/// Runs the full reference-text hunt against `index`, tokenizing with
/// `tokenizer`. Returns one `QuoteHit` per surviving span, ranked by
/// descending score (§6 emits them as a JSON stream in that order).
pub fn hunt(
    refs: &[ReferenceDoc],
    index: &dyn IndexStore,
    tokenizer: &dyn Tokenizer,
    config: &QuoteHunterConfig,
) -> Vec<QuoteHit> {
    let mut ref_tokens: Vec<ReferenceToken> = Vec::new();

    for doc in refs {
        let tokenized = tokenizer.tokenize(&doc.text);
        for term in tokenized.terms {
            ref_tokens.push(ReferenceToken {
                term,
                ref_name: doc.name.clone(),
            });
        }
    }

    if ref_tokens.len() < config.ngram || config.ngram == 0 {
        return Vec::new();
    }

    // Build the reference n-gram sequence, then probe the index for each
    // distinct key, skipping keys the posting list excludes on grounds of
    // count or bad-document membership (§4.6 step 2).
    let mut per_page: HashMap<DocId, Vec<PageHit>> = HashMap::new();

    for ref_pos in 0..=(ref_tokens.len() - config.ngram) {
        let key = ref_tokens[ref_pos..ref_pos + config.ngram]
            .iter()
            .map(|t| t.term.as_str())
            .collect::<Vec<_>>()
            .join("~");

        let Some(postings) = index.posting_list(&key) else {
            continue;
        };

        let df = postings.len() as u32;
        if df == 0 || df as u32 > config.max_count {
            continue;
        }

        for posting in &postings {
            if config.bad_docs.contains(&posting.doc_id) {
                continue;
            }

            per_page
                .entry(posting.doc_id)
                .or_default()
                .push(PageHit {
                    ref_pos: ref_pos as u32,
                    df,
                    corpus_positions: posting.positions.clone(),
                });
        }
    }

    let mut hits = Vec::new();

    for (page, mut page_hits) in per_page {
        page_hits.sort_by_key(|h| h.ref_pos);

        for span in chain_page_hits(&page_hits, config.max_gap) {
            if span.score < config.min_score {
                continue;
            }

            if let Some(hit) = build_hit(
                page,
                &span,
                &ref_tokens,
                index,
                config.ngram,
            ) {
                hits.push(hit);
            }
        }
    }

    // f64 has no total order, so sort strongest spans first via OrderedFloat
    // rather than a custom partial_cmp dance (§4.6 step 7: hits are ranked,
    // not merely discovered).
    hits.sort_by_key(|h| std::cmp::Reverse(OrderedFloat(h.score)));

    hits
}

struct PageSpan {
    ref_start: u32,
    ref_end: u32,
    corpus_start: u32,
    corpus_end: u32,
    score: f64,
}

/// Splits one page's hits into spans wherever the reference-position gap to
/// the next hit exceeds `max_gap`, scoring each span by `Σ log1p(1/df)`
/// (rarer n-grams contribute more, §4.6 step 4).
fn chain_page_hits(hits: &[PageHit], max_gap: u32) -> Vec<PageSpan> {
    if hits.is_empty() {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut chain: Vec<&PageHit> = vec![&hits[0]];

    for hit in &hits[1..] {
        let last = chain.last().unwrap();
        if hit.ref_pos.saturating_sub(last.ref_pos) > max_gap {
            spans.push(span_from_chain(&chain));
            chain = vec![hit];
        } else {
            chain.push(hit);
        }
    }

    spans.push(span_from_chain(&chain));
    spans
}

fn span_from_chain(chain: &[&PageHit]) -> PageSpan {
    let ref_start = chain.iter().map(|h| h.ref_pos).min().unwrap();
    let ref_end = chain.iter().map(|h| h.ref_pos).max().unwrap() + 1;

    let corpus_start = chain
        .iter()
        .flat_map(|h| h.corpus_positions.iter().copied())
        .min()
        .unwrap_or(0);
    let corpus_end = chain
        .iter()
        .flat_map(|h| h.corpus_positions.iter().copied())
        .max()
        .unwrap_or(0)
        + 1;

    let score: f64 = chain.iter().map(|h| (1.0 / h.df as f64).ln_1p()).sum();

    PageSpan {
        ref_start,
        ref_end,
        corpus_start,
        corpus_end,
        score,
    }
}

const CONTEXT_WINDOW: u32 = 50;

/// Fetches ±50 tokens of context on each side, runs SWG, and maps the
/// resulting char bounds back to word offsets by counting spaces consumed,
/// matching the technique `align.rs` uses for anchor passages (§4.6 step 6).
fn build_hit(
    page: DocId,
    span: &PageSpan,
    ref_tokens: &[ReferenceToken],
    index: &dyn IndexStore,
    ngram: usize,
) -> Option<QuoteHit> {
    let page_tokens = index.tokens_of(page)?;

    let ref_start = span.ref_start.saturating_sub(CONTEXT_WINDOW) as usize;
    let ref_end = ((span.ref_end as usize + ngram - 1) + CONTEXT_WINDOW as usize)
        .min(ref_tokens.len());
    let ref_slice = &ref_tokens[ref_start..ref_end];
    let ref_text = ref_slice
        .iter()
        .map(|t| t.term.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let corpus_start = span.corpus_start.saturating_sub(CONTEXT_WINDOW) as usize;
    let corpus_end = ((span.corpus_end as usize + ngram - 1) + CONTEXT_WINDOW as usize)
        .min(page_tokens.len());
    let corpus_slice = &page_tokens[corpus_start..corpus_end.max(corpus_start)];
    let corpus_text = corpus_slice.join(" ");

    let result = swg_align(&ref_text, &corpus_text, 5.0, 0.5, &SubstitutionMatrix)?;

    let stats = crate::align::Alignment {
        sequence1: result.sequence1.clone(),
        sequence2: result.sequence2.clone(),
        start1: 0,
        start2: 0,
        end1: 0,
        end2: 0,
    }
    .stats(&SubstitutionMatrix);

    let cites: Vec<String> = {
        let mut names: Vec<String> = ref_slice.iter().map(|t| t.ref_name.clone()).collect();
        names.sort();
        names.dedup();
        names
    };

    let metadata = index.metadata_of(page).cloned().unwrap_or_default();
    let page_name = index.name_of(page).unwrap_or("").to_string();
    let url = compute_url(page, corpus_slice, &metadata);

    debug!(page = page, score = span.score, "quote hunt span accepted");

    Some(QuoteHit {
        page,
        page_name,
        date: metadata.date,
        title: metadata.title,
        language: metadata.language,
        url,
        score: span.score,
        matches: stats.matches,
        gaps: stats.gaps,
        swscore: stats.swscore,
        cites,
        text1: ref_text,
        align1: result.sequence1,
        align2: result.sequence2,
    })
}

/// URL construction per §4.6: prefer inline OCR `coords=` attributes (an
/// archive-hosted page-image crop), fall back to a `<w p=…>` page anchor,
/// fall back to the plain metadata URL.
fn compute_url(_page: DocId, corpus_tokens: &[String], metadata: &Metadata) -> Option<String> {
    let base = metadata.url.clone();

    for token in corpus_tokens {
        if let Some(coords) = extract_attr(token, "coords") {
            let parts: Vec<&str> = coords.split(',').collect();
            if parts.len() == 4 {
                return base.map(|u| format!("{u}#coords={coords}"));
            }
        }
    }

    for token in corpus_tokens {
        if let Some(page_num) = extract_attr(token, "p") {
            return base.map(|u| format!("{u}#p={page_num}"));
        }
    }

    base
}

fn extract_attr(token: &str, attr: &str) -> Option<String> {
    let needle = format!("{attr}=\"");
    let start = token.find(&needle)? + needle.len();
    let rest = &token[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{MemoryIndex, Posting};
    use crate::tokenizer::UnicodeTokenizer;

    fn build_index() -> MemoryIndex {
        let mut index = MemoryIndex::new();
        let tokens: Vec<String> = "the quick brown fox jumps over the lazy dog today"
            .split_whitespace()
            .map(|s| s.to_string())
            .collect();
        let offsets = tokens.iter().map(|_| (0u32, 0u32)).collect();
        let page = index.add_document("nyt/1865-01-01", tokens.clone(), offsets, Metadata::default());

        for window in tokens.windows(5) {
            let key = window.join("~");
            index.add_posting(
                &key,
                vec![Posting {
                    doc_id: page,
                    tf: 1,
                    positions: vec![0],
                }],
            );
        }

        index
    }

    #[test]
    fn finds_a_quote_shared_with_the_corpus() {
        let index = build_index();
        let tokenizer = UnicodeTokenizer;
        let refs = vec![ReferenceDoc {
            name: "ref-1".to_string(),
            text: "the quick brown fox jumps over".to_string(),
        }];
        let config = QuoteHunterConfig {
            ngram: 5,
            ..Default::default()
        };

        let hits = hunt(&refs, &index, &tokenizer, &config);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].page_name, "nyt/1865-01-01");
        assert_eq!(hits[0].cites, vec!["ref-1".to_string()]);
    }

    #[test]
    fn empty_reference_text_yields_no_hits() {
        let index = build_index();
        let tokenizer = UnicodeTokenizer;
        let refs = vec![ReferenceDoc {
            name: "ref-1".to_string(),
            text: String::new(),
        }];

        let hits = hunt(&refs, &index, &tokenizer, &QuoteHunterConfig::default());
        assert!(hits.is_empty());
    }

    #[test]
    fn min_score_filters_weak_spans() {
        let index = build_index();
        let tokenizer = UnicodeTokenizer;
        let refs = vec![ReferenceDoc {
            name: "ref-1".to_string(),
            text: "the quick brown fox jumps over".to_string(),
        }];
        let config = QuoteHunterConfig {
            ngram: 5,
            min_score: 1000.0,
            ..Default::default()
        };

        let hits = hunt(&refs, &index, &tokenizer, &config);
        assert!(hits.is_empty());
    }

    #[test]
    fn bad_docs_excludes_a_page_even_when_it_shares_the_quote() {
        // Two documents carrying the exact same text, so every n-gram key's
        // posting list has both doc ids from the start (`add_posting` pushes
        // a fresh entry rather than merging into an existing key).
        let mut index = MemoryIndex::new();
        let tokens: Vec<String> = "the quick brown fox jumps over the lazy dog today"
            .split_whitespace()
            .map(|s| s.to_string())
            .collect();
        let offsets: Vec<(u32, u32)> = tokens.iter().map(|_| (0u32, 0u32)).collect();
        let good_page = index.add_document(
            "nyt/1865-01-01",
            tokens.clone(),
            offsets.clone(),
            Metadata::default(),
        );
        let other_page = index.add_document(
            "tribune/1865-01-01",
            tokens.clone(),
            offsets,
            Metadata::default(),
        );

        for window in tokens.windows(5) {
            let key = window.join("~");
            index.add_posting(
                &key,
                vec![
                    Posting {
                        doc_id: good_page,
                        tf: 1,
                        positions: vec![0],
                    },
                    Posting {
                        doc_id: other_page,
                        tf: 1,
                        positions: vec![0],
                    },
                ],
            );
        }

        let tokenizer = UnicodeTokenizer;
        let refs = vec![ReferenceDoc {
            name: "ref-1".to_string(),
            text: "the quick brown fox jumps over".to_string(),
        }];

        let mut bad_docs = std::collections::HashSet::new();
        bad_docs.insert(other_page);
        let config = QuoteHunterConfig {
            ngram: 5,
            bad_docs,
            ..Default::default()
        };

        let hits = hunt(&refs, &index, &tokenizer, &config);
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.page != other_page));
        assert!(hits.iter().any(|h| h.page_name == "nyt/1865-01-01"));
    }
}
