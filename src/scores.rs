//! PairAligner (§4.4): resolves each merged pair's token sequences, runs
//! anchor-chained and/or full SWG alignment, and renders the 16-field TSV
//! alignment record.

use std::fmt;

use tracing::warn;

use crate::align::{align_pair, Alignment, AlignmentOutcome, SubstitutionMatrix};
use crate::index::IndexStore;
use crate::pairrec::PairRecord;

#[derive(Debug, Clone)]
pub struct ScoreRecord {
    pub match_len1: u32,
    pub frac1: f64,
    pub frac2: f64,
    pub matches: u32,
    pub gaps: u32,
    pub swscore: f64,
    pub id1: u32,
    pub id2: u32,
    pub name1: String,
    pub name2: String,
    pub s1: u32,
    pub e1: u32,
    pub s2: u32,
    pub e2: u32,
    pub seq1: String,
    pub seq2: String,
}

impl fmt::Display for ScoreRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.match_len1,
            self.frac1,
            self.frac2,
            self.matches,
            self.gaps,
            self.swscore,
            self.id1,
            self.id2,
            self.name1,
            self.name2,
            self.s1,
            self.e1,
            self.s2,
            self.e2,
            self.seq1,
            self.seq2
        )
    }
}

impl ScoreRecord {
    /// Field order matching `Display`, for writers that want a `csv::Writer`
    /// record rather than a hand-joined string (used by `cmd::scores`).
    pub fn fields(&self) -> [String; 16] {
        [
            self.match_len1.to_string(),
            self.frac1.to_string(),
            self.frac2.to_string(),
            self.matches.to_string(),
            self.gaps.to_string(),
            self.swscore.to_string(),
            self.id1.to_string(),
            self.id2.to_string(),
            self.name1.clone(),
            self.name2.clone(),
            self.s1.to_string(),
            self.e1.to_string(),
            self.s2.to_string(),
            self.e2.to_string(),
            self.seq1.clone(),
            self.seq2.clone(),
        ]
    }
}

/// Aligns one merged pair per §4.4, returning zero or more score records —
/// one per passage whose token span is at least `ngram` long (step 5). A
/// `ngram` of 0 selects full-document SWG alignment inside `align_pair`.
pub fn score_pair(record: &PairRecord, index: &dyn IndexStore, ngram: usize) -> Vec<ScoreRecord> {
    let (id1, id2) = record.pair_key();

    let (Some(name1), Some(name2), Some(w1), Some(w2)) = (
        index.name_of(id1),
        index.name_of(id2),
        index.tokens_of(id1),
        index.tokens_of(id2),
    ) else {
        warn!(id1, id2, "skipping pair: document missing from index");
        return Vec::new();
    };

    let name1 = name1.to_string();
    let name2 = name2.to_string();

    let passages: Vec<Alignment> = match align_pair(w1, w2, ngram) {
        AlignmentOutcome::Ok(passages) => passages,
        AlignmentOutcome::Degraded { passages, reason } => {
            warn!(id1, id2, reason = %reason, "alignment degraded to anchor passages");
            passages
        }
        AlignmentOutcome::Empty => {
            warn!(id1, id2, "alignment unavailable, emitting zero-span record");
            vec![Alignment::zero_span()]
        }
    };

    let scorer = SubstitutionMatrix;

    passages
        .into_iter()
        .filter(|p| p.match_len1() >= ngram as u32)
        .map(|p| {
            let stats = p.stats(&scorer);
            ScoreRecord {
                match_len1: p.match_len1(),
                frac1: p.match_len1() as f64 / w1.len().max(1) as f64,
                frac2: p.match_len2() as f64 / w2.len().max(1) as f64,
                matches: stats.matches,
                gaps: stats.gaps,
                swscore: stats.swscore,
                id1,
                id2,
                name1: name1.clone(),
                name2: name2.clone(),
                s1: p.start1,
                e1: p.end1,
                s2: p.start2,
                e2: p.end2,
                seq1: p.sequence1,
                seq2: p.sequence2,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Metadata, MemoryIndex};
    use crate::pairrec::Feature;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(|w| w.to_string()).collect()
    }

    #[test]
    fn aligns_a_shared_passage() {
        let mut index = MemoryIndex::new();
        let text = "the quick brown fox jumps over the lazy dog again and again";
        let a = index.add_document("nyt/1", words(text), vec![], Metadata::default());
        let b = index.add_document("tribune/1", words(text), vec![], Metadata::default());

        let record = PairRecord {
            doc_a: a,
            doc_b: b,
            features: vec![Feature {
                token: String::new(),
                total_freq: 2,
                tf_a: 1,
                tf_b: 1,
            }],
        };

        let scores = score_pair(&record, &index, 5);
        assert_eq!(scores.len(), 1);
        assert!(scores[0].match_len1 > 0);
        assert_eq!(scores[0].name1, "nyt/1");
    }

    #[test]
    fn missing_document_yields_no_records() {
        let index = MemoryIndex::new();
        let record = PairRecord {
            doc_a: 0,
            doc_b: 1,
            features: vec![],
        };

        assert!(score_pair(&record, &index, 5).is_empty());
    }
}
