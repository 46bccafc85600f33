//! PairMerger (§4.3): a pure streaming reduction over pair-key–contiguous
//! input — group consecutive records sharing a pair key, concatenate their
//! feature lists, and keep only groups meeting `min_matches`.

use crate::collections::ClusteredInsertHashmap;
use crate::index::DocId;
use crate::pairrec::{Feature, PairRecord};

/// Consumes `records` (which must already be pair-key–contiguous, per §5's
/// ordering guarantee obtained by an external sort between `pairs` and
/// `merge`) and calls `emit` once per surviving merged record.
///
/// Uses `ClusteredInsertHashmap`, which checks only the most-recently
/// inserted key before falling back to a hash lookup — the right structure
/// for data that arrives in contiguous runs but isn't guaranteed to never
/// repeat a key later in the stream.
pub fn merge_pairs<I, F>(records: I, min_matches: usize, mut emit: F)
where
    I: IntoIterator<Item = PairRecord>,
    F: FnMut(PairRecord),
{
    let mut grouped: ClusteredInsertHashmap<(DocId, DocId), Vec<Feature>> =
        ClusteredInsertHashmap::new();

    for record in records {
        let key = record.pair_key();
        let features = record.features;

        grouped.insert_with_or_else(
            key,
            || features.clone(),
            |existing| existing.extend(features.clone()),
        );
    }

    for ((doc_a, doc_b), features) in grouped.into_iter() {
        if features.len() >= min_matches {
            emit(PairRecord {
                doc_a,
                doc_b,
                features,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairrec::Feature;

    fn feature(total: u32) -> Feature {
        Feature {
            token: String::new(),
            total_freq: total,
            tf_a: 1,
            tf_b: 1,
        }
    }

    #[test]
    fn concatenates_contiguous_runs_of_same_pair() {
        let records = vec![
            PairRecord {
                doc_a: 1,
                doc_b: 2,
                features: vec![feature(1)],
            },
            PairRecord {
                doc_a: 1,
                doc_b: 2,
                features: vec![feature(2)],
            },
            PairRecord {
                doc_a: 1,
                doc_b: 3,
                features: vec![feature(1)],
            },
        ];

        let mut merged = Vec::new();
        merge_pairs(records, 1, |r| merged.push(r));

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].features.len(), 2);
        assert_eq!(merged[1].features.len(), 1);
    }

    #[test]
    fn drops_groups_below_min_matches() {
        let records = vec![PairRecord {
            doc_a: 1,
            doc_b: 2,
            features: vec![feature(1)],
        }];

        let mut merged = Vec::new();
        merge_pairs(records, 2, |r| merged.push(r));

        assert!(merged.is_empty());
    }
}
