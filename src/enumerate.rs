//! PairEnumerator (§4.2): walks an index part's posting lists and emits
//! candidate cross-series document pairs sharing a rare enough n-gram
//! feature.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::hashing::{hash_pair, hash_str};
use crate::index::{DocId, IndexStore, PostingsEntry};
use crate::pairrec::{Feature, PairRecord};
use crate::series::{SeriesId, SeriesMap};

#[derive(Debug, Clone)]
pub struct EnumerateConfig {
    pub max_series: u32,
    pub max_df: u32,
    pub modp: u64,
    pub modrec: u64,
    pub step: usize,
    pub stride: usize,
    pub word_length: f64,
    pub stopwords: HashSet<String>,
}

impl Default for EnumerateConfig {
    fn default() -> Self {
        Self {
            max_series: 100,
            max_df: 100,
            modp: 1,
            modrec: 1,
            step: 0,
            stride: 1000,
            word_length: 1.5,
            stopwords: HashSet::new(),
        }
    }
}

impl EnumerateConfig {
    fn upper(&self) -> u64 {
        let n = self.max_series as u64;
        n.saturating_mul(n.saturating_sub(1)) / 2
    }
}

struct Candidate {
    doc_a: DocId,
    doc_b: DocId,
    tf_a: u32,
    tf_b: u32,
    series_a: SeriesId,
    series_b: SeriesId,
    total_freq: u32,
}

/// Per-key filtering and cross-count pruning shared by both emission modes
/// (§4.2 steps 1-4). Returns `None` if the key itself is pruned (stopword
/// membership, mean token length, or cross-count/totalFreq bound).
fn candidates_for_key(
    entry: &PostingsEntry,
    series_map: &SeriesMap,
    config: &EnumerateConfig,
) -> Option<Vec<Candidate>> {
    let tokens: Vec<&str> = entry.key.split('~').collect();

    if tokens.iter().any(|t| config.stopwords.contains(*t)) {
        return None;
    }

    let mean_len: f64 =
        tokens.iter().map(|t| t.chars().count()).sum::<usize>() as f64 / tokens.len().max(1) as f64;

    if mean_len < config.word_length {
        return None;
    }

    let mut group_sizes: HashMap<SeriesId, u64> = HashMap::new();
    for posting in &entry.postings {
        *group_sizes
            .entry(series_map.series_of(posting.doc_id))
            .or_insert(0) += 1;
    }

    let sizes: Vec<u64> = group_sizes.values().copied().collect();
    let mut cross_count = 0u64;
    for i in 0..sizes.len() {
        for j in (i + 1)..sizes.len() {
            cross_count += sizes[i] * sizes[j];
        }
    }

    let upper = config.upper();
    let total_freq = entry.document_frequency();

    if cross_count > upper || total_freq as u64 > upper {
        return None;
    }

    let mut candidates = Vec::new();

    for i in 0..entry.postings.len() {
        for j in (i + 1)..entry.postings.len() {
            let a = &entry.postings[i];
            let b = &entry.postings[j];

            let (a, b) = if a.doc_id < b.doc_id { (a, b) } else { (b, a) };

            let series_a = series_map.series_of(a.doc_id);
            let series_b = series_map.series_of(b.doc_id);

            if series_a == series_b {
                continue;
            }

            if a.tf > config.max_df || b.tf > config.max_df {
                continue;
            }

            candidates.push(Candidate {
                doc_a: a.doc_id,
                doc_b: b.doc_id,
                tf_a: a.tf,
                tf_b: b.tf,
                series_a,
                series_b,
                total_freq,
            });
        }
    }

    Some(candidates)
}

fn accepted_by_hash(config: &EnumerateConfig, key: &str) -> bool {
    config.modp <= 1 || hash_str(key) % config.modp == 0
}

fn accepted_by_record_hash(config: &EnumerateConfig, a: DocId, b: DocId) -> bool {
    config.modrec <= 1 || hash_pair(a, b) % config.modrec == 0
}

/// Streams candidate pair records to `emit`, in key-scan order (§5 ordering
/// guarantee). `emit` is called once per surviving `(docA, docB)` candidate.
pub fn enumerate_pairs<F: FnMut(PairRecord)>(
    index: &dyn IndexStore,
    series_map: &SeriesMap,
    config: &EnumerateConfig,
    mut emit: F,
) -> std::io::Result<()> {
    let skip = config.step * config.stride;

    for entry in index.postings_iter(skip, config.stride) {
        let entry = entry?;

        if !accepted_by_hash(config, &entry.key) {
            continue;
        }

        let Some(candidates) = candidates_for_key(&entry, series_map, config) else {
            continue;
        };

        for c in candidates {
            if !accepted_by_record_hash(config, c.doc_a, c.doc_b) {
                continue;
            }

            emit(PairRecord {
                doc_a: c.doc_a,
                doc_b: c.doc_b,
                features: vec![Feature {
                    token: String::new(),
                    total_freq: c.total_freq,
                    tf_a: c.tf_a,
                    tf_b: c.tf_b,
                }],
            });
        }
    }

    Ok(())
}

/// `--counts` mode: a histogram of emitted pair counts by
/// `(seriesA, seriesB)` rather than individual records (§4.2 output modes).
pub fn enumerate_counts(
    index: &dyn IndexStore,
    series_map: &SeriesMap,
    config: &EnumerateConfig,
) -> std::io::Result<HashMap<(SeriesId, SeriesId), u64>> {
    let skip = config.step * config.stride;
    let mut histogram: HashMap<(SeriesId, SeriesId), u64> = HashMap::new();

    for entry in index.postings_iter(skip, config.stride) {
        let entry = entry?;

        if !accepted_by_hash(config, &entry.key) {
            continue;
        }

        let Some(candidates) = candidates_for_key(&entry, series_map, config) else {
            continue;
        };

        for c in candidates {
            if !accepted_by_record_hash(config, c.doc_a, c.doc_b) {
                continue;
            }

            let key = if c.series_a <= c.series_b {
                (c.series_a, c.series_b)
            } else {
                (c.series_b, c.series_a)
            };
            *histogram.entry(key).or_insert(0) += 1;
        }
    }

    if histogram.is_empty() {
        warn!("pair enumeration produced no cross-series candidates for this shard");
    }

    Ok(histogram)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{MemoryIndex, Posting};

    fn build_index() -> (MemoryIndex, SeriesMap) {
        let mut index = MemoryIndex::new();
        let names = vec!["nyt/1", "nyt/2", "tribune/1"];
        for name in &names {
            index.add_document(name, vec![], vec![], Default::default());
        }
        index.add_posting(
            "the~quick~brown",
            vec![
                Posting {
                    doc_id: 0,
                    tf: 1,
                    positions: vec![0],
                },
                Posting {
                    doc_id: 2,
                    tf: 1,
                    positions: vec![5],
                },
            ],
        );

        let series_map = SeriesMap::from_names(names);
        (index, series_map)
    }

    #[test]
    fn emits_cross_series_pair_only() {
        let (index, series_map) = build_index();
        let config = EnumerateConfig::default();

        let mut emitted = Vec::new();
        enumerate_pairs(&index, &series_map, &config, |rec| emitted.push(rec)).unwrap();

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].pair_key(), (0, 2));
    }

    #[test]
    fn max_series_one_excludes_everything() {
        let (index, series_map) = build_index();
        let config = EnumerateConfig {
            max_series: 1,
            ..Default::default()
        };

        let mut emitted = Vec::new();
        enumerate_pairs(&index, &series_map, &config, |rec| emitted.push(rec)).unwrap();

        assert!(emitted.is_empty());
    }

    #[test]
    fn stopword_drops_the_key() {
        let (index, series_map) = build_index();
        let mut stopwords = HashSet::new();
        stopwords.insert("the".to_string());
        let config = EnumerateConfig {
            stopwords,
            ..Default::default()
        };

        let mut emitted = Vec::new();
        enumerate_pairs(&index, &series_map, &config, |rec| emitted.push(rec)).unwrap();

        assert!(emitted.is_empty());
    }

    #[test]
    fn counts_mode_groups_by_series_pair() {
        let (index, series_map) = build_index();
        let config = EnumerateConfig::default();

        let histogram = enumerate_counts(&index, &series_map, &config).unwrap();
        assert_eq!(histogram.values().sum::<u64>(), 1);
    }
}
