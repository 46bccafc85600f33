//! Static `docId -> seriesId` mapping used to suppress within-series matches.
//!
//! A document name decomposes into `(series, issue)` via a fixed delimiter
//! convention: everything before the first `/` is the series, everything
//! after is the issue (`nyt/1865-01-03` -> series `nyt`). A name with no
//! `/` is its own, single-document series.

use std::io;

use crate::collections::IncrementalId;
use crate::index::DocId;

pub type SeriesId = u32;

/// Sentinel returned for ids outside the known range. Series id 0 is never
/// assigned to a real series (interning starts at 1), so equality tests
/// against the sentinel behave correctly for out-of-range lookups.
pub const UNKNOWN_SERIES: SeriesId = 0;

#[derive(Debug, Clone)]
pub struct SeriesMap {
    doc_to_series: Vec<SeriesId>,
}

/// Extracts the series prefix of a document name.
pub fn series_prefix(name: &str) -> &str {
    match name.split_once('/') {
        Some((series, _issue)) => series,
        None => name,
    }
}

impl SeriesMap {
    /// Builds the map from an ordered `docId -> name` table, as produced by
    /// an `IndexStore`'s reverse name lookup.
    pub fn from_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut interner: IncrementalId<String> = IncrementalId::new();
        let mut doc_to_series = Vec::new();

        for name in names {
            // Reserve 0 for the unknown sentinel by offsetting interned ids by 1.
            let id = interner.get(series_prefix(name).to_string()) as SeriesId + 1;
            doc_to_series.push(id);
        }

        Self { doc_to_series }
    }

    /// Loads a precomputed `docId\tseriesId` TSV. The map's size is the
    /// last line's id plus one; lines may arrive in any order.
    pub fn from_tsv_lines<I>(lines: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut entries: Vec<(DocId, SeriesId)> = Vec::new();
        let mut max_id: DocId = 0;

        for line in lines {
            let mut parts = line.splitn(2, '\t');
            let doc_id: DocId = parts
                .next()
                .ok_or_else(|| "missing docId column".to_string())?
                .parse()
                .map_err(|_| "docId column is not an integer".to_string())?;
            let series_id: SeriesId = parts
                .next()
                .ok_or_else(|| "missing seriesId column".to_string())?
                .parse()
                .map_err(|_| "seriesId column is not an integer".to_string())?;

            max_id = max_id.max(doc_id);
            entries.push((doc_id, series_id));
        }

        let mut doc_to_series = vec![UNKNOWN_SERIES; max_id as usize + 1];

        for (doc_id, series_id) in entries {
            doc_to_series[doc_id as usize] = series_id;
        }

        Ok(Self { doc_to_series })
    }

    pub fn load_tsv(path: &str) -> Result<Self, io::Error> {
        let lines = crate::ioutil::read_lines(path)?;
        Self::from_tsv_lines(lines).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn series_of(&self, doc_id: DocId) -> SeriesId {
        self.doc_to_series
            .get(doc_id as usize)
            .copied()
            .unwrap_or(UNKNOWN_SERIES)
    }

    pub fn len(&self) -> usize {
        self.doc_to_series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_to_series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_dense_map_from_names() {
        let names = vec!["nyt/1865-01-01", "nyt/1865-01-02", "tribune/1865-01-01"];
        let map = SeriesMap::from_names(names);

        assert_eq!(map.series_of(0), map.series_of(1));
        assert_ne!(map.series_of(0), map.series_of(2));
        assert_eq!(map.series_of(999), UNKNOWN_SERIES);
    }

    #[test]
    fn loads_from_tsv() {
        let lines = vec!["0\t1".to_string(), "2\t1".to_string(), "1\t2".to_string()];
        let map = SeriesMap::from_tsv_lines(lines).unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(map.series_of(0), 1);
        assert_eq!(map.series_of(1), 2);
        assert_eq!(map.series_of(2), 1);
    }

    #[test]
    fn series_prefix_splits_on_slash() {
        assert_eq!(series_prefix("nyt/1865-01-01"), "nyt");
        assert_eq!(series_prefix("standalone"), "standalone");
    }
}
