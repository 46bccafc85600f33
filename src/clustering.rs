//! Greedy single-link clustering of alignment records by span overlap,
//! with quota pruning (§4.5).

use std::collections::{HashMap, HashSet};

use crate::index::DocId;
use crate::series::SeriesId;

#[derive(Debug, Clone, PartialEq)]
pub struct MemberRecord {
    pub doc_id: DocId,
    pub name: String,
    pub series: SeriesId,
    pub start: u32,
    pub end: u32,
    pub score: f64,
}

impl MemberRecord {
    fn abs_overlap(&self, other: &MemberRecord) -> u32 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        end.saturating_sub(start)
    }

    fn relative_overlap(&self, other: &MemberRecord) -> f64 {
        let overlap = self.abs_overlap(other) as f64;
        let len = (self.end - self.start).max(other.end - other.start) as f64;

        if len == 0.0 {
            0.0
        } else {
            overlap / len
        }
    }
}

pub type ClusterId = u32;

#[derive(Debug, Clone, Copy)]
pub enum LinkageCriterion {
    /// `--min-overlap`: absolute token overlap must reach this many tokens.
    Absolute(u32),
    /// `--relative-overlap`: overlap as a fraction of the longer span.
    Relative(f64),
}

impl LinkageCriterion {
    fn links(&self, a: &MemberRecord, b: &MemberRecord) -> bool {
        match self {
            LinkageCriterion::Absolute(min_overlap) => a.abs_overlap(b) >= *min_overlap,
            LinkageCriterion::Relative(threshold) => a.relative_overlap(b) >= *threshold,
        }
    }
}

/// Clustering state: `members[cid][docId] -> memberRec`, and the reverse
/// index `clusters[docId] -> set<cid>` a document currently belongs to.
/// Cluster ids are assigned monotonically and never reused, even across
/// merges (§3 invariants).
#[derive(Debug, Default)]
pub struct Clusterer {
    next_id: ClusterId,
    members: HashMap<ClusterId, HashMap<DocId, MemberRecord>>,
    clusters: HashMap<DocId, HashSet<ClusterId>>,
}

impl Clusterer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes one alignment record, given as a pair of member candidates
    /// for the same reused passage in two documents.
    pub fn process(&mut self, r1: MemberRecord, r2: MemberRecord, criterion: LinkageCriterion) {
        let id1 = r1.doc_id;
        let id2 = r2.doc_id;

        let c1 = self.clusters.entry(id1).or_default().clone();
        let c2 = self.clusters.entry(id2).or_default().clone();

        let mut matches: Vec<ClusterId> = Vec::new();

        for &cid in &c1 {
            if let Some(existing) = self.members.get(&cid).and_then(|m| m.get(&id1)) {
                if criterion.links(&r1, existing) {
                    matches.push(cid);
                }
            }
        }

        for &cid in &c2 {
            if let Some(existing) = self.members.get(&cid).and_then(|m| m.get(&id2)) {
                if criterion.links(&r2, existing) && !matches.contains(&cid) {
                    matches.push(cid);
                }
            }
        }

        match matches.len() {
            0 => {
                let new_id = self.next_id;
                self.next_id += 1;

                let mut fresh = HashMap::new();
                fresh.insert(id1, r1);
                fresh.insert(id2, r2);
                self.members.insert(new_id, fresh);

                self.clusters.entry(id1).or_default().insert(new_id);
                self.clusters.entry(id2).or_default().insert(new_id);
            }
            1 => {
                let cid = matches[0];
                let bucket = self.members.entry(cid).or_default();
                bucket.insert(id1, r1);
                bucket.insert(id2, r2);

                self.clusters.entry(id1).or_default().insert(cid);
                self.clusters.entry(id2).or_default().insert(cid);
            }
            _ => {
                self.merge(&matches, id1, r1, id2, r2);
            }
        }
    }

    /// Merges `matches` into the smallest cid among them. For every
    /// document found in *any* merged cluster's member map — not only
    /// `id1`/`id2` — rewrites `clusters[d]` to drop the stale cids and point
    /// at the surviving one. This is the literal reading of the source
    /// author's own annotated fix ("dissociate the old cluster numbers from
    /// *all* documents"), resolved as an Open Question in §9.
    fn merge(
        &mut self,
        matches: &[ClusterId],
        id1: DocId,
        r1: MemberRecord,
        id2: DocId,
        r2: MemberRecord,
    ) {
        let surviving = *matches.iter().min().unwrap();
        let stale: Vec<ClusterId> = matches.iter().copied().filter(|c| *c != surviving).collect();

        let mut survivor_members = self.members.remove(&surviving).unwrap_or_default();

        for cid in &stale {
            if let Some(removed) = self.members.remove(cid) {
                for (doc_id, rec) in removed {
                    survivor_members.insert(doc_id, rec);
                }
            }
        }

        survivor_members.insert(id1, r1);
        survivor_members.insert(id2, r2);

        for doc_id in survivor_members.keys().copied().collect::<Vec<_>>() {
            let entry = self.clusters.entry(doc_id).or_default();
            for cid in &stale {
                entry.remove(cid);
            }
            entry.insert(surviving);
        }

        self.members.insert(surviving, survivor_members);
    }

    /// Finalizes clustering: applies the quota filters, then sorts surviving
    /// clusters by descending size (ties broken lexicographically by member
    /// list) and assigns final ids `1..=k`.
    pub fn into_clusters(
        self,
        max_proportion: f64,
        max_repeats: u32,
    ) -> Vec<ClusterOutput> {
        let mut outputs: Vec<ClusterOutput> = self
            .members
            .into_values()
            .filter_map(|members| build_output(members, max_proportion, max_repeats))
            .collect();

        outputs.sort_by(|a, b| {
            b.size
                .cmp(&a.size)
                .then_with(|| a.members.cmp(&b.members))
        });

        for (i, cluster) in outputs.iter_mut().enumerate() {
            cluster.id = i as ClusterId + 1;
        }

        outputs
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterOutput {
    pub id: ClusterId,
    pub size: usize,
    pub members: Vec<(String, u32, u32)>,
}

fn build_output(
    members: HashMap<DocId, MemberRecord>,
    max_proportion: f64,
    max_repeats: u32,
) -> Option<ClusterOutput> {
    let size = members.len();

    if size == 0 {
        return None;
    }

    let mut per_series: HashMap<SeriesId, u32> = HashMap::new();
    for m in members.values() {
        *per_series.entry(m.series).or_insert(0) += 1;
    }

    let top_rep = per_series.values().copied().max().unwrap_or(0);

    if max_proportion < 1.0 && (top_rep as f64 / size as f64) > max_proportion {
        return None;
    }

    if top_rep > max_repeats {
        return None;
    }

    let mut member_list: Vec<(String, u32, u32)> = members
        .into_values()
        .map(|m| (m.name, m.start, m.end))
        .collect();
    member_list.sort();

    Some(ClusterOutput {
        id: 0,
        size,
        members: member_list,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(doc_id: DocId, name: &str, series: SeriesId, start: u32, end: u32) -> MemberRecord {
        MemberRecord {
            doc_id,
            name: name.to_string(),
            series,
            start,
            end,
            score: 1.0,
        }
    }

    #[test]
    fn triangle_with_high_overlap_forms_one_cluster() {
        let mut clusterer = Clusterer::new();
        let criterion = LinkageCriterion::Relative(0.5);

        clusterer.process(rec(0, "A", 1, 0, 100), rec(1, "B", 2, 0, 100), criterion);
        clusterer.process(rec(1, "B", 2, 0, 100), rec(2, "C", 1, 0, 100), criterion);
        clusterer.process(rec(0, "A", 1, 0, 100), rec(2, "C", 1, 0, 100), criterion);

        let clusters = clusterer.into_clusters(1.0, 4);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].size, 3);
    }

    #[test]
    fn quota_drops_overrepresented_series() {
        let mut clusterer = Clusterer::new();
        let criterion = LinkageCriterion::Relative(0.5);

        // A and C share series 1; max-repeats=1 should drop this cluster.
        clusterer.process(rec(0, "A", 1, 0, 100), rec(1, "B", 2, 0, 100), criterion);
        clusterer.process(rec(1, "B", 2, 0, 100), rec(2, "C", 1, 0, 100), criterion);
        clusterer.process(rec(0, "A", 1, 0, 100), rec(2, "C", 1, 0, 100), criterion);

        let clusters = clusterer.into_clusters(1.0, 1);
        assert!(clusters.is_empty());
    }

    #[test]
    fn merge_order_is_commutative_in_final_membership() {
        let criterion = LinkageCriterion::Relative(0.5);

        let mut forward = Clusterer::new();
        forward.process(rec(0, "A", 1, 0, 100), rec(1, "B", 2, 0, 100), criterion);
        forward.process(rec(2, "C", 3, 0, 100), rec(3, "D", 4, 0, 100), criterion);
        forward.process(rec(1, "B", 2, 0, 100), rec(2, "C", 3, 0, 100), criterion);

        let mut other = Clusterer::new();
        other.process(rec(0, "A", 1, 0, 100), rec(1, "B", 2, 0, 100), criterion);
        other.process(rec(1, "B", 2, 0, 100), rec(2, "C", 3, 0, 100), criterion);
        other.process(rec(2, "C", 3, 0, 100), rec(3, "D", 4, 0, 100), criterion);

        let a = forward.into_clusters(1.0, 4);
        let b = other.into_clusters(1.0, 4);

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(a[0].members, b[0].members);
    }

    #[test]
    fn absolute_overlap_threshold() {
        let mut clusterer = Clusterer::new();
        let criterion = LinkageCriterion::Absolute(50);

        clusterer.process(rec(0, "A", 1, 0, 100), rec(1, "B", 2, 40, 140), criterion);

        let clusters = clusterer.into_clusters(1.0, 4);
        assert_eq!(clusters.len(), 1);
    }
}
