//! The opaque n-gram inverted index this core consumes (§1, §4.8 of the spec).
//!
//! `IndexStore` is the trait boundary: the core algorithms (`PairEnumerator`,
//! `PairAligner`, `QuoteHunter`) only ever talk to the index through it.
//! `FileIndex` is one concrete, line-oriented realization of that trait so
//! the CLI is runnable end to end; any other backing store (LMDB, a custom
//! mmap'd format, …) is a drop-in replacement behind the same trait.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32,
    pub positions: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub date: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub language: Option<String>,
}

/// One n-gram key and its posting list, as yielded by a scan of the index.
#[derive(Debug, Clone)]
pub struct PostingsEntry {
    pub key: String,
    pub postings: Vec<Posting>,
}

impl PostingsEntry {
    /// Document frequency: the number of distinct documents carrying this
    /// n-gram, i.e. the length of the posting list.
    pub fn document_frequency(&self) -> u32 {
        self.postings.len() as u32
    }
}

pub trait IndexStore {
    /// Streams `(key, postings)` entries in key-sorted order, starting at
    /// `skip` entries in, yielding at most `take`. Implementations must not
    /// load the whole posting table into memory to honor this (the
    /// `step`/`stride` sharding in `PairEnumerator` relies on cheap skipping).
    fn postings_iter<'a>(
        &'a self,
        skip: usize,
        take: usize,
    ) -> Box<dyn Iterator<Item = io::Result<PostingsEntry>> + 'a>;

    /// Exact-key probe, used by the quote hunter. `None` on a miss.
    fn posting_list(&self, key: &str) -> Option<Vec<Posting>>;

    fn name_of(&self, doc_id: DocId) -> Option<&str>;

    fn names(&self) -> Box<dyn Iterator<Item = (DocId, &str)> + '_>;

    fn tokens_of(&self, doc_id: DocId) -> Option<&[String]>;

    fn offsets_of(&self, doc_id: DocId) -> Option<&[(u32, u32)]>;

    fn metadata_of(&self, doc_id: DocId) -> Option<&Metadata>;

    fn max_doc_id(&self) -> DocId;
}

/// In-memory fake of `IndexStore`, used by unit tests and available to any
/// caller that wants to build an index programmatically rather than from disk.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    postings: Vec<(String, Vec<Posting>)>,
    names: Vec<String>,
    tokens: HashMap<DocId, Vec<String>>,
    offsets: HashMap<DocId, Vec<(u32, u32)>>,
    metadata: HashMap<DocId, Metadata>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_posting(&mut self, key: &str, postings: Vec<Posting>) -> &mut Self {
        self.postings.push((key.to_string(), postings));
        self.postings.sort_by(|a, b| a.0.cmp(&b.0));
        self
    }

    pub fn add_document(
        &mut self,
        name: &str,
        tokens: Vec<String>,
        offsets: Vec<(u32, u32)>,
        metadata: Metadata,
    ) -> DocId {
        let doc_id = self.names.len() as DocId;
        self.names.push(name.to_string());
        self.tokens.insert(doc_id, tokens);
        self.offsets.insert(doc_id, offsets);
        self.metadata.insert(doc_id, metadata);
        doc_id
    }
}

impl IndexStore for MemoryIndex {
    fn postings_iter<'a>(
        &'a self,
        skip: usize,
        take: usize,
    ) -> Box<dyn Iterator<Item = io::Result<PostingsEntry>> + 'a> {
        Box::new(
            self.postings
                .iter()
                .skip(skip)
                .take(take)
                .map(|(key, postings)| {
                    Ok(PostingsEntry {
                        key: key.clone(),
                        postings: postings.clone(),
                    })
                }),
        )
    }

    fn posting_list(&self, key: &str) -> Option<Vec<Posting>> {
        self.postings
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| self.postings[idx].1.clone())
    }

    fn name_of(&self, doc_id: DocId) -> Option<&str> {
        self.names.get(doc_id as usize).map(|s| s.as_str())
    }

    fn names(&self) -> Box<dyn Iterator<Item = (DocId, &str)> + '_> {
        Box::new(
            self.names
                .iter()
                .enumerate()
                .map(|(i, n)| (i as DocId, n.as_str())),
        )
    }

    fn tokens_of(&self, doc_id: DocId) -> Option<&[String]> {
        self.tokens.get(&doc_id).map(|v| v.as_slice())
    }

    fn offsets_of(&self, doc_id: DocId) -> Option<&[(u32, u32)]> {
        self.offsets.get(&doc_id).map(|v| v.as_slice())
    }

    fn metadata_of(&self, doc_id: DocId) -> Option<&Metadata> {
        self.metadata.get(&doc_id)
    }

    fn max_doc_id(&self) -> DocId {
        self.names.len().saturating_sub(1) as DocId
    }
}

/// Parses one `postings.tsv` line: `key \t docId,tf,pos1|pos2|...;docId,tf,pos...`.
fn parse_postings_line(line: &str) -> io::Result<PostingsEntry> {
    let (key, rest) = line
        .split_once('\t')
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed postings line"))?;

    let mut postings = Vec::new();

    if !rest.is_empty() {
        for chunk in rest.split(';') {
            let mut fields = chunk.splitn(3, ',');
            let doc_id: DocId = fields
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad docId"))?;
            let tf: u32 = fields
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad tf"))?;
            let positions = fields
                .next()
                .unwrap_or("")
                .split('|')
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<u32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad position"))?;

            postings.push(Posting {
                doc_id,
                tf,
                positions,
            });
        }
    }

    Ok(PostingsEntry {
        key: key.to_string(),
        postings,
    })
}

/// File-backed `IndexStore`. See §4.8 of the spec for the on-disk layout.
pub struct FileIndex {
    postings_path: std::path::PathBuf,
    names: Vec<String>,
    tokens: HashMap<DocId, Vec<String>>,
    offsets: HashMap<DocId, Vec<(u32, u32)>>,
    metadata: HashMap<DocId, Metadata>,
}

impl FileIndex {
    pub fn open(dir: &Path) -> io::Result<Self> {
        let names = Self::load_names(&dir.join("names.tsv"))?;
        let tokens = Self::load_tokens(&dir.join("tokens.tsv"))?;
        let offsets = Self::load_offsets(&dir.join("offsets.tsv"))?;
        let metadata = Self::load_metadata(&dir.join("meta.json"))?;

        Ok(Self {
            postings_path: dir.join("postings.tsv"),
            names,
            tokens,
            offsets,
            metadata,
        })
    }

    fn load_names(path: &Path) -> io::Result<Vec<String>> {
        let file = fs::File::open(path)?;
        let mut names = Vec::new();

        for line in io::BufReader::new(file).lines() {
            let line = line?;
            let (doc_id, name) = line
                .split_once('\t')
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed names line"))?;
            let doc_id: usize = doc_id
                .parse()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad docId"))?;

            if names.len() <= doc_id {
                names.resize(doc_id + 1, String::new());
            }
            names[doc_id] = name.to_string();
        }

        Ok(names)
    }

    fn load_tokens(path: &Path) -> io::Result<HashMap<DocId, Vec<String>>> {
        let file = fs::File::open(path)?;
        let mut tokens = HashMap::new();

        for line in io::BufReader::new(file).lines() {
            let line = line?;
            let (doc_id, rest) = line
                .split_once('\t')
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed tokens line"))?;
            let doc_id: DocId = doc_id
                .parse()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad docId"))?;
            let terms = rest
                .split('|')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
            tokens.insert(doc_id, terms);
        }

        Ok(tokens)
    }

    fn load_offsets(path: &Path) -> io::Result<HashMap<DocId, Vec<(u32, u32)>>> {
        let file = fs::File::open(path)?;
        let mut offsets = HashMap::new();

        for line in io::BufReader::new(file).lines() {
            let line = line?;
            let (doc_id, rest) = line.split_once('\t').ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "malformed offsets line")
            })?;
            let doc_id: DocId = doc_id
                .parse()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad docId"))?;
            let spans = rest
                .split('|')
                .filter(|s| !s.is_empty())
                .map(|pair| {
                    let (b, e) = pair
                        .split_once(',')
                        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad span"))?;
                    let b: u32 = b
                        .parse()
                        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad span begin"))?;
                    let e: u32 = e
                        .parse()
                        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad span end"))?;
                    Ok((b, e))
                })
                .collect::<io::Result<Vec<_>>>()?;
            offsets.insert(doc_id, spans);
        }

        Ok(offsets)
    }

    fn load_metadata(path: &Path) -> io::Result<HashMap<DocId, Metadata>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let raw = fs::read_to_string(path)?;
        let parsed: HashMap<String, Metadata> = serde_json::from_str(&raw)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        Ok(parsed
            .into_iter()
            .filter_map(|(k, v)| k.parse::<DocId>().ok().map(|id| (id, v)))
            .collect())
    }
}

impl IndexStore for FileIndex {
    fn postings_iter<'a>(
        &'a self,
        skip: usize,
        take: usize,
    ) -> Box<dyn Iterator<Item = io::Result<PostingsEntry>> + 'a> {
        let reader = match fs::File::open(&self.postings_path) {
            Ok(f) => io::BufReader::new(f),
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };

        Box::new(
            reader
                .lines()
                .skip(skip)
                .take(take)
                .map(|line| line.and_then(|l| parse_postings_line(&l))),
        )
    }

    fn posting_list(&self, key: &str) -> Option<Vec<Posting>> {
        // A reference implementation: linear scan. A production-grade
        // `IndexStore` would keep a seekable key index for O(log n) probes.
        let file = fs::File::open(&self.postings_path).ok()?;

        for line in io::BufReader::new(file).lines() {
            let line = line.ok()?;
            if let Some((k, _)) = line.split_once('\t') {
                if k == key {
                    return parse_postings_line(&line).ok().map(|e| e.postings);
                }
            }
        }

        None
    }

    fn name_of(&self, doc_id: DocId) -> Option<&str> {
        self.names.get(doc_id as usize).map(|s| s.as_str())
    }

    fn names(&self) -> Box<dyn Iterator<Item = (DocId, &str)> + '_> {
        Box::new(
            self.names
                .iter()
                .enumerate()
                .map(|(i, n)| (i as DocId, n.as_str())),
        )
    }

    fn tokens_of(&self, doc_id: DocId) -> Option<&[String]> {
        self.tokens.get(&doc_id).map(|v| v.as_slice())
    }

    fn offsets_of(&self, doc_id: DocId) -> Option<&[(u32, u32)]> {
        self.offsets.get(&doc_id).map(|v| v.as_slice())
    }

    fn metadata_of(&self, doc_id: DocId) -> Option<&Metadata> {
        self.metadata.get(&doc_id)
    }

    fn max_doc_id(&self) -> DocId {
        self.names.len().saturating_sub(1) as DocId
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_postings_line() {
        let entry = parse_postings_line("the~quick~brown\t1,2,10|40;3,1,5").unwrap();

        assert_eq!(entry.key, "the~quick~brown");
        assert_eq!(entry.document_frequency(), 2);
        assert_eq!(entry.postings[0].doc_id, 1);
        assert_eq!(entry.postings[0].tf, 2);
        assert_eq!(entry.postings[0].positions, vec![10, 40]);
        assert_eq!(entry.postings[1].positions, vec![5]);
    }

    #[test]
    fn memory_index_roundtrips() {
        let mut index = MemoryIndex::new();
        let a = index.add_document(
            "nyt/1865-01-01",
            vec!["the".into(), "fox".into()],
            vec![(0, 3), (4, 7)],
            Metadata::default(),
        );
        index.add_posting(
            "the~fox",
            vec![Posting {
                doc_id: a,
                tf: 1,
                positions: vec![0],
            }],
        );

        assert_eq!(index.name_of(a), Some("nyt/1865-01-01"));
        assert_eq!(index.posting_list("the~fox").unwrap().len(), 1);
        assert!(index.posting_list("missing~key").is_none());
    }
}
