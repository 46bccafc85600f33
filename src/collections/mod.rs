mod clustered_insert_hashmap;
mod incremental_id;

pub use clustered_insert_hashmap::ClusteredInsertHashmap;
pub use incremental_id::IncrementalId;
