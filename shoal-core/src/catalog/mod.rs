/*
    catalog - the replicated file entry map

    The catalog is the single shared mutable structure of a session. It is
    mutated by local user actions and by remote control messages; all
    mutations are serialized through one entry point and observers learn
    about changes through broadcast events rather than back-references.
*/

mod errors;
mod events;
mod persist;
mod record;
mod store;

pub use errors::{CatalogError, CatalogResult};
pub use events::{CatalogEvent, CatalogEvents};
pub use persist::{load_snapshot, save_snapshot};
pub use record::{FileId, FileRecord, FileStatus, SnapshotEntry};
pub use store::{Catalog, RemoveOverride};
