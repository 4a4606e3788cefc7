//! LanceDB-backed vector index: build, persist, load, search.
//!
//! Typical flow:
//! 1) `build_index` embeds the chunks into a `BuiltIndex`
//! 2) `IndexStore::persist` writes it as a new version and flips `CURRENT`
//! 3) `IndexStore::load` opens the active version, `VectorIndex::search` queries it
pub mod index_build;
mod lock;
pub mod manifest;
pub mod schema;
pub mod search;
pub mod store;
pub mod table;
pub mod writer;

pub use index_build::{build_index, BuiltIndex};
pub use manifest::IndexManifest;
pub use search::VectorIndex;
pub use store::IndexStore;
