//! # glottolog
//!
//! Tooling for a languoid classification stored as a directory tree.
//!
//! Each languoid (family, language or dialect) is a directory named after its
//! glottocode, holding a single `<code>.ini` descriptor. The tree is the
//! source of truth for version control; for bulk reclassification the same
//! data round-trips through LFF, a flat indentation-grouped text format:
//!
//! ```text
//! Athabaskan-Eyak-Tlingit [atha1245], Athabaskan [atha1246]
//!     Ahtena [ahte1237][aht]
//! ```
//!
//! The [`languoids`] module covers the entity, its descriptor store and the
//! tree walker; [`lff`] covers the flattener (`tree2lff`) and the rebuilder
//! (`lff2tree`) that rewrites the tree -- moves, creations and deletions
//! included -- from an edited pair of flat files.

pub mod languoids;
pub mod lff;
pub mod repos;
