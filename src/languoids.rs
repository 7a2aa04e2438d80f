//! Languoid entities and the on-disk tree.
//!
//! Layout follows the usual split: one file per concern, re-exports here.
//! The `NodeCache` threaded through `from_ini` and `walk_tree` is owned by
//! whoever drives a traversal; there is no process-wide node registry.

pub mod codes;
pub mod descriptor;
pub mod ident;
pub mod index;
pub mod languoid;
pub mod level;
pub mod queries;
pub mod walk;

pub use descriptor::{Descriptor, DescriptorError};
pub use ident::is_glottocode;
pub use languoid::{Ancestor, Languoid, LanguoidError, NodeCache};
pub use level::Level;
pub use walk::{find_languoid, walk_tree};
