//! Tree-wide lookups feeding the bibliography pipeline.
//!
//! These walk the whole tree and aggregate descriptor fields keyed by `hid`,
//! the legacy identifier older citation data is tagged with.

use std::collections::BTreeMap;
use std::path::Path;

use crate::languoids::languoid::{LanguoidError, NodeCache};
use crate::languoids::walk::walk_tree;

/// One trigger pattern: a conjunction of keywords, each possibly negated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// `(keyword, positive)` pairs; `false` means the keyword must be absent.
    pub clauses: Vec<(String, bool)>,
}

/// Parse a conjunction like `jena AND NOT timor`.
pub fn parse_conjunctions(phrase: &str) -> Trigger {
    let clauses = phrase
        .split(" AND ")
        .map(|term| match term.strip_prefix("NOT ") {
            Some(keyword) => (keyword.to_string(), false),
            None => (term.to_string(), true),
        })
        .collect();
    Trigger { clauses }
}

/// Map every hid-carrying languoid to its first macroarea (empty string when
/// it has none).
pub fn macroarea_from_hid(tree: &Path) -> Result<BTreeMap<String, String>, LanguoidError> {
    let mut res = BTreeMap::new();
    let mut cache = NodeCache::new();
    for node in walk_tree(tree, &mut cache) {
        let node = node?;
        if let Some(hid) = node.hid() {
            let area = node.macroareas().into_iter().next().unwrap_or_default();
            res.insert(hid.to_string(), area);
        }
    }
    Ok(res)
}

/// Collect parsed trigger patterns of kind `field` (e.g. `lgcode`) from every
/// hid-carrying languoid, keyed by its `Name [hid]` label.
pub fn load_triggers(
    tree: &Path,
    field: &str,
) -> Result<BTreeMap<String, Vec<Trigger>>, LanguoidError> {
    let mut res = BTreeMap::new();
    let mut cache = NodeCache::new();
    for node in walk_tree(tree, &mut cache) {
        let node = node?;
        let hid = match node.hid() {
            Some(hid) => hid,
            None => continue,
        };
        let triggers = node.descriptor().get_list("triggers", field);
        if triggers.is_empty() {
            continue;
        }
        let label = format!("{} [{}]", node.name(), hid);
        res.insert(
            label,
            triggers.iter().map(|t| parse_conjunctions(t)).collect(),
        );
    }
    Ok(res)
}
