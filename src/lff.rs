//! LFF: the flat, indentation-grouped text form of the tree.
//!
//! Two plain-text artifacts carry the whole classification: `lff.txt` for
//! language lines grouped under their family chain, `dff.txt` for dialect
//! lines grouped under their language (plus intermediate dialects). A group
//! header is the comma-joined `Name [id]` ancestor chain; each record below
//! it is indented four spaces:
//!
//! ```text
//! Abkhaz-Adyge [abkh1242], Circassian [circ1239]
//!     Adyghe [adyg1241][ady]
//!     Kabardian [kaba1278][kbd]
//! Basque [-isolate-]
//!     Basque [basq1248][eus]
//! ```
//!
//! Families appear only in group headers -- a record line carries no level,
//! so a family line could not be told from a language line when reading the
//! file back. The rebuilder recreates family nodes from the headers.
//!
//! The flat format is lossy by design: coordinates, hids, macroareas and
//! uninterpreted descriptor sections have no LFF representation. The
//! rebuilder therefore edits existing descriptors field by field instead of
//! regenerating them; whatever LFF does not carry must survive a rebuild
//! untouched.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::languoids::languoid::{
    Ancestor, Languoid, LanguoidError, NodeCache, ISOLATE_SUFFIX, UNCLASSIFIED_LABEL,
};
use crate::languoids::level::Level;
use crate::languoids::walk::walk_tree;

/// Errors raised while flattening or rebuilding.
#[derive(Debug, Clone, PartialEq)]
pub enum LffError {
    Io(String),
    Languoid(LanguoidError),
    /// A malformed group header or record line; the rebuild cannot proceed
    /// on partial line data.
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    /// A dialect record whose language is missing from the language file.
    UnknownLanguage { dialect: String, language: String },
    /// A dialect record with no language ancestor to anchor its directory.
    DialectWithoutLanguage { dialect: String },
}

impl std::error::Error for LffError {}

impl fmt::Display for LffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LffError::Io(msg) => write!(f, "IO error: {}", msg),
            LffError::Languoid(e) => write!(f, "{}", e),
            LffError::Parse { path, line, reason } => {
                write!(f, "{}:{}: {}", path.display(), line, reason)
            }
            LffError::UnknownLanguage { dialect, language } => write!(
                f,
                "dialect {} refers to language {} which has no record in the language file",
                dialect, language
            ),
            LffError::DialectWithoutLanguage { dialect } => {
                write!(f, "dialect {} has no language ancestor", dialect)
            }
        }
    }
}

impl From<LanguoidError> for LffError {
    fn from(e: LanguoidError) -> Self {
        LffError::Languoid(e)
    }
}

/// What a flatten run wrote, plus everything it could not express.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenStats {
    pub languages: usize,
    pub dialects: usize,
    /// Ids whose group label fell back to the `ERROR [-unclassified-]`
    /// marker. Report these; they indicate corrupt lineage data.
    pub unclassified: Vec<String>,
    /// Families with no language below them; LFF has no way to carry them,
    /// so a rebuild from these files would drop them.
    pub unrepresented_families: Vec<String>,
}

impl FlattenStats {
    pub fn is_clean(&self) -> bool {
        self.unclassified.is_empty() && self.unrepresented_families.is_empty()
    }
}

/// Serialize the tree into the two flat files.
pub fn tree2lff(tree: &Path, lff_path: &Path, dff_path: &Path) -> Result<FlattenStats, LffError> {
    let mut languages: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut dialects: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut families: BTreeSet<String> = BTreeSet::new();
    let mut covered: BTreeSet<String> = BTreeSet::new();
    let mut stats = FlattenStats::default();

    let mut cache = NodeCache::new();
    for node in walk_tree(tree, &mut cache) {
        let node = node?;
        match node.level() {
            Level::Family => {
                families.insert(node.id().to_string());
            }
            Level::Language => {
                for ancestor in node.lineage() {
                    covered.insert(ancestor.id.clone());
                }
                let group = node.lff_group();
                if group == UNCLASSIFIED_LABEL {
                    stats.unclassified.push(node.id().to_string());
                }
                languages.entry(group).or_default().push(node.lff_language());
                stats.languages += 1;
            }
            Level::Dialect => {
                let group = node.lff_group();
                if group == UNCLASSIFIED_LABEL {
                    stats.unclassified.push(node.id().to_string());
                }
                dialects.entry(group).or_default().push(node.lff_language());
                stats.dialects += 1;
            }
        }
    }
    stats.unrepresented_families = families.difference(&covered).cloned().collect();

    write_flat_file(lff_path, &languages)?;
    write_flat_file(dff_path, &dialects)?;
    Ok(stats)
}

fn write_flat_file(path: &Path, groups: &BTreeMap<String, Vec<String>>) -> Result<(), LffError> {
    let mut out = String::new();
    for (label, lines) in groups {
        let mut lines = lines.clone();
        lines.sort();
        out.push_str(label);
        out.push('\n');
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
    }
    fs::write(path, out).map_err(|e| LffError::Io(e.to_string()))
}

/// Parse one flat file into records of the given level.
///
/// Group headers carry over to every following record line until the next
/// header; `#` comment lines and blank lines are skipped.
pub fn read_flat_file(path: &Path, level: Level) -> Result<Vec<Languoid>, LffError> {
    let text = fs::read_to_string(path).map_err(|e| LffError::Io(e.to_string()))?;
    let mut group: Option<String> = None;
    let mut nodes = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(record) = line.strip_prefix("    ") {
            let prefix = match &group {
                Some(label) if label.ends_with(ISOLATE_SUFFIX) => None,
                Some(label) => Some(label.as_str()),
                None => {
                    return Err(LffError::Parse {
                        path: path.to_path_buf(),
                        line: lineno,
                        reason: "record line before any group header".to_string(),
                    })
                }
            };
            let node =
                Languoid::from_lff(prefix, record.trim(), level).map_err(|e| LffError::Parse {
                    path: path.to_path_buf(),
                    line: lineno,
                    reason: e.to_string(),
                })?;
            nodes.push(node);
        } else if line.starts_with(' ') || line.starts_with('\t') {
            return Err(LffError::Parse {
                path: path.to_path_buf(),
                line: lineno,
                reason: "record lines are indented by exactly four spaces".to_string(),
            });
        } else {
            group = Some(line.to_string());
        }
    }
    Ok(nodes)
}

/// What a rebuild changed on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub created: usize,
    pub moved: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// One reconciliation target: the state a node must end up in.
#[derive(Debug, Clone)]
struct Target {
    name: String,
    level: Level,
    lineage: Vec<Ancestor>,
    iso: Option<String>,
    status: Option<String>,
    /// Whether a record line backs this target. Header-derived targets
    /// (families, intermediate dialects) only pin name and level.
    from_record: bool,
}

fn dir_for(tree: &Path, lineage: &[Ancestor], id: &str) -> PathBuf {
    let mut dir = tree.to_path_buf();
    for ancestor in lineage {
        dir.push(&ancestor.id);
    }
    dir.push(id);
    dir
}

/// Rebuild the on-disk tree to match the flat files exactly.
///
/// Nodes new to the flat files are created, nodes whose lineage changed are
/// moved (ancestors before descendants), flat-derivable descriptor fields
/// are rewritten while everything else is preserved, and nodes absent from
/// the flat files are deleted. There is no rollback; a failure mid-way
/// leaves a partially migrated tree for the surrounding version control to
/// revert.
pub fn lff2tree(tree: &Path, lff_path: &Path, dff_path: &Path) -> Result<RebuildStats, LffError> {
    let languages = read_flat_file(lff_path, Level::Language)?;
    let dialects = read_flat_file(dff_path, Level::Dialect)?;

    let mut targets: HashMap<String, Target> = HashMap::new();

    // Families exist only in group headers; take each id's first appearance.
    for lang in &languages {
        for (i, ancestor) in lang.lineage().iter().enumerate() {
            targets.entry(ancestor.id.clone()).or_insert_with(|| Target {
                name: ancestor.name.clone(),
                level: Level::Family,
                lineage: lang.lineage()[..i].to_vec(),
                iso: None,
                status: None,
                from_record: false,
            });
        }
    }

    // Language records; their full chain anchors dialect lineages.
    let mut language_chain: HashMap<String, Vec<Ancestor>> = HashMap::new();
    for lang in &languages {
        let mut chain = lang.lineage().to_vec();
        chain.push(lang.as_ancestor());
        language_chain.insert(lang.id().to_string(), chain);
        targets.insert(
            lang.id().to_string(),
            Target {
                name: lang.name().to_string(),
                level: Level::Language,
                lineage: lang.lineage().to_vec(),
                iso: lang.iso().map(str::to_string),
                status: lang.classification_status().map(str::to_string),
                from_record: true,
            },
        );
    }

    for dialect in &dialects {
        let head = match dialect.lineage().first() {
            Some(head) => head,
            None => {
                return Err(LffError::DialectWithoutLanguage {
                    dialect: dialect.id().to_string(),
                })
            }
        };
        let chain = language_chain
            .get(&head.id)
            .ok_or_else(|| LffError::UnknownLanguage {
                dialect: dialect.id().to_string(),
                language: head.id.clone(),
            })?;
        // Intermediate dialects from the label, in case they carry no record
        // line of their own.
        for (i, ancestor) in dialect.lineage()[1..].iter().enumerate() {
            targets.entry(ancestor.id.clone()).or_insert_with(|| {
                let mut lineage = chain.clone();
                lineage.extend_from_slice(&dialect.lineage()[1..1 + i]);
                Target {
                    name: ancestor.name.clone(),
                    level: Level::Dialect,
                    lineage,
                    iso: None,
                    status: None,
                    from_record: false,
                }
            });
        }
        let mut lineage = chain.clone();
        lineage.extend_from_slice(&dialect.lineage()[1..]);
        targets.insert(
            dialect.id().to_string(),
            Target {
                name: dialect.name().to_string(),
                level: Level::Dialect,
                lineage,
                iso: dialect.iso().map(str::to_string),
                status: dialect.classification_status().map(str::to_string),
                from_record: true,
            },
        );
    }

    // Current state of the tree.
    let mut cache = NodeCache::new();
    let mut current: HashMap<String, PathBuf> = HashMap::new();
    for node in walk_tree(tree, &mut cache) {
        let node = node?;
        if let Some(dir) = node.dir() {
            current.insert(node.id().to_string(), dir.to_path_buf());
        }
    }

    let mut stats = RebuildStats::default();

    // Ancestors strictly before descendants, then by id for determinism.
    let mut order: Vec<String> = targets.keys().cloned().collect();
    order.sort_by_key(|id| (targets[id].lineage.len(), id.clone()));

    for id in &order {
        let target = &targets[id];
        let new_dir = dir_for(tree, &target.lineage, id);
        match current.get(id).cloned() {
            None => {
                let mut node =
                    Languoid::from_name_id_level(&target.name, id, target.level, &[])?;
                if let Some(iso) = &target.iso {
                    node.set_iso(Some(iso));
                }
                if let Some(status) = &target.status {
                    node.set_classification_status(Some(status));
                }
                node.write_info(&new_dir)?;
                current.insert(id.clone(), new_dir);
                stats.created += 1;
            }
            Some(old_dir) => {
                if old_dir != new_dir {
                    if let Some(parent) = new_dir.parent() {
                        fs::create_dir_all(parent).map_err(|e| LffError::Io(e.to_string()))?;
                    }
                    fs::rename(&old_dir, &new_dir)
                        .map_err(|e| LffError::Io(e.to_string()))?;
                    // Everything recorded beneath the old location moved
                    // along with it.
                    for dir in current.values_mut() {
                        let rest = match dir.strip_prefix(&old_dir) {
                            Ok(rest) => rest.to_path_buf(),
                            Err(_) => continue,
                        };
                        *dir = new_dir.join(rest);
                    }
                    stats.moved += 1;
                }

                let mut cache = NodeCache::new();
                let mut node = Languoid::from_dir(&new_dir, &mut cache)?;
                let mut changed = false;
                if node.name() != target.name {
                    node.set_name(&target.name);
                    changed = true;
                }
                if node.level() != target.level {
                    node.set_level(target.level);
                    changed = true;
                }
                if target.from_record {
                    if node.iso() != target.iso.as_deref() {
                        node.set_iso(target.iso.as_deref());
                        changed = true;
                    }
                    if node.classification_status() != target.status.as_deref() {
                        node.set_classification_status(target.status.as_deref());
                        changed = true;
                    }
                }
                if changed {
                    node.write_info(&new_dir)?;
                    stats.updated += 1;
                }
            }
        }
    }

    // Whatever the flat files no longer mention goes away, top-down.
    let mut stale: Vec<PathBuf> = current
        .iter()
        .filter(|(id, _)| !targets.contains_key(id.as_str()))
        .map(|(_, dir)| dir.clone())
        .collect();
    stale.sort();
    for dir in stale {
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| LffError::Io(e.to_string()))?;
            stats.deleted += 1;
        }
    }

    Ok(stats)
}
