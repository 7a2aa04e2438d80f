//! The Languoid entity.
//!
//! A `Languoid` is one node of the classification: its descriptor document,
//! its lineage (every strict ancestor, root first) and, when it was read from
//! disk, its directory. Lineage is reconstructed by walking parent
//! directories upward until the first component that is not a languoid
//! identifier; that component marks the edge of the tree.
//!
//! Walking a whole tree touches the same ancestors over and over, so ancestor
//! triples are memoized in a [`NodeCache`]. The cache is an explicit argument
//! owned by whoever drives the traversal. Passing `&mut NodeCache::new()` at
//! a call site is always correct, just slower.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::languoids::descriptor::{Descriptor, DescriptorError};
use crate::languoids::ident::is_glottocode;
use crate::languoids::level::Level;

const SECTION_CORE: &str = "core";

/// Group-label suffix marking a node without ancestors.
pub(crate) const ISOLATE_SUFFIX: &str = "[-isolate-]";
/// Defensive label for a non-empty lineage that joins to nothing; a
/// corruption signal, never intended output.
pub(crate) const UNCLASSIFIED_LABEL: &str = "ERROR [-unclassified-]";

/// Errors raised while constructing or persisting languoids.
#[derive(Debug, Clone, PartialEq)]
pub enum LanguoidError {
    Io(String),
    Descriptor(DescriptorError),
    /// An id, own or in a lineage, that fails the identifier pattern.
    InvalidId(String),
    /// A level string outside the `family|language|dialect` enum.
    InvalidLevel(String),
    /// A required core field is absent from a descriptor.
    MissingField(String),
    /// A node directory without any descriptor file.
    MissingDescriptor(PathBuf),
    /// A node directory with more than one descriptor file.
    MultipleDescriptors(PathBuf),
    /// A malformed flat-format record or group segment.
    InvalidRecord(String),
}

impl std::error::Error for LanguoidError {}

impl fmt::Display for LanguoidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguoidError::Io(msg) => write!(f, "IO error: {}", msg),
            LanguoidError::Descriptor(e) => write!(f, "{}", e),
            LanguoidError::InvalidId(id) => write!(f, "invalid languoid id: {:?}", id),
            LanguoidError::InvalidLevel(level) => write!(f, "invalid level: {:?}", level),
            LanguoidError::MissingField(field) => write!(f, "missing field {}", field),
            LanguoidError::MissingDescriptor(dir) => {
                write!(f, "no descriptor file in {}", dir.display())
            }
            LanguoidError::MultipleDescriptors(dir) => {
                write!(f, "more than one descriptor file in {}", dir.display())
            }
            LanguoidError::InvalidRecord(text) => {
                write!(f, "malformed flat-format field: {:?}", text)
            }
        }
    }
}

impl From<DescriptorError> for LanguoidError {
    fn from(e: DescriptorError) -> Self {
        LanguoidError::Descriptor(e)
    }
}

/// One lineage entry: the (name, id, level) triple of a strict ancestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestor {
    pub name: String,
    pub id: String,
    pub level: Level,
}

impl Ancestor {
    /// Build a lineage entry, failing on an invalid id. Levels are typed, so
    /// their validity holds by construction.
    pub fn new(name: &str, id: &str, level: Level) -> Result<Self, LanguoidError> {
        if !is_glottocode(id) {
            return Err(LanguoidError::InvalidId(id.to_string()));
        }
        Ok(Ancestor {
            name: name.to_string(),
            id: id.to_string(),
            level,
        })
    }

    pub fn label(&self) -> String {
        format!("{} [{}]", self.name, self.id)
    }
}

/// Memoized ancestor triples, keyed by id, shared across one traversal.
pub type NodeCache = HashMap<String, Ancestor>;

/// One taxonomy node.
#[derive(Debug, Clone, PartialEq)]
pub struct Languoid {
    cfg: Descriptor,
    lineage: Vec<Ancestor>,
    level: Level,
    dir: Option<PathBuf>,
}

impl Languoid {
    fn build(
        mut cfg: Descriptor,
        lineage: Vec<Ancestor>,
        level: Level,
        dir: Option<PathBuf>,
    ) -> Result<Self, LanguoidError> {
        match cfg.get(SECTION_CORE, "glottocode") {
            Some(id) if is_glottocode(id) => {}
            Some(id) => return Err(LanguoidError::InvalidId(id.to_string())),
            None => return Err(LanguoidError::MissingField("core.glottocode".to_string())),
        }
        if cfg.get(SECTION_CORE, "name").map_or(true, str::is_empty) {
            return Err(LanguoidError::MissingField("core.name".to_string()));
        }
        cfg.set(SECTION_CORE, "level", level.as_str());
        Ok(Languoid {
            cfg,
            lineage,
            level,
            dir,
        })
    }

    /// Load the languoid whose descriptor lives directly inside `dir`.
    ///
    /// Exactly one `*.ini` file is expected; zero or several is a structural
    /// inconsistency and fails loudly, distinct from lookup misses.
    pub fn from_dir(dir: &Path, cache: &mut NodeCache) -> Result<Self, LanguoidError> {
        let mut descriptors = Vec::new();
        let entries = fs::read_dir(dir).map_err(|e| LanguoidError::Io(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| LanguoidError::Io(e.to_string()))?;
            let path = entry.path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == "ini") {
                descriptors.push(path);
            }
        }
        match descriptors.as_slice() {
            [ini] => Languoid::from_ini(ini, cache),
            [] => Err(LanguoidError::MissingDescriptor(dir.to_path_buf())),
            _ => Err(LanguoidError::MultipleDescriptors(dir.to_path_buf())),
        }
    }

    /// Load a descriptor file and reconstruct the node's lineage by walking
    /// parent directories up to the tree boundary.
    ///
    /// Each ancestor not yet in `cache` is loaded once via [`from_dir`] and
    /// memoized; the node registers its own triple before returning.
    ///
    /// [`from_dir`]: Languoid::from_dir
    pub fn from_ini(path: &Path, cache: &mut NodeCache) -> Result<Self, LanguoidError> {
        let cfg = Descriptor::read(path)?;
        let dir = match path.parent() {
            Some(dir) => dir.to_path_buf(),
            None => {
                return Err(LanguoidError::Io(format!(
                    "{} has no parent directory",
                    path.display()
                )))
            }
        };

        let mut lineage = Vec::new();
        let mut cur = dir.parent();
        while let Some(parent) = cur {
            let id = match parent.file_name().and_then(|n| n.to_str()) {
                Some(name) if is_glottocode(name) => name.to_string(),
                // leading non-languoid path components are not ancestors
                _ => break,
            };
            if !cache.contains_key(&id) {
                let node = Languoid::from_dir(parent, cache)?;
                cache.insert(id.clone(), node.as_ancestor());
            }
            if let Some(ancestor) = cache.get(&id) {
                lineage.push(ancestor.clone());
            }
            cur = parent.parent();
        }
        lineage.reverse();

        let level: Level = match cfg.get(SECTION_CORE, "level") {
            Some(value) => value.parse()?,
            None => {
                return Err(LanguoidError::MissingField(format!(
                    "core.level in {}",
                    path.display()
                )))
            }
        };
        let node = Languoid::build(cfg, lineage, level, Some(dir))?;
        cache.insert(node.id().to_string(), node.as_ancestor());
        Ok(node)
    }

    /// Synthesize a fresh node from name, id and level. The node has no
    /// lineage; placing it in the tree is the caller's concern.
    pub fn from_name_id_level(
        name: &str,
        id: &str,
        level: Level,
        extras: &[(String, String)],
    ) -> Result<Self, LanguoidError> {
        let mut cfg = Descriptor::new();
        cfg.set(SECTION_CORE, "name", name);
        cfg.set(SECTION_CORE, "glottocode", id);
        let mut node = Languoid::build(cfg, Vec::new(), level, None)?;
        for (key, value) in extras {
            node.set_core(key, value)?;
        }
        Ok(node)
    }

    /// Parse one flat-format record.
    ///
    /// `name_and_codes` has the shape `Name [glottocode][iso]`, optionally
    /// followed by a classification status. `group` is the record's group
    /// label, `Ancestor [id]` segments joined by `, `, root first; `None`
    /// for isolates. Segments of non-dialect records are families; for a
    /// dialect record the first segment is its language and the following
    /// ones are dialects.
    pub fn from_lff(
        group: Option<&str>,
        name_and_codes: &str,
        level: Level,
    ) -> Result<Self, LanguoidError> {
        let invalid = || LanguoidError::InvalidRecord(name_and_codes.to_string());
        let (name, rest) = name_and_codes.split_once('[').ok_or_else(invalid)?;
        let name = name.trim();
        let (glottocode, rest) = rest.split_once("][").ok_or_else(invalid)?;
        let (iso, status) = rest.split_once(']').ok_or_else(invalid)?;
        let status = status.trim();
        if name.is_empty() {
            return Err(invalid());
        }

        let mut lineage = Vec::new();
        if let Some(group) = group {
            for (i, segment) in group.split("], ").enumerate() {
                let segment = segment.strip_suffix(']').unwrap_or(segment);
                let (ancestor_name, ancestor_id) = segment
                    .split_once(" [")
                    .ok_or_else(|| LanguoidError::InvalidRecord(group.to_string()))?;
                let ancestor_level = if level == Level::Dialect {
                    if i == 0 {
                        Level::Language
                    } else {
                        Level::Dialect
                    }
                } else {
                    Level::Family
                };
                lineage.push(Ancestor::new(ancestor_name, ancestor_id, ancestor_level)?);
            }
        }

        let mut cfg = Descriptor::new();
        cfg.set(SECTION_CORE, "name", name);
        cfg.set(SECTION_CORE, "glottocode", glottocode);
        let mut node = Languoid::build(cfg, lineage, level, None)?;
        if !iso.is_empty() {
            node.set_iso(Some(iso));
        }
        if !status.is_empty() {
            node.set_classification_status(Some(status));
        }
        Ok(node)
    }

    /// The node's own (name, id, level) triple, as cached during walks.
    pub fn as_ancestor(&self) -> Ancestor {
        Ancestor {
            name: self.name().to_string(),
            id: self.id().to_string(),
            level: self.level,
        }
    }

    pub fn id(&self) -> &str {
        self.cfg.get(SECTION_CORE, "glottocode").unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.cfg.get(SECTION_CORE, "name").unwrap_or_default()
    }

    pub fn set_name(&mut self, name: &str) {
        self.cfg.set(SECTION_CORE, "name", name);
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = level;
        self.cfg.set(SECTION_CORE, "level", level.as_str());
    }

    pub fn lineage(&self) -> &[Ancestor] {
        &self.lineage
    }

    /// The on-disk directory, when the node was loaded from one.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// The location derived from lineage: id segments of every ancestor under
    /// `tree`, ending in the node's own id.
    pub fn derived_dir(&self, tree: &Path) -> PathBuf {
        let mut dir = tree.to_path_buf();
        for ancestor in &self.lineage {
            dir.push(&ancestor.id);
        }
        dir.push(self.id());
        dir
    }

    pub fn latitude(&self) -> Option<f64> {
        self.cfg
            .get(SECTION_CORE, "latitude")
            .and_then(|v| v.parse().ok())
    }

    pub fn set_latitude(&mut self, value: f64) {
        self.cfg.set(SECTION_CORE, "latitude", value.to_string());
    }

    pub fn longitude(&self) -> Option<f64> {
        self.cfg
            .get(SECTION_CORE, "longitude")
            .and_then(|v| v.parse().ok())
    }

    pub fn set_longitude(&mut self, value: f64) {
        self.cfg.set(SECTION_CORE, "longitude", value.to_string());
    }

    pub fn hid(&self) -> Option<&str> {
        self.cfg
            .get(SECTION_CORE, "hid")
            .filter(|v| !v.is_empty())
    }

    pub fn iso(&self) -> Option<&str> {
        self.cfg
            .get(SECTION_CORE, "iso639-3")
            .filter(|v| !v.is_empty())
    }

    pub fn set_iso(&mut self, iso: Option<&str>) {
        match iso {
            Some(iso) => self.cfg.set(SECTION_CORE, "iso639-3", iso),
            None => {
                self.cfg.remove(SECTION_CORE, "iso639-3");
            }
        }
    }

    pub fn classification_status(&self) -> Option<&str> {
        self.cfg
            .get(SECTION_CORE, "classification_status")
            .filter(|v| !v.is_empty())
    }

    pub fn set_classification_status(&mut self, status: Option<&str>) {
        match status {
            Some(status) => self.cfg.set(SECTION_CORE, "classification_status", status),
            None => {
                self.cfg.remove(SECTION_CORE, "classification_status");
            }
        }
    }

    pub fn macroareas(&self) -> Vec<String> {
        self.cfg.get_list(SECTION_CORE, "macroareas")
    }

    pub fn set_macroareas<S: AsRef<str>>(&mut self, areas: &[S]) {
        self.cfg.set_list(SECTION_CORE, "macroareas", areas);
    }

    /// Set an arbitrary core attribute. `level` strings are routed through
    /// the enum so the typed level stays in sync.
    pub fn set_core(&mut self, key: &str, value: &str) -> Result<(), LanguoidError> {
        if key == "level" {
            self.set_level(value.parse()?);
        } else {
            self.cfg.set(SECTION_CORE, key, value);
        }
        Ok(())
    }

    /// The full descriptor, for uninterpreted sections like `triggers`.
    pub fn descriptor(&self) -> &Descriptor {
        &self.cfg
    }

    /// Immediate subdirectories, loaded as languoids.
    pub fn children(&self) -> Result<Vec<Languoid>, LanguoidError> {
        let dir = match &self.dir {
            Some(dir) => dir,
            None => return Ok(Vec::new()),
        };
        let mut cache = NodeCache::new();
        let mut children = Vec::new();
        let entries = fs::read_dir(dir).map_err(|e| LanguoidError::Io(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| LanguoidError::Io(e.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                children.push(Languoid::from_dir(&path, &mut cache)?);
            }
        }
        Ok(children)
    }

    /// Every strict ancestor as a fully loaded languoid, root first.
    pub fn ancestors(&self) -> Result<Vec<Languoid>, LanguoidError> {
        let mut ancestors = Vec::new();
        let dir = match &self.dir {
            Some(dir) => dir,
            None => return Ok(ancestors),
        };
        let mut cache = NodeCache::new();
        let mut cur = dir.parent();
        while let Some(parent) = cur {
            match parent.file_name().and_then(|n| n.to_str()) {
                Some(name) if is_glottocode(name) => {
                    ancestors.push(Languoid::from_dir(parent, &mut cache)?);
                }
                _ => break,
            }
            cur = parent.parent();
        }
        ancestors.reverse();
        Ok(ancestors)
    }

    pub fn parent(&self) -> Result<Option<Languoid>, LanguoidError> {
        Ok(self.ancestors()?.pop())
    }

    /// The top-level ancestor.
    pub fn family(&self) -> Result<Option<Languoid>, LanguoidError> {
        Ok(self.ancestors()?.into_iter().next())
    }

    /// Serialize the descriptor to `outdir/<id>.ini`, creating `outdir` if
    /// needed. Line endings are CRLF unconditionally. Returns the written
    /// path.
    pub fn write_info(&self, outdir: &Path) -> Result<PathBuf, LanguoidError> {
        if !outdir.exists() {
            fs::create_dir_all(outdir).map_err(|e| LanguoidError::Io(e.to_string()))?;
        }
        let path = outdir.join(format!("{}.ini", self.id()));
        self.cfg.write(&path)?;
        Ok(path)
    }

    /// The group label of this node's record in the flat format.
    ///
    /// Isolates get the literal `<Name> [-isolate-]`. Dialects keep only the
    /// contiguous run of non-family ancestors nearest to them, root first;
    /// other levels keep the full lineage. A non-empty lineage that still
    /// joins to nothing yields `ERROR [-unclassified-]`, a corruption signal
    /// callers are expected to report rather than ship.
    pub fn lff_group(&self) -> String {
        if self.lineage.is_empty() {
            return format!("{} {}", self.name(), ISOLATE_SUFFIX);
        }
        let segments: Vec<String> = if self.level == Level::Dialect {
            let run: Vec<&Ancestor> = self
                .lineage
                .iter()
                .rev()
                .take_while(|a| a.level != Level::Family)
                .collect();
            run.into_iter().rev().map(Ancestor::label).collect()
        } else {
            self.lineage.iter().map(Ancestor::label).collect()
        };
        let label = segments.join(", ");
        if label.is_empty() {
            UNCLASSIFIED_LABEL.to_string()
        } else {
            label
        }
    }

    /// The record line of this node in the flat format.
    pub fn lff_language(&self) -> String {
        let mut line = format!(
            "    {} [{}][{}]",
            self.name(),
            self.id(),
            self.iso().unwrap_or("")
        );
        if let Some(status) = self.classification_status() {
            line = format!("{} {}", line, status);
        }
        line
    }
}
