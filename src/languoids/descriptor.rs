//! The per-node descriptor store.
//!
//! Every languoid directory holds one `<code>.ini` file in a small INI
//! dialect: ordered sections of ordered `key = value` entries, where a value
//! may span multiple lines. A multi-line value is written with an empty first
//! line and one indented continuation line per item:
//!
//! ```text
//! [core]
//! name = Abinomn
//! macroareas =
//! 	Papunesia
//!
//! [triggers]
//! lgcode =
//! 	abinomn
//! 	avinomen
//! ```
//!
//! The store is deliberately schema-free. Sections and keys this crate does
//! not interpret (trigger patterns and whatever else editors add) round-trip
//! untouched; the rebuild path depends on that to avoid losing data the flat
//! format cannot carry.
//!
//! Files are written with CRLF line endings regardless of platform, the fixed
//! convention for the on-disk tree. The parser accepts LF and CRLF alike.

use std::fmt;
use std::fs;
use std::path::Path;

/// Errors raised while reading or writing a descriptor file.
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorError {
    Io(String),
    Syntax { line: usize, reason: String },
}

impl std::error::Error for DescriptorError {}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::Io(msg) => write!(f, "IO error: {}", msg),
            DescriptorError::Syntax { line, reason } => {
                write!(f, "descriptor syntax error on line {}: {}", line, reason)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

/// An ordered, schema-free key/value document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Descriptor {
    sections: Vec<Section>,
}

impl Descriptor {
    pub fn new() -> Self {
        Descriptor::default()
    }

    /// Read and parse a descriptor file.
    pub fn read(path: &Path) -> Result<Self, DescriptorError> {
        let text = fs::read_to_string(path).map_err(|e| DescriptorError::Io(e.to_string()))?;
        Descriptor::parse(&text)
    }

    /// Parse descriptor text. Line endings may be LF or CRLF; full-line `#`
    /// and `;` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, DescriptorError> {
        let mut sections: Vec<Section> = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let lineno = idx + 1;
            let line = raw.trim_end();
            if line.is_empty() {
                continue;
            }
            let continuation = line.starts_with(' ') || line.starts_with('\t');
            if continuation {
                let value = match sections.last_mut().and_then(|s| s.entries.last_mut()) {
                    Some((_, value)) => value,
                    None => {
                        return Err(DescriptorError::Syntax {
                            line: lineno,
                            reason: "continuation line without a preceding option".to_string(),
                        })
                    }
                };
                value.push('\n');
                value.push_str(line.trim());
                continue;
            }
            if line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                if sections.iter().any(|s| s.name == name) {
                    return Err(DescriptorError::Syntax {
                        line: lineno,
                        reason: format!("duplicate section [{}]", name),
                    });
                }
                sections.push(Section {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| DescriptorError::Syntax {
                line: lineno,
                reason: format!("expected `key = value`, got {:?}", line),
            })?;
            let key = key.trim().to_string();
            let value = value.trim().to_string();
            let section = sections.last_mut().ok_or_else(|| DescriptorError::Syntax {
                line: lineno,
                reason: "option outside of any [section]".to_string(),
            })?;
            if section.entries.iter().any(|(k, _)| *k == key) {
                return Err(DescriptorError::Syntax {
                    line: lineno,
                    reason: format!("duplicate option {:?}", key),
                });
            }
            section.entries.push((key, value));
        }
        Ok(Descriptor { sections })
    }

    fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    fn section_mut(&mut self, name: &str) -> &mut Section {
        let pos = match self.sections.iter().position(|s| s.name == name) {
            Some(pos) => pos,
            None => {
                self.sections.push(Section {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                self.sections.len() - 1
            }
        };
        &mut self.sections[pos]
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    pub fn has_option(&self, section: &str, key: &str) -> bool {
        self.get(section, key).is_some()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key` in `section`, creating the section if absent and replacing
    /// an existing value in place to keep entry order stable.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        let value = value.into();
        let section = self.section_mut(section);
        match section.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => section.entries.push((key.to_string(), value)),
        }
    }

    /// Remove `key` from `section`. Returns whether it was present.
    pub fn remove(&mut self, section: &str, key: &str) -> bool {
        if let Some(pos) = self.sections.iter().position(|s| s.name == section) {
            let entries = &mut self.sections[pos].entries;
            if let Some(idx) = entries.iter().position(|(k, _)| k == key) {
                entries.remove(idx);
                return true;
            }
        }
        false
    }

    /// A multi-valued field, one value per non-empty line, order preserved.
    /// Missing options read as empty.
    pub fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get(section, key)
            .map(|value| {
                value
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_list<S: AsRef<str>>(&mut self, section: &str, key: &str, items: &[S]) {
        let value = if items.is_empty() {
            String::new()
        } else {
            let mut value = String::new();
            for item in items {
                value.push('\n');
                value.push_str(item.as_ref());
            }
            value
        };
        self.set(section, key, value);
    }

    /// Serialize and write with CRLF line endings.
    pub fn write(&self, path: &Path) -> Result<(), DescriptorError> {
        let text = self.to_string().replace('\n', "\r\n");
        fs::write(path, text).map_err(|e| DescriptorError::Io(e.to_string()))
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            writeln!(f, "[{}]", section.name)?;
            for (key, value) in &section.entries {
                writeln!(f, "{} = {}", key, value.replace('\n', "\n\t"))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[core]
name = Abinomn
glottocode = abin1243
level = language
macroareas =
\tPapunesia

[triggers]
lgcode =
\tabinomn
\tavinomen
";

    #[test]
    fn test_parse_core_fields() {
        let cfg = Descriptor::parse(SAMPLE).unwrap();
        assert_eq!(cfg.get("core", "name"), Some("Abinomn"));
        assert_eq!(cfg.get("core", "level"), Some("language"));
        assert_eq!(cfg.get("core", "missing"), None);
        assert_eq!(cfg.get("nosection", "name"), None);
    }

    #[test]
    fn test_parse_lists() {
        let cfg = Descriptor::parse(SAMPLE).unwrap();
        assert_eq!(cfg.get_list("core", "macroareas"), vec!["Papunesia"]);
        assert_eq!(cfg.get_list("triggers", "lgcode"), vec!["abinomn", "avinomen"]);
        assert_eq!(cfg.get_list("core", "missing"), Vec::<String>::new());
    }

    #[test]
    fn test_parse_crlf_and_comments() {
        let text = "# header\r\n[core]\r\nname = X\r\n; aside\r\nhid = NOCODE_X\r\n";
        let cfg = Descriptor::parse(text).unwrap();
        assert_eq!(cfg.get("core", "name"), Some("X"));
        assert_eq!(cfg.get("core", "hid"), Some("NOCODE_X"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Descriptor::parse("name = X\n").is_err());
        assert!(Descriptor::parse("\tdangling\n").is_err());
        assert!(Descriptor::parse("[core]\njust a line\n").is_err());
        assert!(Descriptor::parse("[core]\n[core]\n").is_err());
        assert!(Descriptor::parse("[core]\nname = A\nname = B\n").is_err());
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut cfg = Descriptor::parse(SAMPLE).unwrap();
        cfg.set("core", "name", "Renamed");
        cfg.set("core", "iso639-3", "bsa");
        let out = cfg.to_string();
        // name stays first, the new option lands at the end of [core]
        assert!(out.find("name = Renamed").unwrap() < out.find("glottocode").unwrap());
        assert_eq!(cfg.get("core", "iso639-3"), Some("bsa"));
    }

    #[test]
    fn test_remove() {
        let mut cfg = Descriptor::parse(SAMPLE).unwrap();
        assert!(cfg.remove("core", "level"));
        assert!(!cfg.remove("core", "level"));
        assert_eq!(cfg.get("core", "level"), None);
    }

    #[test]
    fn test_serialization_round_trip() {
        let cfg = Descriptor::parse(SAMPLE).unwrap();
        let reparsed = Descriptor::parse(&cfg.to_string()).unwrap();
        assert_eq!(cfg, reparsed);
    }

    #[test]
    fn test_set_list_round_trip() {
        let mut cfg = Descriptor::new();
        cfg.set("core", "name", "X");
        cfg.set_list("core", "macroareas", &["Eurasia", "Africa"]);
        let reparsed = Descriptor::parse(&cfg.to_string()).unwrap();
        assert_eq!(reparsed.get_list("core", "macroareas"), vec!["Eurasia", "Africa"]);
    }

    #[test]
    fn test_write_is_crlf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abin1243.ini");
        let cfg = Descriptor::parse(SAMPLE).unwrap();
        cfg.write(&path).unwrap();
        let bytes = fs::read(&path).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("name = Abinomn\r\n"));
        assert!(!text.replace("\r\n", "").contains('\r'));
        assert_eq!(Descriptor::parse(&text).unwrap(), cfg);
    }
}
