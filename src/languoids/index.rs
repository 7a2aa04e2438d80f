//! Generated markdown indexes.
//!
//! One top page per level (`languages.md`, `families.md`, `dialects.md`)
//! linking to per-initial pages that list every languoid of that level with a
//! relative link to its descriptor file.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::languoids::codes::slug;
use crate::languoids::languoid::{LanguoidError, NodeCache};
use crate::languoids::level::Level;
use crate::languoids::walk::walk_tree;
use crate::repos::Repos;

fn plural(level: Level) -> &'static str {
    match level {
        Level::Family => "families",
        Level::Language => "languages",
        Level::Dialect => "dialects",
    }
}

/// Write the index pages for `level` under `repos.languoids()`.
pub fn make_index(repos: &Repos, level: Level) -> Result<(), LanguoidError> {
    let fname = plural(level);
    let languoids_dir = repos.languoids();

    // initial -> label -> descriptor path relative to languoids/
    let mut links: BTreeMap<char, BTreeMap<String, PathBuf>> = BTreeMap::new();
    let mut cache = NodeCache::new();
    for node in walk_tree(&repos.tree(), &mut cache) {
        let node = node?;
        if node.level() != level {
            continue;
        }
        let initial = match slug(node.name()).chars().next() {
            Some(c) => c,
            None => continue,
        };
        let mut label = format!("{} [{}]", node.name(), node.id());
        if let Some(iso) = node.iso() {
            label.push_str(&format!("[{}]", iso));
        }
        let ini = match node.dir() {
            Some(dir) => dir.join(format!("{}.ini", node.id())),
            None => continue,
        };
        let rel = ini
            .strip_prefix(&languoids_dir)
            .map(|p| p.to_path_buf())
            .unwrap_or(ini);
        links.entry(initial).or_default().insert(label, rel);
    }

    let mut top = format!("## {}{}\n\n", fname[..1].to_uppercase(), &fname[1..]);
    let letters: Vec<String> = links
        .keys()
        .map(|i| format!("[-{}-]({}_{}.md)", i.to_uppercase(), fname, i))
        .collect();
    top.push_str(&letters.join(" "));
    top.push('\n');
    fs::write(repos.index(fname), top).map_err(|e| LanguoidError::Io(e.to_string()))?;

    for (initial, entries) in &links {
        let mut page = String::new();
        for (label, path) in entries {
            page.push_str(&format!(
                "- [{}]({})\n",
                label,
                path.display().to_string().replace('\\', "/")
            ));
        }
        fs::write(repos.index(&format!("{}_{}", fname, initial)), page)
            .map_err(|e| LanguoidError::Io(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languoids::languoid::Languoid;
    use std::path::Path;

    fn write_node(dir: &Path, id: &str, name: &str, level: Level, iso: Option<&str>) {
        let mut node = Languoid::from_name_id_level(name, id, level, &[]).unwrap();
        node.set_iso(iso);
        node.write_info(dir).unwrap();
    }

    #[test]
    fn test_make_index() {
        let tmp = tempfile::tempdir().unwrap();
        let repos = Repos::new(tmp.path());
        let tree = repos.tree();
        write_node(&tree.join("abcd1234"), "abcd1234", "Alpha", Level::Language, Some("alp"));
        write_node(&tree.join("bcde1234"), "bcde1234", "Beta", Level::Language, None);
        write_node(&tree.join("cdef1234"), "cdef1234", "Gamma", Level::Family, None);

        make_index(&repos, Level::Language).unwrap();

        let top = fs::read_to_string(repos.index("languages")).unwrap();
        assert_eq!(
            top,
            "## Languages\n\n[-A-](languages_a.md) [-B-](languages_b.md)\n"
        );
        let page_a = fs::read_to_string(repos.index("languages_a")).unwrap();
        assert_eq!(
            page_a,
            "- [Alpha [abcd1234][alp]](tree/abcd1234/abcd1234.ini)\n"
        );
        // families are not listed on the language index
        assert!(!fs::read_to_string(repos.index("languages_b"))
            .unwrap()
            .contains("Gamma"));
    }
}
