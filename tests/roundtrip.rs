//! End-to-end tests of the LFF round trip.
//!
//! The flat format is lossy: coordinates, hids, macroareas and uninterpreted
//! descriptor sections never appear in lff.txt/dff.txt. These tests pin the
//! central contract that a rebuild edits the tree without losing any of that.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use glottolog::languoids::{walk_tree, Languoid, Level, NodeCache};
use glottolog::lff::{lff2tree, tree2lff};

fn write_node(dir: &Path, id: &str, name: &str, level: Level, extras: &[(&str, &str)]) {
    let mut node = Languoid::from_name_id_level(name, id, level, &[]).unwrap();
    for (key, value) in extras {
        node.set_core(key, value).unwrap();
    }
    node.write_info(dir).unwrap();
}

/// A fixture tree with two family levels, a dialect chain, an isolate and
/// one descriptor carrying data the flat format cannot express.
fn sample_tree(tree: &Path) {
    write_node(
        &tree.join("atla1278"),
        "atla1278",
        "Atlantic-Congo",
        Level::Family,
        &[],
    );
    write_node(
        &tree.join("atla1278/bant1294"),
        "bant1294",
        "Bantoid",
        Level::Family,
        &[],
    );
    let bube = tree.join("atla1278/bant1294/bube1242");
    fs::create_dir_all(&bube).unwrap();
    fs::write(
        bube.join("bube1242.ini"),
        concat!(
            "[core]\n",
            "name = Bube\n",
            "glottocode = bube1242\n",
            "level = language\n",
            "iso639-3 = bvb\n",
            "latitude = 3.54507\n",
            "longitude = 8.68333\n",
            "macroareas =\n",
            "\tAfrica\n",
            "\n",
            "[triggers]\n",
            "lgcode =\n",
            "\tbube AND NOT fernandian\n",
        ),
    )
    .unwrap();
    write_node(
        &tree.join("atla1278/bant1294/othr1234"),
        "othr1234",
        "Other Bantoid",
        Level::Language,
        &[],
    );
    write_node(
        &tree.join("atla1278/bant1294/bube1242/nort1111"),
        "nort1111",
        "North Bube",
        Level::Dialect,
        &[],
    );
    write_node(
        &tree.join("atla1278/bant1294/bube1242/nort1111/deep2222"),
        "deep2222",
        "Deep North Bube",
        Level::Dialect,
        &[],
    );
    write_node(
        &tree.join("atla1278/ghos1234"),
        "ghos1234",
        "Ghost",
        Level::Language,
        &[("classification_status", "unattested"), ("hid", "NOCODE_Ghost")],
    );
    write_node(
        &tree.join("basq1248"),
        "basq1248",
        "Basque",
        Level::Language,
        &[("iso639-3", "eus")],
    );
}

#[derive(Debug, Clone, PartialEq)]
struct NodeState {
    name: String,
    level: Level,
    iso: Option<String>,
    status: Option<String>,
    hid: Option<String>,
    lineage: Vec<String>,
    macroareas: Vec<String>,
    latitude: Option<f64>,
    rel_dir: PathBuf,
}

fn snapshot(tree: &Path) -> BTreeMap<String, NodeState> {
    let mut cache = NodeCache::new();
    walk_tree(tree, &mut cache)
        .map(|node| {
            let node = node.unwrap();
            let state = NodeState {
                name: node.name().to_string(),
                level: node.level(),
                iso: node.iso().map(str::to_string),
                status: node.classification_status().map(str::to_string),
                hid: node.hid().map(str::to_string),
                lineage: node.lineage().iter().map(|a| a.id.clone()).collect(),
                macroareas: node.macroareas(),
                latitude: node.latitude(),
                rel_dir: node
                    .dir()
                    .unwrap()
                    .strip_prefix(tree)
                    .unwrap()
                    .to_path_buf(),
            };
            (node.id().to_string(), state)
        })
        .collect()
}

#[test]
fn test_round_trip_changes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let tree = tmp.path().join("tree");
    sample_tree(&tree);
    let before = snapshot(&tree);

    let lff = tmp.path().join("lff.txt");
    let dff = tmp.path().join("dff.txt");
    let flat = tree2lff(&tree, &lff, &dff).unwrap();
    assert!(flat.is_clean());

    let stats = lff2tree(&tree, &lff, &dff).unwrap();
    assert_eq!(stats.created, 0);
    assert_eq!(stats.moved, 0);
    assert_eq!(stats.updated, 0);
    assert_eq!(stats.deleted, 0);

    assert_eq!(snapshot(&tree), before);
    // the uninterpreted section survived verbatim
    let bube = fs::read_to_string(tree.join("atla1278/bant1294/bube1242/bube1242.ini")).unwrap();
    assert!(bube.contains("[triggers]"));
    assert!(bube.contains("bube AND NOT fernandian"));
}

#[test]
fn test_flatten_is_idempotent_after_rebuild() {
    let tmp = tempfile::tempdir().unwrap();
    let tree = tmp.path().join("tree");
    sample_tree(&tree);

    let lff = tmp.path().join("lff.txt");
    let dff = tmp.path().join("dff.txt");
    tree2lff(&tree, &lff, &dff).unwrap();
    let first_lff = fs::read_to_string(&lff).unwrap();
    let first_dff = fs::read_to_string(&dff).unwrap();

    lff2tree(&tree, &lff, &dff).unwrap();
    tree2lff(&tree, &lff, &dff).unwrap();
    assert_eq!(fs::read_to_string(&lff).unwrap(), first_lff);
    assert_eq!(fs::read_to_string(&dff).unwrap(), first_dff);
}

#[test]
fn test_rebuild_moves_subtree_and_preserves_descriptors() {
    let tmp = tempfile::tempdir().unwrap();
    let tree = tmp.path().join("tree");
    sample_tree(&tree);

    let lff = tmp.path().join("lff.txt");
    let dff = tmp.path().join("dff.txt");
    tree2lff(&tree, &lff, &dff).unwrap();

    // Reclassify Bube directly under Atlantic-Congo.
    let text = fs::read_to_string(&lff).unwrap();
    assert!(text.contains("    Bube [bube1242][bvb]\n"));
    let text = text.replace("    Bube [bube1242][bvb]\n", "");
    let text = text.replace(
        "Atlantic-Congo [atla1278]\n",
        "Atlantic-Congo [atla1278]\n    Bube [bube1242][bvb]\n",
    );
    fs::write(&lff, text).unwrap();

    let stats = lff2tree(&tree, &lff, &dff).unwrap();
    assert_eq!(stats.moved, 1);
    assert_eq!(stats.created, 0);
    assert_eq!(stats.deleted, 0);

    assert!(tree.join("atla1278/bube1242/bube1242.ini").is_file());
    assert!(!tree.join("atla1278/bant1294/bube1242").exists());
    // the dialect chain moved along with its language
    assert!(tree
        .join("atla1278/bube1242/nort1111/deep2222/deep2222.ini")
        .is_file());
    // Bantoid keeps its other language
    assert!(tree.join("atla1278/bant1294/othr1234").is_dir());

    let after = snapshot(&tree);
    let bube = &after["bube1242"];
    assert_eq!(bube.lineage, vec!["atla1278"]);
    assert_eq!(bube.macroareas, vec!["Africa"]);
    assert_eq!(bube.latitude, Some(3.54507));
    assert_eq!(bube.iso.as_deref(), Some("bvb"));
    let deep = &after["deep2222"];
    assert_eq!(deep.lineage, vec!["atla1278", "bube1242", "nort1111"]);
}

#[test]
fn test_rebuild_applies_record_edits() {
    let tmp = tempfile::tempdir().unwrap();
    let tree = tmp.path().join("tree");
    sample_tree(&tree);

    let lff = tmp.path().join("lff.txt");
    let dff = tmp.path().join("dff.txt");
    tree2lff(&tree, &lff, &dff).unwrap();

    let text = fs::read_to_string(&lff).unwrap();
    let text = text.replace(
        "    Bube [bube1242][bvb]\n",
        "    Bobe [bube1242][bvb] provisional\n",
    );
    fs::write(&lff, text).unwrap();

    let stats = lff2tree(&tree, &lff, &dff).unwrap();
    assert_eq!(stats.updated, 1);
    assert_eq!(stats.moved, 0);

    let after = snapshot(&tree);
    let bube = &after["bube1242"];
    assert_eq!(bube.name, "Bobe");
    assert_eq!(bube.status.as_deref(), Some("provisional"));
    // untouched by the edit
    assert_eq!(bube.macroareas, vec!["Africa"]);
    assert_eq!(bube.latitude, Some(3.54507));
}

#[test]
fn test_rebuild_deletes_exactly_the_removed_record() {
    let tmp = tempfile::tempdir().unwrap();
    let tree = tmp.path().join("tree");
    sample_tree(&tree);

    let lff = tmp.path().join("lff.txt");
    let dff = tmp.path().join("dff.txt");
    tree2lff(&tree, &lff, &dff).unwrap();

    let text = fs::read_to_string(&lff).unwrap();
    let text = text.replace("    Ghost [ghos1234][] unattested\n", "");
    fs::write(&lff, text).unwrap();

    let stats = lff2tree(&tree, &lff, &dff).unwrap();
    assert_eq!(stats.deleted, 1);
    assert!(!tree.join("atla1278/ghos1234").exists());
    // siblings and the rest of the family are untouched
    assert!(tree.join("atla1278/bant1294/bube1242").is_dir());
    assert!(tree.join("basq1248").is_dir());
}

#[test]
fn test_rebuild_deletes_dialect_subtree() {
    let tmp = tempfile::tempdir().unwrap();
    let tree = tmp.path().join("tree");
    sample_tree(&tree);

    let lff = tmp.path().join("lff.txt");
    let dff = tmp.path().join("dff.txt");
    tree2lff(&tree, &lff, &dff).unwrap();

    // Dropping the intermediate dialect removes its whole subtree: the
    // nested dialect's label still names it, so it has to go too.
    let text = fs::read_to_string(&dff).unwrap();
    let text = text.replace("    North Bube [nort1111][]\n", "");
    let text = text.replace(
        "Bube [bube1242], North Bube [nort1111]\n    Deep North Bube [deep2222][]\n",
        "",
    );
    fs::write(&dff, text).unwrap();

    let stats = lff2tree(&tree, &lff, &dff).unwrap();
    assert_eq!(stats.deleted, 1);
    assert!(!tree.join("atla1278/bant1294/bube1242/nort1111").exists());
    assert!(tree.join("atla1278/bant1294/bube1242/bube1242.ini").is_file());
}

#[test]
fn test_rebuild_creates_new_family_and_language() {
    let tmp = tempfile::tempdir().unwrap();
    let tree = tmp.path().join("tree");
    sample_tree(&tree);

    let lff = tmp.path().join("lff.txt");
    let dff = tmp.path().join("dff.txt");
    tree2lff(&tree, &lff, &dff).unwrap();

    let mut text = fs::read_to_string(&lff).unwrap();
    text.push_str("Newfam [newf1234]\n    Newlang [newl1234][new]\n");
    fs::write(&lff, text).unwrap();

    let stats = lff2tree(&tree, &lff, &dff).unwrap();
    assert_eq!(stats.created, 2);

    let after = snapshot(&tree);
    assert_eq!(after["newf1234"].level, Level::Family);
    assert_eq!(after["newl1234"].level, Level::Language);
    assert_eq!(after["newl1234"].lineage, vec!["newf1234"]);
    assert_eq!(after["newl1234"].iso.as_deref(), Some("new"));
}
