//! Command-line interface for the languoid tree.
//!
//! Usage:
//!   glottolog --repos <dir> tree2lff                       - Write lff.txt and dff.txt from the tree
//!   glottolog --repos <dir> lff2tree                       - Rebuild the tree from lff.txt and dff.txt
//!   glottolog --repos <dir> new-languoid <name> <level>    - Create a languoid with a fresh glottocode
//!   glottolog --repos <dir> recode <code>                  - Assign a new glottocode to a languoid
//!   glottolog --repos <dir> index <level|all>              - Regenerate the markdown indexes

use std::fs;
use std::path::Path;
use std::process::exit;

use clap::{Arg, ArgAction, Command};

use glottolog::languoids::codes::Glottocodes;
use glottolog::languoids::index::make_index;
use glottolog::languoids::{find_languoid, Languoid, Level};
use glottolog::lff;
use glottolog::repos::Repos;

fn main() {
    let matches = Command::new("glottolog")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Languoid tree maintenance: LFF round-tripping, codes and indexes")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("repos")
                .long("repos")
                .help("Path to the data repository (holds languoids/)")
                .default_value("."),
        )
        .subcommand(Command::new("tree2lff").about("Write lff.txt and dff.txt from the tree"))
        .subcommand(
            Command::new("lff2tree")
                .about("Rebuild the tree from lff.txt and dff.txt, in place"),
        )
        .subcommand(
            Command::new("new-languoid")
                .about("Create a languoid with a freshly allocated glottocode")
                .arg(Arg::new("name").required(true))
                .arg(
                    Arg::new("level")
                        .required(true)
                        .help("family, language or dialect"),
                )
                .arg(
                    Arg::new("attrs")
                        .help("Extra core attributes as key=value")
                        .num_args(0..)
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("recode")
                .about("Assign a new glottocode to an existing languoid")
                .arg(Arg::new("code").required(true)),
        )
        .subcommand(
            Command::new("index")
                .about("Regenerate the markdown index pages")
                .arg(Arg::new("level").default_value("all")),
        )
        .get_matches();

    let repos = Repos::new(
        matches
            .get_one::<String>("repos")
            .expect("repos has a default")
            .as_str(),
    );

    match matches.subcommand() {
        Some(("tree2lff", _)) => handle_tree2lff(&repos),
        Some(("lff2tree", _)) => handle_lff2tree(&repos),
        Some(("new-languoid", sub)) => {
            let name = sub.get_one::<String>("name").expect("name is required");
            let level = sub.get_one::<String>("level").expect("level is required");
            let attrs: Vec<String> = sub
                .get_many::<String>("attrs")
                .map(|v| v.cloned().collect())
                .unwrap_or_default();
            handle_new_languoid(&repos, name, level, &attrs);
        }
        Some(("recode", sub)) => {
            let code = sub.get_one::<String>("code").expect("code is required");
            handle_recode(&repos, code);
        }
        Some(("index", sub)) => {
            let level = sub.get_one::<String>("level").expect("level has a default");
            handle_index(&repos, level);
        }
        _ => unreachable!("subcommand is required"),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    exit(1);
}

fn handle_tree2lff(repos: &Repos) {
    let stats = lff::tree2lff(&repos.tree(), &repos.lff(), &repos.dff())
        .unwrap_or_else(|e| fail(e));
    println!(
        "Wrote {} ({} languages) and {} ({} dialects)",
        repos.lff().display(),
        stats.languages,
        repos.dff().display(),
        stats.dialects
    );
    for id in &stats.unclassified {
        eprintln!("Warning: {} has an unclassifiable lineage", id);
    }
    for id in &stats.unrepresented_families {
        eprintln!(
            "Warning: family {} has no languages and is not representable in LFF",
            id
        );
    }
}

fn handle_lff2tree(repos: &Repos) {
    let stats = lff::lff2tree(&repos.tree(), &repos.lff(), &repos.dff())
        .unwrap_or_else(|e| fail(e));
    println!(
        "Tree rebuilt: {} created, {} moved, {} updated, {} deleted",
        stats.created, stats.moved, stats.updated, stats.deleted
    );
    println!("Run `git status` under the repository to inspect the changes;");
    println!("`git checkout {}` discards them.", repos.tree().display());
}

fn load_codes(path: &Path) -> Glottocodes {
    if path.exists() {
        Glottocodes::load(path).unwrap_or_else(|e| fail(e))
    } else {
        Glottocodes::default()
    }
}

fn handle_new_languoid(repos: &Repos, name: &str, level: &str, attrs: &[String]) {
    let level: Level = level.parse().unwrap_or_else(|e| fail(e));
    let mut extras = Vec::new();
    for attr in attrs {
        match attr.split_once('=') {
            Some((key, value)) => extras.push((key.to_string(), value.to_string())),
            None => fail(format!("expected key=value, got {:?}", attr)),
        }
    }

    let codes_path = repos.glottocodes();
    let mut codes = load_codes(&codes_path);
    let id = codes.new_code(name).unwrap_or_else(|e| fail(e));
    let node =
        Languoid::from_name_id_level(name, &id, level, &extras).unwrap_or_else(|e| fail(e));
    let path = node
        .write_info(&repos.tree().join(&id))
        .unwrap_or_else(|e| fail(e));
    codes.save(&codes_path).unwrap_or_else(|e| fail(e));
    println!("Info written to {}", path.display());
}

fn handle_recode(repos: &Repos, code: &str) {
    let mut node = match find_languoid(&repos.tree(), code) {
        Ok(Some(node)) => node,
        Ok(None) => fail(format!("languoid {} not found", code)),
        Err(e) => fail(e),
    };
    let old_dir = match node.dir() {
        Some(dir) => dir.to_path_buf(),
        None => fail(format!("languoid {} has no directory", code)),
    };

    let codes_path = repos.glottocodes();
    let mut codes = load_codes(&codes_path);
    let new_code = codes.new_code(node.name()).unwrap_or_else(|e| fail(e));

    let new_dir = match old_dir.parent() {
        Some(parent) => parent.join(&new_code),
        None => fail(format!("{} has no parent directory", old_dir.display())),
    };
    fs::rename(&old_dir, &new_dir).unwrap_or_else(|e| fail(e));
    node.set_core("glottocode", &new_code).unwrap_or_else(|e| fail(e));
    node.write_info(&new_dir).unwrap_or_else(|e| fail(e));
    fs::remove_file(new_dir.join(format!("{}.ini", code))).unwrap_or_else(|e| fail(e));
    codes.save(&codes_path).unwrap_or_else(|e| fail(e));
    println!("{} -> {}", code, new_code);
}

fn handle_index(repos: &Repos, level: &str) {
    let levels: Vec<Level> = if level == "all" {
        Level::all().to_vec()
    } else {
        vec![level.parse().unwrap_or_else(|e| fail(e))]
    };
    for level in levels {
        make_index(repos, level).unwrap_or_else(|e| fail(e));
    }
}
