//! Black-box end-to-end scenarios against the public `Coordinator` API.

use codeloom::config::Config;
use codeloom::coordinator::Coordinator;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn coordinator() -> Coordinator {
    Coordinator::new(Config::default())
}

#[test]
fn new_index_search_find() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.go"), "package p\nfunc Foo() {}\n").unwrap();

    let coord = coordinator();
    let outcome = coord.index_directory(tmp.path()).unwrap();
    assert_eq!(outcome.files_indexed, 1);

    let results = coord.search("Foo", 0).unwrap();
    assert!(results.iter().any(|r| r.path.ends_with("a.go") && r.line == 2));
}

#[test]
fn edit_reindex_old_gone_new_found() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("a.go");
    fs::write(&file, "package p\nfunc Foo() {}\n").unwrap();

    let coord = coordinator();
    coord.index_directory(tmp.path()).unwrap();

    fs::write(&file, "package p\nfunc Bar() {}\n").unwrap();
    coord.index_file(&file).unwrap();

    let bar_hits = coord.search("Bar", 0).unwrap();
    assert!(bar_hits.iter().any(|r| r.path.ends_with("a.go")));

    let foo_hits = coord.search("Foo", 0).unwrap();
    assert!(!foo_hits.iter().any(|r| r.path.ends_with("a.go")));
}

#[test]
fn delete_remove_absent() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("a.go");
    fs::write(&file, "package p\nfunc Bar() {}\n").unwrap();

    let coord = coordinator();
    coord.index_directory(tmp.path()).unwrap();
    assert_eq!(coord.file_count(), 1);

    fs::remove_file(&file).unwrap();
    coord.remove_file(&file).unwrap();

    let hits = coord.search("Bar", 0).unwrap();
    assert!(!hits.iter().any(|r| r.path.ends_with("a.go")));
    assert_eq!(coord.file_count(), 0);
}

#[test]
fn prefix_query_restricts_candidates() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("src")).unwrap();
    fs::create_dir_all(tmp.path().join("doc")).unwrap();
    fs::write(tmp.path().join("src/x.go"), "package p\nfunc Foo() {}\n").unwrap();
    fs::write(tmp.path().join("doc/y.md"), "Foo appears here too\n").unwrap();
    fs::write(tmp.path().join("src/z.md"), "Bar appears in a markdown file\n").unwrap();

    let coord = coordinator();
    coord.index_directory(tmp.path()).unwrap();

    let go_only = coord.search("path:**/*.go Foo", 0).unwrap();
    assert!(!go_only.is_empty());
    assert!(go_only.iter().all(|r| r.path.extension().unwrap() == "go"));

    let md_only = coord.search("ext:md Bar", 0).unwrap();
    assert!(!md_only.is_empty());
    assert!(md_only.iter().all(|r| r.path.extension().unwrap() == "md"));
}

#[test]
fn concurrent_search_and_update() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("stable.go"), "package p\nfunc Stable() {}\n").unwrap();
    let moving = tmp.path().join("moving.go");
    fs::write(&moving, "package p\nfunc V0() {}\n").unwrap();

    let coord = Arc::new(coordinator());
    coord.index_directory(tmp.path()).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let search_failures = Arc::new(AtomicBool::new(false));

    let searcher = {
        let coord = coord.clone();
        let stop = stop.clone();
        let search_failures = search_failures.clone();
        std::thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                match coord.search("Stable", 0) {
                    Ok(results) if !results.is_empty() => {}
                    _ => search_failures.store(true, Ordering::Relaxed),
                }
            }
        })
    };

    let updater = {
        let coord = coord.clone();
        let moving = moving.clone();
        std::thread::spawn(move || {
            for i in 1..=10 {
                let content = format!("package p\nfunc V{i}() {{}}\n");
                coord.update_file(&moving, content.as_bytes()).unwrap();
            }
        })
    };

    updater.join().unwrap();
    stop.store(true, Ordering::Relaxed);
    searcher.join().unwrap();

    assert!(!search_failures.load(Ordering::Relaxed), "a concurrent search against a stable file failed or came up empty");

    // Every superseded version's exact symbol name must be gone; only the
    // last write's symbol survives in `moving.go`.
    for i in 0..10 {
        assert!(coord.find_symbols_by_name(&format!("V{i}")).unwrap().is_empty());
    }
    assert!(!coord.find_symbols_by_name("V10").unwrap().is_empty());
}

#[test]
fn symbol_lookup_after_rename() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("a.go");
    fs::write(&file, "package p\ntype OldName struct{}\nfunc (o *OldName) M() {}\n").unwrap();

    let coord = coordinator();
    coord.index_directory(tmp.path()).unwrap();

    fs::write(&file, "package p\ntype NewName struct{}\nfunc (o *NewName) M() {}\n").unwrap();
    coord.index_file(&file).unwrap();

    let new_hits = coord.find_symbols_by_name("NewName").unwrap();
    assert!(!new_hits.is_empty());

    let old_hits = coord.find_symbols_by_name("OldName").unwrap();
    assert!(old_hits.is_empty());
}

#[test]
fn empty_directory_indexes_cleanly() {
    let tmp = TempDir::new().unwrap();
    let coord = coordinator();
    let outcome = coord.index_directory(tmp.path()).unwrap();
    assert_eq!(outcome.files_indexed, 0);
    assert_eq!(coord.file_count(), 0);
}

#[test]
fn oversized_pattern_is_a_validation_error() {
    let coord = coordinator();
    let long_pattern = "a".repeat(1001);
    let err = coord.search(&long_pattern, 0).unwrap_err();
    assert!(matches!(err, codeloom::IndexError::Validation(_)));
}

#[test]
fn clear_wipes_the_corpus() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.go"), "package p\nfunc Foo() {}\n").unwrap();

    let coord = coordinator();
    coord.index_directory(tmp.path()).unwrap();
    assert_eq!(coord.file_count(), 1);

    coord.clear().unwrap();
    assert_eq!(coord.file_count(), 0);
    assert!(coord.find_symbols_by_name("Foo").unwrap().is_empty());
}
