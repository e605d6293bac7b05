//! End-to-end tests for the `srcfilter` binary.

use std::{fs, path::PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[allow(deprecated)]
fn srcfilter() -> Command {
    Command::cargo_bin("srcfilter").unwrap()
}

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    srcfilter()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("shard"));
}

#[test]
fn test_build_from_corpus_with_gaps() {
    let dir = TempDir::new().unwrap();
    let corpus = write(&dir, "corpus.txt", "1 2 3\n");

    // five spans plus `1 3`
    srcfilter()
        .arg("build")
        .arg("--corpus")
        .arg(&corpus)
        .args(["--max-phrase-len", "2", "--max-span", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("phrases\t6"));
}

#[test]
fn test_build_from_config_file() {
    let dir = TempDir::new().unwrap();
    let corpus = write(&dir, "corpus.txt", "1 2 3\n");
    let config = write(
        &dir,
        "filter.toml",
        "parallel = true\n\n[filter]\nmax_phrase_len = 2\nmax_span = 3\n",
    );

    srcfilter()
        .arg("build")
        .arg("--corpus")
        .arg(&corpus)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("phrases\t6"));

    // flags win over the file
    srcfilter()
        .arg("build")
        .arg("--corpus")
        .arg(&corpus)
        .arg("--config")
        .arg(&config)
        .args(["--max-phrase-len", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("phrases\t3"));
}

#[test]
fn test_build_writes_phrase_list() {
    let dir = TempDir::new().unwrap();
    let list = write(&dir, "list.txt", "1 2\n\n3\n1 2\n");
    let output = dir.path().join("out.txt");

    srcfilter()
        .arg("build")
        .arg("--list")
        .arg(&list)
        .arg("--output")
        .arg(&output)
        .arg("--trie")
        .assert()
        .success()
        .stdout(predicate::str::contains("phrases\t2"))
        .stdout(predicate::str::contains("trie nodes"));

    assert_eq!(fs::read_to_string(&output).unwrap(), "1 2\n3\n");
}

#[test]
fn test_parallel_build_matches_sequential() {
    let dir = TempDir::new().unwrap();
    let corpus = write(&dir, "corpus.txt", "a b c d\n\nb c d e f\na a a\n");
    let sequential = dir.path().join("seq.txt");
    let parallel = dir.path().join("par.txt");

    for (output, flag) in [(&sequential, None), (&parallel, Some("--parallel"))] {
        srcfilter()
            .arg("build")
            .arg("--corpus")
            .arg(&corpus)
            .args(["--max-phrase-len", "3", "--max-span", "5"])
            .args(flag)
            .arg("--output")
            .arg(output)
            .assert()
            .success();
    }

    assert_eq!(
        fs::read_to_string(&sequential).unwrap(),
        fs::read_to_string(&parallel).unwrap()
    );
}

#[test]
fn test_shard_membership() {
    let dir = TempDir::new().unwrap();
    let list = write(&dir, "list.txt", "1 2\n3\n");
    let query = write(&dir, "query.txt", "1 2\n3\n4\n");

    srcfilter()
        .arg("shard")
        .arg("--list")
        .arg(&list)
        .args(["--start", "0", "--end", "1"])
        .arg("--query")
        .arg(&query)
        .assert()
        .success()
        .stdout("keep\t1 2\ndrop\t3\ndrop\t4\n");
}

#[test]
fn test_shard_of_empty_filter_keeps_everything() {
    let dir = TempDir::new().unwrap();
    let list = write(&dir, "list.txt", "\n");
    let query = write(&dir, "query.txt", "x y\n");

    srcfilter()
        .arg("shard")
        .arg("--list")
        .arg(&list)
        .arg("--query")
        .arg(&query)
        .assert()
        .success()
        .stdout("keep\tx y\n");
}

#[test]
fn test_markers_with_span_rejected() {
    let dir = TempDir::new().unwrap();
    let corpus = write(&dir, "corpus.txt", "1 2 3\n");

    srcfilter()
        .arg("build")
        .arg("--corpus")
        .arg(&corpus)
        .args(["--max-span", "3", "--boundary-markers"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("boundary markers"));
}

#[test]
fn test_corpus_and_list_conflict() {
    let dir = TempDir::new().unwrap();
    let corpus = write(&dir, "corpus.txt", "1 2 3\n");

    srcfilter()
        .arg("build")
        .arg("--corpus")
        .arg(&corpus)
        .arg("--list")
        .arg(&corpus)
        .assert()
        .failure();
}

#[test]
fn test_missing_corpus() {
    srcfilter()
        .args(["build", "--corpus", "/nonexistent/srcfilter/corpus.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading corpus"));
}
