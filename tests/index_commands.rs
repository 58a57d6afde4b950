use assert_fs::fixture::{FileWriteStr, PathChild, PathCreateDir};
use byteorder::ByteOrder;
use fake::faker::lorem::en::Words;
use fake::Fake;
use predicates::prelude::predicate;

mod common;

const EMPTY_BLOB: &str = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391";

/// Entry count from the 12-byte DIRC header
fn entry_count(index: &[u8]) -> u32 {
    assert_eq!(&index[..4], b"DIRC");
    byteorder::NetworkEndian::read_u32(&index[8..12])
}

#[test]
fn adding_an_empty_file_stores_the_known_blob() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);
    dir.child("empty_test_file").write_str("")?;

    common::gfg(&dir)
        .arg("add")
        .arg("empty_test_file")
        .assert()
        .success();

    assert!(common::object_exists(&dir, EMPTY_BLOB));

    let index = common::read_index(&dir);
    assert_eq!(entry_count(&index), 1);
    assert!(common::contains_bytes(&index, b"empty_test_file"));
    assert!(common::contains_bytes(
        &index,
        &common::hex_to_bytes(EMPTY_BLOB)
    ));

    Ok(())
}

#[test]
fn adding_an_unknown_pathspec_aborts_the_invocation() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);
    dir.child("real_file").write_str("1234\n")?;

    common::gfg(&dir)
        .arg("add")
        .arg("real_file")
        .arg("missing_file")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "fatal: pathspec 'missing_file' did not match any files",
        ));

    // the whole invocation aborted before mutating anything
    assert!(!dir.child(".git/index").path().exists());

    Ok(())
}

#[test]
fn adding_a_directory_stages_every_file_underneath() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);
    dir.child("nested").create_dir_all()?;
    dir.child("nested/one.txt").write_str("1234\n")?;
    dir.child("nested/deeper/two.txt").write_str("4321\n")?;

    common::gfg(&dir).arg("add").arg("nested").assert().success();

    let index = common::read_index(&dir);
    assert_eq!(entry_count(&index), 2);
    assert!(common::contains_bytes(&index, b"nested/one.txt"));
    assert!(common::contains_bytes(&index, b"nested/deeper/two.txt"));

    Ok(())
}

#[test]
fn adding_the_same_path_twice_replaces_the_entry() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);
    let file = dir.child("replaced.txt");

    file.write_str("1234\n")?;
    common::gfg(&dir).arg("add").arg("replaced.txt").assert().success();

    file.write_str("4321\n")?;
    common::gfg(&dir).arg("add").arg("replaced.txt").assert().success();

    let index = common::read_index(&dir);
    assert_eq!(entry_count(&index), 1);
    assert!(common::contains_bytes(
        &index,
        &common::hex_to_bytes("79ed404b9b839e31ab01724a986c7d67218c1471")
    ));

    Ok(())
}

#[test]
fn adding_generated_files_keeps_the_index_consistent() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);

    let file_names = ["alpha.txt", "beta.txt", "gamma.txt"];
    for file_name in &file_names {
        let content = Words(5..10).fake::<Vec<String>>().join(" ");
        dir.child(*file_name).write_str(&content)?;
        common::gfg(&dir).arg("add").arg(file_name).assert().success();
    }

    let index = common::read_index(&dir);
    assert_eq!(entry_count(&index), file_names.len() as u32);
    for file_name in &file_names {
        assert!(common::contains_bytes(&index, file_name.as_bytes()));
    }

    Ok(())
}
