use assert_fs::fixture::{FileWriteStr, PathChild};
use predicates::prelude::predicate;

mod common;

const BLOB_1234: &str = "81c545efebe5f57d4cab2ba9ec294c4b0cadf672";
const BLOB_4321: &str = "79ed404b9b839e31ab01724a986c7d67218c1471";
const EMPTY_BLOB: &str = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391";

#[test]
fn hash_object_prints_the_known_blob_sha() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);
    dir.child("test_file").write_str("1234\n")?;

    common::gfg(&dir)
        .arg("hash-object")
        .arg("test_file")
        .assert()
        .success()
        .stdout(format!("{BLOB_1234}\n"));

    // without -w nothing is stored
    assert!(!common::object_exists(&dir, BLOB_1234));

    Ok(())
}

#[test]
fn hash_object_reads_from_stdin() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);

    common::gfg(&dir)
        .arg("hash-object")
        .arg("--stdin")
        .write_stdin("1234\n")
        .assert()
        .success()
        .stdout(format!("{BLOB_1234}\n"));

    common::gfg(&dir)
        .arg("hash-object")
        .arg("--stdin")
        .write_stdin("4321\n")
        .assert()
        .success()
        .stdout(format!("{BLOB_4321}\n"));

    Ok(())
}

#[test]
fn hash_object_write_stores_the_loose_object() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);

    common::gfg(&dir)
        .arg("hash-object")
        .arg("-w")
        .arg("--stdin")
        .write_stdin("1234\n")
        .assert()
        .success()
        .stdout(format!("{BLOB_1234}\n"));

    assert!(common::object_exists(&dir, BLOB_1234));

    Ok(())
}

#[test]
fn hashing_an_empty_file_yields_the_empty_blob() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);
    dir.child("empty_test_file").write_str("")?;

    common::gfg(&dir)
        .arg("hash-object")
        .arg("empty_test_file")
        .assert()
        .success()
        .stdout(format!("{EMPTY_BLOB}\n"));

    Ok(())
}

#[test]
fn hash_object_unknown_file_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);

    common::gfg(&dir)
        .arg("hash-object")
        .arg("missing_file")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "fatal: pathspec 'missing_file' did not match any files",
        ));

    Ok(())
}

#[test]
fn cat_file_prints_type_and_content() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);

    common::gfg(&dir)
        .arg("hash-object")
        .arg("-w")
        .arg("--stdin")
        .write_stdin("1234\n")
        .assert()
        .success();

    common::gfg(&dir)
        .arg("cat-file")
        .arg("-t")
        .arg(BLOB_1234)
        .assert()
        .success()
        .stdout("blob\n");

    common::gfg(&dir)
        .arg("cat-file")
        .arg("-p")
        .arg(BLOB_1234)
        .assert()
        .success()
        .stdout("1234\n");

    // asserting the type prints the raw payload
    common::gfg(&dir)
        .arg("cat-file")
        .arg("blob")
        .arg(BLOB_1234)
        .assert()
        .success()
        .stdout("1234\n");

    Ok(())
}

#[test]
fn cat_file_resolves_short_prefixes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);

    common::gfg(&dir)
        .arg("hash-object")
        .arg("-w")
        .arg("--stdin")
        .write_stdin("1234\n")
        .assert()
        .success();

    common::gfg(&dir)
        .arg("cat-file")
        .arg("-p")
        .arg(&BLOB_1234[..8])
        .assert()
        .success()
        .stdout("1234\n");

    // prefixes shorter than four characters never resolve
    common::gfg(&dir)
        .arg("cat-file")
        .arg("-p")
        .arg(&BLOB_1234[..3])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fatal: Not a valid object name"));

    Ok(())
}

#[test]
fn cat_file_unknown_object_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);

    common::gfg(&dir)
        .arg("cat-file")
        .arg("-p")
        .arg("deadbeef")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "fatal: Not a valid object name deadbeef",
        ));

    Ok(())
}

#[test]
fn cat_file_type_mismatch_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::init_repo(&dir);

    common::gfg(&dir)
        .arg("hash-object")
        .arg("-w")
        .arg("--stdin")
        .write_stdin("1234\n")
        .assert()
        .success();

    common::gfg(&dir)
        .arg("cat-file")
        .arg("tree")
        .arg(BLOB_1234)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a valid 'tree' object"));

    Ok(())
}
