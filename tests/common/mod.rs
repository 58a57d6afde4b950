#![allow(dead_code)]

use assert_cmd::Command;
use assert_fs::TempDir;

/// Build a `gfg` command running inside the given repository directory
pub fn gfg(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gfg").expect("gfg binary should build");
    cmd.current_dir(dir.path());
    cmd
}

/// Build a `gfg` command with a deterministic author identity
pub fn gfg_with_identity(dir: &TempDir) -> Command {
    let mut cmd = gfg(dir);
    cmd.env("GIT_AUTHOR_NAME", "Test Author")
        .env("GIT_AUTHOR_EMAIL", "test@example.com");
    cmd
}

/// Initialise an empty repository in the given directory
pub fn init_repo(dir: &TempDir) {
    gfg(dir).arg("init").assert().success();
}

/// Whether a loose object with the given hex name exists
pub fn object_exists(dir: &TempDir, hex: &str) -> bool {
    dir.path()
        .join(".git/objects")
        .join(&hex[..2])
        .join(&hex[2..])
        .exists()
}

/// Count every loose object file in the repository
pub fn count_objects(dir: &TempDir) -> usize {
    walkdir(dir.path().join(".git/objects"))
}

fn walkdir(path: std::path::PathBuf) -> usize {
    let Ok(entries) = std::fs::read_dir(&path) else {
        return 0;
    };

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            if entry.path().is_dir() {
                walkdir(entry.path())
            } else {
                1
            }
        })
        .sum()
}

/// Decode a hex string into raw bytes (for searching index contents)
pub fn hex_to_bytes(hex: &str) -> Vec<u8> {
    hex.as_bytes()
        .chunks(2)
        .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap(), 16).unwrap())
        .collect()
}

/// Whether `haystack` contains `needle` as a byte subsequence
pub fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}

/// Read the raw bytes of `.git/index`
pub fn read_index(dir: &TempDir) -> Vec<u8> {
    std::fs::read(dir.path().join(".git/index")).expect("index file should exist")
}

/// Capture a command's stdout as a string
pub fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("command should run");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout should be UTF-8")
}
