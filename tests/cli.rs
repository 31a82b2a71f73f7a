use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn harvester() -> Command {
    Command::cargo_bin("harvester").unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    harvester()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("harvest"))
        .stdout(predicate::str::contains("processed"));
}

#[test]
fn test_invalid_date_is_rejected() {
    harvester()
        .args(["harvest", "rust", "--after", "yesterday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("YYYY-MM-DD"));
}

#[test]
fn test_processed_reports_archived_ids() {
    let root = TempDir::new().unwrap();
    let query_dir = root.path().join("rust");
    fs_err::create_dir_all(&query_dir).unwrap();
    fs_err::write(
        query_dir.join("Talk.trans.txt"),
        "// link: https://www.youtube.com/watch?v=abc123\nBody.",
    )
    .unwrap();

    harvester()
        .current_dir(root.path())
        .args(["processed", "--list", "--output"])
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 videos already processed"))
        .stdout(predicate::str::contains("abc123"));
}

#[test]
fn test_api_key_is_read_from_dotenv_file() {
    let dir = TempDir::new().unwrap();
    fs_err::write(dir.path().join("config.yaml"), "pipeline:\n  min_length_ratio: 0.8\n").unwrap();
    fs_err::write(dir.path().join(".env"), "YOUTUBE_API_KEY=dotenv-secret\n").unwrap();

    harvester()
        .current_dir(dir.path())
        .env_remove("YOUTUBE_API_KEY")
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("YouTube API Key: dote…"));
}
