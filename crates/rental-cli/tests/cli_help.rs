use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("rental")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("bookings"))
        .stdout(predicate::str::contains("cars"));
}

#[test]
fn test_bookings_help_shows_subcommands() {
    cargo_bin_cmd!("rental")
        .args(["bookings", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("cancel"));
}

#[test]
fn test_search_requires_coordinates() {
    cargo_bin_cmd!("rental")
        .args(["search", "--lat", "52.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--lng"));
}

#[test]
fn test_search_rejects_unknown_fuel() {
    cargo_bin_cmd!("rental")
        .args(["search", "--lat", "1", "--lng", "2", "--fuel", "steam"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown fuel type"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("rental")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}
