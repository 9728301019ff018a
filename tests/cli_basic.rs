//! Integration tests for basic CLI behavior.
//!
//! Tests that the binary exists, accepts standard flags, and each subcommand
//! responds to `--help` with appropriate text.

#![allow(deprecated)] // cargo_bin deprecation — replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: get a Command for the `slideprint` binary.
fn slideprint() -> Command {
    Command::cargo_bin("slideprint").expect("binary 'slideprint' should be built")
}

// ─── Top-level flags ─────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    slideprint()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: slideprint"))
        .stdout(predicate::str::contains("sites"))
        .stdout(predicate::str::contains("match"))
        .stdout(predicate::str::contains("counter"))
        .stdout(predicate::str::contains("counts"))
        .stdout(predicate::str::contains("assemble"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn version_flag_shows_semver() {
    slideprint()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^slideprint \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn no_args_shows_error_and_usage() {
    slideprint()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: slideprint"));
}

#[test]
fn invalid_subcommand_fails() {
    slideprint()
        .arg("this-is-not-a-real-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ─── Subcommand help ─────────────────────────────────────────────────────────

#[test]
fn counts_help() {
    slideprint()
        .args(["counts", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Read slide counts from a saved viewer page"))
        .stdout(predicate::str::contains("<HTML>"))
        .stdout(predicate::str::contains("--url"));
}

#[test]
fn assemble_help() {
    slideprint()
        .args(["assemble", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("printable HTML document"))
        .stdout(predicate::str::contains("<SLIDES>"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--ratio"));
}

#[test]
fn assemble_requires_output() {
    slideprint()
        .args(["assemble", "slides.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--output"));
}

// ─── Sites and matching ──────────────────────────────────────────────────────

#[test]
fn sites_lists_every_viewer_in_order() {
    let output = slideprint().arg("sites").assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output).unwrap();

    let names = ["pitch", "docsend", "brieflink", "visible.vc", "decksend"];
    let positions: Vec<usize> = names.iter().map(|n| stdout.find(n).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{stdout}");
}

#[test]
fn match_known_viewers() {
    for (url, name) in [
        ("https://pitch.com/public/0f3a-77", "pitch"),
        ("https://acme.docsend.com/view/abc123", "docsend"),
        ("https://brieflink.com/v/12ab-cd", "brieflink"),
        ("https://decks.visible.vc/acme-seed", "visible.vc"),
        ("https://decksend.net/abc123", "decksend"),
    ] {
        slideprint()
            .args(["match", url])
            .assert()
            .success()
            .stdout(predicate::str::contains(name));
    }
}

#[test]
fn match_unknown_url_fails() {
    slideprint()
        .args(["match", "https://example.com/deck"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no site adapter"));
}

// ─── Counter parsing ─────────────────────────────────────────────────────────

#[test]
fn counter_parses_padded_text() {
    slideprint()
        .args(["counter", "  3 / 20 "])
        .assert()
        .success()
        .stdout("3 / 20\n");
}

#[test]
fn counter_rejects_text_without_numbers() {
    slideprint()
        .args(["counter", "Page"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no slide counter"));
}

// ─── Config ──────────────────────────────────────────────────────────────────

#[test]
fn config_shows_defaults_without_file() {
    let dir = tempfile::tempdir().unwrap();
    slideprint()
        .arg("config")
        .env("XDG_CONFIG_HOME", dir.path())
        .env("HOME", dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("settle_ms = 600"))
        .stdout(predicate::str::contains("jpeg_quality = 90"));
}
