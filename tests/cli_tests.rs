//! Tests for the `sfm` binary

mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use common::{bmp, gif_as, png, write_file};
use mockito::Matcher;
use predicates::prelude::*;
use tempfile::TempDir;

fn sfm() -> Command {
    let mut cmd = cargo_bin_cmd!("sfm");
    cmd.env_remove("STOREFRONT_API_URL")
        .env_remove("STOREFRONT_TOKEN")
        .env_remove("STOREFRONT_TIMEOUT_SECS")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_prepare_writes_png_for_bmp() {
    let tmp = TempDir::new().unwrap();
    let input = write_file(tmp.path(), &bmp("banner.bmp", 12, 8));
    let out_dir = tmp.path().join("out");

    sfm()
        .arg("prepare")
        .arg(&input)
        .arg("--out-dir")
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Prepared 1 file"));

    let bytes = std::fs::read(out_dir.join("banner.png")).unwrap();
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!((img.width(), img.height()), (12, 8));
}

#[test]
fn test_prepare_keeps_both_files_when_names_collide() {
    let tmp = TempDir::new().unwrap();
    let png_input = write_file(tmp.path(), &png("a.png", 8, 8));
    let webp_input = write_file(tmp.path(), &gif_as("a.webp", "image/webp", 6, 4));
    let out_dir = tmp.path().join("out");

    sfm()
        .arg("prepare")
        .arg(&png_input)
        .arg(&webp_input)
        .arg("--out-dir")
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Prepared 2 files"))
        .stdout(predicate::str::contains("written as a-1.png"));

    let first = image::open(out_dir.join("a.png")).unwrap();
    let second = image::open(out_dir.join("a-1.png")).unwrap();
    assert_eq!((first.width(), first.height()), (8, 8));
    assert_eq!((second.width(), second.height()), (6, 4));
}

#[test]
fn test_prepare_rejects_oversized_kib() {
    sfm()
        .args(["prepare", "x.png", "--threshold-kib"])
        .arg(u64::MAX.to_string())
        .assert()
        .failure()
        .stderr(predicate::str::contains("too large"));
}

#[test]
fn test_prepare_fails_when_nothing_decodes() {
    let tmp = TempDir::new().unwrap();
    let bogus = tmp.path().join("notes.webp");
    std::fs::write(&bogus, b"definitely not an image").unwrap();

    sfm()
        .arg("prepare")
        .arg(&bogus)
        .arg("--out-dir")
        .arg(tmp.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("could be decoded"));
}

#[test]
fn test_prepare_missing_file() {
    sfm()
        .args(["prepare", "/nonexistent/photo.jpg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_submit_dry_run_prints_parts() {
    sfm()
        .args([
            "submit",
            "landing",
            "--id",
            "l1",
            "--existing",
            "image=https://cdn.shop.test/logo.png",
            "--existing",
            "heroImage=https://cdn.shop.test/h.png",
            "--remove",
            "heroImage=https://cdn.shop.test/h.png",
            "--set",
            "storeName=Corner Shop",
            "--set",
            "colourCode=#fff",
            "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("PUT /landing/l1"))
        .stdout(predicate::str::contains("storeName = Corner Shop"))
        .stdout(predicate::str::contains(
            r#"deletedHeroImages = ["https://cdn.shop.test/h.png"]"#,
        ));
}

#[test]
fn test_submit_rejects_malformed_set() {
    sfm()
        .args(["submit", "product", "--set", "price", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected name=value"));
}

#[test]
fn test_submit_reports_validation_problems() {
    sfm()
        .args(["submit", "landing", "--set", "colourCode=blue", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("storeName is required"))
        .stderr(predicate::str::contains("image is required"));
}

#[test]
fn test_submit_without_api_url_fails() {
    let tmp = TempDir::new().unwrap();
    let logo = write_file(tmp.path(), &png("logo.png", 8, 8));

    sfm()
        .args(["submit", "category", "--set", "name=Kitchen"])
        .args(["--set", "description=Pots"])
        .arg("--attach")
        .arg(format!("categoryImage={}", logo.display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("STOREFRONT_API_URL"));
}

#[test]
fn test_submit_creates_entity() {
    let tmp = TempDir::new().unwrap();
    let logo = write_file(tmp.path(), &png("logo.png", 8, 8));

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/cate")
        .match_header("authorization", "Bearer s3cret")
        .match_header(
            "content-type",
            Matcher::Regex("multipart/form-data".to_string()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("Kitchen".to_string()),
            Matcher::Regex(r#"filename="logo.png""#.to_string()),
        ]))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":{"_id":"cat-1","name":"Kitchen"}}"#)
        .create();

    sfm()
        .env("STOREFRONT_API_URL", server.url())
        .env("STOREFRONT_TOKEN", "s3cret")
        .args(["submit", "cate", "--set", "name=Kitchen"])
        .args(["--set", "description=Pots"])
        .arg("--attach")
        .arg(format!("categoryImage={}", logo.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved category cat-1"));

    mock.assert();
}

#[test]
fn test_submit_surfaces_server_message() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("PUT", "/product/p1")
        .with_status(422)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message":"category does not exist"}"#)
        .create();

    sfm()
        .args(["submit", "product", "--id", "p1", "--api-url"])
        .arg(server.url())
        .args(["--set", "name=Mug", "--set", "description=Stoneware"])
        .args(["--set", "category=nope", "--set", "price=12"])
        .args(["--set", "stockCount=3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("category does not exist"));

    mock.assert();
}
