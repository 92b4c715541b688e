use assert_cmd::Command;
use image::codecs::gif::GifEncoder;
use image::{Frame, Rgba, RgbaImage};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SCRIPT: &str = r#"{
  "scenes": [
    {
      "location": "courtroom_left",
      "actions": [
        { "character": "phoenix", "text": "Hi there", "action": "text" }
      ]
    }
  ]
}"#;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_objection-engine"))
}

fn write_png(path: &Path, w: u32, h: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(w, h, Rgba([50, 60, 70, 255])).save(path).unwrap();
}

fn write_gif(path: &Path, w: u32, h: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = fs::File::create(path).unwrap();
    let mut encoder = GifEncoder::new(file);
    encoder
        .encode_frame(Frame::new(RgbaImage::from_pixel(w, h, Rgba([200, 10, 10, 255]))))
        .unwrap();
}

/// A working directory with a minimal asset tree and a config that disables the font.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let assets = dir.path().join("assets");
    write_png(&assets.join("defenseempty.png"), 64, 48);
    write_png(&assets.join("logo-left.png"), 16, 8);
    write_png(&assets.join("textbox4.png"), 32, 12);
    write_png(&assets.join("arrow.png"), 4, 4);
    write_gif(&assets.join("Sprites-phoenix/phoenix-normal.gif"), 10, 10);
    fs::write(dir.path().join("objection.toml"), "[render]\nfont = \"\"\n").unwrap();
    fs::write(dir.path().join("script.json"), SCRIPT).unwrap();
    dir
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Courtroom animation engine"));
}

#[test]
fn test_cli_template_generation() {
    cli()
        .arg("template")
        .arg("objection")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"location\": \"courtroom_left\""))
        .stdout(predicate::str::contains("\"action\": \"objection\""));
}

#[test]
fn test_cli_validate_valid_script() {
    let dir = workspace();
    cli()
        .arg("validate")
        .arg(dir.path().join("script.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("Scenes: 1"));
}

#[test]
fn test_cli_validate_rejects_text_without_speaker() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(
        &path,
        r#"{"scenes": [{"location": "judge_stand", "actions": [{"text": "Order!", "action": "text"}]}]}"#,
    )
    .unwrap();

    cli()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid script"));
}

#[test]
fn test_cli_config_prints_toml() {
    let dir = TempDir::new().unwrap();
    cli()
        .current_dir(dir.path())
        .arg("config")
        .arg("--fps")
        .arg("24")
        .assert()
        .success()
        .stdout(predicate::str::contains("[render]"))
        .stdout(predicate::str::contains("fps = 24"));
}

#[test]
fn test_cli_rejects_zero_fps() {
    let dir = workspace();
    cli()
        .current_dir(dir.path())
        .args(["--fps", "0", "plan", "script.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("render.fps must be at least 1"));
}

#[test]
fn test_cli_plan_counts_frames() {
    let dir = workspace();
    // "Hi there" speaks for 7 frames, then settles for 25
    cli()
        .current_dir(dir.path())
        .arg("plan")
        .arg("script.json")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 32 frames"));
}

#[test]
fn test_cli_plan_json() {
    let dir = workspace();
    let output = cli()
        .current_dir(dir.path())
        .args(["plan", "script.json", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let cues: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let cues = cues.as_array().unwrap();
    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0]["type"], "blip");
    assert_eq!(cues[0]["frames"], 7);
    assert_eq!(cues[1]["type"], "silence");
    assert_eq!(cues[1]["frames"], 25);
}

#[test]
fn test_cli_plan_missing_asset() {
    let dir = workspace();
    fs::remove_file(dir.path().join("assets/Sprites-phoenix/phoenix-normal.gif")).unwrap();
    cli()
        .current_dir(dir.path())
        .args(["plan", "script.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("asset not found"));
}

#[test]
fn test_cli_direct_with_seed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("turns.json");
    fs::write(
        &path,
        r#"[
            {"name": "alice", "sentences": ["I was home all night."]},
            {"name": "bob", "emotion": "anger", "sentences": ["Liar!"]}
        ]"#,
    )
    .unwrap();

    let run = || {
        cli()
            .current_dir(dir.path())
            .args(["direct", "turns.json", "--seed", "42"])
            .output()
            .unwrap()
    };
    let first = run();
    assert!(first.status.success());
    assert_eq!(first.stdout, run().stdout);

    let script: serde_json::Value = serde_json::from_slice(&first.stdout).unwrap();
    assert_eq!(script["scenes"].as_array().unwrap().len(), 2);
    assert_eq!(script["scenes"][1]["actions"][0]["action"], "objection");
}
