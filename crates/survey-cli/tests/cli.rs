use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use serde_json::{Value, json};

fn survey_gen(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("survey-gen").unwrap();
    cmd.current_dir(dir.path())
        .env("SURVEY_ALLOWED_ROOTS", dir.path())
        .env_remove("SURVEY_OUTPUT_DIR")
        .env_remove("RUST_LOG");
    cmd
}

fn generation_input() -> Value {
    json!({
        "dir_name": "checkin",
        "survey": { "key": "checkin", "name": { "en": "Check-in" } },
        "questions": [
            {
                "key": "Q1",
                "type": "single_choice",
                "title": { "en": "Feeling well?" },
                "options": [
                    { "key": "0", "content": { "en": "Yes" } },
                    { "key": "1", "content": { "en": "No" } }
                ]
            },
            {
                "key": "Q2",
                "type": "text",
                "title": { "en": "What is wrong?" },
                "required": false,
                "condition": {
                    "name": "responseHasKeysAny",
                    "data": [
                        { "dtype": "str", "str": "checkin.Q1" },
                        { "dtype": "str", "str": "rg.scg" },
                        { "dtype": "str", "str": "1" }
                    ]
                }
            }
        ]
    })
}

fn sample_json(dir: &TempDir, name: &str) -> String {
    let output = survey_gen(dir)
        .args(["sample", "--name", name])
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn generate_writes_bundle() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("input.json");
    input.write_str(&generation_input().to_string()).unwrap();

    survey_gen(&temp)
        .args(["generate", "--input"])
        .arg(input.path())
        .args(["--out"])
        .arg(temp.path())
        .assert()
        .success();

    let survey_file = temp.child("checkin/surveys/checkin.survey.json");
    assert!(survey_file.path().exists());
    assert!(temp.child("checkin/schemas/survey.schema.json").path().exists());
    assert!(temp.child("checkin/README.md").path().exists());

    let survey: Value =
        serde_json::from_str(&std::fs::read_to_string(survey_file.path()).unwrap()).unwrap();
    assert_eq!(survey["current"]["surveyDefinition"]["key"], "checkin");
    assert_eq!(
        survey["current"]["surveyDefinition"]["items"][1]["key"],
        "checkin.Q2"
    );
}

#[test]
fn generate_refuses_to_overwrite_without_force() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("input.json");
    input.write_str(&generation_input().to_string()).unwrap();
    temp.child("checkin").create_dir_all().unwrap();

    survey_gen(&temp)
        .args(["generate", "--input"])
        .arg(input.path())
        .assert()
        .failure();

    survey_gen(&temp)
        .args(["generate", "--force", "--input"])
        .arg(input.path())
        .assert()
        .success();
    assert!(
        temp.child("checkin/surveys/checkin.survey.json")
            .path()
            .exists()
    );
}

#[test]
fn generate_rejects_output_outside_allowed_roots() {
    let temp = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    let input = temp.child("input.json");
    input.write_str(&generation_input().to_string()).unwrap();

    survey_gen(&temp)
        .args(["generate", "--input"])
        .arg(input.path())
        .arg("--out")
        .arg(elsewhere.path())
        .assert()
        .failure();
}

#[test]
fn failed_forced_generate_keeps_the_previous_bundle() {
    let temp = TempDir::new().unwrap();
    let keep = temp.child("checkin/KEEP.txt");
    keep.write_str("previous bundle").unwrap();
    let mut broken = generation_input();
    broken["questions"][1]["condition"] = json!({
        "name": "hasResponse",
        "data": [
            { "dtype": "str", "str": "checkin.nope" },
            { "dtype": "str", "str": "rg" }
        ]
    });
    let input = temp.child("input.json");
    input.write_str(&broken.to_string()).unwrap();

    survey_gen(&temp)
        .args(["generate", "--force", "--input"])
        .arg(input.path())
        .assert()
        .failure();
    assert!(keep.path().exists());
    assert!(!temp.child("checkin/surveys").path().exists());
}

#[test]
fn generate_rejects_dir_name_escaping_the_output_root() {
    let outer = TempDir::new().unwrap();
    let sandbox = outer.child("sandbox");
    sandbox.create_dir_all().unwrap();
    let mut escaping = generation_input();
    escaping["dir_name"] = json!("missing/../../escaped");
    let input = outer.child("input.json");
    input.write_str(&escaping.to_string()).unwrap();

    let mut cmd = Command::cargo_bin("survey-gen").unwrap();
    cmd.current_dir(sandbox.path())
        .env("SURVEY_ALLOWED_ROOTS", sandbox.path())
        .env_remove("SURVEY_OUTPUT_DIR")
        .env_remove("RUST_LOG")
        .args(["generate", "--input"])
        .arg(input.path())
        .assert()
        .failure();
    assert!(!outer.child("escaped").path().exists());
    assert!(!sandbox.child("missing").path().exists());
}

#[test]
fn sample_output_lints_clean_and_previews() {
    let temp = TempDir::new().unwrap();
    let survey = temp.child("weekly.json");
    survey.write_str(&sample_json(&temp, "weekly")).unwrap();

    survey_gen(&temp)
        .args(["lint", "--survey"])
        .arg(survey.path())
        .assert()
        .success();

    let output = survey_gen(&temp)
        .args(["preview", "--survey"])
        .arg(survey.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.starts_with("Survey: Weekly questionnaire (weekly)"));

    let output = survey_gen(&temp)
        .args(["preview", "--format", "json", "--survey"])
        .arg(survey.path())
        .output()
        .unwrap();
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["survey_key"], "weekly");
}

#[test]
fn lint_fails_on_dangling_reference() {
    let temp = TempDir::new().unwrap();
    let mut survey: Value = serde_json::from_str(&sample_json(&temp, "intake")).unwrap();
    survey["current"]["surveyDefinition"]["items"][0]["condition"] = json!({
        "name": "hasResponse",
        "data": [
            { "dtype": "str", "str": "intake.missing" },
            { "dtype": "str", "str": "rg" }
        ]
    });
    let file = temp.child("broken.json");
    file.write_str(&survey.to_string()).unwrap();

    let output = survey_gen(&temp)
        .args(["lint", "--survey"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["errors"][0]["code"], "dangling_item_reference");
}

#[test]
fn schema_describes_the_survey_document() {
    let temp = TempDir::new().unwrap();
    let output = survey_gen(&temp).arg("schema").output().unwrap();
    assert!(output.status.success());
    let schema: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["title"], "Survey");
}

#[test]
fn unknown_sample_is_rejected_by_the_parser() {
    let temp = TempDir::new().unwrap();
    survey_gen(&temp)
        .args(["sample", "--name", "monthly"])
        .assert()
        .failure();
}
