use survey_spec::catalog::{SAMPLE_NAMES, by_name, intake, weekly};
use survey_spec::{Survey, SurveyEditor, build_render_payload, render_text, validate};

fn samples() -> Vec<Survey> {
    SAMPLE_NAMES
        .iter()
        .map(|name| by_name(name).unwrap().unwrap())
        .collect()
}

#[test]
fn samples_pass_lint() {
    for survey in samples() {
        let result = validate(&survey);
        assert!(result.valid, "{}: {:?}", survey.root_key(), result.errors);
    }
}

#[test]
fn samples_survive_a_json_round_trip() {
    for survey in samples() {
        let json = serde_json::to_string(&survey).unwrap();
        let parsed: Survey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, survey);
        assert!(SurveyEditor::from_survey(parsed).is_ok());
    }
}

#[test]
fn intake_preview_lists_every_question() {
    let payload = build_render_payload(&intake::generate().unwrap(), "en");
    let questions = payload
        .items
        .iter()
        .filter(|item| item.kind.as_str() == "question")
        .count();
    assert_eq!(questions, 7);
    let text = render_text(&payload);
    assert!(text.starts_with("Survey: Intake questionnaire (intake)"));
    assert!(text.contains("intake.Q6 [question] When were you vaccinated? (conditional)"));
    assert!(text.contains("intake.end [surveyEnd]"));
}

#[test]
fn weekly_keys_follow_the_group_layout() {
    let editor = SurveyEditor::from_survey(weekly::generate().unwrap()).unwrap();
    let keys = editor.item_keys();
    assert_eq!(keys.first().map(String::as_str), Some("weekly"));
    assert!(keys.contains(&"weekly.symptoms.Q1".to_string()));
    assert!(keys.contains(&"weekly.details.Q5".to_string()));
    assert_eq!(keys.last().map(String::as_str), Some("weekly.end"));
}
