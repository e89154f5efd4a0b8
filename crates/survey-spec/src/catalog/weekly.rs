//! Recurring symptoms questionnaire with a conditional details block.

use crate::catalog::{question, survey_end};
use crate::editor::{EditorError, ItemEditor, NewItem, SurveyEditor};
use crate::exp_with_args;
use crate::expr::{
    DateUnit, Expression, date_response_diff_from_now, or, response_has_keys_any,
    response_has_only_keys_other_than, timestamp_with_offset,
};
use crate::i18n::loc_strings;
use crate::spec::component::{ComponentProperties, PropertyValue};
use crate::spec::item::{Validation, ValidationType};
use crate::spec::survey::Survey;
use crate::templates::{
    OptionDef, date_input_component, help_group_component, init_dropdown_group, init_likert_scale,
    init_multiple_choice_group, init_single_choice_group, init_slider_categorical_group,
    locale_text, require_response,
};

pub const SURVEY_KEY: &str = "weekly";

const NO_SYMPTOMS: &str = "0";
const DAY: i64 = 24 * 60 * 60;

pub fn generate() -> Result<Survey, EditorError> {
    let mut survey = SurveyEditor::new(SURVEY_KEY)?;
    survey.set_survey_id(SURVEY_KEY);
    survey.set_version_id("1");
    survey.set_survey_name(loc_strings([("en", "Weekly questionnaire")]));
    survey.set_survey_duration(loc_strings([("en", "1 to 3 minutes")]));
    survey.set_metadata("repeat", "weekly");

    let root = survey.root_key().to_string();

    let symptoms_group = survey.add_new_survey_item(NewItem::group("symptoms"), &root, None)?;
    let symptoms_group = symptoms_group.key().to_string();
    let symptoms_key = format!("{}.Q1", symptoms_group);

    let any_symptom = response_has_keys_any(&symptoms_key, "rg.mcg", &["1", "2", "3", "4"]);
    let no_symptom = response_has_keys_any(&symptoms_key, "rg.mcg", &[NO_SYMPTOMS]);
    let mut symptoms = question(
        &mut survey,
        &symptoms_group,
        "Q1",
        &[("en", "Did you have any of the following symptoms since your last report?")],
        init_multiple_choice_group(
            "mcg",
            &[
                OptionDef::option(NO_SYMPTOMS, &[("en", "No symptoms")]).with_disabled(any_symptom),
                OptionDef::option("1", &[("en", "Fever")]).with_disabled(no_symptom.clone()),
                OptionDef::option("2", &[("en", "Cough")]).with_disabled(no_symptom.clone()),
                OptionDef::option("3", &[("en", "Sore throat")]).with_disabled(no_symptom.clone()),
                OptionDef::option("4", &[("en", "Headache")]).with_disabled(no_symptom),
            ],
            None,
        ),
    )?;
    symptoms.set_help_group_component(help_group_component(&[
        locale_text(&[("en", "Why are we asking this?")]),
        locale_text(&[("en", "Symptom reports let us follow how illness spreads.")]),
    ]))?;
    symptoms.add_validation(require_response(&symptoms_key))?;
    survey.update_survey_item(symptoms.into_item())?;

    let details = survey.add_new_survey_item(NewItem::group("details"), &root, None)?;
    let mut details = ItemEditor::from_item(details);
    details.set_condition(Some(response_has_only_keys_other_than(
        &symptoms_key,
        "rg.mcg",
        &[NO_SYMPTOMS],
    )));
    details.set_selection_method(Some(Expression::sequential()))?;
    let details_key = details.key().to_string();
    survey.update_survey_item(details.into_item())?;

    let start_props = ComponentProperties {
        min: Some(PropertyValue::Arg(timestamp_with_offset(-365 * DAY, None).into())),
        max: Some(PropertyValue::Arg(timestamp_with_offset(0, None).into())),
        ..ComponentProperties::default()
    };
    let mut start = question(
        &mut survey,
        &details_key,
        "Q2",
        &[("en", "When did the first symptoms start?")],
        date_input_component("date", Some(start_props)),
    )?;
    let start_key = start.key().to_string();
    start.add_validation(Validation {
        key: "recent".into(),
        kind: ValidationType::Soft,
        rule: exp_with_args!(
            "lte",
            date_response_diff_from_now(&start_key, "rg.date", DateUnit::Days, true),
            14
        ),
    })?;
    survey.update_survey_item(start.into_item())?;

    let severity = question(
        &mut survey,
        &details_key,
        "Q3",
        &[("en", "How severe were your symptoms?")],
        init_slider_categorical_group("slider", &scale(&["Very mild", "Mild", "Moderate", "Severe"])),
    )?;
    survey.update_survey_item(severity.into_item())?;

    let impact = question(
        &mut survey,
        &details_key,
        "Q4",
        &[("en", "My symptoms kept me from my daily activities.")],
        init_likert_scale(
            "likert",
            &scale(&[
                "Strongly disagree",
                "Disagree",
                "Neutral",
                "Agree",
                "Strongly agree",
            ]),
        ),
    )?;
    let impact_key = impact.key().to_string();
    survey.update_survey_item(impact.into_item())?;

    let mut days_off = question(
        &mut survey,
        &details_key,
        "Q5",
        &[("en", "How many days did you stay home from work or school?")],
        init_dropdown_group(
            "ddg",
            &scale(&["0", "1", "2", "3", "4", "5", "6", "7", "More than 7"]),
            None,
        ),
    )?;
    days_off.set_condition(Some(response_has_keys_any(
        &impact_key,
        "rg.likert",
        &["3", "4"],
    )));
    survey.update_survey_item(days_off.into_item())?;

    let mut doctor = question(
        &mut survey,
        &root,
        "Q6",
        &[("en", "Did you contact a doctor about your fever or cough?")],
        init_single_choice_group(
            "scg",
            &[
                OptionDef::option("0", &[("en", "Yes")]),
                OptionDef::option("1", &[("en", "No")]),
            ],
            None,
        ),
    )?;
    doctor.set_condition(Some(or([
        response_has_keys_any(&symptoms_key, "rg.mcg", &["1"]),
        response_has_keys_any(&symptoms_key, "rg.mcg", &["2"]),
    ])));
    survey.update_survey_item(doctor.into_item())?;

    survey_end(&mut survey, &root, &[("en", "Thank you, see you next week.")])?;

    Ok(survey.into_survey())
}

/// Options keyed by position.
fn scale(labels: &[&str]) -> Vec<OptionDef> {
    labels
        .iter()
        .enumerate()
        .map(|(index, label)| OptionDef::option(index.to_string(), &[("en", *label)]))
        .collect()
}
