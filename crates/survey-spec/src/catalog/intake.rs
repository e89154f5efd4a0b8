//! One-off intake questionnaire: demographics, household and vaccination.

use crate::catalog::{page_break, question, survey_end};
use crate::editor::{EditorError, SurveyEditor};
use crate::expr::{
    ExpressionArg, check_response_value_with_regex, response_has_keys_any, timestamp_with_offset,
};
use crate::i18n::loc_strings;
use crate::spec::component::{ComponentProperties, PropertyValue};
use crate::spec::item::{Validation, ValidationType};
use crate::spec::survey::Survey;
use crate::templates::{
    MatrixCell, MatrixRow, MatrixRowRole, OptionDef, ROLE_DROPDOWN, date_input_component,
    init_matrix_question, init_multiple_choice_group, init_single_choice_group, input_component,
    locale_text, require_response, text_component,
};

pub const SURVEY_KEY: &str = "intake";

const YEAR: i64 = 365 * 24 * 60 * 60;

pub fn generate() -> Result<Survey, EditorError> {
    let mut survey = SurveyEditor::new(SURVEY_KEY)?;
    survey.set_survey_id(SURVEY_KEY);
    survey.set_version_id("1");
    survey.set_survey_name(loc_strings([("en", "Intake questionnaire")]));
    survey.set_survey_description(loc_strings([(
        "en",
        "Background questions asked once when joining the study.",
    )]));
    survey.set_survey_duration(loc_strings([("en", "About 5 minutes")]));

    let root = survey.root_key().to_string();

    let mut gender = question(
        &mut survey,
        &root,
        "Q1",
        &[("en", "What is your gender?")],
        init_single_choice_group(
            "scg",
            &[
                OptionDef::option("0", &[("en", "Male")]),
                OptionDef::option("1", &[("en", "Female")]),
                OptionDef::option("2", &[("en", "Other")]),
            ],
            None,
        ),
    )?;
    gender.add_validation(require_response(gender.key()))?;
    survey.update_survey_item(gender.into_item())?;

    let mut birth_date = question(
        &mut survey,
        &root,
        "Q2",
        &[("en", "What is your month and year of birth?")],
        date_input_component("date", Some(date_range(-120 * YEAR, 0))),
    )?;
    birth_date.add_validation(require_response(birth_date.key()))?;
    survey.update_survey_item(birth_date.into_item())?;

    let mut postal_code = question(
        &mut survey,
        &root,
        "Q3",
        &[("en", "What are the digits of your home postal code?")],
        input_component("input", "input", None),
    )?;
    postal_code.add_display_component(
        text_component(None, &locale_text(&[("en", "Four digits, e.g. 1234.")])),
        None,
    )?;
    let key = postal_code.key().to_string();
    postal_code.add_validation(Validation {
        key: "r2".into(),
        kind: ValidationType::Soft,
        rule: check_response_value_with_regex(&key, "rg.input", "^[0-9]{4}$"),
    })?;
    survey.update_survey_item(postal_code.into_item())?;

    let household = question(
        &mut survey,
        &root,
        "Q4",
        &[("en", "How many people in each age group live in your household?")],
        init_matrix_question("mat", &household_rows()),
    )?;
    survey.update_survey_item(household.into_item())?;

    page_break(&mut survey, &root)?;

    let vaccinated = question(
        &mut survey,
        &root,
        "Q5",
        &[("en", "Did you receive a flu vaccine last season?")],
        init_single_choice_group(
            "scg",
            &[
                OptionDef::option("0", &[("en", "Yes")]),
                OptionDef::option("1", &[("en", "No")]),
                OptionDef::option("2", &[("en", "I don't know")]),
            ],
            None,
        ),
    )?;
    let vaccinated_key = vaccinated.key().to_string();
    survey.update_survey_item(vaccinated.into_item())?;

    let mut vaccination_date = question(
        &mut survey,
        &root,
        "Q6",
        &[("en", "When were you vaccinated?")],
        date_input_component("date", Some(date_range(-YEAR, 0))),
    )?;
    vaccination_date.set_condition(Some(response_has_keys_any(
        &vaccinated_key,
        "rg.scg",
        &["0"],
    )));
    survey.update_survey_item(vaccination_date.into_item())?;

    let conditions_key = format!("{}.Q7", root);
    let none_selected = response_has_keys_any(&conditions_key, "rg.mcg", &["0"]);
    let other_selected = response_has_keys_any(&conditions_key, "rg.mcg", &["1", "2", "3"]);
    let mut conditions = question(
        &mut survey,
        &root,
        "Q7",
        &[("en", "Do you have any of the following chronic conditions?")],
        init_multiple_choice_group(
            "mcg",
            &[
                OptionDef::option("0", &[("en", "None of these")])
                    .with_disabled(other_selected),
                OptionDef::option("1", &[("en", "Asthma")]).with_disabled(none_selected.clone()),
                OptionDef::option("2", &[("en", "Diabetes")]).with_disabled(none_selected.clone()),
                OptionDef::input("3", &[("en", "Other, namely:")]).with_disabled(none_selected),
            ],
            None,
        ),
    )?;
    conditions.add_validation(require_response(&conditions_key))?;
    survey.update_survey_item(conditions.into_item())?;

    survey_end(
        &mut survey,
        &root,
        &[("en", "Thank you for completing the intake questionnaire.")],
    )?;

    Ok(survey.into_survey())
}

fn date_range(min_offset: i64, max_offset: i64) -> ComponentProperties {
    ComponentProperties {
        min: Some(PropertyValue::Arg(ExpressionArg::from(timestamp_with_offset(
            min_offset, None,
        )))),
        max: Some(PropertyValue::Arg(ExpressionArg::from(timestamp_with_offset(
            max_offset, None,
        )))),
        date_input_mode: Some("YM".into()),
        ..ComponentProperties::default()
    }
}

fn household_rows() -> Vec<MatrixRow> {
    let counts = (0..=5)
        .map(|count| {
            let label = count.to_string();
            OptionDef::option(label.clone(), &[("en", label.as_str())])
        })
        .collect::<Vec<_>>();
    let header = MatrixRow {
        key: "header".into(),
        role: MatrixRowRole::HeaderRow,
        cells: vec![
            MatrixCell {
                key: "age".into(),
                role: "text".into(),
                content: Some(locale_text(&[("en", "Age group")])),
                items: Vec::new(),
            },
            MatrixCell {
                key: "count".into(),
                role: "text".into(),
                content: Some(locale_text(&[("en", "Number of people")])),
                items: Vec::new(),
            },
        ],
        display_condition: None,
    };
    let age_groups = [
        ("r1", "0-4 years"),
        ("r2", "5-18 years"),
        ("r3", "19-64 years"),
        ("r4", "65+ years"),
    ];
    let rows = age_groups.into_iter().map(|(key, label)| MatrixRow {
        key: key.to_string(),
        role: MatrixRowRole::ResponseRow,
        cells: vec![
            MatrixCell {
                key: "label".into(),
                role: "label".into(),
                content: Some(locale_text(&[("en", label)])),
                items: Vec::new(),
            },
            MatrixCell {
                key: "count".into(),
                role: ROLE_DROPDOWN.into(),
                content: None,
                items: counts.clone(),
            },
        ],
        display_condition: None,
    });
    std::iter::once(header).chain(rows).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate;

    #[test]
    fn intake_is_structurally_valid() {
        let survey = generate().unwrap();
        let result = validate(&survey);
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn vaccination_date_depends_on_previous_answer() {
        let editor = SurveyEditor::from_survey(generate().unwrap()).unwrap();
        let item = editor.find_survey_item("intake.Q6").unwrap();
        let condition = item.condition().unwrap();
        assert_eq!(condition.referenced_item_keys(), vec!["intake.Q5"]);
    }

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(generate().unwrap(), generate().unwrap());
    }
}
