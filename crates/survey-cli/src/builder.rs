use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::HashSet,
    fs, io,
    path::{Component, Path, PathBuf},
};
use tracing::debug;

use survey_spec::{
    EditorError, Expression, ItemEditor, NewItem, Survey, SurveyEditor, Validation,
    ValidationResult,
    path::is_valid_segment,
    spec::DType,
    templates::{
        LocaleText, MatrixRow, OptionDef, date_input_component, help_group_component,
        init_dropdown_group, init_likert_scale, init_matrix_question, init_multiple_choice_group,
        init_single_choice_group, init_slider_categorical_group, input_component, localize,
        require_response, title_component,
    },
    validate,
};

/// Input shape describing what should be generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationInput {
    pub dir_name: String,
    #[serde(default)]
    pub summary_md: Option<String>,
    pub survey: SurveyInput,
    /// Groups in declaration order; parents must come before their children.
    #[serde(default)]
    pub groups: Vec<GroupInput>,
    #[serde(default)]
    pub questions: Vec<QuestionInput>,
    /// Text of the closing item; omitted when absent.
    #[serde(default)]
    pub end: Option<LocaleText>,
}

/// Metadata describing the survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyInput {
    pub key: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub name: Option<LocaleText>,
    #[serde(default)]
    pub description: Option<LocaleText>,
    #[serde(default)]
    pub duration: Option<LocaleText>,
}

/// Item group; `key` and `parent` are paths relative to the survey root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInput {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expression>,
}

/// One question; `group` is a path relative to the survey root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionInput {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    pub title: LocaleText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub help: Vec<LocaleText>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<MatrixRow>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expression>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Validation>,
    #[serde(default)]
    pub page_break_after: bool,
}

fn default_required() -> bool {
    true
}

/// Supported response types for generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    SingleChoice,
    MultipleChoice,
    Dropdown,
    SliderCategorical,
    Likert,
    Matrix,
    Text,
    MultilineText,
    Number,
    Date,
}

impl ResponseKind {
    fn needs_options(self) -> bool {
        matches!(
            self,
            ResponseKind::SingleChoice
                | ResponseKind::MultipleChoice
                | ResponseKind::Dropdown
                | ResponseKind::SliderCategorical
                | ResponseKind::Likert
        )
    }
}

/// Generated bundle returned by the builder.
pub struct GeneratedBundle {
    pub survey: Survey,
    pub schema: Value,
    pub lint: ValidationResult,
}

/// Build the survey, its schema and lint report from the JSON input.
pub fn build_bundle(input: &GenerationInput) -> Result<GeneratedBundle, String> {
    validate_input(input)?;
    let survey = build_survey(input).map_err(|err| err.to_string())?;

    let lint = validate(&survey);
    if !lint.valid {
        let messages = lint
            .errors
            .iter()
            .map(|issue| {
                format!(
                    "{}: {}",
                    issue.item_key.as_deref().unwrap_or("<survey>"),
                    issue.message
                )
            })
            .collect::<Vec<_>>();
        return Err(format!("generated survey is invalid: {}", messages.join("; ")));
    }

    let schema =
        serde_json::to_value(schemars::schema_for!(Survey)).map_err(|err| err.to_string())?;
    Ok(GeneratedBundle {
        survey,
        schema,
        lint,
    })
}

fn validate_input(input: &GenerationInput) -> Result<(), String> {
    if input.dir_name.trim().is_empty() {
        return Err("dir_name must be provided".into());
    }
    let mut components = Path::new(&input.dir_name).components();
    if !matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) {
        return Err(format!(
            "dir_name '{}' must be a single directory name",
            input.dir_name
        ));
    }
    if !is_valid_segment(&input.survey.key) {
        return Err(format!("survey key '{}' is not a valid key", input.survey.key));
    }
    if input.questions.is_empty() {
        return Err("at least one question must be defined".into());
    }

    let mut groups = HashSet::new();
    for group in &input.groups {
        if let Some(parent) = &group.parent
            && !groups.contains(parent.as_str())
        {
            return Err(format!(
                "group '{}' references unknown parent group '{}'",
                group.key, parent
            ));
        }
        if !groups.insert(relative_path(group.parent.as_deref(), &group.key)) {
            return Err(format!("duplicate group '{}'", group.key));
        }
    }

    let mut seen = HashSet::new();
    for question in &input.questions {
        if question.key.trim().is_empty() {
            return Err("question key cannot be empty".into());
        }
        if let Some(group) = &question.group
            && !groups.contains(group.as_str())
        {
            return Err(format!(
                "question '{}' references unknown group '{}'",
                question.key, group
            ));
        }
        let path = relative_path(question.group.as_deref(), &question.key);
        if groups.contains(&path) || !seen.insert(path.clone()) {
            return Err(format!("duplicate item key '{}'", path));
        }
        if question.kind.needs_options() && question.options.is_empty() {
            return Err(format!("question '{}' must include options", question.key));
        }
        if question.kind == ResponseKind::Matrix && question.rows.is_empty() {
            return Err(format!("matrix question '{}' must include rows", question.key));
        }
    }

    let breaks = input
        .questions
        .iter()
        .filter(|question| question.page_break_after);
    for (index, question) in breaks.enumerate() {
        let path = relative_path(question.group.as_deref(), &page_break_key(index));
        if groups.contains(&path) || !seen.insert(path.clone()) {
            return Err(format!(
                "page break '{}' after question '{}' collides with an item of the same key",
                path, question.key
            ));
        }
    }

    Ok(())
}

fn page_break_key(index: usize) -> String {
    format!("pb{}", index)
}

fn relative_path(parent: Option<&str>, key: &str) -> String {
    match parent {
        Some(parent) => format!("{}.{}", parent, key),
        None => key.to_string(),
    }
}

fn full_key(root: &str, relative: Option<&str>) -> String {
    match relative {
        Some(relative) => format!("{}.{}", root, relative),
        None => root.to_string(),
    }
}

/// Runs the declarative input through the survey editor.
pub fn build_survey(input: &GenerationInput) -> Result<Survey, EditorError> {
    let meta = &input.survey;
    let mut editor = SurveyEditor::new(&meta.key)?;
    if let Some(id) = &meta.id {
        editor.set_survey_id(id.clone());
    }
    if let Some(version_id) = &meta.version_id {
        editor.set_version_id(version_id.clone());
    }
    if let Some(name) = &meta.name {
        editor.set_survey_name(localize(name));
    }
    if let Some(description) = &meta.description {
        editor.set_survey_description(localize(description));
    }
    if let Some(duration) = &meta.duration {
        editor.set_survey_duration(localize(duration));
    }

    let root = editor.root_key().to_string();
    let mut page_breaks = 0;
    for group in &input.groups {
        let parent = full_key(&root, group.parent.as_deref());
        let item = editor.add_new_survey_item(NewItem::group(group.key.clone()), &parent, None)?;
        if group.condition.is_some() {
            let mut item = ItemEditor::from_item(item);
            item.set_condition(group.condition.clone());
            editor.update_survey_item(item.into_item())?;
        }
        debug!(group = %group.key, parent = %parent, "group added");
    }

    for question in &input.questions {
        let parent = full_key(&root, question.group.as_deref());
        add_question(&mut editor, &parent, question)?;
        if question.page_break_after {
            let props = NewItem::typed(page_break_key(page_breaks), "pageBreak");
            page_breaks += 1;
            editor.add_new_survey_item(props, &parent, None)?;
        }
    }

    if let Some(end) = &input.end {
        let item = editor.add_new_survey_item(NewItem::typed("end", "surveyEnd"), &root, None)?;
        let mut item = ItemEditor::from_item(item);
        item.set_title_component(title_component(end))?;
        editor.update_survey_item(item.into_item())?;
    }

    Ok(editor.into_survey())
}

fn add_question(
    editor: &mut SurveyEditor,
    parent: &str,
    question: &QuestionInput,
) -> Result<(), EditorError> {
    let item = editor.add_new_survey_item(NewItem::question(question.key.clone()), parent, None)?;
    let mut item = ItemEditor::from_item(item);
    let key = item.key().to_string();

    item.set_title_component(title_component(&question.title))?;
    if !question.help.is_empty() {
        item.set_help_group_component(help_group_component(&question.help))?;
    }
    item.add_existing_response_component(response_component(question), None, None)?;
    item.set_condition(question.condition.clone());
    if question.required {
        item.add_validation(require_response(&key))?;
    }
    for validation in &question.validations {
        item.add_validation(validation.clone())?;
    }
    editor.update_survey_item(item.into_item())?;
    debug!(key = %key, kind = ?question.kind, "question added");
    Ok(())
}

fn response_component(question: &QuestionInput) -> survey_spec::ItemComponent {
    let options = &question.options;
    match question.kind {
        ResponseKind::SingleChoice => init_single_choice_group("scg", options, None),
        ResponseKind::MultipleChoice => init_multiple_choice_group("mcg", options, None),
        ResponseKind::Dropdown => init_dropdown_group("ddg", options, None),
        ResponseKind::SliderCategorical => init_slider_categorical_group("slider", options),
        ResponseKind::Likert => init_likert_scale("likert", options),
        ResponseKind::Matrix => init_matrix_question("mat", &question.rows),
        ResponseKind::Text => input_component("input", "input", None),
        ResponseKind::MultilineText => input_component("input", "multilineTextInput", None),
        ResponseKind::Number => input_component("number", "numberInput", Some(DType::Number)),
        ResponseKind::Date => date_input_component("date", None),
    }
}

/// Writes the bundle below `out_root/<dir_name>` and returns that directory.
pub fn write_bundle(
    bundle: &GeneratedBundle,
    input: &GenerationInput,
    out_root: &Path,
) -> io::Result<PathBuf> {
    let bundle_dir = out_root.join(&input.dir_name);
    let surveys_dir = bundle_dir.join("surveys");
    let schemas_dir = bundle_dir.join("schemas");

    fs::create_dir_all(&surveys_dir)?;
    fs::create_dir_all(&schemas_dir)?;

    let base_name = sanitize_file_name(bundle.survey.root_key());
    write_json(
        &surveys_dir.join(format!("{}.survey.json", base_name)),
        &bundle.survey,
    )?;
    write_json(&schemas_dir.join("survey.schema.json"), &bundle.schema)?;

    let readme_path = bundle_dir.join("README.md");
    fs::write(readme_path, build_readme(bundle, input, &base_name))?;

    Ok(bundle_dir)
}

fn sanitize_file_name(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "survey".into()
    } else {
        cleaned
    }
}

fn write_json(path: &Path, value: &impl Serialize) -> io::Result<()> {
    let contents = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    fs::write(path, contents)
}

fn build_readme(bundle: &GeneratedBundle, input: &GenerationInput, base_name: &str) -> String {
    let title = input
        .survey
        .name
        .as_ref()
        .and_then(|name| name.iter().next().map(|(_, text)| text.to_string()))
        .unwrap_or_else(|| input.survey.key.clone());
    let mut lines = vec![format!("# {}", title), String::new()];
    if let Some(summary) = &input.summary_md {
        lines.push(summary.clone());
        lines.push(String::new());
    }
    lines.push(format!("- survey key: `{}`", bundle.survey.root_key()));
    lines.push(format!("- questions: {}", input.questions.len()));
    lines.push(format!("- groups: {}", input.groups.len()));
    lines.push(format!("- lint warnings: {}", bundle.lint.warnings.len()));
    lines.push(String::new());
    lines.push("## Files".into());
    lines.push(String::new());
    lines.push(format!(
        "- `surveys/{}.survey.json`: survey definition for the survey engine",
        base_name
    ));
    lines.push("- `schemas/survey.schema.json`: JSON Schema of the survey document".into());
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_input() -> GenerationInput {
        serde_json::from_value(json!({
            "dir_name": "weekly-lite",
            "summary_md": "Short weekly check-in.",
            "survey": { "key": "wl", "name": { "en": "Weekly lite" } },
            "groups": [{ "key": "sym" }],
            "questions": [
                {
                    "key": "Q1",
                    "group": "sym",
                    "type": "multiple_choice",
                    "title": { "en": "Symptoms?" },
                    "options": [
                        { "key": "0", "content": { "en": "None" } },
                        { "key": "1", "content": { "en": "Fever" } }
                    ]
                },
                {
                    "key": "Q2",
                    "type": "date",
                    "title": { "en": "Since when?" },
                    "required": false,
                    "condition": {
                        "name": "responseHasKeysAny",
                        "data": [
                            { "dtype": "str", "str": "wl.sym.Q1" },
                            { "dtype": "str", "str": "rg.mcg" },
                            { "dtype": "str", "str": "1" }
                        ]
                    }
                }
            ],
            "end": { "en": "Thanks!" }
        }))
        .unwrap()
    }

    #[test]
    fn builds_survey_with_groups_and_conditions() {
        let bundle = build_bundle(&sample_input()).unwrap();
        let editor = SurveyEditor::from_survey(bundle.survey).unwrap();
        assert_eq!(
            editor.item_keys(),
            vec!["wl", "wl.sym", "wl.sym.Q1", "wl.Q2", "wl.end"]
        );
        let q2 = editor.find_survey_item("wl.Q2").unwrap();
        assert!(q2.condition().is_some());
        assert!(bundle.lint.warnings.is_empty());
        assert!(bundle.schema.get("title").is_some());
    }

    #[test]
    fn rejects_options_missing_for_choice_questions() {
        let mut input = sample_input();
        input.questions[0].options.clear();
        let err = build_bundle(&input).err().unwrap();
        assert!(err.contains("must include options"));
    }

    #[test]
    fn rejects_unknown_groups_and_duplicates() {
        let mut input = sample_input();
        input.questions[1].group = Some("missing".into());
        assert!(build_bundle(&input).err().unwrap().contains("unknown group"));

        let mut input = sample_input();
        input.questions[1].key = "sym".into();
        assert!(build_bundle(&input).err().unwrap().contains("duplicate item key"));
    }

    #[test]
    fn dangling_conditions_fail_the_build() {
        let mut input = sample_input();
        input.questions[1].condition = Some(survey_spec::expr::has_response("wl.nope", "rg"));
        let err = build_bundle(&input).err().unwrap();
        assert!(err.contains("unknown item 'wl.nope'"));
    }

    #[test]
    fn writes_bundle_layout() {
        let temp = tempfile::tempdir().unwrap();
        let input = sample_input();
        let bundle = build_bundle(&input).unwrap();
        let dir = write_bundle(&bundle, &input, temp.path()).unwrap();
        assert!(dir.join("surveys/wl.survey.json").exists());
        assert!(dir.join("schemas/survey.schema.json").exists());
        let readme = fs::read_to_string(dir.join("README.md")).unwrap();
        assert!(readme.starts_with("# Weekly lite"));
        assert!(readme.contains("Short weekly check-in."));
    }

    #[test]
    fn dir_name_must_be_a_single_component() {
        for dir_name in ["missing/../../escaped", "../up", "a/b", ".", "/abs"] {
            let mut input = sample_input();
            input.dir_name = dir_name.into();
            let err = build_bundle(&input).err().unwrap();
            assert!(err.contains("single directory name"), "{}: {}", dir_name, err);
        }
    }

    #[test]
    fn page_breaks_get_their_own_keys() {
        let mut input = sample_input();
        input.questions[0].page_break_after = true;
        input.questions[1].key = "0".into();
        input.questions[1].page_break_after = true;
        let bundle = build_bundle(&input).unwrap();
        let editor = SurveyEditor::from_survey(bundle.survey).unwrap();
        assert_eq!(
            editor.item_keys(),
            vec!["wl", "wl.sym", "wl.sym.Q1", "wl.sym.pb0", "wl.0", "wl.pb1", "wl.end"]
        );
    }

    #[test]
    fn page_break_colliding_with_a_question_is_reported() {
        let mut input = sample_input();
        input.questions[0].page_break_after = true;
        input.questions[1].group = Some("sym".into());
        input.questions[1].key = "pb0".into();
        let err = build_bundle(&input).err().unwrap();
        assert!(err.contains("page break 'sym.pb0'"), "{}", err);
    }
}
