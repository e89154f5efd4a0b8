pub mod builder;

use builder::{GeneratedBundle, GenerationInput, build_bundle, write_bundle};
use clap::{Parser, Subcommand, ValueEnum};
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};
use survey_spec::{
    Survey, SurveyEditor, build_render_payload, catalog, render_json_ui, render_text, validate,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Survey definition generator",
    long_about = "Builds survey-engine survey definitions from declarative input, lints and previews them"
)]
struct Cli {
    /// Log editor operations (same as RUST_LOG=debug).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PreviewFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a survey bundle from a JSON description of its questions.
    Generate {
        /// JSON file describing the survey metadata, groups and questions.
        #[arg(long, value_name = "INPUT")]
        input: PathBuf,
        /// Root directory for the bundle (defaults to SURVEY_OUTPUT_DIR or the current directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Overwrite an existing bundle.
        #[arg(long)]
        force: bool,
    },
    /// Check a survey definition for key and reference errors.
    Lint {
        /// Path to the survey JSON.
        #[arg(long, value_name = "SURVEY")]
        survey: PathBuf,
    },
    /// Print an outline of a survey definition.
    Preview {
        /// Path to the survey JSON.
        #[arg(long, value_name = "SURVEY")]
        survey: PathBuf,
        /// Language code used to resolve texts.
        #[arg(long, default_value = "en")]
        lang: String,
        #[arg(long, value_enum, default_value_t = PreviewFormat::Text)]
        format: PreviewFormat,
    },
    /// Print the JSON Schema of the survey document.
    Schema,
    /// Print one of the built-in sample surveys.
    Sample {
        #[arg(long, value_parser = ["intake", "weekly"])]
        name: String,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Generate { input, out, force } => run_generate(input, out, force, cli.verbose),
        Command::Lint { survey } => run_lint(survey),
        Command::Preview {
            survey,
            lang,
            format,
        } => run_preview(survey, &lang, format),
        Command::Schema => run_schema(),
        Command::Sample { name } => run_sample(&name),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_generate(
    input_path: PathBuf,
    out_dir: Option<PathBuf>,
    force: bool,
    verbose: bool,
) -> CliResult<()> {
    let contents = fs::read_to_string(&input_path)?;
    let input: GenerationInput = serde_json::from_str(&contents)?;
    let out_root = resolve_output_root(out_dir)?;
    let bundle = build_bundle(&input)?;

    let bundle_dir = out_root.join(&input.dir_name);
    ensure_allowed_root(&bundle_dir)?;
    if bundle_dir.exists() {
        if force {
            fs::remove_dir_all(&bundle_dir)?;
        } else {
            return Err(format!(
                "bundle {} already exists; rerun with --force to overwrite",
                bundle_dir.display()
            )
            .into());
        }
    }

    let bundle_dir = write_bundle(&bundle, &input, &out_root)?;
    info!(dir = %bundle_dir.display(), "bundle written");
    println!("Generated survey bundle at {}", bundle_dir.display());
    if verbose {
        dump_bundle_debug(&bundle);
    }
    Ok(())
}

fn dump_bundle_debug(bundle: &GeneratedBundle) {
    println!("Items:");
    for key in item_keys(&bundle.survey) {
        println!("  {}", key);
    }
    for warning in &bundle.lint.warnings {
        println!(
            "warning [{}] {}: {}",
            warning.code,
            warning.item_key.as_deref().unwrap_or("<survey>"),
            warning.message
        );
    }
}

fn item_keys(survey: &Survey) -> Vec<String> {
    let mut keys = Vec::new();
    survey
        .current
        .survey_definition
        .walk(&mut |item| keys.push(item.key().to_string()));
    keys
}

fn read_survey(path: &Path) -> CliResult<Survey> {
    let contents = fs::read_to_string(path)?;
    let survey: Survey = serde_json::from_str(&contents)?;
    debug!(path = %path.display(), key = survey.root_key(), "survey loaded");
    Ok(survey)
}

fn run_lint(survey_path: PathBuf) -> CliResult<()> {
    let survey = read_survey(&survey_path)?;
    let result = validate(&survey);
    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.valid {
        Ok(())
    } else {
        Err(format!("{} lint error(s)", result.errors.len()).into())
    }
}

fn run_preview(survey_path: PathBuf, lang: &str, format: PreviewFormat) -> CliResult<()> {
    let survey = read_survey(&survey_path)?;
    let payload = build_render_payload(&survey, lang);
    match format {
        PreviewFormat::Text => println!("{}", render_text(&payload)),
        PreviewFormat::Json => {
            let value = render_json_ui(&payload);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(Survey);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_sample(name: &str) -> CliResult<()> {
    let survey = catalog::by_name(name).ok_or_else(|| format!("unknown sample '{}'", name))??;
    let editor = SurveyEditor::from_survey(survey)?;
    println!("{}", editor.get_survey_json(true)?);
    Ok(())
}

fn resolve_output_root(out: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match out {
        Some(path) => path,
        None => env::var_os("SURVEY_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    if candidate.as_os_str().is_empty() {
        return Err("output directory cannot be empty".into());
    }
    ensure_allowed_root(&candidate)?;
    Ok(candidate)
}

fn ensure_allowed_root(target: &Path) -> CliResult<()> {
    let target = canonicalize_target(target)?;
    let roots = allowed_roots()?;
    if roots.iter().any(|root| target.starts_with(root)) {
        Ok(())
    } else {
        Err(format!(
            "path '{}' is outside allowed roots {:?}",
            target.display(),
            roots
        )
        .into())
    }
}

/// Roots from `SURVEY_ALLOWED_ROOTS` (colon separated); the current directory otherwise.
fn allowed_roots() -> CliResult<Vec<PathBuf>> {
    let roots = env::var("SURVEY_ALLOWED_ROOTS")
        .ok()
        .map(|value| {
            value
                .split(':')
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(PathBuf::from)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let mut canonical_roots = roots
        .into_iter()
        .map(|root| root.canonicalize().unwrap_or(root))
        .collect::<Vec<_>>();

    if canonical_roots.is_empty() {
        let cwd = env::current_dir()?;
        canonical_roots.push(cwd.canonicalize().unwrap_or(cwd));
    }

    Ok(canonical_roots)
}

fn canonicalize_target(path: &Path) -> CliResult<PathBuf> {
    if path.exists() {
        return Ok(path.canonicalize()?);
    }

    if let Some(parent) = path.parent()
        && let Ok(parent_canon) = parent.canonicalize()
    {
        return Ok(match path.file_name() {
            Some(file_name) => parent_canon.join(file_name),
            None => parent_canon,
        });
    }

    if path
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        return Err(format!("cannot resolve '..' in missing path '{}'", path.display()).into());
    }
    let cwd = env::current_dir()?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_keeps_missing_leaf() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("bundle");
        let resolved = canonicalize_target(&target).unwrap();
        assert_eq!(resolved, temp.path().canonicalize().unwrap().join("bundle"));
    }

    #[test]
    fn canonicalize_refuses_parent_hops_through_missing_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("missing/../../escaped");
        assert!(canonicalize_target(&target).is_err());
    }

    #[test]
    fn walks_item_keys_in_order() {
        let survey = catalog::weekly::generate().unwrap();
        let keys = item_keys(&survey);
        assert_eq!(keys[0], "weekly");
        assert_eq!(keys[1], "weekly.symptoms");
    }
}
