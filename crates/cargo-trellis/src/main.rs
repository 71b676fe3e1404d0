//! Command line tooling for trellis-bdd.
//!
//! `generate` renders a Rust test scaffold for one or more feature files,
//! optionally skipping steps already present in a registry dump, and
//! `steps` lists the distinct steps a set of features requires with their
//! file and line, conjunction keywords resolved. Both work directly on
//! feature files so they run without compiling the test suite.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::{bail, Context, Result};
use trellis_bdd::{parse_registry_dump, scaffold_missing, DefinedStep};
use trellis_bdd_patterns::StepKeyword;

/// Cargo subcommand providing scaffolding and inspection for trellis-bdd.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Supported commands.
#[derive(Subcommand)]
enum Commands {
    /// Print a Rust test scaffold for each feature file.
    Generate {
        /// Feature files to scaffold.
        #[arg(required = true)]
        features: Vec<PathBuf>,
        /// Registry dump (JSON) whose steps are omitted from the scaffold.
        #[arg(long, value_name = "PATH")]
        registry: Option<PathBuf>,
    },
    /// List the distinct steps the given features require.
    Steps {
        /// Feature files or directories to search.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Generate { features, registry } => generate(&features, registry.as_deref()),
        Commands::Steps { paths } => steps(&paths),
    }
}

fn parse_feature(path: &Path) -> Result<gherkin::Feature> {
    gherkin::Feature::parse_path(path, gherkin::GherkinEnv::default())
        .wrap_err_with(|| format!("failed to parse feature {}", path.display()))
}

/// Load the step definitions from a registry dump file.
fn load_registry(path: &Path) -> Result<Vec<DefinedStep>> {
    let json = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read registry dump {}", path.display()))?;
    parse_registry_dump(&json)
        .wrap_err_with(|| format!("failed to parse registry dump {}", path.display()))
}

fn generate(features: &[PathBuf], registry: Option<&Path>) -> Result<()> {
    let defined = match registry {
        Some(path) => load_registry(path)?,
        None => Vec::new(),
    };
    let mut first = true;
    for path in features {
        let feature = parse_feature(path)?;
        if !first {
            println!();
        }
        first = false;
        print!(
            "{}",
            scaffold_missing(&feature, &path.to_string_lossy(), &defined)
        );
    }
    Ok(())
}

/// Expand files and directories into a sorted list of feature files.
fn collect_feature_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in walkdir::WalkDir::new(path) {
                let entry = entry.wrap_err_with(|| {
                    format!("failed to walk directory {}", path.display())
                })?;
                if entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "feature")
                {
                    files.push(entry.into_path());
                }
            }
        } else {
            bail!("no such file or directory: {}", path.display());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Distinct steps of a feature with conjunctions resolved, in file order.
/// Each entry carries the line of its first occurrence.
fn feature_steps(feature: &gherkin::Feature) -> Vec<(StepKeyword, String, usize)> {
    let mut out: Vec<(StepKeyword, String, usize)> = Vec::new();
    let mut containers: Vec<&[gherkin::Step]> = Vec::new();
    if let Some(background) = &feature.background {
        containers.push(&background.steps);
    }
    for scenario in &feature.scenarios {
        containers.push(&scenario.steps);
    }
    for steps in containers {
        let mut previous: Option<StepKeyword> = None;
        for step in steps {
            let keyword = StepKeyword::from(step.ty).resolve(&mut previous);
            if !out
                .iter()
                .any(|(seen, text, _)| *seen == keyword && *text == step.value)
            {
                out.push((keyword, step.value.clone(), step.position.line));
            }
        }
    }
    out
}

fn steps(paths: &[PathBuf]) -> Result<()> {
    let files = collect_feature_files(paths)?;
    if files.is_empty() {
        bail!("no .feature files found");
    }
    let mut entries: Vec<(StepKeyword, String, String)> = Vec::new();
    for file in &files {
        let feature = parse_feature(file)?;
        for (keyword, text, line) in feature_steps(&feature) {
            if !entries
                .iter()
                .any(|(seen, existing, _)| *seen == keyword && *existing == text)
            {
                entries.push((keyword, text, format!("{}:{line}", file.display())));
            }
        }
    }
    for (keyword, text, location) in entries {
        println!("{location} {} {text}", keyword.as_str());
    }
    Ok(())
}
