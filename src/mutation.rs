use crate::config::MutationConfig;
use crate::error::{MutationError, Result};
use crate::mutator::{ConditionalAccessMutator, MutationLevel, Mutator};
use crate::parser::{parse_with_source_map, SourceMap};
use crate::synthesis::Mutation;
use crate::syntax::{Expr, NodeRef};
use futures::future::try_join_all;
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

pub const CHAIN_EXTENSION: &str = "chain";

/// A mutation together with the rendered program before and after it
#[derive(Debug, Clone)]
pub struct GeneratedMutant {
    pub mutation: Mutation,
    pub original: String,
    pub mutated: String,
}

#[derive(Debug, Clone)]
pub struct LineMutant {
    pub line: usize,
    pub mutant: GeneratedMutant,
}

#[derive(Debug)]
pub struct MutatedFile {
    pub file_path: String,
    pub folder: PathBuf,
    pub mutants: Vec<LineMutant>,
}

/// Mutators allowed at `level`
pub fn enabled_mutators(level: MutationLevel) -> Vec<Box<dyn Mutator>> {
    let all: Vec<Box<dyn Mutator>> = vec![Box::new(ConditionalAccessMutator)];
    all.into_iter().filter(|m| m.level() <= level).collect()
}

/// Runs every enabled mutator at every conditional access of `program`.
///
/// Candidates are visited pre-order; the entry check inside each mutator
/// keeps nested links from being mutated twice. With `one_mutant` only the
/// first mutation is synthesized.
fn collect_mutations(program: &Expr, config: &MutationConfig) -> Result<Vec<Mutation>> {
    let mutators = enabled_mutators(config.level);
    if mutators.is_empty() {
        debug!("no mutators enabled at level {}", config.level);
    }

    let limit = if config.one_mutant { 1 } else { usize::MAX };

    NodeRef::root(program)
        .descendants()
        .into_iter()
        .filter(|candidate| candidate.node().as_conditional().is_some())
        .flat_map(|candidate| {
            mutators
                .iter()
                .flat_map(move |mutator| mutator.apply_mutations(candidate.clone()))
        })
        .take(limit)
        .collect()
}

/// Mutants of a tree with no source text behind it, rendered whole
pub fn mutate_expression(program: &Expr, config: &MutationConfig) -> Result<Vec<GeneratedMutant>> {
    let original = program.to_string();

    collect_mutations(program, config)?
        .into_iter()
        .map(|mutation| -> Result<GeneratedMutant> {
            let mutated = mutation.apply(program)?.to_string();
            Ok(GeneratedMutant {
                mutation,
                original: original.clone(),
                mutated,
            })
        })
        .collect()
}

/// Mutants of one line of chain notation. Only the anchor's text is
/// rewritten; every byte outside it is kept as written.
pub fn mutate_source(source: &str, config: &MutationConfig) -> Result<Vec<GeneratedMutant>> {
    let (program, source_map) = parse_with_source_map(source)?;

    collect_mutations(&program, config)?
        .into_iter()
        .map(|mutation| -> Result<GeneratedMutant> {
            let mutated = splice(source, &source_map, &mutation)?;
            Ok(GeneratedMutant {
                mutation,
                original: source.to_string(),
                mutated,
            })
        })
        .collect()
}

fn splice(source: &str, source_map: &SourceMap, mutation: &Mutation) -> Result<String> {
    let missing = || MutationError::InvalidPath(mutation.anchor.path.to_string());
    let span = source_map
        .span_at(&mutation.anchor.path)
        .ok_or_else(missing)?;
    let replacement = mutation.replacement().ok_or_else(missing)?;

    Ok(format!(
        "{}{}{}",
        &source[..span.start],
        replacement,
        &source[span.end..]
    ))
}

pub async fn run_mutation(inputs: &[PathBuf], config: &MutationConfig) -> Result<Vec<MutatedFile>> {
    let files = collect_input_files(inputs)?;
    if files.is_empty() {
        return Err(MutationError::InvalidInput(format!(
            "No .{} files found in the provided paths",
            CHAIN_EXTENSION
        )));
    }

    let folders = plan_folders(&files, config.output_dir.as_deref())?;
    try_join_all(
        files
            .iter()
            .zip(folders)
            .map(|(file, folder)| mutate_file_into(file, folder, config)),
    )
    .await
}

/// Mutant folder for every input. Inputs whose default folder would clash
/// (same stem and extension in different directories) get a short hash of
/// their path appended.
fn plan_folders(files: &[PathBuf], output_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    let defaults = files
        .iter()
        .map(|file| mutation_folder(file, output_dir))
        .collect::<Result<Vec<_>>>()?;

    let mut counts: HashMap<PathBuf, usize> = HashMap::new();
    for folder in &defaults {
        *counts.entry(folder.clone()).or_default() += 1;
    }

    files
        .iter()
        .zip(defaults)
        .map(|(file, folder)| {
            if counts.get(&folder).copied().unwrap_or(0) > 1 {
                hashed_mutation_folder(file, output_dir)
            } else {
                Ok(folder)
            }
        })
        .collect()
}

/// Expands directories into the `.chain` files below them. Paths naming a
/// file are taken as given.
pub fn collect_input_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }

        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry?;
            let is_chain_file = entry
                .path()
                .extension()
                .map_or(false, |ext| ext == CHAIN_EXTENSION);
            if entry.file_type().is_file() && is_chain_file {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    let mut seen = HashSet::new();
    files.retain(|file| seen.insert(file.clone()));
    Ok(files)
}

pub async fn mutate_file(file_to_mutate: &Path, config: &MutationConfig) -> Result<MutatedFile> {
    let folder = mutation_folder(file_to_mutate, config.output_dir.as_deref())?;
    mutate_file_into(file_to_mutate, folder, config).await
}

async fn mutate_file_into(
    file_to_mutate: &Path,
    folder: PathBuf,
    config: &MutationConfig,
) -> Result<MutatedFile> {
    let file_str = file_to_mutate.to_string_lossy().to_string();
    println!("\n\nGenerating mutants for {}...", file_str);

    let source_code = fs::read_to_string(file_to_mutate).await?;
    let lines: Vec<&str> = source_code.lines().collect();
    println!("File has {} lines", lines.len());

    let skip_lines_for_file = config.skip_lines_for(&file_str);
    let mut mutants = Vec::new();
    let mut mutant_count = 0;

    for (line_idx, line) in lines.iter().enumerate() {
        let line_num = line_idx + 1;

        // skip_lines uses 1-indexed line numbers
        if let Some(skip) = skip_lines_for_file {
            if skip.contains(&line_num) {
                continue;
            }
        }

        if should_skip_line(line) {
            continue;
        }

        let generated = match mutate_source(line, config) {
            Ok(generated) => generated,
            Err(e @ MutationError::Parse { .. }) => {
                warn!("{}:{}: {}", file_str, line_num, e);
                continue;
            }
            Err(e) => return Err(e),
        };
        if generated.is_empty() {
            println!(
                "Line {} '{}' has no null-conditional access to mutate",
                line_num,
                line.trim()
            );
        }

        for mutant in generated {
            let mut mutated_lines = lines.clone();
            mutated_lines[line_idx] = &mutant.mutated;
            let mutated_content = mutated_lines.join("\n");

            mutant_count =
                write_mutation(&folder, file_to_mutate, &mutated_content, mutant_count).await?;
            mutants.push(LineMutant {
                line: line_num,
                mutant,
            });
        }
    }

    println!("Generated {} mutants...", mutant_count);
    Ok(MutatedFile {
        file_path: file_str,
        folder,
        mutants,
    })
}

fn should_skip_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with('#')
}

fn file_parts(file_to_mutate: &Path) -> Result<(&str, &str)> {
    let file_name = file_to_mutate
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| MutationError::InvalidInput("Invalid file path".to_string()))?;
    let ext = file_to_mutate
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or(CHAIN_EXTENSION);
    Ok((file_name, ext))
}

fn mutation_folder(file_to_mutate: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let (file_name, ext) = file_parts(file_to_mutate)?;
    let base = output_dir.unwrap_or_else(|| Path::new("."));
    Ok(base.join(format!("muts-{}-{}", file_name, ext)))
}

fn hashed_mutation_folder(file_to_mutate: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let (file_name, ext) = file_parts(file_to_mutate)?;
    let base = output_dir.unwrap_or_else(|| Path::new("."));

    let mut hasher = Sha256::new();
    hasher.update(file_to_mutate.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    Ok(base.join(format!("muts-{}-{}-{}", file_name, ext, &digest[..8])))
}

async fn write_mutation(
    folder: &Path,
    file_to_mutate: &Path,
    mutated_content: &str,
    mutant_index: usize,
) -> Result<usize> {
    let (file_name, ext) = file_parts(file_to_mutate)?;
    create_mutation_folder(folder, file_to_mutate).await?;

    let mutator_file = folder.join(format!("{}.mutant.{}.{}", file_name, mutant_index, ext));
    fs::write(mutator_file, mutated_content).await?;

    Ok(mutant_index + 1)
}

async fn create_mutation_folder(folder_path: &Path, file_to_mutate: &Path) -> Result<()> {
    if !folder_path.exists() {
        fs::create_dir_all(folder_path).await?;

        let original_file_path = folder_path.join("original_file.txt");
        fs::write(original_file_path, file_to_mutate.to_string_lossy().as_bytes()).await?;
    }

    Ok(())
}
