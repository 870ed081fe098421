use crate::error::Result;
use crate::mutation::MutatedFile;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutantInfo {
    pub id: String,
    pub display_name: String,
    pub category: String,
    pub anchor: String,
    pub original: String,
    pub mutated: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportData {
    pub filename: String,
    pub folder: String,
    pub date: String,
    pub total_mutants: usize,
    /// Mutants keyed by 1-indexed source line
    pub mutants: BTreeMap<String, Vec<MutantInfo>>,
}

impl ReportData {
    pub fn from_mutated_file(file: &MutatedFile, now: DateTime<Local>) -> Self {
        let mut mutants: BTreeMap<String, Vec<MutantInfo>> = BTreeMap::new();

        for line_mutant in &file.mutants {
            let mutant = &line_mutant.mutant;
            mutants
                .entry(line_mutant.line.to_string())
                .or_default()
                .push(MutantInfo {
                    id: mutant.mutation.id(),
                    display_name: mutant.mutation.display_name.clone(),
                    category: mutant.mutation.category.to_string(),
                    anchor: mutant.mutation.anchor.path.to_string(),
                    original: mutant.original.clone(),
                    mutated: mutant.mutated.clone(),
                });
        }

        ReportData {
            filename: file.file_path.clone(),
            folder: file.folder.to_string_lossy().to_string(),
            date: now.format("%d/%m/%Y %H:%M:%S").to_string(),
            total_mutants: file.mutants.len(),
            mutants,
        }
    }
}

/// Appends one report entry per file to the JSON array at `json_file`,
/// creating it when missing
pub fn generate_report(files: &[MutatedFile], json_file: &Path) -> Result<()> {
    let now: DateTime<Local> = Local::now();
    let reports: Vec<ReportData> = files
        .iter()
        .map(|file| ReportData::from_mutated_file(file, now))
        .collect();

    save_report(&reports, json_file)?;
    println!("Report saved to {}", json_file.display());
    Ok(())
}

fn save_report(reports: &[ReportData], json_file: &Path) -> Result<()> {
    let mut entries = if json_file.exists() {
        let existing_content = fs::read_to_string(json_file)?;
        let existing_data: serde_json::Value = serde_json::from_str(&existing_content)?;
        match existing_data {
            serde_json::Value::Array(arr) => arr,
            // a single object from an older run becomes the first entry
            single => vec![single],
        }
    } else {
        Vec::new()
    };

    for report in reports {
        entries.push(serde_json::to_value(report)?);
    }

    let json_content = serde_json::to_string_pretty(&serde_json::Value::Array(entries))?;
    fs::write(json_file, json_content)?;
    Ok(())
}
