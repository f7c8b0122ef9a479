//! Output formatting for lint runs.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};

use crate::lint::{FileError, Match, RunReport, Severity, SuppressedMatch, SuppressionType, BLOCK_LINE};

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub entries: Vec<String>,
    pub passed: bool,
    pub files_scanned: usize,
    pub matches: Vec<JsonMatch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<JsonSuppressedMatch>,
    pub suppressed_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<JsonDiagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_errors: Vec<JsonDiagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parse_errors: Vec<JsonDiagnostic>,
}

#[derive(Serialize, Deserialize)]
pub struct JsonMatch {
    pub rule: String,
    pub severity: String,
    pub file: String,
    /// 0 for findings about a whole task
    pub line: usize,
    pub message: String,
    pub text: String,
}

#[derive(Serialize, Deserialize)]
pub struct JsonSuppressedMatch {
    #[serde(rename = "match")]
    pub finding: JsonMatch,
    pub suppression: JsonSuppression,
}

#[derive(Serialize, Deserialize)]
pub struct JsonSuppression {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,
    pub line: usize,
    #[serde(rename = "type")]
    pub suppression_type: String,
}

/// A rule fault, an unreadable file or a file with malformed structure.
#[derive(Serialize, Deserialize)]
pub struct JsonDiagnostic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    pub file: String,
    pub message: String,
}

/// Build the JSON document for a run.
pub fn json_report(entries: &[String], report: &RunReport, show_suppressed: bool) -> JsonReport {
    let suppressed = if show_suppressed {
        report.suppressed.iter().map(suppressed_to_json).collect()
    } else {
        Vec::new()
    };

    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        entries: entries.to_vec(),
        passed: report.is_clean(),
        files_scanned: report.files.len(),
        matches: report.matches.iter().map(match_to_json).collect(),
        suppressed,
        suppressed_count: report.suppressed.len(),
        faults: report
            .faults
            .iter()
            .map(|f| JsonDiagnostic {
                rule: Some(f.rule_id.clone()),
                file: f.file.clone(),
                message: f.message.clone(),
            })
            .collect(),
        file_errors: report.file_errors.iter().map(file_error_to_json).collect(),
        parse_errors: report.parse_errors.iter().map(file_error_to_json).collect(),
    }
}

fn file_error_to_json(e: &FileError) -> JsonDiagnostic {
    JsonDiagnostic {
        rule: None,
        file: e.file.clone(),
        message: e.message.clone(),
    }
}

/// Write results in JSON format.
pub fn write_json(entries: &[String], report: &RunReport, show_suppressed: bool) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&json_report(entries, report, show_suppressed))?;
    println!("{}", json);
    Ok(())
}

fn match_to_json(m: &Match) -> JsonMatch {
    JsonMatch {
        rule: m.rule_id.clone(),
        severity: m.severity.to_string(),
        file: m.file.clone(),
        line: m.line,
        message: m.message.clone(),
        text: m.text.clone(),
    }
}

fn suppressed_to_json(sm: &SuppressedMatch) -> JsonSuppressedMatch {
    JsonSuppressedMatch {
        finding: match_to_json(&sm.finding),
        suppression: JsonSuppression {
            rules: sm.suppression.rules.clone(),
            line: sm.suppression.line,
            suppression_type: suppression_label(sm.suppression.suppression_type).to_string(),
        },
    }
}

fn suppression_label(kind: SuppressionType) -> &'static str {
    match kind {
        SuppressionType::Inline => "inline",
        SuppressionType::SkipTag => "skip_tag",
    }
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Location of a match; whole-task findings point at the task's first line.
pub fn location(m: &Match) -> String {
    if m.line == BLOCK_LINE {
        format!("{}:{} (task)", m.file, m.origin_line)
    } else {
        format!("{}:{}", m.file, m.line)
    }
}

/// Write results in pretty (human-readable) format.
pub fn write_pretty(entries: &[String], report: &RunReport, show_suppressed: bool) {
    println!();
    print!("  ");
    print!("{}", "playlint".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    for entry in entries {
        print!("  {}", "Linting: ".dimmed());
        println!("{}", entry);
    }
    print!("  {}", "Files:   ".dimmed());
    println!("{}", report.files.len());
    println!();

    if !report.matches.is_empty() {
        write_matches(&report.matches);
        println!();
    }

    if !report.suppressed.is_empty() {
        write_suppressed_summary(&report.suppressed, show_suppressed);
        println!();
    }

    if !report.faults.is_empty()
        || !report.file_errors.is_empty()
        || !report.parse_errors.is_empty()
    {
        write_diagnostics(report);
        println!();
    }

    write_final_status(report);
    println!();
}

fn write_matches(matches: &[Match]) {
    println!("  {} ({}):", "Matches".bold(), matches.len());
    println!();

    for m in matches {
        write_severity_tag(&m.severity);
        print!("   ");
        print!("{:<8}", m.rule_id.dimmed());
        println!("{}", location(m).blue());

        println!("            {}", m.message);
        if m.line != BLOCK_LINE {
            println!("            {}", m.text.trim_end().dimmed());
        }
        println!();
    }
}

fn write_severity_tag(severity: &Severity) {
    match severity {
        Severity::VeryHigh | Severity::High => print!("    {} ", "HIGH ".red()),
        Severity::Medium => print!("    {} ", "MED  ".yellow()),
        Severity::Low | Severity::VeryLow => print!("    {} ", "LOW  ".blue()),
        Severity::Info => print!("    {} ", "INFO ".dimmed()),
    }
}

fn write_suppressed_summary(suppressed: &[SuppressedMatch], show_details: bool) {
    println!("  {} ({}):", "Suppressed".dimmed(), suppressed.len());

    if !show_details {
        println!("    {}", "(use --show-suppressed to see details)".dimmed());
        return;
    }

    println!();
    for sm in suppressed {
        print!("    {:<8}", sm.finding.rule_id.dimmed());
        print!("{}", location(&sm.finding).blue());
        println!(
            "{}",
            format!(
                "  ({} on line {})",
                suppression_label(sm.suppression.suppression_type),
                sm.suppression.line
            )
            .dimmed()
        );
    }
}

fn write_diagnostics(report: &RunReport) {
    println!("  {}", "Problems:".bold());
    for fault in &report.faults {
        println!("    {} {}", "FAULT".red(), fault);
    }
    for error in &report.file_errors {
        println!("    {} {}: {}", "UNREADABLE".red(), error.file, error.message);
    }
    for error in &report.parse_errors {
        println!("    {} {}: {}", "MALFORMED".yellow(), error.file, error.message);
    }
}

fn write_final_status(report: &RunReport) {
    let count = report.matches.len();
    let plural = if count != 1 { "es" } else { "" };
    print!("  {}", format!("{} match{}", count, plural).dimmed());
    print!("  ");

    if report.is_clean() {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", "FAILED".red());
    }
    println!();
}
