use std::fs;

use anyhow::{Context, Result};
use course_ics_core::{
    CompileOptions, IcsOptions, RawCourseRecord, compile::compile, parse_date,
    reference::ReferenceTable,
};
use serde::Deserialize;

/// Options shared by every subcommand.
pub struct Settings {
    pub timezone: String,
    pub compile: CompileOptions,
}

impl Settings {
    pub fn new(timezone: &str, term_start: Option<&str>, term_end: Option<&str>) -> Result<Self> {
        let mut compile = CompileOptions::with_timezone_name(timezone)?;
        let start_date = term_start
            .map(parse_date)
            .transpose()?
            .unwrap_or(compile.default_term.start_date);
        let end_date = term_end
            .map(parse_date)
            .transpose()?
            .unwrap_or(compile.default_term.end_date);
        compile = compile.with_default_term(start_date, end_date);

        Ok(Self {
            timezone: timezone.trim().to_string(),
            compile,
        })
    }
}

/// `generate` parameters
pub struct GenerateParams {
    pub input: String,
    pub reference: Option<String>,
    pub output: Option<String>,
    pub calendar_name: Option<String>,
    pub reminder_minutes: Option<u32>,
}

/// Records file: a bare array or `{"courses": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsDocument {
    Bare(Vec<RawCourseRecord>),
    Wrapped { courses: Vec<RawCourseRecord> },
}

fn load_records(path: &str) -> Result<Vec<RawCourseRecord>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read records from {path}"))?;
    let document: RecordsDocument = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse records in {path}"))?;
    Ok(match document {
        RecordsDocument::Bare(records) | RecordsDocument::Wrapped { courses: records } => records,
    })
}

fn load_reference(path: Option<&str>) -> Result<ReferenceTable> {
    let Some(path) = path else {
        tracing::info!("No reference table given, every course uses the default term");
        return Ok(ReferenceTable::new());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read reference table from {path}"))?;
    let table = ReferenceTable::from_json(&content)?;
    tracing::info!("Loaded {} reference entries from {}", table.len(), path);
    Ok(table)
}

/// Compile records and write the calendar document.
pub fn generate_command(settings: &Settings, params: GenerateParams) -> Result<()> {
    let records = load_records(&params.input)?;
    let table = load_reference(params.reference.as_deref())?;
    let compilation = compile(&records, &table, &settings.compile);

    let report = compilation.validation_report();
    for flagged in &report.flagged {
        println!(
            "! record {} ({}): {:?}",
            flagged.index, flagged.course_code, flagged.issues
        );
    }
    for item in &compilation.skips.items {
        match item.weekday {
            Some(weekday) => println!(
                "- skipped {} on {}: {:?}",
                item.course_code, weekday, item.reason
            ),
            None => println!("- skipped {}: {:?}", item.course_code, item.reason),
        }
    }

    let mut options = IcsOptions {
        timezone: Some(settings.timezone.clone()),
        reminder_minutes: params.reminder_minutes,
        ..IcsOptions::default()
    };
    if params.calendar_name.is_some() {
        options.calendar_name = params.calendar_name;
    }
    let ics_content = compilation.to_ics(options)?;

    let output_file = params
        .output
        .unwrap_or_else(|| "course-schedule.ics".to_string());
    fs::write(&output_file, ics_content)
        .with_context(|| format!("Failed to write {output_file}"))?;

    println!(
        "✓ {} events from {} records written to {}",
        compilation.events.len(),
        records.len(),
        output_file
    );
    if !compilation.skips.is_empty() {
        println!(
            "  {} courses and {} events skipped",
            compilation.skips.skipped_courses, compilation.skips.skipped_events
        );
    }

    Ok(())
}

pub fn links_command(settings: &Settings, input: &str, reference: Option<&str>) -> Result<()> {
    let records = load_records(input)?;
    let table = load_reference(reference)?;
    let compilation = compile(&records, &table, &settings.compile);

    for link in compilation.quick_add_links()? {
        println!("{}\t{}", link.event_id, link.url);
    }

    Ok(())
}

/// Print courses, validation flags, events and skips as one JSON document.
pub fn normalize_command(settings: &Settings, input: &str, reference: Option<&str>) -> Result<()> {
    let records = load_records(input)?;
    let table = load_reference(reference)?;
    let compilation = compile(&records, &table, &settings.compile);

    let review = serde_json::json!({
        "courses": compilation.courses,
        "validation": compilation.validation_report(),
        "events": compilation.events,
        "skips": compilation.skips,
    });
    println!("{}", serde_json::to_string_pretty(&review)?);

    Ok(())
}

pub fn reference_list_command(file: Option<&str>) -> Result<()> {
    let table = load_reference(file)?;

    println!("Reference entries:");
    if table.is_empty() {
        println!("  (none)");
    }
    for (code, entry) in table.iter() {
        println!(
            "  {} -> {} ({} .. {})",
            code, entry.location, entry.start_date, entry.end_date
        );
    }

    Ok(())
}

pub fn reference_lookup_command(settings: &Settings, file: Option<&str>, code: &str) -> Result<()> {
    let table = load_reference(file)?;
    let resolved = table.lookup(code, &settings.compile.default_term);

    println!("Course: {}", code.trim());
    println!("Matched via: {:?}", resolved.source);
    println!("Location: {}", resolved.entry.location);
    println!(
        "Term: {} .. {}",
        resolved.entry.start_date, resolved.entry.end_date
    );

    Ok(())
}

pub fn reference_export_command(file: Option<&str>, output: &str) -> Result<()> {
    let table = load_reference(file)?;
    fs::write(output, table.export_to_json()?)
        .with_context(|| format!("Failed to write {output}"))?;
    println!("✓ {} reference entries exported to {}", table.len(), output);

    Ok(())
}
