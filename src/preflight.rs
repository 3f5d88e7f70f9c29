use ibanbic::util::clean;
use ibanbic::{Bic, Iban, IbanOptions, Registry, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

static IBAN_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}[0-9]{2}").expect("IBAN prefix regex is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Iban,
    Bic,
}

impl IdentifierKind {
    fn parse(kind: &str, value: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "iban" => Some(IdentifierKind::Iban),
            "bic" | "swift" => Some(IdentifierKind::Bic),
            "" => Some(Self::detect(value)),
            _ => None,
        }
    }

    /// Anything opening with two letters and two digits is taken for an IBAN.
    fn detect(value: &str) -> Self {
        if IBAN_PREFIX.is_match(&clean(value)) {
            IdentifierKind::Iban
        } else {
            IdentifierKind::Bic
        }
    }
}

#[derive(Debug, Deserialize)]
struct InputRow {
    #[serde(default)]
    kind: String,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct PreflightIssue {
    pub line: usize,
    pub level: IssueLevel,
    /// Error kind such as `invalid_checksum_digits`.
    pub kind: String,
    pub message: String,
}

/// One line of the written report.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRow {
    pub line: usize,
    pub kind: Option<IdentifierKind>,
    pub value: String,
    pub valid: bool,
    pub error_kind: String,
    pub message: String,
    pub country_code: String,
    pub bank_code: String,
    pub bic: String,
    pub bank_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct PreflightReport {
    pub total_records: usize,
    pub iban_records: usize,
    pub bic_records: usize,
    pub valid_records: usize,
    pub rows: Vec<CheckRow>,
    pub issues: Vec<PreflightIssue>,
}

impl PreflightReport {
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.level == IssueLevel::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.level == IssueLevel::Warning)
            .count()
    }
}

pub fn preflight_csv(
    path: &Path,
    registry: &Registry,
    validate_bban: bool,
) -> Result<PreflightReport, String> {
    let file = std::fs::File::open(path).map_err(|err| format!("{}: {err}", path.display()))?;
    preflight_reader(file, registry, validate_bban)
}

pub fn preflight_reader<R: Read>(
    input: R,
    registry: &Registry,
    validate_bban: bool,
) -> Result<PreflightReport, String> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);
    let mut report = PreflightReport::default();

    for (idx, result) in reader.deserialize().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record: InputRow = result.map_err(|err| err.to_string())?;
        report.total_records += 1;

        let mut row = CheckRow {
            line,
            kind: IdentifierKind::parse(&record.kind, &record.value),
            value: record.value.clone(),
            valid: false,
            error_kind: String::new(),
            message: String::new(),
            country_code: String::new(),
            bank_code: String::new(),
            bic: String::new(),
            bank_name: String::new(),
        };

        match row.kind {
            Some(IdentifierKind::Iban) => {
                report.iban_records += 1;
                check_iban(registry, &record.value, validate_bban, &mut row, &mut report.issues);
            }
            Some(IdentifierKind::Bic) => {
                report.bic_records += 1;
                check_bic(registry, &record.value, &mut row, &mut report.issues);
            }
            None => {
                row.error_kind = "unknown_kind".to_string();
                row.message = format!("kind must be iban or bic, got '{}'", record.kind);
                report.issues.push(issue(line, IssueLevel::Error, "unknown_kind", &row.message));
            }
        }

        if row.valid {
            report.valid_records += 1;
        }
        report.rows.push(row);
    }

    log::debug!(
        "checked {} identifiers: {} valid",
        report.total_records,
        report.valid_records
    );
    Ok(report)
}

fn check_iban(
    registry: &Registry,
    value: &str,
    validate_bban: bool,
    row: &mut CheckRow,
    issues: &mut Vec<PreflightIssue>,
) {
    let options = IbanOptions {
        validate_bban,
        ..IbanOptions::default()
    };
    match Iban::with_options(registry, value, options) {
        Ok(iban) => {
            row.valid = true;
            row.country_code = iban.country_code().to_string();
            row.bank_code = iban.bank_code().to_string();
            row.bic = iban.bic().map(|bic| bic.to_string()).unwrap_or_default();
            row.bank_name = iban.bank_name().unwrap_or_default().to_string();
            if iban.bank().is_none() && registry.banks_by_country(iban.country_code()).is_some() {
                issues.push(issue(
                    row.line,
                    IssueLevel::Warning,
                    "unknown_bank",
                    "bank code not found in bank directory",
                ));
            }
        }
        Err(err) => record_error(row, issues, &err),
    }
}

fn check_bic(
    registry: &Registry,
    value: &str,
    row: &mut CheckRow,
    issues: &mut Vec<PreflightIssue>,
) {
    match Bic::new(value) {
        Ok(bic) => {
            row.valid = true;
            row.country_code = bic.country_code().to_string();
            row.bic = bic.to_string();
            row.bank_code = bic.domestic_bank_codes(registry).join("|");
            row.bank_name = bic.bank_names(registry).join("|");
            if !bic.exists(registry) {
                issues.push(issue(
                    row.line,
                    IssueLevel::Warning,
                    "unknown_bic",
                    "BIC not found in bank directory",
                ));
            }
        }
        Err(err) => record_error(row, issues, &err),
    }
}

fn record_error(row: &mut CheckRow, issues: &mut Vec<PreflightIssue>, err: &ValidationError) {
    row.error_kind = err.kind().to_string();
    row.message = err.to_string();
    issues.push(issue(row.line, IssueLevel::Error, err.kind(), &row.message));
}

fn issue(line: usize, level: IssueLevel, kind: &str, message: &str) -> PreflightIssue {
    PreflightIssue {
        line,
        level,
        kind: kind.to_string(),
        message: message.to_string(),
    }
}

pub fn write_report(output: &Path, rows: &[CheckRow]) -> Result<(), String> {
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| err.to_string())?;
    }
    let mut writer = csv::Writer::from_path(output).map_err(|err| err.to_string())?;
    for row in rows {
        writer.serialize(row).map_err(|err| err.to_string())?;
    }
    writer.flush().map_err(|err| err.to_string())
}
