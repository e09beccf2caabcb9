//! Test case model and tabular case sources
//!
//! Expands CSV test data into named cases:
//! - Four-valued field states (absent / null / blank / value)
//! - Lazy, restartable iteration over CSV rows
//! - Default negative matrix generation and CSV emission

use super::contract::ServiceStatus;
use super::error::{HarnessError, HarnessResult};
use super::fixtures::baseline_value;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::{Path, PathBuf};

/// Number of columns in a case row: name, expected status code, 14 field cells
pub const CASE_COLUMNS: usize = 16;

/// CSV cell spelling for a field whose key is omitted from the document
pub const ABSENT_CELL: &str = "ABSENT";

/// State of one templated field within a case
///
/// `Blank` serializes as `""`, `Null` as JSON null, and `Absent` drops the
/// key from the rendered document entirely. Anything a case does not set
/// falls back to the valid baseline value, so each case isolates exactly
/// the field under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState {
    Absent,
    Null,
    Blank,
    Value(String),
}

impl FieldState {
    /// Parse a CSV cell into a field state
    pub fn parse(cell: &str) -> FieldState {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            FieldState::Blank
        } else if trimmed.eq_ignore_ascii_case("null") {
            FieldState::Null
        } else if trimmed == ABSENT_CELL {
            FieldState::Absent
        } else {
            FieldState::Value(trimmed.to_string())
        }
    }

    /// CSV cell spelling of this state
    pub fn to_cell(&self) -> String {
        match self {
            FieldState::Absent => ABSENT_CELL.to_string(),
            FieldState::Null => "null".to_string(),
            FieldState::Blank => String::new(),
            FieldState::Value(v) => csv_escape(v),
        }
    }
}

/// The fourteen templated fields of an experiment definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseField {
    ExperimentName,
    DeploymentName,
    Namespace,
    PerformanceProfile,
    SloClass,
    Direction,
    Mode,
    TargetCluster,
    Image,
    ContainerName,
    MeasurementDuration,
    Threshold,
    MatchLabel,
    MatchLabelValue,
}

impl CaseField {
    /// All fields in CSV column order
    pub const ALL: [CaseField; 14] = [
        CaseField::ExperimentName,
        CaseField::DeploymentName,
        CaseField::Namespace,
        CaseField::PerformanceProfile,
        CaseField::SloClass,
        CaseField::Direction,
        CaseField::Mode,
        CaseField::TargetCluster,
        CaseField::Image,
        CaseField::ContainerName,
        CaseField::MeasurementDuration,
        CaseField::Threshold,
        CaseField::MatchLabel,
        CaseField::MatchLabelValue,
    ];

    /// CSV column name, matching the service's JSON key spelling
    pub fn column_name(&self) -> &'static str {
        match self {
            CaseField::ExperimentName => "experiment_name",
            CaseField::DeploymentName => "deployment_name",
            CaseField::Namespace => "namespace",
            CaseField::PerformanceProfile => "performanceProfile",
            CaseField::SloClass => "slo_class",
            CaseField::Direction => "direction",
            CaseField::Mode => "mode",
            CaseField::TargetCluster => "targetCluster",
            CaseField::Image => "image",
            CaseField::ContainerName => "container_name",
            CaseField::MeasurementDuration => "measurement_duration",
            CaseField::Threshold => "threshold",
            CaseField::MatchLabel => "matchLabel",
            CaseField::MatchLabelValue => "matchLabelValue",
        }
    }
}

/// One named conformance case
///
/// `fields` holds only the states a case sets explicitly; every other
/// field renders with its baseline value.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Case name, unique within a run
    pub name: String,

    /// Expected HTTP status code from create
    pub expected_status_code: u16,

    /// Expected `status` field, derived from the status code family
    pub expected_status: ServiceStatus,

    /// Field states this case sets
    pub fields: HashMap<CaseField, FieldState>,
}

impl TestCase {
    /// Case with a single overridden field
    pub fn single_field(
        name: impl Into<String>,
        expected_status_code: u16,
        field: CaseField,
        state: FieldState,
    ) -> Self {
        let mut fields = HashMap::new();
        fields.insert(field, state);
        TestCase {
            name: name.into(),
            expected_status_code,
            expected_status: status_for_code(expected_status_code),
            fields,
        }
    }

    /// State of a field, falling back to the baseline value
    pub fn state(&self, field: CaseField) -> FieldState {
        self.fields
            .get(&field)
            .cloned()
            .unwrap_or_else(|| FieldState::Value(baseline_value(field).to_string()))
    }

    /// Whether this case moves a field away from its baseline value
    pub fn overrides(&self, field: CaseField) -> bool {
        match self.fields.get(&field) {
            None => false,
            Some(FieldState::Value(v)) => v != baseline_value(field),
            Some(_) => true,
        }
    }
}

/// Derive the expected status field from a status code
fn status_for_code(code: u16) -> ServiceStatus {
    if (200..300).contains(&code) {
        ServiceStatus::Success
    } else {
        ServiceStatus::Error
    }
}

// ==================== CSV source ====================

/// Tabular case source backed by a CSV file
///
/// Each call to [`cases`](CaseSource::cases) opens the file afresh, so the
/// sequence restarts from the first row.
pub struct CaseSource {
    path: PathBuf,
}

impl CaseSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CaseSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazy iterator over the rows of the source
    pub fn cases(&self) -> HarnessResult<CaseIter> {
        let file = File::open(&self.path).map_err(|e| HarnessError::io(&self.path, e))?;
        Ok(CaseIter {
            lines: BufReader::new(file).lines(),
            path: self.path.display().to_string(),
            line_no: 0,
            seen: HashSet::new(),
        })
    }
}

/// Iterator over parsed case rows
pub struct CaseIter {
    lines: Lines<BufReader<File>>,
    path: String,
    line_no: usize,
    seen: HashSet<String>,
}

impl Iterator for CaseIter {
    type Item = HarnessResult<TestCase>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(HarnessError::Io {
                        path: self.path.clone(),
                        message: format!("failed to read line {}: {}", self.line_no + 1, e),
                    }));
                }
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }
            // Optional header row
            if self.line_no == 1 && line.starts_with("test_name,") {
                continue;
            }

            return Some(self.parse_row(&line));
        }
    }
}

impl CaseIter {
    fn parse_row(&mut self, line: &str) -> HarnessResult<TestCase> {
        let cells = split_csv_line(line);
        if cells.len() != CASE_COLUMNS {
            return Err(HarnessError::MalformedRow {
                path: self.path.clone(),
                line: self.line_no,
                expected: CASE_COLUMNS,
                found: cells.len(),
            });
        }

        let name = cells[0].trim().to_string();
        if name.is_empty() {
            return Err(HarnessError::CaseParse {
                path: self.path.clone(),
                message: format!("empty case name at line {}", self.line_no),
            });
        }
        if !self.seen.insert(name.clone()) {
            return Err(HarnessError::CaseParse {
                path: self.path.clone(),
                message: format!("duplicate case name '{}' at line {}", name, self.line_no),
            });
        }

        let expected_status_code =
            cells[1]
                .trim()
                .parse::<u16>()
                .map_err(|e| HarnessError::CaseParse {
                    path: self.path.clone(),
                    message: format!(
                        "invalid expected status code '{}' at line {}: {}",
                        cells[1].trim(),
                        self.line_no,
                        e
                    ),
                })?;

        let mut fields = HashMap::new();
        for (field, cell) in CaseField::ALL.iter().zip(&cells[2..]) {
            fields.insert(*field, FieldState::parse(cell));
        }

        Ok(TestCase {
            name,
            expected_status_code,
            expected_status: status_for_code(expected_status_code),
            fields,
        })
    }
}

// ==================== Default matrix ====================

/// Generator for the built-in negative case matrix
pub struct CaseMatrix;

impl CaseMatrix {
    /// Blank, null, and absent variants for every templated field,
    /// each expecting a rejection
    pub fn default_negative() -> Vec<TestCase> {
        let variants = [
            ("blank", FieldState::Blank),
            ("null", FieldState::Null),
            ("absent", FieldState::Absent),
        ];

        let mut cases = Vec::with_capacity(CaseField::ALL.len() * variants.len());
        for field in CaseField::ALL {
            for (prefix, state) in &variants {
                cases.push(TestCase::single_field(
                    format!("{}_{}", prefix, field.column_name()),
                    super::contract::ERROR_STATUS_CODE,
                    field,
                    state.clone(),
                ));
            }
        }
        cases
    }

    /// Write cases as CSV, filling unset fields with baseline values
    pub fn write_csv(cases: &[TestCase], path: &Path) -> HarnessResult<()> {
        let mut file = File::create(path).map_err(|e| HarnessError::io(path, e))?;

        let mut header = vec!["test_name".to_string(), "expected_status_code".to_string()];
        header.extend(CaseField::ALL.iter().map(|f| f.column_name().to_string()));
        writeln!(file, "{}", header.join(",")).map_err(|e| HarnessError::io(path, e))?;

        for case in cases {
            let mut row = vec![csv_escape(&case.name), case.expected_status_code.to_string()];
            for field in CaseField::ALL {
                row.push(case.state(field).to_cell());
            }
            writeln!(file, "{}", row.join(",")).map_err(|e| HarnessError::io(path, e))?;
        }

        Ok(())
    }
}

// ==================== CSV helpers ====================

/// Split a CSV line honoring double-quoted fields
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == ',' {
            fields.push(current.clone());
            current.clear();
        } else {
            current.push(c);
        }
    }
    fields.push(current);
    fields
}

/// Quote a CSV cell when it contains separators or quotes
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
