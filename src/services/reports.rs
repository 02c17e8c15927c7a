//! Catalogue of misconduct report cases.
//!
//! The catalogue lives in a text file with one case per line:
//! `N.Type=Description`, where `N` orders the cases.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ReportCaseError {
    #[error("line {line}: empty line")]
    EmptyLine { line: usize },

    #[error("line {line}: expected `N.Type=Description`, got {content:?}")]
    Malformed { line: usize, content: String },

    #[error("a case for {0:?} already exists, see the report cases file")]
    Duplicate(String),

    #[error("case type cannot be empty")]
    EmptyType,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ReportCase {
    pub number: u32,
    pub case_type: String,
    pub description: String,
}

impl ReportCase {
    /// Lookup key: the type with spaces replaced by underscores.
    #[must_use]
    pub fn key(&self) -> String {
        normalize_type(&self.case_type)
    }
}

fn normalize_type(case_type: &str) -> String {
    case_type.trim().replace(' ', "_")
}

const DEFAULT_CASES: &str = "\
0.Spam=Posting unsolicited or repetitive content
1.Harassment=Abusive or threatening behaviour towards other users
2.Fake Profile=Impersonating someone or using false details
3.Inappropriate Content=Offensive or explicit material
4.Plagiarism=Presenting someone else's project work as their own
5.Other=Anything not covered above";

#[derive(Debug, Clone, Default)]
pub struct ReportCases {
    cases: BTreeMap<String, ReportCase>,
}

impl ReportCases {
    pub fn parse(content: &str) -> Result<Self, ReportCaseError> {
        let mut cases = Self::default();
        let body = content.trim_end_matches(['\n', '\r', ' ']);
        if body.is_empty() {
            return Ok(cases);
        }

        for (index, raw) in body.lines().enumerate() {
            let line = index + 1;
            let text = raw.trim_end_matches('\r');
            if text.trim().is_empty() {
                return Err(ReportCaseError::EmptyLine { line });
            }

            let case = parse_line(text).ok_or_else(|| ReportCaseError::Malformed {
                line,
                content: text.to_string(),
            })?;
            cases.cases.insert(case.key(), case);
        }

        Ok(cases)
    }

    /// The built-in catalogue.
    #[must_use]
    pub fn defaults() -> Self {
        match Self::parse(DEFAULT_CASES) {
            Ok(cases) => cases,
            Err(_) => Self::default(),
        }
    }

    /// Reads the catalogue at `path`, falling back to the built-in one when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ReportCaseError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cases = Self::parse(&content)?;
                debug!("Loaded {} report cases from {}", cases.len(), path.display());
                Ok(cases)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Report cases file {} not found, using built-in cases",
                    path.display()
                );
                Ok(Self::defaults())
            }
            Err(source) => Err(ReportCaseError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Adds a case numbered after the existing ones.
    pub fn add(&mut self, case_type: &str, description: &str) -> Result<&ReportCase, ReportCaseError> {
        let key = normalize_type(case_type);
        if key.is_empty() {
            return Err(ReportCaseError::EmptyType);
        }
        if self.cases.contains_key(&key) {
            return Err(ReportCaseError::Duplicate(case_type.trim().to_string()));
        }

        let number = self
            .cases
            .values()
            .map(|case| case.number + 1)
            .max()
            .unwrap_or(0);
        let case = ReportCase {
            number,
            case_type: case_type.trim().to_string(),
            description: description.trim().to_string(),
        };

        Ok(self.cases.entry(key).or_insert(case))
    }

    /// Serialized catalogue, ordered by case number.
    #[must_use]
    pub fn to_content(&self) -> String {
        self.sorted()
            .iter()
            .map(|case| format!("{}.{}={}", case.number, case.case_type, case.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn save(&self, path: &Path) -> Result<(), ReportCaseError> {
        std::fs::write(path, self.to_content()).map_err(|source| ReportCaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Saved {} report cases to {}", self.len(), path.display());
        Ok(())
    }

    /// Case whose type matches `case_type` (spaces and underscores are interchangeable).
    #[must_use]
    pub fn get(&self, case_type: &str) -> Option<&ReportCase> {
        self.cases.get(&normalize_type(case_type))
    }

    #[must_use]
    pub fn sorted(&self) -> Vec<&ReportCase> {
        let mut cases: Vec<&ReportCase> = self.cases.values().collect();
        cases.sort_by_key(|case| case.number);
        cases
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

fn parse_line(line: &str) -> Option<ReportCase> {
    let (head, description) = line.split_once('=')?;
    let (number, case_type) = head.split_once('.')?;
    let number = number.trim().parse().ok()?;
    let case_type = case_type.trim();
    if case_type.is_empty() {
        return None;
    }

    Some(ReportCase {
        number,
        case_type: case_type.to_string(),
        description: description.trim().to_string(),
    })
}
