//! Watchlist Service
//!
//! Loads the user's watchlist (code, name, category) and cross-checks every
//! name against the reference table before anything is fetched.

use crate::error::{AppError, Result};
use crate::models::{Instrument, NameMismatch, ReferenceEntry};
use calamine::{open_workbook_auto, Reader};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CODE_HEADERS: &[&str] = &["代码", "code", "ts_code"];
const NAME_HEADERS: &[&str] = &["名称", "name"];
const CATEGORY_HEADERS: &[&str] = &["概念", "category", "concept"];

/// Validated set of instruments, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watchlist {
    instruments: Vec<Instrument>,
}

impl Watchlist {
    /// Build a watchlist, rejecting duplicate codes
    pub fn new(instruments: Vec<Instrument>) -> Result<Self> {
        if instruments.is_empty() {
            return Err(AppError::Validation("Watchlist is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for instrument in &instruments {
            if !seen.insert(instrument.code.as_str()) {
                return Err(AppError::Validation(format!(
                    "Duplicate code in watchlist: {}",
                    instrument.code
                )));
            }
        }

        Ok(Self { instruments })
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn codes(&self) -> Vec<String> {
        self.instruments.iter().map(|i| i.code.clone()).collect()
    }

    /// Distinct categories in first-appearance order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.instruments
            .iter()
            .map(|i| i.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }
}

/// Watchlist service for business logic
pub struct WatchlistService;

impl WatchlistService {
    /// Load the watchlist and validate it against the reference table
    ///
    /// On a name mismatch every offending row is written to
    /// `<watchlist stem>_mismatch.csv` next to the watchlist.
    pub fn load(watchlist_path: &Path, reference_path: &Path) -> Result<Watchlist> {
        info!(
            "WatchlistService::load - watchlist={:?} reference={:?}",
            watchlist_path, reference_path
        );

        let instruments = Self::read_watchlist(watchlist_path)?;
        let reference = Self::read_reference(reference_path)?;

        let mismatches = Self::find_mismatches(&instruments, &reference);
        if !mismatches.is_empty() {
            let side_file = Self::mismatch_path(watchlist_path);
            Self::write_mismatches(&side_file, &mismatches)?;
            warn!(
                "{} watchlist rows disagree with the reference table, see {:?}",
                mismatches.len(),
                side_file
            );
            return Err(AppError::Validation(format!(
                "{} watchlist names do not match the reference table (details in {})",
                mismatches.len(),
                side_file.display()
            )));
        }

        let watchlist = Watchlist::new(instruments)?;
        info!(
            "Loaded {} instruments in {} categories",
            watchlist.len(),
            watchlist.categories().len()
        );
        Ok(watchlist)
    }

    /// Read watchlist rows from a spreadsheet or CSV file
    pub fn read_watchlist(path: &Path) -> Result<Vec<Instrument>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let rows = match extension.as_str() {
            "csv" => Self::read_csv_rows(path)?,
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Self::read_sheet_rows(path)?,
            other => {
                return Err(AppError::Validation(format!(
                    "Unsupported watchlist format '{}': {}",
                    other,
                    path.display()
                )))
            }
        };

        Self::parse_rows(rows)
    }

    fn read_sheet_rows(path: &Path) -> Result<Vec<Vec<String>>> {
        let mut workbook = open_workbook_auto(path)?;
        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| AppError::Validation(format!("Workbook has no sheets: {}", path.display())))?;

        let range = workbook.worksheet_range(&sheet)?;

        Ok(range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
            .collect())
    }

    fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|f| f.trim().to_string()).collect());
        }
        Ok(rows)
    }

    fn parse_rows(rows: Vec<Vec<String>>) -> Result<Vec<Instrument>> {
        let mut rows = rows.into_iter();
        let header = rows
            .next()
            .ok_or_else(|| AppError::Validation("Watchlist has no header row".to_string()))?;

        let code_col = find_column(&header, CODE_HEADERS)?;
        let name_col = find_column(&header, NAME_HEADERS)?;
        let category_col = find_column(&header, CATEGORY_HEADERS)?;

        let mut instruments = Vec::new();

        for (i, row) in rows.enumerate() {
            if row.iter().all(|cell| cell.is_empty()) {
                continue;
            }

            // Header is line 1
            let line = i + 2;
            let cell = |col: usize, what: &str| {
                row.get(col)
                    .filter(|v| !v.is_empty())
                    .cloned()
                    .ok_or_else(|| AppError::Validation(format!("Watchlist line {}: missing {}", line, what)))
            };

            instruments.push(Instrument {
                code: cell(code_col, "code")?.to_ascii_uppercase(),
                name: cell(name_col, "name")?,
                category: cell(category_col, "category")?,
            });
        }

        Ok(instruments)
    }

    /// Read the reference table (`ts_code`, `name`, other columns ignored)
    pub fn read_reference(path: &Path) -> Result<HashMap<String, String>> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut reference = HashMap::new();

        for entry in reader.deserialize() {
            let entry: ReferenceEntry = entry?;
            reference.insert(entry.ts_code.trim().to_ascii_uppercase(), entry.name.trim().to_string());
        }

        Ok(reference)
    }

    /// Watchlist rows whose name differs from the reference name for the same code
    pub fn find_mismatches(
        instruments: &[Instrument],
        reference: &HashMap<String, String>,
    ) -> Vec<NameMismatch> {
        instruments
            .iter()
            .filter_map(|instrument| {
                let reference_name = reference.get(&instrument.code);
                if reference_name == Some(&instrument.name) {
                    None
                } else {
                    Some(NameMismatch {
                        code: instrument.code.clone(),
                        watchlist_name: instrument.name.clone(),
                        reference_name: reference_name.cloned(),
                    })
                }
            })
            .collect()
    }

    fn mismatch_path(watchlist_path: &Path) -> PathBuf {
        let stem = watchlist_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("watchlist");
        watchlist_path.with_file_name(format!("{}_mismatch.csv", stem))
    }

    fn write_mismatches(path: &Path, mismatches: &[NameMismatch]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for mismatch in mismatches {
            writer.serialize(mismatch)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn find_column(header: &[String], aliases: &[&str]) -> Result<usize> {
    header
        .iter()
        .position(|h| {
            // Excel CSV exports start with a byte-order mark
            let h = h.trim().trim_start_matches('\u{feff}');
            aliases.iter().any(|a| h.eq_ignore_ascii_case(a))
        })
        .ok_or_else(|| {
            AppError::Validation(format!("Watchlist header is missing a column named one of {:?}", aliases))
        })
}
