//! Report Service
//!
//! Writes ranked rows to an xlsx workbook with one sheet per category.
//! Inside a sheet each instrument gets its own block: a header row, then
//! its rows in date order, then three blank rows.

use crate::config::{exchange_today, format_date};
use crate::error::{AppError, Result};
use crate::models::{InstrumentScore, RankedBar};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Zero-based position of the first block (cell B2)
const FIRST_ROW: u32 = 1;
const FIRST_COL: u16 = 1;

/// Blank rows between two instrument blocks
const BLOCK_GAP: u32 = 3;

const MAX_SHEET_NAME: usize = 31;

const HEADERS: [&str; 22] = [
    "category",
    "name",
    "code",
    "trade_date",
    "open",
    "high",
    "low",
    "close",
    "pre_close",
    "change",
    "pct_chg",
    "vol",
    "amount",
    "limit_up_price",
    "amount_change",
    "volume_trend",
    "price_trend",
    "limit_up_today",
    "limit_up_yesterday",
    "signal",
    "index1",
    "index2",
];

/// Make a category label usable as a worksheet name
///
/// Characters Excel rejects become `_`, as do leading and trailing
/// apostrophes. The result is at most 31 characters and never empty.
pub fn sanitize_sheet_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '[' | ']' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME)
        .collect();

    if sanitized.starts_with('\'') {
        sanitized.replace_range(..1, "_");
    }
    if sanitized.ends_with('\'') {
        sanitized.pop();
        sanitized.push('_');
    }

    if sanitized.trim().is_empty() {
        "Sheet".to_string()
    } else {
        sanitized
    }
}

/// Sheet name not yet taken, compared case-insensitively like Excel does
fn unique_sheet_name(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_lowercase()) {
        return base.to_string();
    }

    let mut n = 2;
    loop {
        let suffix = format!("_{}", n);
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        let candidate: String = base.chars().take(keep).chain(suffix.chars()).collect();
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

/// index1 desc, index2 desc with missing last, code asc
fn rank_order(a: (&str, InstrumentScore), b: (&str, InstrumentScore)) -> Ordering {
    let (code_a, score_a) = a;
    let (code_b, score_b) = b;

    score_b
        .index1
        .cmp(&score_a.index1)
        .then_with(|| match (score_a.index2, score_b.index2) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| code_a.cmp(code_b))
}

/// Rows of one category grouped per instrument, in report order
struct CategoryPage<'a> {
    category: &'a str,
    blocks: Vec<Vec<&'a RankedBar>>,
}

/// Report service for business logic
pub struct ReportService;

impl ReportService {
    /// Write the report and return its path
    ///
    /// The file is `<file_name>.xlsx` inside `output_dir`; without a name the
    /// current exchange date (YYYYMMDD) is used.
    pub fn write(ranked: &[RankedBar], output_dir: &Path, file_name: Option<&str>) -> Result<PathBuf> {
        if ranked.is_empty() {
            return Err(AppError::Validation("No rows to report".to_string()));
        }

        let stem = match file_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => format_date(exchange_today()),
        };
        let path = output_dir.join(format!("{}.xlsx", stem));

        info!(
            "ReportService::write - {} rows to {}",
            ranked.len(),
            path.display()
        );

        std::fs::create_dir_all(output_dir)?;

        let pages = Self::paginate(ranked);
        let header_format = Format::new().set_bold();
        let mut used_names = HashSet::new();
        let mut workbook = Workbook::new();

        for page in &pages {
            let sheet_name = unique_sheet_name(&sanitize_sheet_name(page.category), &mut used_names);
            debug!(
                "Sheet '{}' for category '{}': {} instruments",
                sheet_name,
                page.category,
                page.blocks.len()
            );

            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet_name)?;

            let mut row = FIRST_ROW;
            for block in &page.blocks {
                Self::write_header(worksheet, row, &header_format)?;
                for (offset, bar) in block.iter().enumerate() {
                    Self::write_row(worksheet, row + 1 + offset as u32, bar)?;
                }
                row += 1 + block.len() as u32 + BLOCK_GAP;
            }
        }

        workbook.save(&path)?;

        info!("Report written: {} sheets", pages.len());
        Ok(path)
    }

    /// Group by category (first appearance) then by instrument (rank order)
    fn paginate(ranked: &[RankedBar]) -> Vec<CategoryPage<'_>> {
        let mut order: Vec<&str> = Vec::new();
        let mut by_category: HashMap<&str, HashMap<&str, Vec<&RankedBar>>> = HashMap::new();

        for bar in ranked {
            let category = bar.row.category.as_str();
            if !by_category.contains_key(category) {
                order.push(category);
            }
            by_category
                .entry(category)
                .or_default()
                .entry(bar.row.code())
                .or_default()
                .push(bar);
        }

        order
            .into_iter()
            .map(|category| {
                let mut blocks: Vec<Vec<&RankedBar>> =
                    by_category.remove(category).unwrap_or_default().into_values().collect();

                for block in &mut blocks {
                    block.sort_by_key(|b| b.row.trade_date());
                }
                blocks.sort_by(|a, b| {
                    rank_order((a[0].row.code(), a[0].score), (b[0].row.code(), b[0].score))
                });

                CategoryPage { category, blocks }
            })
            .collect()
    }

    fn write_header(worksheet: &mut Worksheet, row: u32, format: &Format) -> Result<()> {
        for (i, header) in HEADERS.iter().enumerate() {
            worksheet.write_string_with_format(row, FIRST_COL + i as u16, *header, format)?;
        }
        Ok(())
    }

    fn write_row(worksheet: &mut Worksheet, row: u32, ranked: &RankedBar) -> Result<()> {
        let flagged = &ranked.row;
        let bar = &flagged.bar;
        let col = |i: u16| FIRST_COL + i;

        worksheet.write_string(row, col(0), &flagged.category)?;
        worksheet.write_string(row, col(1), &flagged.name)?;
        worksheet.write_string(row, col(2), &bar.code)?;
        worksheet.write_string(row, col(3), format_date(bar.trade_date))?;

        let prices = [
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.pre_close,
            bar.change,
            bar.pct_chg,
            bar.vol,
            bar.amount,
            flagged.limit_up_price,
        ];
        for (i, value) in prices.iter().enumerate() {
            worksheet.write_number(row, col(4 + i as u16), *value)?;
        }

        if let Some(change) = flagged.amount_change {
            worksheet.write_number(row, col(14), change)?;
        }
        let volume = flagged.volume_trend.label();
        if !volume.is_empty() {
            worksheet.write_string(row, col(15), volume)?;
        }
        let price = flagged.price_trend.label();
        if !price.is_empty() {
            worksheet.write_string(row, col(16), price)?;
        }

        worksheet.write_boolean(row, col(17), flagged.limit_up_today)?;
        if let Some(yesterday) = flagged.limit_up_yesterday {
            worksheet.write_boolean(row, col(18), yesterday)?;
        }
        worksheet.write_boolean(row, col(19), flagged.signal)?;

        worksheet.write_number(row, col(20), f64::from(ranked.score.index1))?;
        if let Some(index2) = ranked.score.index2 {
            worksheet.write_number(row, col(21), index2)?;
        }

        Ok(())
    }
}
