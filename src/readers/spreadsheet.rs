use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use log::{debug, warn};
use std::io::Cursor;

/// Substring patterns for financial-sounding sheet names.
const SHEET_NAME_PATTERNS: &[&str] = &[
    "income", "p&l", "pnl", "profit", "revenue", "balance", "cash flow", "cashflow", "financ",
    "kpi", "summary",
];

/// Short codes only count as a match when they are the whole sheet name,
/// otherwise "Notes" would match "cf" by accident.
const SHEET_NAME_EXACT: &[&str] = &["is", "bs", "cf"];

pub fn sheet_name_matches(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    SHEET_NAME_EXACT.contains(&lower.as_str())
        || SHEET_NAME_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Picks the sheets worth rendering: those whose names look financial, or
/// every sheet when none match.
pub fn select_sheets(all_names: &[String]) -> Vec<String> {
    let matched: Vec<String> = all_names
        .iter()
        .filter(|n| sheet_name_matches(n))
        .cloned()
        .collect();
    if matched.is_empty() {
        debug!("no sheet name matched the financial patterns, processing all sheets");
        all_names.to_vec()
    } else {
        matched
    }
}

/// Parses a workbook and renders financial-sounding sheets to delimited
/// tabular text blocks, each prefixed with its sheet name. Falls back to all
/// sheets when no name matches; returns None when nothing usable remains.
pub fn read_workbook(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        debug!("spreadsheet reader skipped: empty buffer");
        return None;
    }

    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = match open_workbook_auto_from_rs(cursor) {
        Ok(wb) => wb,
        Err(e) => {
            warn!("could not open workbook: {}", e);
            return None;
        }
    };

    let selected = select_sheets(&workbook.sheet_names().to_vec());

    let mut blocks = Vec::new();
    for name in &selected {
        let range = match workbook.worksheet_range(name) {
            Ok(range) => range,
            Err(e) => {
                warn!("could not read sheet '{}': {}", name, e);
                continue;
            }
        };
        if let Some(block) = render_sheet(name, &range) {
            blocks.push(block);
        }
    }

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}

/// Renders one sheet as tab-delimited rows under a `[Sheet: name]` header.
/// Returns None when the sheet has no content after stripping delimiters.
pub fn render_sheet(name: &str, range: &Range<Data>) -> Option<String> {
    let mut lines = Vec::new();
    for row in range.rows() {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        let line = cells.join("\t");
        if line.replace('\t', "").trim().is_empty() {
            continue;
        }
        lines.push(line);
    }

    if lines.is_empty() {
        return None;
    }

    Some(format!("[Sheet: {}]\n{}", name, lines.join("\n")))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_name_matching() {
        assert!(sheet_name_matches("Income Statement"));
        assert!(sheet_name_matches("P&L FY23"));
        assert!(sheet_name_matches("Balance Sheet"));
        assert!(sheet_name_matches("Cash Flow"));
        assert!(sheet_name_matches("KPI Dashboard"));
        assert!(sheet_name_matches("BS"));
        assert!(sheet_name_matches("cf"));

        assert!(!sheet_name_matches("Cover"));
        assert!(!sheet_name_matches("Notes"));
        assert!(!sheet_name_matches("Instructions"));
    }

    #[test]
    fn test_sheet_selection_prefers_matches_then_falls_back() {
        let names = vec![
            "Cover".to_string(),
            "Income Statement".to_string(),
            "Notes".to_string(),
        ];
        assert_eq!(select_sheets(&names), vec!["Income Statement".to_string()]);

        let unmatched = vec!["Cover".to_string(), "Notes".to_string()];
        assert_eq!(select_sheets(&unmatched), unmatched);
    }

    #[test]
    fn test_render_sheet_skips_empty_rows() {
        let mut range: Range<Data> = Range::new((0, 0), (2, 1));
        range.set_value((0, 0), Data::String("Revenue".to_string()));
        range.set_value((0, 1), Data::Float(1200.0));
        // row 1 left fully empty
        range.set_value((2, 0), Data::String("EBITDA".to_string()));
        range.set_value((2, 1), Data::Float(310.5));

        let block = render_sheet("Income Statement", &range).unwrap();
        assert!(block.starts_with("[Sheet: Income Statement]"));
        assert_eq!(block.lines().count(), 3);
        assert!(block.contains("Revenue\t1200"));
        assert!(block.contains("EBITDA\t310.5"));
    }

    #[test]
    fn test_render_empty_sheet_is_none() {
        let range: Range<Data> = Range::new((0, 0), (3, 3));
        assert!(render_sheet("Blank", &range).is_none());
    }

    #[test]
    fn test_invalid_workbook_bytes_are_none() {
        assert!(read_workbook(b"definitely not a workbook").is_none());
        assert!(read_workbook(&[]).is_none());
    }
}
