//! Spreadsheet import and export
//!
//! Exports are plain worksheets with a bold header row and columns sized to
//! their content. Imports read the first worksheet of an `.xlsx` file and
//! map its header row onto the fields a result row needs.

use std::collections::HashMap;
use std::io::Cursor;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use crate::models::registration::Registration;
use crate::models::result::{CompetitionResult, RoundType};
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::helpers::format_timestamp;

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SHEET_NAME: &str = "数据导出";
const MAX_COLUMN_WIDTH: usize = 50;

/// A worksheet ready to be written
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(headers: Vec<&'static str>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Widest cell of each column plus two, capped at 50
    pub fn column_widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let widest = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0);
                (widest + 2).min(MAX_COLUMN_WIDTH)
            })
            .collect()
    }

    /// Serialize to `.xlsx` bytes
    pub fn to_xlsx(&self) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        for (col, header) in self.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }
        for (index, row) in self.rows.iter().enumerate() {
            for (col, cell) in row.iter().enumerate() {
                worksheet.write_string(index as u32 + 1, col as u16, cell.as_str())?;
            }
        }
        for (col, width) in self.column_widths().into_iter().enumerate() {
            worksheet.set_column_width(col as u16, width as f64)?;
        }

        Ok(workbook.save_to_buffer()?)
    }
}

pub fn results_sheet(results: &[CompetitionResult]) -> Sheet {
    let mut sheet = Sheet::new(vec!["赛事名称", "用户名", "姓名", "轮次", "成绩", "名次", "录入时间"]);
    for result in results {
        sheet.push(vec![
            result.event_title.clone(),
            result.username.clone(),
            result.display_name().to_string(),
            result.round_type.label().to_string(),
            result.score.clone(),
            result.rank.map(|r| r.to_string()).unwrap_or_default(),
            format_timestamp(result.created_at),
        ]);
    }
    sheet
}

pub fn registrations_sheet(registrations: &[Registration]) -> Sheet {
    let mut sheet = Sheet::new(vec!["赛事名称", "报名编号", "用户名", "姓名", "手机号", "报名时间", "审核状态"]);
    for registration in registrations {
        sheet.push(vec![
            registration.event_title.clone(),
            registration.registration_number.clone(),
            registration.username.clone(),
            registration.participant_display_name().to_string(),
            registration.participant_phone.clone(),
            format_timestamp(registration.created_at),
            registration.status.label().to_string(),
        ]);
    }
    sheet
}

/// `{prefix}_{YYYYMMDDHHMMSS}.xlsx`
pub fn export_filename(prefix: &str, now: chrono::DateTime<chrono::Utc>) -> String {
    format!("{}_{}.xlsx", prefix, now.format("%Y%m%d%H%M%S"))
}

/// Columns an import needs, in the order missing ones are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportColumn {
    Event,
    Participant,
    Round,
    Score,
    Rank,
}

impl ImportColumn {
    const ALL: [ImportColumn; 5] = [
        ImportColumn::Event,
        ImportColumn::Participant,
        ImportColumn::Round,
        ImportColumn::Score,
        ImportColumn::Rank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportColumn::Event => "event",
            ImportColumn::Participant => "participant",
            ImportColumn::Round => "round",
            ImportColumn::Score => "score",
            ImportColumn::Rank => "rank",
        }
    }

    /// Lowercase header spellings accepted for this column
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            ImportColumn::Event => &["赛事名称", "赛事", "比赛名称", "event name", "event", "match name"],
            ImportColumn::Participant => &["参赛者", "选手", "运动员", "participant", "athlete", "选手姓名", "name"],
            ImportColumn::Round => &["轮次", "round", "round type", "阶段", "赛次"],
            ImportColumn::Score => &["成绩", "score", "result"],
            ImportColumn::Rank => &["排名", "rank", "position"],
        }
    }
}

/// Header row mapped to column indexes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    indexes: HashMap<ImportColumn, usize>,
}

impl ColumnMapping {
    /// Map a header row; the error lists every missing column. When two
    /// headers name the same column the rightmost one is used.
    pub fn from_headers(headers: &[String]) -> Result<Self> {
        let mut indexes = HashMap::new();
        for (index, header) in headers.iter().enumerate() {
            let normalized = header.trim().to_lowercase();
            if let Some(column) = ImportColumn::ALL
                .iter()
                .find(|column| column.aliases().contains(&normalized.as_str()))
            {
                indexes.insert(*column, index);
            }
        }

        let missing: Vec<&str> = ImportColumn::ALL
            .iter()
            .filter(|column| !indexes.contains_key(column))
            .map(|column| column.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(SportsHubError::invalid(format!("Missing required columns: {}", missing.join(", "))));
        }

        Ok(Self { indexes })
    }

    fn cell<'a>(&self, row: &'a [String], column: ImportColumn) -> &'a str {
        self.indexes
            .get(&column)
            .and_then(|index| row.get(*index))
            .map(|cell| cell.trim())
            .unwrap_or("")
    }
}

/// One data row of an import, cells already trimmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    /// 1-based worksheet row number
    pub row: usize,
    pub event: String,
    pub participant: String,
    pub round: String,
    pub score: String,
    pub rank: String,
}

/// Read the first worksheet of an `.xlsx` upload into text cells
pub fn read_xlsx(bytes: Vec<u8>) -> Result<(Vec<String>, Vec<(usize, Vec<String>)>)> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SportsHubError::invalid("Workbook has no worksheet"))??;

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range.rows().enumerate();
    let headers = match rows.next() {
        Some((_, header)) => header.iter().map(cell_text).collect(),
        None => return Err(SportsHubError::invalid("Workbook is empty")),
    };

    let data = rows
        .map(|(offset, row)| (first_row + offset + 1, row.iter().map(cell_text).collect()))
        .collect();
    Ok((headers, data))
}

/// Apply the header mapping; blank rows are skipped
pub fn import_rows(headers: &[String], data: Vec<(usize, Vec<String>)>) -> Result<Vec<ImportRow>> {
    let mapping = ColumnMapping::from_headers(headers)?;

    let rows: Vec<ImportRow> = data
        .into_iter()
        .filter(|(_, cells)| cells.iter().any(|cell| !cell.trim().is_empty()))
        .map(|(row, cells)| ImportRow {
            row,
            event: mapping.cell(&cells, ImportColumn::Event).to_string(),
            participant: mapping.cell(&cells, ImportColumn::Participant).to_string(),
            round: mapping.cell(&cells, ImportColumn::Round).to_string(),
            score: mapping.cell(&cells, ImportColumn::Score).to_string(),
            rank: mapping.cell(&cells, ImportColumn::Rank).to_string(),
        })
        .collect();

    if rows.is_empty() {
        return Err(SportsHubError::invalid("Workbook has no data rows"));
    }
    Ok(rows)
}

/// Whole floats print without the fraction so ranks like `3.0` read as `3`
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.trim().to_string(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => format!("{}", *value as i64),
        other => other.to_string().trim().to_string(),
    }
}

/// Map free-form round text to a round; semifinal is tried before final
pub fn normalize_round(text: &str) -> Option<RoundType> {
    const KEYWORDS: [(RoundType, &[&str]); 3] = [
        (RoundType::Semifinal, &["半决赛", "semifinal"]),
        (RoundType::Final, &["决赛", "final"]),
        (RoundType::Preliminary, &["预赛", "初赛", "preliminary"]),
    ];

    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }
    KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword)))
        .map(|(round, _)| *round)
}

/// The cell text plus every distinct parenthesised alias in it
pub fn candidate_names(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut names = vec![text.to_string()];
    let mut rest = text;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(')') else { break };
        let alias = after[..close].trim();
        if !alias.is_empty() && !names.iter().any(|name| name == alias) {
            names.push(alias.to_string());
        }
        rest = &after[close + 1..];
    }
    names
}

/// Blank is no rank; numbers are truncated toward zero
pub fn parse_rank(text: &str) -> std::result::Result<Option<i32>, ()> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value.trunc() as i32)),
        _ => Err(()),
    }
}

/// Find the single approved registration matching a participant cell
///
/// Each candidate is tried against the participant name, then the user's
/// real name, then the username; more than one hit is an error.
pub fn match_registration<'a>(
    approved: &'a [Registration],
    candidates: &[String],
) -> std::result::Result<&'a Registration, String> {
    type Field = fn(&Registration) -> &str;
    let fields: [Field; 3] = [
        |r| r.participant_name.as_str(),
        |r| r.user_real_name.as_str(),
        |r| r.username.as_str(),
    ];

    for candidate in candidates {
        let wanted = candidate.to_lowercase();
        for field in fields {
            let mut matches = approved
                .iter()
                .filter(|registration| !field(registration).is_empty() && field(registration).to_lowercase() == wanted);
            match (matches.next(), matches.next()) {
                (Some(_), Some(_)) => {
                    return Err(format!("Participant \"{}\" matches more than one registration", candidate));
                }
                (Some(registration), None) => return Ok(registration),
                _ => {}
            }
        }
    }
    Err("No approved registration matches this participant".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use crate::models::registration::{PaymentStatus, RegistrationStatus};

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn registration(id: i64, participant: &str, real_name: &str, username: &str) -> Registration {
        let now = Utc::now();
        Registration {
            id,
            event_id: 1,
            event_title: "校运会".into(),
            user_id: id,
            username: username.into(),
            user_real_name: real_name.into(),
            status: RegistrationStatus::Approved,
            registration_number: format!("REG-1-{id}"),
            participant_name: participant.into(),
            participant_phone: String::new(),
            participant_id_card: String::new(),
            participant_gender: None,
            participant_birth_date: None,
            participant_organization: String::new(),
            emergency_contact: String::new(),
            emergency_phone: String::new(),
            payment_status: PaymentStatus::Unpaid,
            payment_amount: Decimal::ZERO,
            payment_time: None,
            remarks: String::new(),
            review_remarks: String::new(),
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_round_keywords() {
        assert_eq!(normalize_round("半决赛"), Some(RoundType::Semifinal));
        assert_eq!(normalize_round("Semifinal A"), Some(RoundType::Semifinal));
        assert_eq!(normalize_round("决赛"), Some(RoundType::Final));
        assert_eq!(normalize_round(" FINAL "), Some(RoundType::Final));
        assert_eq!(normalize_round("初赛"), Some(RoundType::Preliminary));
        assert_eq!(normalize_round("第二轮"), None);
        assert_eq!(normalize_round(""), None);
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(candidate_names("张三(zhangsan)"), strings(&["张三(zhangsan)", "zhangsan"]));
        assert_eq!(candidate_names("  李四 "), strings(&["李四"]));
        assert_eq!(candidate_names("a (b) (b) ( )"), strings(&["a (b) (b) ( )", "b"]));
        assert!(candidate_names("   ").is_empty());
    }

    #[test]
    fn test_parse_rank() {
        assert_eq!(parse_rank(""), Ok(None));
        assert_eq!(parse_rank("3"), Ok(Some(3)));
        assert_eq!(parse_rank("2.9"), Ok(Some(2)));
        assert_eq!(parse_rank("first"), Err(()));
    }

    #[test]
    fn test_column_mapping_aliases() {
        let headers = strings(&["赛事名称", "Athlete", "轮次", "SCORE", "排名"]);
        let mapping = ColumnMapping::from_headers(&headers).unwrap();
        let row = strings(&["校运会", "张三", "决赛", "10.5", "1"]);
        assert_eq!(mapping.cell(&row, ImportColumn::Participant), "张三");
        assert_eq!(mapping.cell(&row, ImportColumn::Rank), "1");
    }

    #[test]
    fn test_repeated_header_uses_rightmost_column() {
        let headers = strings(&["event", "participant", "round", "score", "rank", "成绩"]);
        let mapping = ColumnMapping::from_headers(&headers).unwrap();
        let row = strings(&["校运会", "张三", "决赛", "draft", "1", "10.5"]);
        assert_eq!(mapping.cell(&row, ImportColumn::Score), "10.5");
    }

    #[test]
    fn test_missing_columns_reported() {
        let err = ColumnMapping::from_headers(&strings(&["event", "score"])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: Missing required columns: participant, round, rank");
    }

    #[test]
    fn test_import_rows_skip_blank_lines() {
        let headers = strings(&["event", "participant", "round", "score", "rank"]);
        let data = vec![
            (2, strings(&["校运会", "张三", "决赛", "10.5", "1"])),
            (3, strings(&["", " ", "", "", ""])),
            (4, strings(&["校运会", "李四", "决赛", "11.0"])),
        ];
        let rows = import_rows(&headers, data).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].row, 4);
        assert_eq!(rows[1].rank, "");
    }

    #[test]
    fn test_import_requires_data() {
        let headers = strings(&["event", "participant", "round", "score", "rank"]);
        assert!(import_rows(&headers, Vec::new()).is_err());
    }

    #[test]
    fn test_match_by_participant_then_username() {
        let approved = vec![
            registration(1, "张三", "", "zhangsan"),
            registration(2, "", "李四", "lisi"),
        ];
        assert_eq!(match_registration(&approved, &strings(&["张三"])).unwrap().id, 1);
        assert_eq!(match_registration(&approved, &strings(&["李四"])).unwrap().id, 2);
        assert_eq!(
            match_registration(&approved, &candidate_names("Li Si(LISI)")).unwrap().id,
            2
        );
        assert!(match_registration(&approved, &strings(&["王五"])).is_err());
    }

    #[test]
    fn test_ambiguous_match_is_error() {
        let approved = vec![
            registration(1, "张三", "", "a"),
            registration(2, "张三", "", "b"),
        ];
        let err = match_registration(&approved, &strings(&["张三"])).unwrap_err();
        assert!(err.contains("more than one"));
    }

    #[test]
    fn test_column_widths() {
        let mut sheet = Sheet::new(vec!["名次", "成绩"]);
        sheet.push(vec!["1".into(), "x".repeat(80)]);
        assert_eq!(sheet.column_widths(), vec![4, 50]);
    }

    #[test]
    fn test_written_sheet_reads_back() {
        let mut sheet = Sheet::new(vec!["赛事名称", "参赛者", "轮次", "成绩", "排名"]);
        sheet.push(strings(&["校运会", "张三", "决赛", "10.52s", "1"]));
        let bytes = sheet.to_xlsx().unwrap();

        let (headers, data) = read_xlsx(bytes).unwrap();
        let rows = import_rows(&headers, data).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[0].participant, "张三");
        assert_eq!(rows[0].score, "10.52s");
    }

    #[test]
    fn test_garbage_upload_rejected() {
        let err = read_xlsx(b"not a workbook".to_vec()).unwrap_err();
        assert_eq!(err.status_and_code().0, axum::http::StatusCode::BAD_REQUEST);
    }
}
