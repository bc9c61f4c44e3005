use super::{ImportError, Row};
use calamine::{Data, DataType, Reader, Xlsx};
use chrono::Timelike;
use log::debug;
use std::io::Cursor;
use std::sync::Arc;

pub const CSV_TYPES: [&str; 3] = ["text/csv", "text/comma-separated-values", "application/csv"];
pub const XLSX_TYPES: [&str; 3] = [
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "application/vnd.msexcel",
];

/// An uploaded file with the content type declared by the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub fn supported_types() -> Vec<&'static str> {
    CSV_TYPES.iter().chain(XLSX_TYPES.iter()).copied().collect()
}

enum Source {
    Csv(csv::StringRecordsIntoIter<Cursor<Vec<u8>>>),
    Sheet(std::iter::Enumerate<std::vec::IntoIter<Vec<String>>>),
}

/// Lazy sequence of the data rows of a CSV or XLSX file.
///
/// The file is dropped as soon as the last row has been read.
pub struct FileReader {
    headers: Arc<[String]>,
    source: Option<Source>,
}

fn clean_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Arc<[String]> {
    headers
        .enumerate()
        .map(|(idx, h)| {
            let h = if idx == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect()
}

impl FileReader {
    /// Fails with [`ImportError::UnsupportedType`] before reading anything
    /// when the content type is neither CSV nor XLSX.
    pub fn new(file: UploadedFile) -> Result<Self, ImportError> {
        let content_type = file.content_type.trim().to_lowercase();
        if CSV_TYPES.contains(&content_type.as_str()) {
            let mut reader = csv::ReaderBuilder::new()
                .flexible(true)
                .from_reader(Cursor::new(file.bytes));
            let headers = clean_headers(reader.headers()?.iter());
            Ok(FileReader {
                headers,
                source: Some(Source::Csv(reader.into_records())),
            })
        } else if XLSX_TYPES.contains(&content_type.as_str()) {
            let mut rows = xlsx_to_rows(file.bytes)?.into_iter();
            let headers = match rows.next() {
                Some(header) => clean_headers(header.iter().map(String::as_str)),
                None => Arc::from(Vec::new()),
            };
            Ok(FileReader {
                headers,
                source: Some(Source::Sheet(rows.enumerate())),
            })
        } else {
            Err(ImportError::UnsupportedType {
                content_type: file.content_type,
                supported: supported_types().join(", "),
            })
        }
    }

    #[cfg(test)]
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn close(&mut self) {
        if self.source.take().is_some() {
            debug!("file reader exhausted");
        }
    }
}

impl Iterator for FileReader {
    type Item = Result<Row, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (values, number) = match self.source.as_mut()? {
                Source::Csv(records) => match records.next() {
                    Some(Ok(record)) => {
                        let number = record.position().map_or(0, |p| p.line() as usize);
                        (record.iter().map(str::to_string).collect(), number)
                    }
                    Some(Err(e)) => {
                        self.close();
                        return Some(Err(e.into()));
                    }
                    None => {
                        self.close();
                        return None;
                    }
                },
                Source::Sheet(rows) => match rows.next() {
                    Some((idx, values)) => (values, idx + 2),
                    None => {
                        self.close();
                        return None;
                    }
                },
            };
            let row = Row::new(self.headers.clone(), values, number);
            if !row.is_blank() {
                return Some(Ok(row));
            }
        }
    }
}

/// Renders the first worksheet as rows of strings, the way the cells would
/// read once exported to CSV.
pub fn xlsx_to_rows(bytes: Vec<u8>) -> Result<Vec<Vec<String>>, ImportError> {
    let mut workbook = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| ImportError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::EmptyWorkbook)?
        .map_err(|e| ImportError::Spreadsheet(e.to_string()))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 => {
                dt.format("%Y-%m-%d").to_string()
            }
            Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::csv_file;
    use rstest::rstest;

    #[rstest]
    #[case("text/csv")]
    #[case("text/comma-separated-values")]
    #[case("application/csv")]
    #[case("Text/CSV")]
    fn csv_rows_are_keyed_by_header(#[case] content_type: &str) {
        let mut file = csv_file("What,When,Where\nBird,2018-01-01,Perth\nFrog,2018-02-01,Broome\n");
        file.content_type = content_type.to_string();
        let reader = FileReader::new(file).unwrap();
        assert_eq!(reader.headers(), ["What", "When", "Where"]);

        let rows: Vec<Row> = reader.map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        for r in &rows {
            let keys: Vec<&str> = r.iter().map(|(k, _)| k).collect();
            assert_eq!(keys, ["What", "When", "Where"]);
        }
        assert_eq!(rows[1].get("Where"), Some("Broome"));
        assert_eq!(rows[0].number(), 2);
        assert_eq!(rows[1].number(), 3);
    }

    #[rstest]
    #[case("application/json")]
    #[case("text/plain")]
    #[case("")]
    fn unsupported_types_fail_up_front(#[case] content_type: &str) {
        let mut file = csv_file("a,b\n1,2\n");
        file.content_type = content_type.to_string();
        match FileReader::new(file) {
            Err(ImportError::UnsupportedType { content_type: ct, supported }) => {
                assert_eq!(ct, content_type);
                assert!(supported.contains("text/csv"));
            }
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("reader accepted {content_type}"),
        }
    }

    #[rstest]
    fn bom_blank_lines_and_short_rows() {
        let file = csv_file("\u{feff}Code, Name \nA1,Alpha\n,\nB2\n");
        let rows: Vec<Row> = FileReader::new(file).unwrap().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Code"), Some("A1"));
        assert_eq!(rows[0].get("Name"), Some("Alpha"));
        assert_eq!(rows[1].get("Code"), Some("B2"));
        assert_eq!(rows[1].get("Name"), Some(""));
    }

    #[rstest]
    fn source_is_released_after_last_row() {
        let mut reader = FileReader::new(csv_file("a\n1\n")).unwrap();
        assert!(reader.next().is_some());
        assert!(reader.next().is_none());
        assert!(reader.source.is_none());
        assert!(reader.next().is_none());
    }

    fn workbook() -> UploadedFile {
        UploadedFile {
            file_name: "observations.xlsx".into(),
            content_type: XLSX_TYPES[0].into(),
            bytes: include_bytes!("../../tests/fixtures/observations.xlsx").to_vec(),
        }
    }

    #[rstest]
    #[case(XLSX_TYPES[0])]
    #[case(XLSX_TYPES[1])]
    #[case(XLSX_TYPES[2])]
    fn xlsx_rows_are_keyed_by_header(#[case] content_type: &str) {
        let mut file = workbook();
        file.content_type = content_type.to_string();
        let reader = FileReader::new(file).unwrap();
        assert_eq!(reader.headers(), ["Code", "Count", "Date", "Name"]);

        let rows: Vec<Row> = reader.map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        for r in &rows {
            let keys: Vec<&str> = r.iter().map(|(k, _)| k).collect();
            assert_eq!(keys, ["Code", "Count", "Date", "Name"]);
        }
        assert_eq!(rows[0].number(), 2);
        assert_eq!(rows[0].get("Code"), Some("A1"));
        assert_eq!(rows[0].get("Count"), Some("3"));
        assert_eq!(rows[0].get("Date"), Some("2018-03-21"));
        assert_eq!(rows[0].get("Name"), Some("Alpha"));

        // Row 3 of the sheet is empty.
        assert_eq!(rows[1].number(), 4);
        assert_eq!(rows[1].get("Code"), Some("B2"));
        assert_eq!(rows[1].get("Count"), Some(""));
        assert_eq!(rows[1].get("Date"), Some("2018-03-21T12:00:00"));
    }

    #[rstest]
    fn invalid_xlsx_is_an_error() {
        let file = UploadedFile {
            file_name: "sites.xlsx".into(),
            content_type: XLSX_TYPES[0].into(),
            bytes: b"not a zip archive".to_vec(),
        };
        assert!(matches!(
            FileReader::new(file),
            Err(ImportError::Spreadsheet(_))
        ));
    }

    #[rstest]
    #[case(Data::Empty, "")]
    #[case(Data::String("Perth".into()), "Perth")]
    #[case(Data::Float(12.0), "12")]
    #[case(Data::Float(-31.95), "-31.95")]
    #[case(Data::Int(7), "7")]
    #[case(Data::Bool(true), "true")]
    fn cells_render_like_csv(#[case] cell: Data, #[case] expected: &str) {
        assert_eq!(cell_to_string(&cell), expected);
    }
}
