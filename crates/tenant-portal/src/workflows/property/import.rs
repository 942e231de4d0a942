use std::io::Read;

use serde::{Deserialize, Deserializer};

use crate::domain::{NewVendor, Vendor, VendorCategory};
use crate::workflows::error::ValidationError;
use crate::workflows::normalize_email;

const REQUIRED_COLUMNS: [&str; 2] = ["name", "category"];

/// Outcome of a vendor import: rows saved and rows turned away.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportReport {
    pub imported: Vec<Vendor>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct VendorRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    category: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    notes: Option<String>,
}

impl VendorRow {
    fn is_blank(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.notes.is_none()
    }

    fn into_vendor(self) -> Result<NewVendor, String> {
        let name = self.name.ok_or_else(|| "name is required".to_string())?;
        let category = self
            .category
            .as_deref()
            .unwrap_or_default()
            .parse::<VendorCategory>()?;
        let email = self
            .email
            .map(|raw| normalize_email(&raw).map_err(|_| format!("invalid email '{raw}'")))
            .transpose()?;
        Ok(NewVendor {
            name,
            category,
            email,
            phone: self.phone,
            notes: self.notes,
        })
    }
}

/// A parsed import row, or the reason it was turned away.
pub(super) struct ParsedRow {
    pub(super) line: u64,
    pub(super) vendor: Result<NewVendor, String>,
}

/// Reads `name,category,email,phone,notes` rows. Header names are matched case-insensitively;
/// blank rows are skipped.
pub(super) fn parse_vendor_rows<R: Read>(reader: R) -> Result<Vec<ParsedRow>, ValidationError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|err| ValidationError::MalformedImport(err.to_string()))?
        .iter()
        .map(|header| header.to_ascii_lowercase())
        .collect::<csv::StringRecord>();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == column) {
            return Err(ValidationError::MissingImportColumn(column));
        }
    }

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                let line = err.position().map_or(0, |position| position.line());
                rows.push(ParsedRow {
                    line,
                    vendor: Err(err.to_string()),
                });
                continue;
            }
        };
        let line = record.position().map_or(0, |position| position.line());
        let row: VendorRow = match record.deserialize(Some(&headers)) {
            Ok(row) => row,
            Err(err) => {
                rows.push(ParsedRow {
                    line,
                    vendor: Err(err.to_string()),
                });
                continue;
            }
        };
        if row.is_blank() {
            continue;
        }
        rows.push(ParsedRow {
            line,
            vendor: row.into_vendor(),
        });
    }

    Ok(rows)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn reads_rows_with_line_numbers() {
        let csv = "Name,Category,Email,Phone,Notes\n\
                   Rapid Rooter , plumber, Jobs@Rapid.example ,555-0100,\n\
                   ,,,,\n\
                   Volt Bros,electrical,,,after hours\n";

        let rows = parse_vendor_rows(csv.as_bytes()).expect("parse");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        let first = rows[0].vendor.as_ref().expect("first row");
        assert_eq!(first.name, "Rapid Rooter");
        assert_eq!(first.category, VendorCategory::Plumbing);
        assert_eq!(first.email.as_deref(), Some("jobs@rapid.example"));
        assert_eq!(first.notes, None);
        assert_eq!(rows[1].line, 4);
        assert_eq!(
            rows[1].vendor.as_ref().expect("second row").notes.as_deref(),
            Some("after hours")
        );
    }

    #[test]
    fn missing_category_column_rejects_the_file() {
        let err = parse_vendor_rows("name,email\nRapid Rooter,a@b.example\n".as_bytes())
            .err()
            .expect("missing column");

        assert_eq!(err, ValidationError::MissingImportColumn("category"));
    }

    #[test]
    fn bad_rows_carry_a_reason() {
        let csv = "name,category,email\nGlass Co,glazing,\n,plumbing,\nKeys Inc,security,not-mail\n";

        let rows = parse_vendor_rows(csv.as_bytes()).expect("parse");

        let reasons: Vec<(u64, String)> = rows
            .into_iter()
            .map(|row| (row.line, row.vendor.expect_err("rejected")))
            .collect();
        assert_eq!(reasons[0].0, 2);
        assert!(reasons[0].1.contains("glazing"));
        assert_eq!(reasons[1], (3, "name is required".to_string()));
        assert!(reasons[2].1.contains("not-mail"));
    }
}
