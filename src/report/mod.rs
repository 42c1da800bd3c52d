//! Report Formatter
//!
//! Renders emission rows into the fixed line-per-record templates the agents
//! hand back to the conversation, and parses such lines back into labelled
//! values.
//!
//! Every template is a header plus `Label: value` pairs joined by `, `.
//! Integral numbers print without a fraction, missing numbers print as
//! [`MISSING`].

use crate::models::{EmissionRecord, Metrics, NumericField, RecordKeys, TextReport};
use crate::types::{AppError, AppResult};

/// Placeholder for a numeric field the store has no value for.
pub const MISSING: &str = "N/A";

const SECTOR_LABEL: &str = "Sector";
const SUBSECTOR_LABEL: &str = "Subsector";
const CONTINENT_LABEL: &str = "Continent";
const COUNTRY_LABEL: &str = "Country";
const FIRST_PREFIX: &str = "Sector1 - ";
const SECOND_PREFIX: &str = "Sector2 - ";

/// Numeric columns shown by the similarity and country templates.
const SUMMARY_FIELDS: [NumericField; 7] = [
    NumericField::Mar2025Total,
    NumericField::MonthlyPctChange,
    NumericField::Ytd2025,
    NumericField::Ytd2024,
    NumericField::Ytd2023,
    NumericField::Ytd2022,
    NumericField::Ytd2021,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    SimilarSectors,
    SimilarCountries,
    SectorReport,
    CountryReport,
}

impl TemplateKind {
    pub fn header(&self) -> &'static str {
        match self {
            TemplateKind::SimilarSectors => "These are the sectors that are similar to your query:",
            TemplateKind::SimilarCountries => "The data of the country:",
            TemplateKind::SectorReport => "Sector Report:",
            TemplateKind::CountryReport => "Country Report:",
        }
    }
}

/// Two sectors' values for one shared subsector.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparedPair {
    pub subsector: String,
    pub first: Metrics,
    pub second: Metrics,
}

pub fn format(rows: &[EmissionRecord], template: TemplateKind) -> TextReport {
    TextReport {
        header: template.header().to_string(),
        lines: rows.iter().map(|row| format_row(row, template)).collect(),
    }
}

pub fn format_comparison(pairs: &[ComparedPair]) -> TextReport {
    let lines = pairs
        .iter()
        .map(|pair| {
            let mut parts = vec![labelled(SUBSECTOR_LABEL, &pair.subsector)];
            for field in [NumericField::Mar2025Total, NumericField::MonthlyPctChange] {
                parts.push(labelled(
                    &format!("{FIRST_PREFIX}{}", field.column()),
                    &format_number(pair.first.get(field)),
                ));
                parts.push(labelled(
                    &format!("{SECOND_PREFIX}{}", field.column()),
                    &format_number(pair.second.get(field)),
                ));
            }
            parts.join(", ")
        })
        .collect();

    TextReport {
        header: "Comparison between sectors:".to_string(),
        lines,
    }
}

/// Listing of distinct values, one per line.
pub fn format_listing(title: &str, values: &[String]) -> TextReport {
    TextReport {
        header: title.to_string(),
        lines: values.to_vec(),
    }
}

fn format_row(row: &EmissionRecord, template: TemplateKind) -> String {
    let mut parts = match (&row.keys, template) {
        (RecordKeys::Sector { subsector_name, .. }, TemplateKind::SectorReport) => {
            vec![labelled(SUBSECTOR_LABEL, subsector_name)]
        }
        (
            RecordKeys::Sector {
                sector_name,
                subsector_name,
            },
            _,
        ) => vec![
            labelled(SECTOR_LABEL, sector_name),
            labelled(SUBSECTOR_LABEL, subsector_name),
        ],
        (RecordKeys::Country { continent, country }, _) => vec![
            labelled(CONTINENT_LABEL, continent),
            labelled(COUNTRY_LABEL, country),
        ],
    };

    let fields: &[NumericField] = match template {
        TemplateKind::SectorReport => &NumericField::ALL,
        _ => &SUMMARY_FIELDS,
    };
    for field in fields {
        parts.push(labelled(field.column(), &format_number(row.metrics.get(*field))));
    }

    parts.join(", ")
}

fn labelled(label: &str, value: &str) -> String {
    format!("{label}: {value}")
}

pub fn format_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            if v.fract() == 0.0 && v.abs() < 1e15 {
                format!("{}", v as i64)
            } else {
                format!("{v}")
            }
        }
        _ => MISSING.to_string(),
    }
}

/// Labelled values recovered from one formatted line, in line order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub fields: Vec<(String, String)>,
}

impl ParsedLine {
    pub fn text(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// `Some(None)` for a missing placeholder, `None` when the label is absent
    /// or not numeric.
    pub fn number(&self, label: &str) -> Option<Option<f64>> {
        let raw = self.text(label)?;
        if raw == MISSING {
            return Some(None);
        }
        raw.parse::<f64>().ok().map(Some)
    }
}

fn known_labels() -> Vec<String> {
    let mut labels: Vec<String> = [SECTOR_LABEL, SUBSECTOR_LABEL, CONTINENT_LABEL, COUNTRY_LABEL]
        .iter()
        .map(|l| l.to_string())
        .collect();
    for field in NumericField::ALL {
        labels.push(field.column().to_string());
        labels.push(format!("{FIRST_PREFIX}{}", field.column()));
        labels.push(format!("{SECOND_PREFIX}{}", field.column()));
    }
    labels
}

/// Parses a formatted report line. Categorical values may contain `, `; a
/// segment only starts a new pair when it begins with a known label.
///
/// A value that itself contains `, <Label>: ` (say a subsector named
/// `Oil, Sector: Gas`) cannot be told apart from the next pair and is split
/// there.
pub fn parse_line(line: &str) -> AppResult<ParsedLine> {
    let labels = known_labels();
    let mut fields: Vec<(String, String)> = Vec::new();

    for segment in line.trim().split(", ") {
        let started = labels.iter().find_map(|label| {
            segment
                .strip_prefix(label.as_str())
                .and_then(|rest| rest.strip_prefix(": "))
                .map(|value| (label.clone(), value.to_string()))
        });

        match (started, fields.last_mut()) {
            (Some(pair), _) => fields.push(pair),
            (None, Some((_, value))) => {
                value.push_str(", ");
                value.push_str(segment);
            }
            (None, None) => {
                return Err(AppError::InvalidInput(format!(
                    "report line does not start with a known label: {segment}"
                )))
            }
        }
    }

    Ok(ParsedLine { fields })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn power_row() -> EmissionRecord {
        EmissionRecord::sector("Energy", "Power")
            .with_metric(NumericField::Mar2025Total, 100.0)
            .with_metric(NumericField::MonthlyPctChange, 5.0)
            .with_metric(NumericField::Ytd2025, 312.75)
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(Some(100.0)), "100");
        assert_eq!(format_number(Some(-3.0)), "-3");
        assert_eq!(format_number(Some(2.5)), "2.5");
        assert_eq!(format_number(None), MISSING);
        assert_eq!(format_number(Some(f64::NAN)), MISSING);
    }

    #[test]
    fn test_sector_report_line() {
        let report = format(&[power_row()], TemplateKind::SectorReport);
        assert_eq!(report.header, "Sector Report:");
        assert_eq!(report.lines.len(), 1);
        let line = &report.lines[0];
        assert!(line.starts_with("Subsector: Power, Mar_2025_Total: 100, Prev_Month: N/A"));
        assert!(line.contains("Monthly_%_change: 5"));
        assert!(line.contains("2025_YTD: 312.75"));
        assert!(!line.contains("Sector: Energy"));
    }

    #[test]
    fn test_similar_sector_line_carries_both_keys() {
        let report = format(&[power_row()], TemplateKind::SimilarSectors);
        let line = &report.lines[0];
        assert!(line.starts_with("Sector: Energy, Subsector: Power, Mar_2025_Total: 100"));
        assert!(!line.contains("Prev_Month"));
    }

    #[test]
    fn test_country_report_line() {
        let row = EmissionRecord::country("Europe", "France")
            .with_metric(NumericField::Ytd2021, 4.0);
        let report = format(&[row], TemplateKind::CountryReport);
        assert_eq!(report.header, "Country Report:");
        assert!(report.lines[0].starts_with("Continent: Europe, Country: France"));
        assert!(report.lines[0].ends_with("2021_YTD: 4"));
    }

    #[test]
    fn test_parse_recovers_formatted_values() {
        let row = power_row();
        let report = format(&[row.clone()], TemplateKind::SimilarSectors);
        let parsed = parse_line(&report.lines[0]).unwrap();

        assert_eq!(parsed.text("Sector"), Some("Energy"));
        assert_eq!(parsed.text("Subsector"), Some("Power"));
        for field in SUMMARY_FIELDS {
            let recovered = parsed.number(field.column()).unwrap();
            match (recovered, row.metrics.get(field)) {
                (Some(a), Some(b)) => assert!((a - b).abs() < 1e-9),
                (None, None) => {}
                other => panic!("mismatch for {}: {:?}", field.column(), other),
            }
        }
    }

    #[test]
    fn test_parse_keeps_commas_inside_names() {
        let row = EmissionRecord::sector("Industry", "Cement, lime and plaster")
            .with_metric(NumericField::Mar2025Total, 7.25);
        let report = format(&[row], TemplateKind::SectorReport);
        let parsed = parse_line(&report.lines[0]).unwrap();
        assert_eq!(parsed.text("Subsector"), Some("Cement, lime and plaster"));
        assert_eq!(parsed.number("Mar_2025_Total"), Some(Some(7.25)));
    }

    #[test]
    fn test_comparison_line() {
        let mut first = Metrics::default();
        first.mar_2025_total = Some(10.0);
        first.monthly_pct_change = Some(1.5);
        let mut second = Metrics::default();
        second.mar_2025_total = Some(20.0);

        let report = format_comparison(&[ComparedPair {
            subsector: "Rail".to_string(),
            first,
            second,
        }]);
        assert_eq!(report.header, "Comparison between sectors:");
        assert_eq!(
            report.lines[0],
            "Subsector: Rail, Sector1 - Mar_2025_Total: 10, Sector2 - Mar_2025_Total: 20, \
             Sector1 - Monthly_%_change: 1.5, Sector2 - Monthly_%_change: N/A"
        );

        let parsed = parse_line(&report.lines[0]).unwrap();
        assert_eq!(parsed.number("Sector2 - Mar_2025_Total"), Some(Some(20.0)));
        assert_eq!(parsed.number("Sector2 - Monthly_%_change"), Some(None));
    }

    #[test]
    fn test_parse_splits_values_containing_a_label() {
        let parsed = parse_line("Sector: Energy, Subsector: Oil, Sector: Gas, Mar_2025_Total: 5").unwrap();
        assert_eq!(parsed.fields.len(), 4);
        assert_eq!(parsed.text("Subsector"), Some("Oil"));
        assert_eq!(parsed.text("Sector"), Some("Energy"));
        assert_eq!(parsed.number("Mar_2025_Total"), Some(Some(5.0)));
    }

    #[test]
    fn test_parse_rejects_unlabelled_line() {
        assert!(matches!(parse_line("hello world"), Err(AppError::InvalidInput(_))));
    }
}
