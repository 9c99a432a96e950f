//! CSV rendering of concentration tables.
//!
//! Writers take any [`Write`]; opening files is left to the caller.

use std::io::Write;
use std::str::FromStr;

use bioaerosol_core::{Result, Species};
use serde::Serialize;

use crate::table::ConcentrationTable;

/// Header of the long layout.
pub const LONG_HEADER: [&str; 4] = ["date", "time", "classification", "conc"];

/// Header of the wide dashboard layout.
pub const WIDE_HEADER: [&str; 7] = ["Date", "Time", "Bacteria", "Fungi", "Pollen", "PM2.5", "PM10"];

/// Output table shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputLayout {
    /// One row per (bin, classification).
    #[default]
    Long,
    /// One row per bin with the dashboard's columns.
    Wide,
}

impl FromStr for OutputLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "long" => Ok(OutputLayout::Long),
            "wide" => Ok(OutputLayout::Wide),
            other => Err(format!("unknown layout '{other}' (expected long or wide)")),
        }
    }
}

#[derive(Serialize)]
struct LongRow<'a> {
    date: String,
    time: String,
    classification: &'a str,
    conc: Option<f64>,
}

#[derive(Serialize)]
struct WideRow {
    date: String,
    time: String,
    bacteria: Option<f64>,
    fungi: Option<f64>,
    pollen: Option<f64>,
    pm25: Option<f64>,
    pm10: Option<f64>,
}

/// Write the table in the given layout. The header row is always written.
pub fn write_table<W: Write>(
    table: &ConcentrationTable,
    layout: OutputLayout,
    include_particulate: bool,
    writer: W,
) -> Result<()> {
    match layout {
        OutputLayout::Long => write_long(table, include_particulate, writer),
        OutputLayout::Wide => write_wide(table, writer),
    }
}

/// Write `date,time,classification,conc` rows. Undefined concentrations are empty cells.
pub fn write_long<W: Write>(
    table: &ConcentrationTable,
    include_particulate: bool,
    writer: W,
) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(LONG_HEADER)?;
    for row in table.rows(include_particulate) {
        wtr.serialize(LongRow {
            date: row.date(),
            time: row.time(),
            classification: row.classification.label(),
            conc: row.conc,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write one row per bin with the dashboard columns.
pub fn write_wide<W: Write>(table: &ConcentrationTable, writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(WIDE_HEADER)?;
    for bin in &table.bins {
        wtr.serialize(WideRow {
            date: bin.bin.format("%Y-%m-%d").to_string(),
            time: bin.bin.format("%H:%M:%S").to_string(),
            bacteria: bin.concentration(Species::Bacteria),
            fungi: bin.concentration(Species::Fungi),
            pollen: bin.concentration(Species::Pollen),
            pm25: bin.pm25(),
            pm10: bin.pm10(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::BinConcentrations;
    use bioaerosol_core::Granularity;
    use chrono::{FixedOffset, TimeZone};

    fn table() -> ConcentrationTable {
        let at = |minute| {
            FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 5, 1, 10, minute, 0)
                .unwrap()
        };
        ConcentrationTable {
            granularity: Granularity::Minute,
            average_flow_rate: 60.0,
            bins: vec![
                BinConcentrations {
                    bin: at(1),
                    elapsed: 0.5,
                    counts: [1, 2, 0, 0, 4],
                    pm25_count: 1,
                    pm10_count: 7,
                    denominator: 2.0,
                },
                BinConcentrations {
                    bin: at(2),
                    elapsed: 0.0,
                    counts: [1, 0, 0, 0, 0],
                    pm25_count: 0,
                    pm10_count: 1,
                    denominator: 0.0,
                },
            ],
        }
    }

    fn render(layout: OutputLayout, include_particulate: bool, t: &ConcentrationTable) -> String {
        let mut buf = Vec::new();
        write_table(t, layout, include_particulate, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_long_layout() {
        let out = render(OutputLayout::Long, false, &table());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "date,time,classification,conc");
        assert_eq!(lines[1], "2024-05-01,10:01:00,Bacteria,0.5");
        assert_eq!(lines[2], "2024-05-01,10:01:00,Fungi,1.0");
        assert_eq!(lines[5], "2024-05-01,10:01:00,Non-fluorescence,2.0");
        assert_eq!(lines[6], "2024-05-01,10:02:00,Bacteria,");
        assert_eq!(lines.len(), 11);
    }

    #[test]
    fn test_long_layout_with_particulate() {
        let out = render(OutputLayout::Long, true, &table());
        assert!(out.contains("2024-05-01,10:01:00,PM2.5,0.5\n"));
        assert!(out.contains("2024-05-01,10:01:00,PM10,3.5\n"));
    }

    #[test]
    fn test_wide_layout() {
        let out = render(OutputLayout::Wide, false, &table());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Date,Time,Bacteria,Fungi,Pollen,PM2.5,PM10");
        assert_eq!(lines[1], "2024-05-01,10:01:00,0.5,1.0,0.0,0.5,3.5");
        assert_eq!(lines[2], "2024-05-01,10:02:00,,,,,");
    }

    #[test]
    fn test_empty_table_still_has_header() {
        let mut t = table();
        t.bins.clear();
        assert_eq!(
            render(OutputLayout::Long, false, &t),
            "date,time,classification,conc\n"
        );
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("wide".parse::<OutputLayout>().unwrap(), OutputLayout::Wide);
        assert_eq!("Long".parse::<OutputLayout>().unwrap(), OutputLayout::Long);
        assert!("tall".parse::<OutputLayout>().is_err());
    }
}
