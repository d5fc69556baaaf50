//! Turns the merged table into report rows, the JSON results document and
//! the console summary.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::aggregate::GlobalTable;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Station {
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub processing_time: String,
    pub file_size_bytes: u64,
    pub number_of_stations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub stations: Vec<Station>,
    pub stats: Stats,
}

impl Report {
    pub fn new(table: &GlobalTable, file_size: u64, elapsed: Duration) -> Self {
        let stations = stations(table);
        let stats = Stats {
            processing_time: format!("{elapsed:?}"),
            file_size_bytes: file_size,
            number_of_stations: stations.len(),
        };
        Report { stations, stats }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser)?;
        Ok(out)
    }

    /// Encodes the whole document before touching the file, so an encoding
    /// failure never leaves a truncated report behind.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Console summary showing the `top` stations with the widest range.
    pub fn summary(&self, top: usize) -> Summary<'_> {
        Summary { report: self, top }
    }
}

pub struct Summary<'a> {
    report: &'a Report,
    top: usize,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.report.stats;
        writeln!(f, "1BRC (One Billion Row Challenge) Results")?;
        writeln!(f, "==========================================")?;
        writeln!(f, "Input File Size: {}", format_file_size(stats.file_size_bytes))?;
        writeln!(f, "Number of Stations: {}", stats.number_of_stations)?;
        writeln!(f, "Processing Time: {}", stats.processing_time)?;

        let ranked = top_by_range(&self.report.stations, self.top);
        if ranked.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "Top {} Stations by Temperature Range:", ranked.len())?;
        writeln!(f, "------------------------------------")?;
        for (i, s) in ranked.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", s.name)?;
            writeln!(f, "  Min: {:.1}°C", s.min)?;
            writeln!(f, "  Max: {:.1}°C", s.max)?;
            writeln!(f, "  Mean: {:.1}°C", s.mean)?;
            writeln!(f, "  Range: {:.1}°C", s.range())?;
        }
        Ok(())
    }
}

/// One row per key, sorted by name.
pub fn stations(table: &GlobalTable) -> Vec<Station> {
    let mut rows: Vec<Station> = table
        .iter()
        .map(|(name, a)| Station { name: name.to_owned(), min: a.min, max: a.max, mean: a.mean() })
        .collect();
    rows.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// The `n` stations with the widest `max - min`, widest first. Ties keep
/// name order.
pub fn top_by_range(stations: &[Station], n: usize) -> Vec<&Station> {
    let mut ranked: Vec<&Station> = stations.iter().collect();
    ranked.sort_by(|a, b| b.range().total_cmp(&a.range()).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(n);
    ranked
}

/// `{Berlin=-1.0/-1.0/-1.0, Hamburg=8.5/11.9/15.2}`
pub fn render_brc(stations: &[Station]) -> String {
    let rows: Vec<String> = stations
        .iter()
        .map(|s| format!("{}={:.1}/{:.1}/{:.1}", s.name, s.min, s.mean, s.max))
        .collect();
    format!("{{{}}}", rows.join(", "))
}

pub fn format_file_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let (mut div, mut exp) = (UNIT, 0);
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.1} {}B", bytes as f64 / div as f64, b"KMGTPE"[exp] as char)
}
