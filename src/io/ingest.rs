//! SED table ingest.
//!
//! Two layouts are accepted:
//!
//! - **ECSV**: `#`-prefixed YAML header describing the columns (name, unit,
//!   datatype), then space-delimited rows under a header row
//! - **CSV** (by `.csv` extension): comma-delimited with a header row,
//!   frequencies in Hz
//!
//! Columns are looked up case-insensitively by name: `nu`, `nuFnu`,
//! `nuFnu_err`. Frequency units from the ECSV header are converted to Hz.
//! Rows that fail to parse are skipped and reported with their line number.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::data::SedTable;
use crate::error::AppError;
use crate::physics::ev_to_hz;

const COL_NU: &str = "nu";
const COL_FLUX: &str = "nufnu";
const COL_FLUX_ERR: &str = "nufnu_err";

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SedLayout {
    Ecsv,
    Csv,
}

impl SedLayout {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => SedLayout::Csv,
            _ => SedLayout::Ecsv,
        }
    }
}

/// Ingest output: the parsed table plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedSed {
    pub table: SedTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Unit the frequency column was declared in.
    pub nu_unit: String,
}

/// Read an SED table from disk.
pub fn load_sed(path: &Path) -> Result<IngestedSed, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read SED table '{}': {e}", path.display())))?;
    let ingested = parse_sed(&text, SedLayout::from_path(path))
        .map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", path.display())))?;
    for err in &ingested.row_errors {
        warn!(line = err.line, "skipping row: {}", err.message);
    }
    debug!(
        path = %path.display(),
        rows_read = ingested.rows_read,
        rows_used = ingested.table.len(),
        "loaded SED table"
    );
    Ok(ingested)
}

/// Parse SED table text in the given layout.
pub fn parse_sed(text: &str, layout: SedLayout) -> Result<IngestedSed, AppError> {
    let (delimiter, units) = match layout {
        SedLayout::Ecsv => {
            if !text.trim_start().starts_with("# %ECSV") {
                return Err(AppError::new(2, "Missing `# %ECSV` header line"));
            }
            (b' ', parse_ecsv_units(text))
        }
        SedLayout::Csv => (b',', HashMap::new()),
    };

    let nu_unit = units.get(COL_NU).cloned().unwrap_or_else(|| "Hz".to_string());
    let nu_scale = frequency_converter(&nu_unit)?;
    for col in [COL_FLUX, COL_FLUX_ERR] {
        if let Some(unit) = units.get(col) {
            ensure_flux_unit(col, unit)?;
        }
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read column names: {e}")))?
        .clone();
    let collapse = layout == SedLayout::Ecsv;
    let header_map = build_header_map(&headers, collapse);
    for col in [COL_NU, COL_FLUX, COL_FLUX_ERR] {
        if !header_map.contains_key(col) {
            return Err(AppError::new(2, format!("Missing required column: `{col}`")));
        }
    }

    let mut table = SedTable::default();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for result in reader.records() {
        rows_read += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line: e.position().map(|p| p.line() as usize).unwrap_or(0),
                    message: format!("parse error: {e}"),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        match parse_row(&record, &header_map, collapse) {
            Ok((nu, flux, err)) => table.push(nu_scale(nu), flux, err),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if table.is_empty() {
        return Err(AppError::new(3, "No valid rows in SED table"));
    }
    Ok(IngestedSed { table, row_errors, rows_read, nu_unit })
}

/// Column name -> unit, from `# - {name: nu, unit: Hz, ...}` header lines.
fn parse_ecsv_units(text: &str) -> HashMap<String, String> {
    let mut units = HashMap::new();
    for line in text.lines().take_while(|l| l.starts_with('#')) {
        let entry = line.trim_start_matches('#').trim();
        let Some(body) = entry.strip_prefix("- {").and_then(|b| b.strip_suffix('}')) else {
            continue;
        };
        let mut name = None;
        let mut unit = None;
        for field in body.split(',') {
            let Some((key, value)) = field.split_once(':') else {
                continue;
            };
            let value = value.trim().trim_matches(|c| c == '\'' || c == '"').to_string();
            match key.trim() {
                "name" => name = Some(value),
                "unit" => unit = Some(value),
                _ => {}
            }
        }
        if let (Some(name), Some(unit)) = (name, unit) {
            units.insert(normalize_header_name(&name), unit);
        }
    }
    units
}

/// Conversion of a frequency (or photon energy) column to Hz.
fn frequency_converter(unit: &str) -> Result<fn(f64) -> f64, AppError> {
    let convert: fn(f64) -> f64 = match unit.trim() {
        "Hz" | "" => |v| v,
        "kHz" => |v| v * 1e3,
        "MHz" => |v| v * 1e6,
        "GHz" => |v| v * 1e9,
        "eV" => ev_to_hz,
        "keV" => |v| ev_to_hz(v * 1e3),
        "MeV" => |v| ev_to_hz(v * 1e6),
        "GeV" => |v| ev_to_hz(v * 1e9),
        "TeV" => |v| ev_to_hz(v * 1e12),
        other => return Err(AppError::new(2, format!("Unsupported unit for `nu`: '{other}'"))),
    };
    Ok(convert)
}

fn ensure_flux_unit(col: &str, unit: &str) -> Result<(), AppError> {
    let compact: String = unit.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.as_str() {
        "" | "erg/(cm2s)" | "erg/(scm2)" | "ergcm-2s-1" | "erg/cm2/s" => Ok(()),
        _ => Err(AppError::new(
            2,
            format!("Column `{col}` must be in erg cm-2 s-1, found '{unit}'"),
        )),
    }
}

/// Fields of a record. With `collapse`, empty fields left by repeated space
/// delimiters are dropped; otherwise positions are kept as written.
fn fields(record: &StringRecord, collapse: bool) -> Vec<&str> {
    record.iter().filter(|f| !collapse || !f.is_empty()).collect()
}

/// Lowercased header -> index.
fn build_header_map(headers: &StringRecord, collapse: bool) -> HashMap<String, usize> {
    fields(headers, collapse)
        .into_iter()
        .enumerate()
        .filter(|(_, name)| !name.is_empty())
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    collapse: bool,
) -> Result<(f64, f64, f64), String> {
    let fields = fields(record, collapse);
    let get = |name: &str| -> Result<f64, String> {
        let idx = header_map[name];
        let raw = fields
            .get(idx)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| format!("Missing value: `{name}`"))?;
        let v = raw
            .parse::<f64>()
            .map_err(|_| format!("Invalid number for `{name}`: '{raw}'"))?;
        if v.is_finite() { Ok(v) } else { Err(format!("Non-finite value for `{name}`")) }
    };
    let nu = get(COL_NU)?;
    let flux = get(COL_FLUX)?;
    let err = get(COL_FLUX_ERR)?;
    if nu <= 0.0 {
        return Err(format!("Frequency must be positive, got {nu}"));
    }
    if err < 0.0 {
        return Err(format!("Flux error must be non-negative, got {err}"));
    }
    Ok((nu, flux, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECSV: &str = "\
# %ECSV 0.9
# ---
# datatype:
# - {name: nu, unit: GHz, datatype: float64}
# - {name: nuFnu, unit: erg / (cm2 s), datatype: float64}
# - {name: nuFnu_err, unit: erg / (cm2 s), datatype: float64}
nu nuFnu nuFnu_err
2.3 1.2e-13 1.0e-14
15.0 3.4e-13 2.0e-14
abc 1e-12 1e-13
43.0 5.1e-13
86.0 7.0e-13 -1.0
";

    #[test]
    fn ecsv_units_are_converted_and_bad_rows_reported() {
        let out = parse_sed(ECSV, SedLayout::Ecsv).unwrap();
        assert_eq!(out.nu_unit, "GHz");
        assert_eq!(out.rows_read, 5);
        assert_eq!(out.table.nu, vec![2.3e9, 15.0e9]);
        assert_eq!(out.table.nu_fnu_err, vec![1.0e-14, 2.0e-14]);
        let lines: Vec<usize> = out.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.windows(2).all(|w| w[1] == w[0] + 1));
        assert!(out.row_errors[0].message.contains("Invalid number"));
    }

    #[test]
    fn energy_units_map_to_frequency() {
        let text = ECSV.replace("unit: GHz", "unit: TeV");
        let out = parse_sed(&text, SedLayout::Ecsv).unwrap();
        assert!((out.table.nu[0] / ev_to_hz(2.3e12) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn csv_layout_with_mixed_case_headers() {
        let text = "NU,NUFNU,nufnu_err\n1e10,1e-12,1e-13\n1e25,2e-11,3e-12\n";
        let out = parse_sed(text, SedLayout::Csv).unwrap();
        assert_eq!(out.table.len(), 2);
        assert_eq!(out.nu_unit, "Hz");
    }

    #[test]
    fn csv_empty_cells_keep_column_positions() {
        let text = "nu,a,nuFnu,nuFnu_err,b\n1e10,,1e-12,1e-13,7\n2e10,1,,1e-13,7\n";
        let out = parse_sed(text, SedLayout::Csv).unwrap();
        assert_eq!(out.table.nu_fnu, vec![1e-12]);
        assert_eq!(out.table.nu_fnu_err, vec![1e-13]);
        assert_eq!(out.row_errors.len(), 1);
        assert!(out.row_errors[0].message.contains("`nufnu`"));
    }

    #[test]
    fn schema_problems_are_errors() {
        assert!(parse_sed("nu nuFnu nuFnu_err\n1 2 3\n", SedLayout::Ecsv).is_err());
        assert!(parse_sed("nu,flux\n1,2\n", SedLayout::Csv).is_err());
        let text = ECSV.replace("unit: GHz", "unit: parsec");
        assert_eq!(parse_sed(&text, SedLayout::Ecsv).unwrap_err().exit_code(), 2);
        let text = ECSV.replacen("unit: erg / (cm2 s)", "unit: Jy", 1);
        assert!(parse_sed(&text, SedLayout::Ecsv).is_err());
    }

    #[test]
    fn layout_from_extension() {
        assert_eq!(SedLayout::from_path(Path::new("a/b.csv")), SedLayout::Csv);
        assert_eq!(SedLayout::from_path(Path::new("a/b.ecsv")), SedLayout::Ecsv);
    }
}
