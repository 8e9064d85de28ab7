//! Write SED tables and run reports.
//!
//! SED tables are written as ECSV so they load back through [`crate::io::load_sed`].

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::data::SedTable;
use crate::error::AppError;

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .map_err(|e| AppError::new(2, format!("Failed to create directory '{}': {e}", dir.display()))),
        _ => Ok(()),
    }
}

/// Write an SED table as ECSV (`nu` in Hz, fluxes in erg cm-2 s-1).
pub fn write_sed_ecsv(path: &Path, table: &SedTable) -> Result<(), AppError> {
    ensure_parent_dir(path)?;
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create SED table '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    let write_err = |e: std::io::Error| AppError::new(2, format!("Failed to write SED table: {e}"));

    writeln!(
        out,
        "# %ECSV 1.0\n\
         # ---\n\
         # datatype:\n\
         # - {{name: nu, unit: Hz, datatype: float64}}\n\
         # - {{name: nuFnu, unit: erg / (cm2 s), datatype: float64}}\n\
         # - {{name: nuFnu_err, unit: erg / (cm2 s), datatype: float64}}"
    )
    .map_err(write_err)?;

    let mut writer = csv::WriterBuilder::new().delimiter(b' ').from_writer(out);
    let csv_err = |e: csv::Error| AppError::new(2, format!("Failed to write SED table: {e}"));
    writer.write_record(["nu", "nuFnu", "nuFnu_err"]).map_err(csv_err)?;
    for i in 0..table.len() {
        writer
            .write_record([
                format!("{:e}", table.nu[i]),
                format!("{:e}", table.nu_fnu[i]),
                format!("{:e}", table.nu_fnu_err[i]),
            ])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(write_err)
}

/// Pretty-printed JSON export.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    ensure_parent_dir(path)?;
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create JSON '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, value)
        .map_err(|e| AppError::new(2, format!("Failed to write JSON '{}': {e}", path.display())))?;
    writeln!(out).and_then(|_| out.flush())
        .map_err(|e| AppError::new(2, format!("Failed to write JSON '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::load_sed;

    #[test]
    fn written_table_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sed.ecsv");
        let mut table = SedTable::default();
        table.push(2.4e10, 1.5e-12, 1.0e-13);
        table.push(1.2e17, 3.25e-10, 0.0);
        table.push(5.0e25, 7.0e-11, 2.0e-12);

        write_sed_ecsv(&path, &table).unwrap();
        let loaded = load_sed(&path).unwrap();
        assert_eq!(loaded.table, table);
        assert_eq!(loaded.rows_read, 3);
        assert!(loaded.row_errors.is_empty());
        assert_eq!(loaded.table.upper_limits(), vec![1]);
    }

    #[test]
    fn json_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &serde_json::json!({ "chi2": 12.5 })).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["chi2"], 12.5);
    }
}
