//! Long-format CSV tables.
//!
//! Column order is fixed for the downstream statistics scripts:
//!
//! ```text
//! power_by_freq.csv    eegid,chan,freq_band,freq,power_abs,power_rel,power_db
//! power_by_band.csv    eegid,chan,freq_band,power_abs,power_rel,power_db
//! connectivity.csv     eegid,method,chan1,chan2,<band…>
//! power_by_region.csv  eegid,region,hemisphere,freq_band,power_abs,power_rel,power_db
//! failures.csv         eegid,stage,error
//! subjects.csv         eegid,group,filename
//! ```
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::bands::BandSet;
use crate::connectivity::EdgeRow;
use crate::pipeline::{BatchResult, SubjectFailure};

pub const POWER_BY_FREQ: &str = "power_by_freq.csv";
pub const POWER_BY_BAND: &str = "power_by_band.csv";
pub const CONNECTIVITY: &str = "connectivity.csv";
pub const POWER_BY_REGION: &str = "power_by_region.csv";
pub const FAILURES: &str = "failures.csv";
pub const SUBJECTS: &str = "subjects.csv";

/// Serialize `rows` with a header taken from the struct's field order.
pub fn write_rows<W: Write, T: Serialize>(out: W, rows: &[T]) -> Result<()> {
    let mut w = csv::Writer::from_writer(out);
    for r in rows {
        w.serialize(r)?;
    }
    w.flush()?;
    Ok(())
}

/// Write the connectivity table; one value column per band, in band order.
pub fn write_connectivity<W: Write>(out: W, bands: &BandSet, rows: &[EdgeRow]) -> Result<()> {
    let mut w = csv::Writer::from_writer(out);
    let mut header = vec!["eegid", "method", "chan1", "chan2"];
    header.extend(bands.names());
    w.write_record(&header)?;

    let mut record = Vec::with_capacity(header.len());
    for r in rows {
        record.clear();
        record.push(r.eegid.clone());
        record.push(r.method.name().to_string());
        record.push(r.chan1.clone());
        record.push(r.chan2.clone());
        record.extend(r.values.iter().map(|v| v.to_string()));
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct FailureRecord<'a> {
    eegid: &'a str,
    stage: &'a str,
    error: String,
}

pub fn write_failures<W: Write>(out: W, failures: &[SubjectFailure]) -> Result<()> {
    let rows: Vec<FailureRecord<'_>> = failures
        .iter()
        .map(|f| FailureRecord { eegid: &f.eegid, stage: &f.stage, error: f.error.to_string() })
        .collect();
    write_rows(out, &rows)
}

fn create(dir: &Path, name: &str) -> Result<std::io::BufWriter<std::fs::File>> {
    let path = dir.join(name);
    let f = std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    Ok(std::io::BufWriter::new(f))
}

/// Write every table of `result` into `dir` (created if missing).
///
/// `power_by_region.csv` is written only when region rows exist and
/// `failures.csv` only when something failed.
pub fn write_all(dir: &Path, bands: &BandSet, result: &BatchResult) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    write_rows(create(dir, SUBJECTS)?, &result.subjects)?;
    write_rows(create(dir, POWER_BY_FREQ)?, &result.power_by_freq)?;
    write_rows(create(dir, POWER_BY_BAND)?, &result.power_by_band)?;
    write_connectivity(create(dir, CONNECTIVITY)?, bands, &result.connectivity)?;
    if !result.power_by_region.is_empty() {
        write_rows(create(dir, POWER_BY_REGION)?, &result.power_by_region)?;
    }
    if !result.failures.is_empty() {
        write_failures(create(dir, FAILURES)?, &result.failures)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ConnMethod;
    use crate::power::{BandPowerRow, PowerRow};

    #[test]
    fn power_header_order() {
        let rows = vec![PowerRow {
            eegid: "s1".into(),
            chan: "3".into(),
            freq_band: "theta".into(),
            freq: 6.5,
            power_abs: 2.0,
            power_rel: 0.25,
            power_db: 3.0,
        }];
        let mut buf = Vec::new();
        write_rows(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("eegid,chan,freq_band,freq,power_abs,power_rel,power_db"));
        assert_eq!(lines.next(), Some("s1,3,theta,6.5,2.0,0.25,3.0"));
    }

    #[test]
    fn band_header_order() {
        let rows = vec![BandPowerRow {
            eegid: "s1".into(),
            chan: "3".into(),
            freq_band: "theta".into(),
            power_abs: 2.0,
            power_rel: 0.25,
            power_db: 3.0,
        }];
        let mut buf = Vec::new();
        write_rows(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("eegid,chan,freq_band,power_abs,power_rel,power_db\n"));
    }

    #[test]
    fn connectivity_has_one_column_per_band() {
        let bands = BandSet::from_triples(&[("theta", 4.0, 8.0), ("gamma", 30.0, 80.0)]).unwrap();
        let rows = vec![EdgeRow {
            eegid: "s1".into(),
            method: ConnMethod::Wpli2Debiased,
            chan1: "1".into(),
            chan2: "2".into(),
            values: vec![0.5, 0.125],
        }];
        let mut buf = Vec::new();
        write_connectivity(&mut buf, &bands, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec!["eegid,method,chan1,chan2,theta,gamma", "s1,wpli2_debiased,1,2,0.5,0.125"]);
    }
}
