//! Subject log: which file belongs to which subject and genotype group.
//!
//! Comma-separated with at least the columns `filename,eegid,group`; any
//! other columns are ignored.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::recording::SubjectMeta;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectEntry {
    pub filename: String,
    pub eegid: String,
    pub group: String,
}

#[derive(Debug, Clone, Default)]
pub struct SubjectLog {
    entries: Vec<SubjectEntry>,
}

impl SubjectLog {
    pub fn new(entries: Vec<SubjectEntry>) -> Self {
        Self { entries }
    }

    /// Parse a subject-log CSV.
    pub fn load(path: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("opening subject log {}", path.display()))?;
        let entries = rdr
            .deserialize()
            .collect::<std::result::Result<Vec<SubjectEntry>, _>>()
            .with_context(|| format!("parsing subject log {}", path.display()))?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[SubjectEntry] {
        &self.entries
    }

    /// The unique entry for a recording file.
    ///
    /// An entry matches when its `filename` equals the file's name or its
    /// stem (`s01.safetensors` matches `s01.safetensors` and `s01`).
    ///
    /// # Errors
    ///
    /// [`PipelineError::SubjectLookup`] unless exactly one entry matches.
    pub fn lookup(&self, recording: &Path) -> std::result::Result<SubjectMeta, PipelineError> {
        let file_name = recording
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = recording
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let hits: Vec<&SubjectEntry> = self
            .entries
            .iter()
            .filter(|e| e.filename == file_name || e.filename == stem)
            .collect();

        match hits.as_slice() {
            [entry] => Ok(SubjectMeta::new(&entry.eegid, &entry.group, file_name)),
            _ => Err(PipelineError::SubjectLookup { file: file_name, matches: hits.len() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn log() -> SubjectLog {
        SubjectLog::new(vec![
            SubjectEntry { filename: "m01.safetensors".into(), eegid: "M01".into(), group: "wt".into() },
            SubjectEntry { filename: "m02".into(), eegid: "M02".into(), group: "ko".into() },
            SubjectEntry { filename: "dup".into(), eegid: "D1".into(), group: "wt".into() },
            SubjectEntry { filename: "dup.safetensors".into(), eegid: "D2".into(), group: "ko".into() },
        ])
    }

    #[test]
    fn matches_by_name_or_stem() {
        let m = log().lookup(Path::new("/data/m01.safetensors")).unwrap();
        assert_eq!((m.eegid.as_str(), m.group.as_str()), ("M01", "wt"));
        let m = log().lookup(Path::new("/data/m02.safetensors")).unwrap();
        assert_eq!(m.eegid, "M02");
        assert_eq!(m.filename, "m02.safetensors");
    }

    #[test]
    fn zero_or_many_matches_fail() {
        match log().lookup(Path::new("m99.safetensors")) {
            Err(PipelineError::SubjectLookup { matches, .. }) => assert_eq!(matches, 0),
            other => panic!("unexpected {other:?}"),
        }
        match log().lookup(Path::new("dup.safetensors")) {
            Err(PipelineError::SubjectLookup { matches, .. }) => assert_eq!(matches, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn loads_csv_with_extra_columns() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "filename, eegid, group, weight").unwrap();
        writeln!(f, "m01.safetensors, M01, wt, 21.5").unwrap();
        writeln!(f, "m02.safetensors, M02, ko, 19.0").unwrap();
        let log = SubjectLog::load(f.path()).unwrap();
        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.entries()[1].group, "ko");
    }
}
