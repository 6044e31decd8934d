//! Channel-to-region atlas and region-level band power.
//!
//! Atlas CSV columns: `chan,region,hemisphere`.  Region power averages the
//! band-averaged rows of every channel mapped to the same
//! (region, hemisphere); channels missing from the atlas are skipped.
use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::power::BandPowerRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasEntry {
    pub chan: String,
    pub region: String,
    pub hemisphere: String,
}

#[derive(Debug, Clone, Default)]
pub struct Atlas {
    entries: Vec<AtlasEntry>,
    by_chan: HashMap<String, usize>,
}

impl Atlas {
    /// Build an atlas; channel ids must be unique.
    pub fn new(entries: Vec<AtlasEntry>) -> Result<Self> {
        let mut by_chan = HashMap::with_capacity(entries.len());
        for (i, e) in entries.iter().enumerate() {
            if by_chan.insert(e.chan.clone(), i).is_some() {
                bail!("atlas lists channel '{}' more than once", e.chan);
            }
        }
        Ok(Self { entries, by_chan })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("opening atlas {}", path.display()))?;
        let entries = rdr
            .deserialize()
            .collect::<std::result::Result<Vec<AtlasEntry>, _>>()
            .with_context(|| format!("parsing atlas {}", path.display()))?;
        Self::new(entries)
    }

    pub fn lookup(&self, chan: &str) -> Option<&AtlasEntry> {
        self.by_chan.get(chan).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One row of the region power table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionPowerRow {
    pub eegid: String,
    pub region: String,
    pub hemisphere: String,
    pub freq_band: String,
    pub power_abs: f64,
    pub power_rel: f64,
    pub power_db: f64,
}

/// Mean band power per (eegid, region, hemisphere, band).
///
/// Output order follows first appearance in `rows`.
pub fn region_power(rows: &[BandPowerRow], atlas: &Atlas) -> Vec<RegionPowerRow> {
    type Key<'a> = (&'a str, &'a str, &'a str, &'a str);

    let mut order: Vec<Key<'_>> = Vec::new();
    let mut acc: HashMap<Key<'_>, (f64, f64, f64, usize)> = HashMap::new();
    let mut unmapped: Vec<&str> = Vec::new();

    for r in rows {
        let Some(entry) = atlas.lookup(&r.chan) else {
            if !unmapped.contains(&r.chan.as_str()) {
                unmapped.push(&r.chan);
            }
            continue;
        };
        let key = (r.eegid.as_str(), entry.region.as_str(), entry.hemisphere.as_str(), r.freq_band.as_str());
        let a = acc.entry(key).or_insert_with(|| {
            order.push(key);
            (0.0, 0.0, 0.0, 0)
        });
        a.0 += r.power_abs;
        a.1 += r.power_rel;
        a.2 += r.power_db;
        a.3 += 1;
    }

    if !unmapped.is_empty() {
        warn!("{} channel(s) not in atlas, skipped: {}", unmapped.len(), unmapped.join(", "));
    }

    order
        .into_iter()
        .map(|key| {
            let (abs, rel, db, n) = acc[&key];
            let inv_n = 1.0 / n as f64;
            RegionPowerRow {
                eegid: key.0.to_string(),
                region: key.1.to_string(),
                hemisphere: key.2.to_string(),
                freq_band: key.3.to_string(),
                power_abs: abs * inv_n,
                power_rel: rel * inv_n,
                power_db: db * inv_n,
            }
        })
        .collect()
}
