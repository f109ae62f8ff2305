use crate::model::{ProductPriceRecord, Snapshot, StorageError};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::ops::RangeBounds;
use std::path::PathBuf;
use tracing::{debug, info};

const HEADER: [&str; 6] = ["ean", "nombre", "categoria", "cat_principal", "precio", "fecha"];

/// Every snapshot ever ingested, keyed by date and backed by a single CSV file.
pub struct HistoricalStore {
    path: PathBuf,
    snapshots: BTreeMap<NaiveDate, Snapshot>,
}

impl HistoricalStore {
    /// Reads the table at `path`. A file that does not exist yet is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let mut store = Self {
            path,
            snapshots: BTreeMap::new(),
        };
        if !store.path.exists() {
            debug!("No history at {}, starting empty", store.path.display());
            return Ok(store);
        }

        let mut reader = csv::Reader::from_path(&store.path)?;
        let mut seen: HashSet<(NaiveDate, String)> = HashSet::new();
        for result in reader.deserialize::<ProductPriceRecord>() {
            let record = result?;
            if !seen.insert((record.date, record.product_id.clone())) {
                debug!("Ignoring repeated row {} on {}", record.product_id, record.date);
                continue;
            }
            store
                .snapshots
                .entry(record.date)
                .or_insert_with(|| Snapshot::new(record.date))
                .records
                .push(record);
        }

        info!(
            "Loaded history: {} rows over {} dates",
            store.row_count(),
            store.snapshots.len()
        );
        Ok(store)
    }

    /// Replaces whatever was stored for `date` with `snapshot` and persists the table.
    ///
    /// Merging the same date again overwrites it, so re-runs never pile up rows.
    pub fn merge(&mut self, mut snapshot: Snapshot, date: NaiveDate) -> Result<(), StorageError> {
        snapshot.date = date;
        let mut seen = HashSet::new();
        snapshot.records.retain(|r| seen.insert(r.product_id.clone()));
        for record in &mut snapshot.records {
            record.date = date;
        }

        if self.snapshots.insert(date, snapshot).is_some() {
            info!("Replaced existing rows for {}", date);
        }
        self.persist()?;
        info!("{}: {} rows", self.path.display(), self.row_count());
        Ok(())
    }

    /// Most recent snapshot strictly before `date`.
    pub fn snapshot_before(&self, date: NaiveDate) -> Option<&Snapshot> {
        self.snapshots.range(..date).next_back().map(|(_, s)| s)
    }

    /// Snapshot for the latest stored date that is not after `target`.
    pub fn snapshot_at_or_before(&self, target: NaiveDate) -> Option<&Snapshot> {
        self.snapshots.range(..=target).next_back().map(|(_, s)| s)
    }

    pub fn snapshot_at(&self, date: NaiveDate) -> Option<&Snapshot> {
        self.snapshots.get(&date)
    }

    /// Snapshots whose date falls in `range`, oldest first.
    pub fn snapshots_in<R: RangeBounds<NaiveDate>>(&self, range: R) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.range(range).map(|(_, s)| s)
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.snapshots.keys().next_back().copied()
    }

    #[cfg(test)]
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.snapshots.keys().copied()
    }

    pub fn row_count(&self) -> usize {
        self.snapshots.values().map(Snapshot::len).sum()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    fn persist(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&tmp)?;
            writer.write_record(HEADER)?;
            for snapshot in self.snapshots.values() {
                for record in &snapshot.records {
                    writer.serialize(record)?;
                }
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
