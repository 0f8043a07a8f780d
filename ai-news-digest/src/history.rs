use crate::dedup::HistoricalFingerprints;
use crate::types::{Digest, DigestIndex, Localized, Result};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const INDEX_FILE: &str = "index.json";

/// The part of a persisted digest that dedup needs.
#[derive(Debug, Deserialize)]
struct StoredDigest {
    #[serde(default)]
    news: Vec<StoredStory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredStory {
    #[serde(default)]
    title: Localized,
    #[serde(default)]
    source_url: String,
}

/// Directory of `{date}.json` digests plus `index.json`.
pub struct HistoryStore {
    data_dir: PathBuf,
}

impl HistoryStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn digest_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE)
    }

    /// Stories of one persisted digest; `None` when missing or unreadable.
    /// Only titles and URLs are read, so files from older writers without a
    /// crawl log (or with a partial one) still count.
    fn read_stories(&self, date: NaiveDate) -> Option<Vec<StoredStory>> {
        let path = self.digest_path(date);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No history for {} ({})", date, e);
                return None;
            }
        };
        match serde_json::from_str::<StoredDigest>(&content) {
            Ok(stored) => Some(stored.news),
            Err(e) => {
                warn!("Ignoring unreadable digest {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Fingerprints of the `window` days strictly before `date`.
    pub fn load_fingerprints(&self, date: NaiveDate, window: u32) -> HistoricalFingerprints {
        let days: Vec<Vec<StoredStory>> = (1..=u64::from(window))
            .filter_map(|back| date.checked_sub_days(Days::new(back)))
            .filter_map(|day| self.read_stories(day))
            .collect();

        let fingerprints = HistoricalFingerprints::from_stories(
            days.iter()
                .flatten()
                .map(|story| (&story.title, story.source_url.as_str())),
        );
        info!(
            "Loaded {} fingerprints from {} prior digests (window {} days)",
            fingerprints.len(),
            days.len(),
            window
        );
        fingerprints
    }

    pub fn write_digest(&self, digest: &Digest) -> Result<PathBuf> {
        let path = self.digest_path(digest.date);
        write_pretty(&path, digest)?;
        info!("Wrote {} ({} stories)", path.display(), digest.news.len());
        Ok(path)
    }

    /// Records `date` in the index; an unreadable index is rebuilt.
    pub fn update_index(&self, date: NaiveDate, cap: usize) -> Result<DigestIndex> {
        let path = self.index_path();
        let mut index = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Replacing unreadable index {}: {}", path.display(), e);
                DigestIndex::default()
            }),
            Err(_) => DigestIndex::default(),
        };

        index.record(date, cap);
        write_pretty(&path, &index)?;
        debug!("Index now holds {} dates", index.dates.len());
        Ok(index)
    }
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}
