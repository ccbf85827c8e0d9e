//! Per-page revision history.
//!
//! Each page has a JSON file under `<root>/history/` keyed by the Unix
//! timestamp of the edit:
//!
//! ```json
//! { "1767225600.000001": { "user": "ana", "formatted-date": "Jan 01, 2026 at 12:00:00 AM", "version": "body" } }
//! ```

use crate::error::{Result, WikiError};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%b %d, %Y at %I:%M:%S %p";

/// One saved version of a page body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    #[serde(skip)]
    pub timestamp: String,
    pub user: String,
    #[serde(rename = "formatted-date")]
    pub formatted_date: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Same,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffKind,
    pub text: String,
}

#[derive(Debug)]
pub struct History {
    url: String,
    path: PathBuf,
    entries: BTreeMap<String, Revision>,
}

impl History {
    /// Open the history file, creating an empty one if needed.
    pub fn open(path: impl Into<PathBuf>, url: &str) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, "{}\n")?;
        }

        let raw = std::fs::read_to_string(&path)?;
        let mut entries: BTreeMap<String, Revision> = serde_json::from_str(&raw)?;
        for (ts, revision) in entries.iter_mut() {
            revision.timestamp = ts.clone();
        }

        Ok(Self {
            url: url.to_string(),
            path,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a new version made by `user` now.
    pub fn save(&mut self, user: &str, version: &str) -> Result<Revision> {
        self.save_at(Utc::now(), user, version)
    }

    fn save_at(&mut self, at: DateTime<Utc>, user: &str, version: &str) -> Result<Revision> {
        let mut micros = at.timestamp_micros();
        let mut key = timestamp_key(micros);
        while self.entries.contains_key(&key) {
            micros += 1;
            key = timestamp_key(micros);
        }

        let revision = Revision {
            timestamp: key.clone(),
            user: user.to_string(),
            formatted_date: at.with_timezone(&Local).format(DATE_FORMAT).to_string(),
            version: version.replace("\r\n", "\n"),
        };
        self.entries.insert(key, revision.clone());
        self.write()?;

        Ok(revision)
    }

    fn write(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// All revisions, newest first.
    pub fn revisions(&self) -> Vec<Revision> {
        let mut revisions: Vec<Revision> = self.entries.values().cloned().collect();
        revisions.sort_by_key(|r| std::cmp::Reverse(sort_key(&r.timestamp)));
        revisions
    }

    pub fn latest(&self) -> Option<Revision> {
        self.revisions().into_iter().next()
    }

    pub fn get(&self, timestamp: &str) -> Result<&Revision> {
        self.entries
            .get(timestamp)
            .ok_or_else(|| WikiError::RevisionNotFound {
                url: self.url.clone(),
                timestamp: timestamp.to_string(),
            })
    }

    /// Line diff of a revision against the one before it.
    pub fn diff(&self, timestamp: &str) -> Result<Vec<DiffLine>> {
        let revision = self.get(timestamp)?;
        let revisions = self.revisions();
        let previous = revisions
            .iter()
            .skip_while(|r| r.timestamp != revision.timestamp)
            .nth(1)
            .map(|r| r.version.as_str())
            .unwrap_or("");

        Ok(diff_lines(previous, &revision.version))
    }
}

fn timestamp_key(micros: i64) -> String {
    format!("{}.{:06}", micros.div_euclid(1_000_000), micros.rem_euclid(1_000_000))
}

/// `(seconds, nanoseconds)` of a key; fractions may have any number of digits.
fn sort_key(timestamp: &str) -> (i64, u32) {
    let (secs, frac) = timestamp.split_once('.').unwrap_or((timestamp, ""));
    let mut digits: String = frac.chars().take(9).collect();
    while digits.len() < 9 {
        digits.push('0');
    }
    (secs.parse().unwrap_or(0), digits.parse().unwrap_or(0))
}

/// Largest LCS table `diff_lines` builds for the changed region.
const MAX_DIFF_CELLS: usize = 4_000_000;

/// LCS based line diff from `old` to `new`.
///
/// Lines shared at the start and end are matched directly. If the region
/// between them is still too large for the table, it is shown as removed
/// then added.
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffLine> {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let (a_mid, b_mid) = (&a[prefix..a.len() - suffix], &b[prefix..b.len() - suffix]);

    let mut out = Vec::with_capacity(a.len().max(b.len()));
    out.extend(a[..prefix].iter().map(|l| diff_line(DiffKind::Same, l)));
    if (a_mid.len() + 1).saturating_mul(b_mid.len() + 1) <= MAX_DIFF_CELLS {
        lcs_diff(a_mid, b_mid, &mut out);
    } else {
        out.extend(a_mid.iter().map(|l| diff_line(DiffKind::Removed, l)));
        out.extend(b_mid.iter().map(|l| diff_line(DiffKind::Added, l)));
    }
    out.extend(a[a.len() - suffix..].iter().map(|l| diff_line(DiffKind::Same, l)));

    out
}

fn diff_line(kind: DiffKind, text: &str) -> DiffLine {
    DiffLine {
        kind,
        text: text.to_string(),
    }
}

fn lcs_diff(a: &[&str], b: &[&str], out: &mut Vec<DiffLine>) {
    let width = b.len() + 1;
    // lcs[i * width + j] = longest common subsequence of a[i..] and b[j..]
    let mut lcs = vec![0u32; (a.len() + 1) * width];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i * width + j] = if a[i] == b[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            out.push(diff_line(DiffKind::Same, a[i]));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            out.push(diff_line(DiffKind::Removed, a[i]));
            i += 1;
        } else {
            out.push(diff_line(DiffKind::Added, b[j]));
            j += 1;
        }
    }
    out.extend(a[i..].iter().map(|l| diff_line(DiffKind::Removed, l)));
    out.extend(b[j..].iter().map(|l| diff_line(DiffKind::Added, l)));
}
