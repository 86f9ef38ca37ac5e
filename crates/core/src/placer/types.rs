//! Types for the placer module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What to do when the destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Leave the existing file alone and drop the new payload.
    Keep,
    /// Replace the existing file.
    Overwrite,
    /// Put the payload next to the existing file under a generated name.
    Rename,
}

impl OverwritePolicy {
    /// Returns the string representation used in config and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            OverwritePolicy::Keep => "keep",
            OverwritePolicy::Overwrite => "overwrite",
            OverwritePolicy::Rename => "rename",
        }
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverwritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(OverwritePolicy::Keep),
            "overwrite" => Ok(OverwritePolicy::Overwrite),
            "rename" => Ok(OverwritePolicy::Rename),
            other => Err(format!(
                "unknown overwrite policy '{}', expected keep, overwrite or rename",
                other
            )),
        }
    }
}

/// A single placement request.
#[derive(Debug, Clone)]
pub struct PlacementRequest {
    /// Temporary payload written by the transport.
    pub source: PathBuf,
    /// Where the caller wants the payload.
    pub destination: PathBuf,
    /// How to handle an existing destination.
    pub policy: OverwritePolicy,
}

impl PlacementRequest {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        policy: OverwritePolicy,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            policy,
        }
    }
}

/// Successful result of a placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlacementOutcome {
    /// The payload now lives at `path`.
    Placed { path: PathBuf },
    /// The destination already existed and was kept; the payload was not moved.
    Skipped { existing: PathBuf },
}

impl PlacementOutcome {
    /// The path holding the file the caller should use.
    pub fn path(&self) -> &Path {
        match self {
            PlacementOutcome::Placed { path } => path,
            PlacementOutcome::Skipped { existing } => existing,
        }
    }

    pub fn is_placed(&self) -> bool {
        matches!(self, PlacementOutcome::Placed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PlacementOutcome::Skipped { .. })
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            PlacementOutcome::Placed { .. } => "placed",
            PlacementOutcome::Skipped { .. } => "skipped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_str() {
        assert_eq!("keep".parse::<OverwritePolicy>(), Ok(OverwritePolicy::Keep));
        assert_eq!(
            " Overwrite ".parse::<OverwritePolicy>(),
            Ok(OverwritePolicy::Overwrite)
        );
        assert_eq!("RENAME".parse::<OverwritePolicy>(), Ok(OverwritePolicy::Rename));
        assert!("replace".parse::<OverwritePolicy>().is_err());
    }

    #[test]
    fn test_policy_serde_roundtrip_names() {
        let json = serde_json::to_string(&OverwritePolicy::Overwrite).unwrap();
        assert_eq!(json, "\"overwrite\"");
        let policy: OverwritePolicy = serde_json::from_str("\"keep\"").unwrap();
        assert_eq!(policy, OverwritePolicy::Keep);
    }

    #[test]
    fn test_outcome_path() {
        let placed = PlacementOutcome::Placed {
            path: PathBuf::from("/out/a.txt"),
        };
        let skipped = PlacementOutcome::Skipped {
            existing: PathBuf::from("/out/b.txt"),
        };

        assert_eq!(placed.path(), Path::new("/out/a.txt"));
        assert!(placed.is_placed());
        assert_eq!(skipped.path(), Path::new("/out/b.txt"));
        assert!(skipped.is_skipped());
        assert_eq!(skipped.label(), "skipped");
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let placed = PlacementOutcome::Placed {
            path: PathBuf::from("/out/a.txt"),
        };
        let value = serde_json::to_value(&placed).unwrap();
        assert_eq!(value["outcome"], "placed");
        assert_eq!(value["path"], "/out/a.txt");
    }
}
