use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Canonical stage name type used throughout the crate.
pub type StageId = String;

/// Sample (or merged group) identifier.
pub type SampleId = String;

/// Opaque job identifier handed back by the submission backend.
pub type JobId = String;

/// How a stage maps its input samples onto output groups.
///
/// - `Linear`: one output group per input sample (1:1).
/// - `Merge`: all samples of a linear predecessor collapse into a single
///   combined group (N:1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageType {
    Linear,
    Merge,
}

impl Default for StageType {
    fn default() -> Self {
        StageType::Linear
    }
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageType::Linear => f.write_str("linear"),
            StageType::Merge => f.write_str("merge"),
        }
    }
}

impl FromStr for StageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(StageType::Linear),
            "merge" => Ok(StageType::Merge),
            other => Err(format!(
                "invalid module_type: {other} (expected \"linear\" or \"merge\")"
            )),
        }
    }
}

/// Compute sizing attached to a submission (from the stage descriptor or
/// the backend defaults).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ComputeSizing {
    #[serde(default)]
    pub vcpus: Option<u32>,
    /// Memory in MiB.
    #[serde(default)]
    pub memory: Option<u32>,
}

impl ComputeSizing {
    /// Fill unset fields from `defaults`.
    pub fn or(self, defaults: ComputeSizing) -> ComputeSizing {
        ComputeSizing {
            vcpus: self.vcpus.or(defaults.vcpus),
            memory: self.memory.or(defaults.memory),
        }
    }
}

/// Parse a simple duration string like `"30s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit (ms, s, m or h)"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    match unit_part.trim().to_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => secs_times(value, 60, s),
        "h" => secs_times(value, 60 * 60, s),
        unit => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m or h"
        )),
    }
}

fn secs_times(value: u64, unit_secs: u64, raw: &str) -> Result<Duration, String> {
    value
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{raw}' is too large"))
}
