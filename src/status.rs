//! Status vocabulary for applications and interview stages: codes, labels,
//! display tones and icons.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display tone for a status badge. The terminal view maps these to colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Info,
    Progress,
    Success,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Saved,
    Applied,
    Interview,
    Offer,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Saved,
        ApplicationStatus::Applied,
        ApplicationStatus::Interview,
        ApplicationStatus::Offer,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Applied => "applied",
            Self::Interview => "interview",
            Self::Offer => "offer",
            Self::Rejected => "rejected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Saved => "Saved",
            Self::Applied => "Applied",
            Self::Interview => "Interviewing",
            Self::Offer => "Offer",
            Self::Rejected => "Rejected",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            Self::Saved => Tone::Neutral,
            Self::Applied => Tone::Info,
            Self::Interview => Tone::Progress,
            Self::Offer => Tone::Success,
            Self::Rejected => Tone::Danger,
        }
    }

    pub fn icon(self) -> char {
        match self {
            Self::Saved => ' ',
            Self::Applied => '+',
            Self::Interview => '*',
            Self::Offer => '$',
            Self::Rejected => 'x',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageOutcome {
    #[default]
    Pending,
    Scheduled,
    Passed,
    Failed,
}

impl StageOutcome {
    /// Order used by the click-to-cycle badge.
    pub const CYCLE: [StageOutcome; 4] = [
        StageOutcome::Pending,
        StageOutcome::Scheduled,
        StageOutcome::Passed,
        StageOutcome::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Scheduled => "Scheduled",
            Self::Passed => "Passed",
            Self::Failed => "Failed",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            Self::Pending => Tone::Neutral,
            Self::Scheduled => Tone::Info,
            Self::Passed => Tone::Success,
            Self::Failed => Tone::Danger,
        }
    }

    pub fn icon(self) -> char {
        match self {
            Self::Pending => '?',
            Self::Scheduled => '@',
            Self::Passed => '+',
            Self::Failed => 'x',
        }
    }

    /// Cyclic successor, wrapping from `Failed` back to `Pending`.
    pub fn next(self) -> Self {
        let idx = Self::CYCLE.iter().position(|o| *o == self).unwrap_or(0);
        Self::CYCLE[(idx + 1) % Self::CYCLE.len()]
    }

    /// Still counts toward upcoming interviews.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Scheduled)
    }
}

/// Label and tone for a raw status code as stored or received. Codes this
/// build does not know render as a neutral "In Progress" badge.
pub fn label_for_code(code: &str) -> (&'static str, Tone) {
    if let Ok(status) = code.parse::<ApplicationStatus>() {
        return (status.label(), status.tone());
    }
    if let Ok(outcome) = code.parse::<StageOutcome>() {
        return (outcome.label(), outcome.tone());
    }
    ("In Progress", Tone::Neutral)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{code}'")]
pub struct UnknownCode {
    pub kind: &'static str,
    pub code: String,
}

impl FromStr for ApplicationStatus {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == code)
            .ok_or(UnknownCode {
                kind: "application status",
                code,
            })
    }
}

impl FromStr for StageOutcome {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_lowercase();
        Self::CYCLE
            .into_iter()
            .find(|outcome| outcome.as_str() == code)
            .ok_or(UnknownCode {
                kind: "stage outcome",
                code,
            })
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for ApplicationStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ApplicationStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for StageOutcome {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for StageOutcome {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
