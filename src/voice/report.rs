//! Read Report
//!
//! Serializable summary of one read, for logs and the CLI

use super::reader::ReadOutcome;
use super::ReadError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a read ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    /// Still running
    InProgress,
    /// Digits were collected and accepted
    Accepted,
    /// Play-only read reached the end of its prompts
    Completed,
    /// Attempts exhausted
    AttemptLimit,
    /// Caller went quiet
    TimeoutLimit,
    /// Call ended mid-read
    Hangup,
    /// Options were rejected before playing
    Invalid,
}

impl From<&ReadError> for ReadStatus {
    fn from(err: &ReadError) -> Self {
        match err {
            ReadError::AttemptLimit => ReadStatus::AttemptLimit,
            ReadError::TimeoutLimit => ReadStatus::TimeoutLimit,
            ReadError::Hangup => ReadStatus::Hangup,
            ReadError::InvalidOptions(_) => ReadStatus::Invalid,
        }
    }
}

/// Summary of one read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadReport {
    /// Unique report ID
    pub id: String,
    /// Prompts the read was asked to play
    pub prompts: Vec<String>,
    /// Digits requested
    pub digits_requested: usize,
    pub status: ReadStatus,
    /// Accepted digits
    pub digits: Option<String>,
    /// Failure reason, machine readable
    pub reason: Option<String>,
    /// Prompt cycles started
    pub attempts: u32,
    /// Prompts actually rendered, markers included
    pub prompts_played: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Duration in milliseconds
    pub duration_ms: Option<i64>,
}

impl ReadReport {
    /// Open a report for a read about to start
    pub fn start(prompts: Vec<String>, digits_requested: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            prompts,
            digits_requested,
            status: ReadStatus::InProgress,
            digits: None,
            reason: None,
            attempts: 0,
            prompts_played: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
        }
    }

    /// Close the report with the read's result
    pub fn finish(&mut self, result: &Result<ReadOutcome, ReadError>) {
        match result {
            Ok(outcome) => {
                self.status = if outcome.digits.is_some() {
                    ReadStatus::Accepted
                } else {
                    ReadStatus::Completed
                };
                self.digits = outcome.digits.clone();
                self.attempts = outcome.attempts;
                self.prompts_played = outcome.prompts_played.clone();
            }
            Err(err) => {
                self.status = ReadStatus::from(err);
                self.reason = Some(err.reason().to_string());
            }
        }

        let ended = Utc::now();
        self.duration_ms = Some((ended - self.started_at).num_milliseconds());
        self.ended_at = Some(ended);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_start() {
        let report = ReadReport::start(vec!["enter-pin".to_string()], 4);
        assert_eq!(report.status, ReadStatus::InProgress);
        assert_eq!(report.digits_requested, 4);
        assert!(report.ended_at.is_none());
        assert!(Uuid::parse_str(&report.id).is_ok());
    }

    #[test]
    fn test_report_accepted() {
        let mut report = ReadReport::start(vec!["enter-pin".to_string()], 4);
        report.finish(&Ok(ReadOutcome {
            digits: Some("1234".to_string()),
            attempts: 1,
            prompts_played: vec!["enter-pin".to_string()],
        }));

        assert_eq!(report.status, ReadStatus::Accepted);
        assert_eq!(report.digits.as_deref(), Some("1234"));
        assert_eq!(report.attempts, 1);
        assert!(report.reason.is_none());
        assert!(report.ended_at.is_some());
        assert!(report.duration_ms.unwrap() >= 0);
    }

    #[test]
    fn test_report_completed_without_digits() {
        let mut report = ReadReport::start(vec!["welcome".to_string()], 0);
        report.finish(&Ok(ReadOutcome {
            digits: None,
            attempts: 1,
            prompts_played: vec!["welcome".to_string()],
        }));
        assert_eq!(report.status, ReadStatus::Completed);
    }

    #[test]
    fn test_report_failure_reason() {
        let mut report = ReadReport::start(vec!["enter-pin".to_string()], 4);
        report.finish(&Err(ReadError::TimeoutLimit));
        assert_eq!(report.status, ReadStatus::TimeoutLimit);
        assert_eq!(report.reason.as_deref(), Some("timeout limit"));
        assert!(report.ended_at.is_some());
    }

    #[test]
    fn test_report_serializes_snake_case_status() {
        let mut report = ReadReport::start(vec!["a".to_string()], 1);
        report.finish(&Err(ReadError::AttemptLimit));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "attempt_limit");
        assert_eq!(json["reason"], "attempt limit");
    }
}
