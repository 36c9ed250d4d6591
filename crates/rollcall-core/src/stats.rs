//! Aggregate metrics over a batch of attendance records.

use crate::{
    config::SummaryPolicy,
    types::{AttendanceRecord, StatsSummary, TopPerformer},
};
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use itertools::Itertools;

/// Summarize a batch of records.
///
/// The average is 0 for an empty batch. Top performers are sorted by
/// percentage, descending, keeping input order among equal values.
pub fn summarize(
    records: &[AttendanceRecord],
    policy: &SummaryPolicy,
    timestamp: DateTime<Utc>,
) -> StatsSummary {
    let total_students = records
        .iter()
        .map(|record| record.student.as_str())
        .collect::<IndexSet<_>>()
        .len();

    let average_attendance = if records.is_empty() {
        0.0
    } else {
        let sum: f64 = records.iter().map(|record| record.present_percentage).sum();
        sum / records.len() as f64
    };

    let below_threshold = records
        .iter()
        .filter(|record| record.present_percentage < policy.low_attendance_threshold)
        .count();

    // sorted_by is a stable sort
    let top_performers = records
        .iter()
        .sorted_by(|a, b| b.present_percentage.total_cmp(&a.present_percentage))
        .take(policy.top_performers)
        .map(|record| TopPerformer {
            name: record.student_name.clone(),
            attendance: record.present_percentage,
        })
        .collect();

    StatsSummary {
        timestamp,
        total_students,
        average_attendance,
        below_threshold,
        top_performers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(student: &str, name: &str, pct: f64) -> AttendanceRecord {
        AttendanceRecord {
            student: student.to_string(),
            student_name: name.to_string(),
            present_percentage: pct,
        }
    }

    fn names(summary: &StatsSummary) -> Vec<&str> {
        summary
            .top_performers
            .iter()
            .map(|p| p.name.as_str())
            .collect()
    }

    #[test]
    fn test_two_students() {
        let records = [record("s1", "Alice", 90.0), record("s2", "Bob", 60.0)];
        let summary = summarize(&records, &SummaryPolicy::default(), Utc::now());

        assert_eq!(summary.total_students, 2);
        assert_eq!(summary.average_attendance, 75.0);
        assert_eq!(summary.below_threshold, 1);
        assert_eq!(names(&summary), ["Alice", "Bob"]);
    }

    #[test]
    fn test_empty_batch() {
        let summary = summarize(&[], &SummaryPolicy::default(), Utc::now());

        assert_eq!(summary.total_students, 0);
        assert_eq!(summary.average_attendance, 0.0);
        assert_eq!(summary.below_threshold, 0);
        assert!(summary.top_performers.is_empty());
    }

    #[test]
    fn test_duplicate_student_counted_once() {
        // One row per month for the same student
        let records = [
            record("s1", "Alice", 80.0),
            record("s1", "Alice", 100.0),
            record("s2", "Bob", 70.0),
        ];
        let summary = summarize(&records, &SummaryPolicy::default(), Utc::now());

        assert_eq!(summary.total_students, 2);
        assert_eq!(summary.top_performers.len(), 3);
    }

    #[test]
    fn test_threshold_is_strict() {
        let records = [record("s1", "A", 75.0), record("s2", "B", 74.999)];
        let summary = summarize(&records, &SummaryPolicy::default(), Utc::now());
        assert_eq!(summary.below_threshold, 1);
    }

    #[test]
    fn test_top_performers_truncated_and_stable() {
        let records = [
            record("s1", "A", 50.0),
            record("s2", "B", 90.0),
            record("s3", "C", 70.0),
            record("s4", "D", 90.0),
            record("s5", "E", 100.0),
            record("s6", "F", 70.0),
            record("s7", "G", 10.0),
        ];
        let summary = summarize(&records, &SummaryPolicy::default(), Utc::now());

        assert_eq!(names(&summary), ["E", "B", "D", "C", "F"]);
    }

    #[test]
    fn test_custom_policy() {
        let policy = SummaryPolicy {
            low_attendance_threshold: 50.0,
            top_performers: 1,
        };
        let records = [record("s1", "A", 40.0), record("s2", "B", 60.0)];
        let summary = summarize(&records, &policy, Utc::now());

        assert_eq!(summary.below_threshold, 1);
        assert_eq!(names(&summary), ["B"]);
    }
}
