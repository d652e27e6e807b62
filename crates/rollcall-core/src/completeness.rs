use rollcall_parser::StudentId;
use serde::Serialize;
use tracing::{info, warn};

use crate::merge::MergedTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    BelowThreshold,
    UnknownGrade,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscardedStudent {
    pub student_id: StudentId,
    pub populated: usize,
    pub reason: DiscardReason,
}

/// Drops students with fewer than `threshold` populated source fields, and students whose
/// grade level could not be resolved from any source.
pub fn apply_completeness(table: &mut MergedTable, threshold: usize) -> Vec<DiscardedStudent> {
    let before = table.len();
    let removed = table.retain(|_, record| record.grade.is_some() && record.populated >= threshold);

    let discarded: Vec<DiscardedStudent> = removed
        .into_iter()
        .map(|(student_id, record)| {
            let reason = if record.grade.is_none() {
                DiscardReason::UnknownGrade
            } else {
                DiscardReason::BelowThreshold
            };
            warn!(
                student_id = student_id.as_i64(),
                populated = record.populated,
                threshold,
                ?reason,
                "Discarding incomplete student"
            );
            DiscardedStudent {
                student_id,
                populated: record.populated,
                reason,
            }
        })
        .collect();

    info!(
        threshold,
        before,
        retained = table.len(),
        discarded = discarded.len(),
        "Applied completeness threshold"
    );
    discarded
}
