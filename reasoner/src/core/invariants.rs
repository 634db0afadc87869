//! Session invariants checked against a step list snapshot.

use std::time::Duration;

use crate::core::types::{StepKind, StepRecord};

/// Check session invariants:
/// - Indexes are `1..=n` in order
/// - Intermediate steps never exceed `step_cap`
/// - `total_latency` equals the sum of step latencies
/// - No Final step except as the last record
/// - A finished session ends with exactly one Final or Error record
pub fn validate_session(
    steps: &[StepRecord],
    total_latency: Duration,
    step_cap: u32,
    done: bool,
) -> Vec<String> {
    let mut errors = Vec::new();

    for (pos, step) in steps.iter().enumerate() {
        let expected = pos as u32 + 1;
        if step.index != expected {
            errors.push(format!(
                "step at position {pos} has index {} (expected {expected})",
                step.index
            ));
        }
    }

    let intermediate = steps
        .iter()
        .filter(|step| step.kind == StepKind::Intermediate)
        .count() as u32;
    if intermediate > step_cap {
        errors.push(format!(
            "{intermediate} intermediate steps exceed step cap {step_cap}"
        ));
    }

    let sum: Duration = steps.iter().map(|step| step.latency).sum();
    if sum != total_latency {
        errors.push(format!(
            "total latency {total_latency:?} differs from step sum {sum:?}"
        ));
    }

    let finals = steps
        .iter()
        .filter(|step| step.kind == StepKind::Final)
        .count();
    if finals > 1 {
        errors.push(format!("{finals} final steps (expected at most 1)"));
    }
    if let Some(pos) = steps.iter().position(|step| step.kind == StepKind::Final) {
        if pos + 1 != steps.len() {
            errors.push(format!("final step at position {pos} is not last"));
        }
    }

    if done {
        match steps.last().map(|step| step.kind) {
            Some(StepKind::Final) | Some(StepKind::Error) => {}
            Some(StepKind::Intermediate) => {
                errors.push("finished session ends with an intermediate step".to_string());
            }
            None => errors.push("finished session has no steps".to_string()),
        }
    } else if finals > 0 {
        errors.push("unfinished session already has a final step".to_string());
    }

    errors
}
