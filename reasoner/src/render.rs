//! Plain-text presenter used by the CLI.

use std::time::Duration;

use crate::core::types::{StepKind, StepRecord};

/// Render one step as a block of text.
pub fn format_step(step: &StepRecord) -> String {
    let heading = match step.kind {
        StepKind::Intermediate => format!("Step {}: {}", step.index, step.title),
        StepKind::Final => step.title.clone(),
        StepKind::Error => format!("Step {}: {} (error)", step.index, step.title),
    };
    format!(
        "### {heading}\n{}\n({})\n",
        step.content.trim(),
        format_secs(step.latency)
    )
}

/// Footer printed once the session is done.
pub fn format_footer(total: Duration) -> String {
    format!("Total thinking time: {}", format_secs(total))
}

fn format_secs(duration: Duration) -> String {
    format!("{:.2} s", duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(kind: StepKind) -> StepRecord {
        StepRecord {
            index: 2,
            title: "Count occurrences".to_string(),
            content: "  r appears 3 times \n".to_string(),
            latency: Duration::from_millis(1234),
            kind,
        }
    }

    #[test]
    fn intermediate_step_has_numbered_heading() {
        assert_eq!(
            format_step(&step(StepKind::Intermediate)),
            "### Step 2: Count occurrences\nr appears 3 times\n(1.23 s)\n"
        );
    }

    #[test]
    fn final_and_error_headings() {
        assert!(format_step(&step(StepKind::Final)).starts_with("### Count occurrences\n"));
        assert!(format_step(&step(StepKind::Error)).contains("(error)"));
    }

    #[test]
    fn footer_formats_seconds() {
        assert_eq!(
            format_footer(Duration::from_millis(2500)),
            "Total thinking time: 2.50 s"
        );
    }
}
