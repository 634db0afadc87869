//! Fixed instructions sent to the model, rendered from embedded templates.

use anyhow::Result;
use minijinja::{Environment, context};
use tracing::debug;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const ACKNOWLEDGEMENT_TEMPLATE: &str = include_str!("prompts/acknowledgement.md");
const FINAL_REQUEST_TEMPLATE: &str = include_str!("prompts/final_request.md");

/// Rendered instructions for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// System instruction opening every transcript.
    pub system: String,
    /// Assistant acknowledgement placed after the user's prompt.
    pub acknowledgement: String,
    /// User message appended before the final-answer call.
    pub final_request: String,
}

/// Template engine wrapper around minijinja.
pub struct PromptBuilder {
    env: Environment<'static>,
    step_cap: u32,
}

impl PromptBuilder {
    pub fn new(step_cap: u32) -> Self {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)
            .expect("system template should be valid");
        env.add_template("acknowledgement", ACKNOWLEDGEMENT_TEMPLATE)
            .expect("acknowledgement template should be valid");
        env.add_template("final_request", FINAL_REQUEST_TEMPLATE)
            .expect("final_request template should be valid");
        Self { env, step_cap }
    }

    pub fn build(&self) -> Result<PromptSet> {
        let system = self
            .env
            .get_template("system")?
            .render(context! { step_cap => self.step_cap })?;
        let acknowledgement = self.env.get_template("acknowledgement")?.render(context! {})?;
        let final_request = self.env.get_template("final_request")?.render(context! {})?;
        debug!(
            step_cap = self.step_cap,
            system_bytes = system.len(),
            "rendered prompts"
        );
        Ok(PromptSet {
            system: system.trim().to_string(),
            acknowledgement: acknowledgement.trim().to_string(),
            final_request: final_request.trim().to_string(),
        })
    }
}
