//! Schema validation of raw model replies.
//!
//! A reply is accepted only if it parses as JSON and satisfies the schema for
//! the call kind. Anything else is a [`CallError::MalformedResponse`]; missing
//! fields are never filled with defaults.

use std::sync::LazyLock;

use jsonschema::Validator;
use serde_json::Value;

use crate::core::types::{CallError, StepPayload};

const STEP_SCHEMA: &str = include_str!("../../schemas/step.schema.json");
const FINAL_SCHEMA: &str = include_str!("../../schemas/final.schema.json");

static STEP_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| compile(STEP_SCHEMA));
static FINAL_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| compile(FINAL_SCHEMA));

fn compile(raw: &str) -> Validator {
    let schema: Value = serde_json::from_str(raw).expect("embedded schema should be valid json");
    jsonschema::validator_for(&schema).expect("embedded schema should compile")
}

/// Parse and validate a raw reply.
///
/// `is_final` selects the final-answer schema, which does not require
/// `next_action`; any `next_action` sent with a final reply is dropped.
pub fn parse_payload(raw: &str, is_final: bool) -> Result<StepPayload, CallError> {
    let mut value: Value = serde_json::from_str(raw.trim())
        .map_err(|err| CallError::MalformedResponse(format!("invalid json: {err}")))?;

    let validator: &Validator = if is_final {
        &FINAL_VALIDATOR
    } else {
        &STEP_VALIDATOR
    };
    let messages: Vec<String> = validator
        .iter_errors(&value)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(CallError::MalformedResponse(messages.join("; ")));
    }

    if let Some(object) = value.as_object_mut().filter(|_| is_final) {
        object.remove("next_action");
    }
    serde_json::from_value(value).map_err(|err| CallError::MalformedResponse(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::NextAction;

    #[test]
    fn parses_intermediate_step() {
        let payload = parse_payload(
            r#"{"title":"Identify letters","content":"s t r a w","next_action":"continue"}"#,
            false,
        )
        .expect("valid step");
        assert_eq!(payload.title, "Identify letters");
        assert_eq!(payload.next_action, Some(NextAction::Continue));
    }

    #[test]
    fn intermediate_step_requires_next_action() {
        let err = parse_payload(r#"{"title":"t","content":"c"}"#, false).unwrap_err();
        assert!(matches!(err, CallError::MalformedResponse(_)));
        assert!(err.to_string().contains("next_action"));
    }

    #[test]
    fn unknown_next_action_is_malformed() {
        let err = parse_payload(
            r#"{"title":"t","content":"c","next_action":"maybe"}"#,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, CallError::MalformedResponse(_)));
    }

    #[test]
    fn final_reply_drops_next_action() {
        let payload = parse_payload(
            r#"{"title":"Final Answer","content":"There are 3 R's.","next_action":"continue"}"#,
            true,
        )
        .expect("valid final");
        assert_eq!(payload.content, "There are 3 R's.");
        assert_eq!(payload.next_action, None);
    }

    #[test]
    fn final_reply_ignores_unknown_next_action() {
        for next_action in [r#""none""#, r#""done""#, r#""""#, "7", "null"] {
            let raw = format!(
                r#"{{"title":"Final Answer","content":"There are 3 R's.","next_action":{next_action}}}"#
            );
            let payload = parse_payload(&raw, true).expect("final reply accepted");
            assert_eq!(payload.content, "There are 3 R's.");
            assert_eq!(payload.next_action, None);
        }
    }

    #[test]
    fn final_reply_requires_content() {
        let err = parse_payload(r#"{"title":"Final Answer"}"#, true).unwrap_err();
        assert!(err.to_string().contains("content"));
    }

    #[test]
    fn non_json_is_malformed() {
        let err = parse_payload("Sure! The answer is 3.", false).unwrap_err();
        assert!(err.to_string().starts_with("malformed response: invalid json"));
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        let err = parse_payload(r#"{"title":1,"content":"c"}"#, true).unwrap_err();
        assert!(matches!(err, CallError::MalformedResponse(_)));
    }
}
