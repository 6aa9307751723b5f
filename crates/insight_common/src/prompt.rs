//! Prompts for the reasoning backend.

use crate::telemetry::TelemetrySnapshot;
use crate::trend::TrendContext;

/// System prompt: fixes the role and the two-field answer contract.
pub const SYSTEM_PROMPT: &str = "\
You are the diagnostic core of a live system-health monitor. You receive one \
telemetry snapshot and a short trend framing. Identify the single most \
important problem and the single most useful next action.

Rules:
- Answer with ONE JSON object and nothing else.
- The object has exactly two keys: \"alert\" and \"recommendation\".
- \"alert\" is a short label (max 6 words) or null when nothing is wrong.
- \"recommendation\" is one imperative sentence or null.";

/// Schema reminder appended to the user prompt.
pub const RESPONSE_SCHEMA: &str = r#"{"alert": string | null, "recommendation": string | null}"#;

/// Build the user prompt for one request.
pub fn build_user_prompt(snapshot: &TelemetrySnapshot, context: TrendContext) -> String {
    format!(
        "{}\n\nTelemetry snapshot:\n{}\n\nRespond with JSON matching:\n{}",
        context.message(),
        snapshot.to_prompt_json(),
        RESPONSE_SCHEMA
    )
}
