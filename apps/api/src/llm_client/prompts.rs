// Shared prompt constants and prompt-building utilities.
// Each feature's own prompt templates live in analysis/prompts.rs.
// This file contains cross-cutting prompt fragments.

/// System instruction fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Builds a system instruction from a role statement plus the JSON-only rule.
pub fn json_system(role: &str) -> String {
    format!("{role} {JSON_ONLY_SYSTEM}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_system_appends_json_rule() {
        let system = json_system("You are a fashion expert.");
        assert!(system.starts_with("You are a fashion expert. "));
        assert!(system.ends_with(JSON_ONLY_SYSTEM));
    }
}
