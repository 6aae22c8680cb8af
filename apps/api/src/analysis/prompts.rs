// All prompt constants for the Analysis module.
// Reuses the JSON-only fragment from llm_client::prompts via `json_system`.
// Templates use `{fieldName}` placeholders matching the request field names.

/// Role statement for the style insight engine.
pub const STYLE_INSIGHT_ROLE: &str = "You are a visual stylist who reads moodboards and outfits.";

/// Style insight prompt. The photo travels as an inline image part.
pub const STYLE_INSIGHT_PROMPT_TEMPLATE: &str = r#"Analyze the style of the attached image. Identify visual clusters and thematic tags that describe the style.

Return a JSON object with this EXACT schema:
{
  "visualClusters": ["earthy", "bold", "minimalist"],
  "thematicTags": ["grounded", "surreal", "early summer calm"]
}

Both fields are lists of short strings."#;

/// Role statement for the identity / expression alignment check.
pub const ALIGNMENT_ROLE: &str =
    "You are an assistant that analyzes the alignment between a person's expressed mood and their content.";

/// Alignment prompt. Replace `{questionnaireResponses}` and `{contentExamples}`.
pub const ALIGNMENT_PROMPT_TEMPLATE: &str = r#"Based on the user's questionnaire responses:
{questionnaireResponses}

And their content examples:
{contentExamples}

Provide an alignment score (0-100) and feedback on how well the content reflects their desired personal expression. Be specific in your feedback. Focus on actionable areas for improvement.

Return a JSON object with this EXACT schema:
{
  "alignmentScore": 82,
  "feedback": "Specific, actionable feedback"
}

`alignmentScore` MUST be a whole number between 0 and 100."#;

/// Role statement for the seasonal content compass.
pub const CONTENT_COMPASS_ROLE: &str = "You are a social media content strategist.";

/// Content compass prompt. Replace `{currentSeason}`, `{mood}` and `{platform}`.
pub const CONTENT_COMPASS_PROMPT_TEMPLATE: &str = r#"Based on the current season, the user's mood, and the social media platform, suggest a content theme and a soft-focus post structure.

Current Season: {currentSeason}
Mood: {mood}
Platform: {platform}

Return a JSON object with this EXACT schema:
{
  "theme": "A suggested content theme",
  "postStructure": "A soft-focus post structure suited to the platform"
}"#;

/// Role statement for outfit garment identification.
pub const OUTFIT_ROLE: &str = "You are a fashion expert.";

/// Outfit identification prompt. The photo travels as an inline image part.
pub const OUTFIT_PROMPT_TEMPLATE: &str = r#"Analyze the attached outfit photo and identify the fashion items, providing a semantic label for each. Also describe the overall style of the outfit.

Return a JSON object with this EXACT schema:
{
  "identifiedItems": [
    {"label": "oversized linen blazer"}
  ],
  "overallStyleDescription": "A description of the overall style"
}"#;

/// Per-garment image prompt. Replace `{label}`.
pub const GARMENT_IMAGE_PROMPT_TEMPLATE: &str = "Generate an image of a neutral, non-gendered virtual model wearing a {label}. \
    Focus on the garment itself, not the model's features. The model should be in a neutral pose.";

/// Substitutes every `{name}` placeholder with its value in a single pass.
///
/// Values are copied through verbatim, so a placeholder inside a value is
/// never expanded. Braces that do not name a known value are left as is.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let known = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match known {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_all_placeholders() {
        let prompt = render(
            CONTENT_COMPASS_PROMPT_TEMPLATE,
            &[
                ("currentSeason", "Autumn"),
                ("mood", "Quietly reflective"),
                ("platform", "Instagram"),
            ],
        );
        assert!(prompt.contains("Current Season: Autumn"));
        assert!(prompt.contains("Mood: Quietly reflective"));
        assert!(prompt.contains("Platform: Instagram"));
        assert!(!prompt.contains("{currentSeason}"));
    }

    #[test]
    fn test_render_leaves_json_braces_alone() {
        let prompt = render(
            ALIGNMENT_PROMPT_TEMPLATE,
            &[
                ("questionnaireResponses", "calm"),
                ("contentExamples", "posts"),
            ],
        );
        assert!(prompt.contains("\"alignmentScore\": 82"));
    }

    #[test]
    fn test_render_does_not_expand_placeholders_inside_values() {
        let prompt = render(
            ALIGNMENT_PROMPT_TEMPLATE,
            &[
                ("questionnaireResponses", "I feel like {contentExamples} today"),
                ("contentExamples", "Moodboard of linen textures"),
            ],
        );
        assert!(prompt.contains("I feel like {contentExamples} today"));
        assert_eq!(prompt.matches("Moodboard of linen textures").count(), 1);
    }

    #[test]
    fn test_render_keeps_unknown_and_unclosed_braces() {
        let prompt = render("a {b} {unknown} {c", &[("b", "B")]);
        assert_eq!(prompt, "a B {unknown} {c");
    }

    #[test]
    fn test_garment_prompt_names_the_label() {
        let prompt = render(GARMENT_IMAGE_PROMPT_TEMPLATE, &[("label", "silk scarf")]);
        assert!(prompt.contains("wearing a silk scarf."));
    }
}
