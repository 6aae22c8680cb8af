//! The four AI-backed features: ids, input schemas, output schemas and result types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::schema::{InputField, InputRule, OutputField};

/// Minimum length of free-text questionnaire answers.
pub const MIN_FREE_TEXT_CHARS: usize = 10;

/// Seasons offered by the content compass form.
pub const SEASONS: &[&str] = &["Spring", "Summer", "Autumn", "Winter"];

/// Mood presets offered by the content compass form. Free text is also accepted.
pub const COMPASS_MOODS: &[&str] = &[
    "Early summer calm",
    "Deep creative energy",
    "Quietly reflective",
    "Playful and bright",
    "Focused and grounded",
];

/// Platform presets offered by the content compass form. Free text is also accepted.
pub const PLATFORMS: &[&str] = &["Instagram", "X (Twitter)", "LinkedIn"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    StyleInsight,
    IdentityAlignment,
    ContentCompass,
    OutfitVisualizer,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown analysis feature '{0}'")]
pub struct UnknownFeature(pub String);

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::StyleInsight,
        Feature::IdentityAlignment,
        Feature::ContentCompass,
        Feature::OutfitVisualizer,
    ];

    /// Kebab-case id used in routes and logs.
    pub fn id(&self) -> &'static str {
        match self {
            Feature::StyleInsight => "style-insight",
            Feature::IdentityAlignment => "identity-alignment",
            Feature::ContentCompass => "content-compass",
            Feature::OutfitVisualizer => "outfit-visualizer",
        }
    }

    pub fn input_fields(&self) -> &'static [InputField] {
        match self {
            Feature::StyleInsight | Feature::OutfitVisualizer => PHOTO_INPUT,
            Feature::IdentityAlignment => ALIGNMENT_INPUT,
            Feature::ContentCompass => COMPASS_INPUT,
        }
    }

    /// Fields the provider's structured answer must carry. For the outfit
    /// visualizer this is the garment-identification call only.
    pub fn output_fields(&self) -> &'static [OutputField] {
        match self {
            Feature::StyleInsight => STYLE_INSIGHT_OUTPUT,
            Feature::IdentityAlignment => ALIGNMENT_OUTPUT,
            Feature::ContentCompass => COMPASS_OUTPUT,
            Feature::OutfitVisualizer => GARMENT_IDENTIFICATION_OUTPUT,
        }
    }

    /// Short user-facing message for provider and schema failures.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Feature::StyleInsight => "Failed to analyze style.",
            Feature::IdentityAlignment => "Failed to run alignment check.",
            Feature::ContentCompass => "Failed to get content suggestions.",
            Feature::OutfitVisualizer => "Failed to visualize outfit.",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Feature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|f| f.id() == s)
            .ok_or_else(|| UnknownFeature(s.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Input schemas
// ────────────────────────────────────────────────────────────────────────────

pub const PHOTO_DATA_URI: &str = "photoDataUri";

const PHOTO_INPUT: &[InputField] = &[InputField {
    name: PHOTO_DATA_URI,
    rule: InputRule::ImageDataUri,
}];

const ALIGNMENT_INPUT: &[InputField] = &[
    InputField {
        name: "questionnaireResponses",
        rule: InputRule::MinChars(MIN_FREE_TEXT_CHARS),
    },
    InputField {
        name: "contentExamples",
        rule: InputRule::MinChars(MIN_FREE_TEXT_CHARS),
    },
];

const COMPASS_INPUT: &[InputField] = &[
    InputField {
        name: "currentSeason",
        rule: InputRule::OneOf(SEASONS),
    },
    InputField {
        name: "mood",
        rule: InputRule::Required,
    },
    InputField {
        name: "platform",
        rule: InputRule::Required,
    },
];

// ────────────────────────────────────────────────────────────────────────────
// Output schemas
// ────────────────────────────────────────────────────────────────────────────

const STYLE_INSIGHT_OUTPUT: &[OutputField] = &[
    OutputField::text_list(
        "visualClusters",
        "Visual clusters identified in the image (e.g. earthy, bold, minimalist).",
    ),
    OutputField::text_list(
        "thematicTags",
        "Thematic tags associated with the image (e.g. grounded, surreal, early summer calm).",
    ),
];

const ALIGNMENT_OUTPUT: &[OutputField] = &[
    OutputField::score(
        "alignmentScore",
        0,
        100,
        "Whole-number score (0-100) for how well the content matches the expressed mood.",
    ),
    OutputField::text(
        "feedback",
        "Qualitative feedback on the alignment, suggesting areas for improvement.",
    ),
];

const COMPASS_OUTPUT: &[OutputField] = &[
    OutputField::text("theme", "A suggested content theme based on the season and mood."),
    OutputField::text(
        "postStructure",
        "A soft-focus post structure suggestion for the specified platform.",
    ),
];

const GARMENT_FIELDS: &[OutputField] =
    &[OutputField::text("label", "A semantic label for the fashion item.")];

const GARMENT_IDENTIFICATION_OUTPUT: &[OutputField] = &[
    OutputField::object_list(
        "identifiedItems",
        GARMENT_FIELDS,
        "The fashion items identified in the photo.",
    ),
    OutputField::text(
        "overallStyleDescription",
        "A description of the overall style of the outfit.",
    ),
];

// ────────────────────────────────────────────────────────────────────────────
// Result types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleInsight {
    pub visual_clusters: Vec<String>,
    pub thematic_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentReport {
    pub alignment_score: u8,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSuggestion {
    pub theme: String,
    pub post_structure: String,
}

/// One garment as labelled by the identification call, before image generation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GarmentLabel {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarmentIdentification {
    pub identified_items: Vec<GarmentLabel>,
    pub overall_style_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitItem {
    pub label: String,
    /// `data:` URL of the generated image, or empty if generation failed.
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitVisualization {
    pub identified_items: Vec<OutfitItem>,
    pub overall_style_description: String,
}

/// Validated output of any feature. Serializes as the bare feature payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnalysisData {
    StyleInsight(StyleInsight),
    Alignment(AlignmentReport),
    ContentCompass(ContentSuggestion),
    Outfit(OutfitVisualization),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::schema::{response_schema, validate_output};
    use serde_json::json;

    #[test]
    fn test_feature_ids_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(feature.id().parse::<Feature>().unwrap(), feature);
        }
    }

    #[test]
    fn test_unknown_feature_id() {
        assert_eq!(
            "horoscope".parse::<Feature>(),
            Err(UnknownFeature("horoscope".to_string()))
        );
    }

    #[test]
    fn test_failure_messages_are_distinct() {
        let messages: std::collections::HashSet<_> =
            Feature::ALL.iter().map(|f| f.failure_message()).collect();
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn test_alignment_schema_accepts_integer_score() {
        let value = json!({"alignmentScore": 82, "feedback": "Strong connection to calm."});
        assert!(validate_output(&value, Feature::IdentityAlignment.output_fields()).is_ok());
        let report: AlignmentReport = serde_json::from_value(value).unwrap();
        assert_eq!(report.alignment_score, 82);
    }

    #[test]
    fn test_outfit_identification_schema_needs_labels() {
        let value = json!({
            "identifiedItems": [{"label": "loafers"}, {"imageUrl": ""}],
            "overallStyleDescription": "Relaxed tailoring"
        });
        let err = validate_output(&value, Feature::OutfitVisualizer.output_fields()).unwrap_err();
        assert_eq!(err.path, "$.identifiedItems[1].label");
    }

    #[test]
    fn test_style_insight_response_schema_lists_both_fields() {
        let schema = response_schema(Feature::StyleInsight.output_fields());
        assert_eq!(schema["required"], json!(["visualClusters", "thematicTags"]));
    }

    #[test]
    fn test_analysis_data_serializes_untagged_camel_case() {
        let data = AnalysisData::ContentCompass(ContentSuggestion {
            theme: "Dopamine Dressing".to_string(),
            post_structure: "Carousel of three looks".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({"theme": "Dopamine Dressing", "postStructure": "Carousel of three looks"})
        );
    }
}
