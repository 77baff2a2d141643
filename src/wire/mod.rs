use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// ========================================
/// Domain records
/// ========================================

/// One generated object/prompt/keywords record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    /// SEO-style display title.
    pub object: String,
    /// Fully composed image-generation instruction.
    pub prompt: String,
    /// Absent or `null` both read as an empty list.
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

fn null_as_empty<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(d)?.unwrap_or_default())
}

/// Fixed generation profiles. Every constant the model sees is tied to one
/// of these; none of them is user-configurable beyond picking the variant.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Six quick ideas, titles and prompts only.
    Quick,
    /// Thirty ideas themed on events roughly three months out.
    #[default]
    Seasonal,
    /// Seventy evergreen catalog ideas with keywords.
    Catalog,
}

impl Variant {
    pub fn idea_count(self) -> usize {
        match self {
            Variant::Quick => 6,
            Variant::Seasonal => 30,
            Variant::Catalog => 70,
        }
    }

    pub fn temperature(self) -> f32 {
        match self {
            Variant::Quick => 0.9,
            Variant::Seasonal => 0.7,
            Variant::Catalog => 0.8,
        }
    }

    pub fn wants_keywords(self) -> bool {
        !matches!(self, Variant::Quick)
    }

    pub fn uses_target_date(self) -> bool {
        matches!(self, Variant::Seasonal)
    }

    pub fn name(self) -> &'static str {
        match self {
            Variant::Quick => "quick",
            Variant::Seasonal => "seasonal",
            Variant::Catalog => "catalog",
        }
    }
}

/// Exact keyword count asked of the model in keyword variants.
pub const KEYWORD_COUNT: usize = 25;
/// Keywords every keyword list must contain.
pub const MANDATORY_KEYWORDS: [&str; 2] = ["png", "transparent background"];
/// Suffix carried by exactly half of the titles.
pub const TITLE_SUFFIX: &str = ", on transparent background";

/// Built fresh for each generation; never persisted.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub variant: Variant,
    pub excluded_labels: BTreeSet<String>,
    pub temperature: f32,
    pub target_date: Option<NaiveDate>,
}

/// ========================================
/// Gemini generateContent wire protocol
/// ========================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate; empty when the model
    /// produced nothing.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}
