//! Read-side projection of a stored resume record.

use crate::records::ResumeRecord;
use serde::Serialize;

const SKILL_CATEGORIES: [&str; 2] = ["Skill", "Product"];
const ORGANIZATION_CATEGORY: &str = "Organization";
const DATE_CATEGORY: &str = "DateTime";

/// Entities bucketed by category, as returned by the insights endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeInsights {
    /// Detected candidate name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Stored summary.
    #[serde(rename = "Summary")]
    pub summary: String,
    /// `Skill` and `Product` entities.
    #[serde(rename = "Skills")]
    pub skills: Vec<String>,
    /// `Organization` entities.
    #[serde(rename = "Organizations")]
    pub organizations: Vec<String>,
    /// `DateTime` entities.
    #[serde(rename = "Dates")]
    pub dates: Vec<String>,
    /// Key phrases, unchanged.
    #[serde(rename = "Key Phrases")]
    pub key_phrases: Vec<String>,
}

impl ResumeInsights {
    /// Reshape a record, preserving entity order within each bucket.
    pub fn from_record(record: ResumeRecord) -> Self {
        let texts_in = |matches: &dyn Fn(&str) -> bool| -> Vec<String> {
            record
                .entities
                .iter()
                .filter(|entity| matches(&entity.category))
                .map(|entity| entity.text.clone())
                .collect()
        };

        let skills = texts_in(&|category| SKILL_CATEGORIES.contains(&category));
        let organizations = texts_in(&|category| category == ORGANIZATION_CATEGORY);
        let dates = texts_in(&|category| category == DATE_CATEGORY);

        Self {
            name: record.name,
            summary: record.summary,
            skills,
            organizations,
            dates,
            key_phrases: record.key_phrases,
        }
    }

    /// Pretty-printed JSON body.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
