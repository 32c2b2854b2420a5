//! Core data models used throughout the structurer and the index.
//!
//! [`SectionRecord`] is what the structurer emits and what the corpus file
//! stores; [`IndexEntry`] is what a collection persists; [`SectionHit`] is
//! what a query returns.

use serde::{Deserialize, Deserializer, Serialize};

/// One statutory section, as extracted from the source document.
///
/// Serialized with the corpus file's field names: `chapter`,
/// `chapter_title`, `Section`, `section_title`, `section_desc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    #[serde(deserialize_with = "chapter_from_string_or_number")]
    pub chapter: String,
    pub chapter_title: String,
    #[serde(rename = "Section")]
    pub section_number: u32,
    pub section_title: String,
    #[serde(rename = "section_desc")]
    pub section_body: String,
}

impl SectionRecord {
    /// Text that gets embedded and returned to callers:
    /// `"Section {n}: {title}"`, a blank line, then the body.
    pub fn display_text(&self) -> String {
        format!(
            "Section {}: {}\n\n{}",
            self.section_number, self.section_title, self.section_body
        )
    }

    pub fn metadata(&self) -> SectionMetadata {
        SectionMetadata {
            chapter: self.chapter.clone(),
            chapter_title: self.chapter_title.clone(),
            section_number: self.section_number,
            section_title: self.section_title.clone(),
        }
    }
}

/// Hand-edited corpus files sometimes carry the chapter as a bare number.
fn chapter_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Chapter {
        Text(String),
        Number(i64),
    }

    Ok(match Chapter::deserialize(deserializer)? {
        Chapter::Text(s) => s,
        Chapter::Number(n) => n.to_string(),
    })
}

/// Attribution metadata stored alongside every index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionMetadata {
    pub chapter: String,
    pub chapter_title: String,
    pub section_number: u32,
    pub section_title: String,
}

/// A persisted unit of a collection: one embedded section.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    /// Document-order position within the collection; breaks score ties.
    pub position: i64,
    pub metadata: SectionMetadata,
    /// Display text (header + body).
    pub content: String,
    pub content_hash: String,
    pub embedding: Vec<f32>,
}

/// Bookkeeping row for a built collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub provider: String,
    pub model: String,
    pub dims: usize,
    pub entry_count: i64,
    pub corpus_hash: String,
    pub built_at: i64,
}

/// A ranked query result, shaped for the retrieval tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionHit {
    #[serde(rename = "section")]
    pub section_number: u32,
    pub section_title: String,
    pub chapter: String,
    pub chapter_title: String,
    /// Display text of the matched entry.
    pub content: String,
    /// Cosine similarity to the query; larger is closer.
    pub score: f64,
}

impl SectionHit {
    pub fn metadata(&self) -> SectionMetadata {
        SectionMetadata {
            chapter: self.chapter.clone(),
            chapter_title: self.chapter_title.clone(),
            section_number: self.section_number,
            section_title: self.section_title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SectionRecord {
        SectionRecord {
            chapter: "XVI".into(),
            chapter_title: "Of Offences Affecting the Human Body".into(),
            section_number: 365,
            section_title: "Kidnapping or abducting with intent to murder".into(),
            section_body: "Whoever kidnaps or abducts any person shall be punished.".into(),
        }
    }

    #[test]
    fn serializes_with_corpus_field_names() {
        let json = serde_json::to_value(record()).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["Section", "chapter", "chapter_title", "section_desc", "section_title"]
        );
        assert_eq!(obj["Section"], serde_json::json!(365));
        assert_eq!(obj["chapter"], serde_json::json!("XVI"));
    }

    #[test]
    fn numeric_chapter_is_read_as_text() {
        let json = r#"{"chapter": 0, "chapter_title": "Unknown", "Section": 4,
                       "section_title": "Extension", "section_desc": "Body."}"#;
        let rec: SectionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.chapter, "0");
        assert_eq!(rec.section_number, 4);
    }

    #[test]
    fn display_text_has_header_and_blank_line() {
        let rec = SectionRecord {
            chapter: "I".into(),
            chapter_title: "General".into(),
            section_number: 2,
            section_title: "Punishment".into(),
            section_body: "Every person liable shall be punished.".into(),
        };
        assert_eq!(
            rec.display_text(),
            "Section 2: Punishment\n\nEvery person liable shall be punished."
        );
    }

    #[test]
    fn hit_serializes_section_key() {
        let hit = SectionHit {
            section_number: 2,
            section_title: "Punishment".into(),
            chapter: "I".into(),
            chapter_title: "General".into(),
            content: "Section 2: Punishment".into(),
            score: 0.5,
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["section"], serde_json::json!(2));
        assert!(json.get("section_number").is_none());
    }
}
