//! Corpus structurer: plain legal-code text → ordered [`SectionRecord`]s.
//!
//! The scan is a single forward pass over the lines of the document. Each
//! line is classified on its own by [`classify_line`]:
//!
//! | Kind | Example |
//! |------|---------|
//! | [`LineKind::Chapter`] | `CHAPTER XVI Of Offences Affecting the Human Body`, `CHAPTER VIIA ...` |
//! | [`LineKind::Section`] | `Section 365. Kidnapping`, `§ 12 Title`, `12. Title`, `365A. Title` |
//! | [`LineKind::Body`] | anything else |
//!
//! A section heading opens a record under the current chapter; body lines
//! accumulate until the next chapter or section heading. Records whose body
//! ends up empty are dropped.
//!
//! Heading detection is deliberately permissive and has no cross-line
//! validation. A real heading the patterns miss is folded into the previous
//! section's body, and a body line that happens to look like a heading opens
//! a spurious section. Both are data-quality limits of the source text, so
//! they are not reported as errors.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::SectionRecord;

static CHAPTER_RE: OnceLock<Regex> = OnceLock::new();
static LABELLED_SECTION_RE: OnceLock<Regex> = OnceLock::new();
static BARE_SECTION_RE: OnceLock<Regex> = OnceLock::new();

/// Chapter assigned to sections that appear before any chapter heading.
pub const UNKNOWN_CHAPTER: &str = "0";
pub const UNKNOWN_CHAPTER_TITLE: &str = "Unknown";

fn chapter_re() -> &'static Regex {
    CHAPTER_RE.get_or_init(|| {
        Regex::new(r"(?i)^chapter\s+([ivxlcdm]+[a-z]?|\d+[a-z]?)\b[\s:.\-–]*(.*)$")
            .expect("chapter heading pattern")
    })
}

fn labelled_section_re() -> &'static Regex {
    LABELLED_SECTION_RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:section|sec\.|s\.|§)\s*(\d+)([a-z]{0,2})\b[\s:.\-–]*(.*)$")
            .expect("labelled section heading pattern")
    })
}

fn bare_section_re() -> &'static Regex {
    BARE_SECTION_RE.get_or_init(|| {
        Regex::new(r"^(\d+)([A-Za-z]{0,2})\.\s+(\S.*)$").expect("bare section heading pattern")
    })
}

/// Classification of a single (trimmed) line of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Chapter { number: &'a str, title: &'a str },
    /// `suffix` is the letter part of an inserted section number such as
    /// `365A`; the record keeps only the integer part as its number.
    Section {
        number: u32,
        suffix: &'a str,
        title: &'a str,
    },
    Body(&'a str),
}

/// Classify one line. Chapter headings win over section headings; lines
/// matching neither are [`LineKind::Body`].
pub fn classify_line(line: &str) -> LineKind<'_> {
    let line = line.trim();

    if let Some(caps) = chapter_re().captures(line) {
        let number = caps.get(1).map_or("", |m| m.as_str());
        let title = caps.get(2).map_or("", |m| m.as_str().trim());
        return LineKind::Chapter { number, title };
    }

    let caps = labelled_section_re()
        .captures(line)
        .or_else(|| bare_section_re().captures(line));

    if let Some(caps) = caps {
        let number = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|n| *n > 0);
        if let Some(number) = number {
            let suffix = caps.get(2).map_or("", |m| m.as_str());
            let title = caps.get(3).map_or("", |m| m.as_str().trim());
            return LineKind::Section {
                number,
                suffix,
                title,
            };
        }
    }

    LineKind::Body(line)
}

/// Chapter heading in effect while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChapterContext {
    chapter: String,
    chapter_title: String,
}

impl Default for ChapterContext {
    fn default() -> Self {
        Self {
            chapter: UNKNOWN_CHAPTER.to_string(),
            chapter_title: UNKNOWN_CHAPTER_TITLE.to_string(),
        }
    }
}

/// Section being accumulated.
struct OpenSection {
    context: ChapterContext,
    number: u32,
    title: String,
    body: Vec<String>,
}

impl OpenSection {
    fn close(self) -> Option<SectionRecord> {
        let body = normalize_whitespace(&self.body.join(" "));
        if body.is_empty() {
            return None;
        }
        Some(SectionRecord {
            chapter: self.context.chapter,
            chapter_title: self.context.chapter_title,
            section_number: self.number,
            section_title: normalize_whitespace(&self.title),
            section_body: body,
        })
    }
}

/// Parse the full text of a legal code into section records, in document
/// order. Never fails; an input with no recognizable section headings
/// yields an empty vector.
pub fn parse_sections(text: &str) -> Vec<SectionRecord> {
    let mut records = Vec::new();
    let mut context = ChapterContext::default();
    let mut open: Option<OpenSection> = None;

    for raw in text.lines() {
        match classify_line(raw) {
            LineKind::Chapter { number, title } => {
                records.extend(open.take().and_then(OpenSection::close));
                context = ChapterContext {
                    chapter: number.to_string(),
                    chapter_title: normalize_whitespace(title),
                };
            }
            LineKind::Section {
                number,
                suffix,
                title,
            } => {
                records.extend(open.take().and_then(OpenSection::close));
                open = Some(OpenSection {
                    context: context.clone(),
                    number,
                    title: lettered_title(suffix, title),
                    body: Vec::new(),
                });
            }
            LineKind::Body(line) => {
                // Preamble before the first section is not part of any record.
                if let Some(section) = open.as_mut() {
                    if !line.is_empty() {
                        section.body.push(line.to_string());
                    }
                }
            }
        }
    }

    records.extend(open.take().and_then(OpenSection::close));
    records
}

/// Non-fatal conditions found while structuring a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusWarning {
    /// No section heading matched anywhere in the text.
    EmptyCorpus,
}

impl std::fmt::Display for CorpusWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorpusWarning::EmptyCorpus => write!(f, "no sections found"),
        }
    }
}

/// Records plus the warnings the caller has to decide about.
#[derive(Debug, Clone)]
pub struct StructureReport {
    pub records: Vec<SectionRecord>,
    pub warnings: Vec<CorpusWarning>,
}

impl StructureReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// [`parse_sections`] with the empty-corpus condition surfaced explicitly.
pub fn structure_text(text: &str) -> StructureReport {
    let records = parse_sections(text);
    let mut warnings = Vec::new();
    if records.is_empty() {
        warnings.push(CorpusWarning::EmptyCorpus);
    }
    StructureReport { records, warnings }
}

/// `365A. Acts of gross indecency` is stored as section 365 titled
/// `A. Acts of gross indecency`, so the letter stays searchable.
fn lettered_title(suffix: &str, title: &str) -> String {
    match (suffix.is_empty(), title.is_empty()) {
        (true, _) => title.to_string(),
        (false, true) => suffix.to_string(),
        (false, false) => format!("{}. {}", suffix, title),
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "CHAPTER I General\nSection 1. Short title\nThis Code may be called the Penal Code.\nSection 2. Punishment\nEvery person liable shall be punished.";

    #[test]
    fn sample_yields_two_records() {
        let records = parse_sections(SAMPLE);
        assert_eq!(
            records,
            vec![
                SectionRecord {
                    chapter: "I".into(),
                    chapter_title: "General".into(),
                    section_number: 1,
                    section_title: "Short title".into(),
                    section_body: "This Code may be called the Penal Code.".into(),
                },
                SectionRecord {
                    chapter: "I".into(),
                    chapter_title: "General".into(),
                    section_number: 2,
                    section_title: "Punishment".into(),
                    section_body: "Every person liable shall be punished.".into(),
                },
            ]
        );
    }

    #[test]
    fn classify_chapter_variants() {
        assert_eq!(
            classify_line("CHAPTER XVI Of Offences Affecting the Human Body"),
            LineKind::Chapter {
                number: "XVI",
                title: "Of Offences Affecting the Human Body"
            }
        );
        assert_eq!(
            classify_line("Chapter 4: Exceptions"),
            LineKind::Chapter {
                number: "4",
                title: "Exceptions"
            }
        );
        assert_eq!(
            classify_line("  CHAPTER IV  "),
            LineKind::Chapter {
                number: "IV",
                title: ""
            }
        );
    }

    #[test]
    fn classify_section_variants() {
        assert_eq!(
            classify_line("Section 365. Kidnapping"),
            LineKind::Section {
                number: 365,
                suffix: "",
                title: "Kidnapping"
            }
        );
        assert_eq!(
            classify_line("§ 12 Definitions"),
            LineKind::Section {
                number: 12,
                suffix: "",
                title: "Definitions"
            }
        );
        assert_eq!(
            classify_line("SECTION 7: Territorial extent"),
            LineKind::Section {
                number: 7,
                suffix: "",
                title: "Territorial extent"
            }
        );
        assert_eq!(
            classify_line("44. Injury"),
            LineKind::Section {
                number: 44,
                suffix: "",
                title: "Injury"
            }
        );
    }

    #[test]
    fn classify_lettered_numbers() {
        assert_eq!(
            classify_line("Section 365A. Acts of gross indecency"),
            LineKind::Section {
                number: 365,
                suffix: "A",
                title: "Acts of gross indecency"
            }
        );
        assert_eq!(
            classify_line("90A. Definitions"),
            LineKind::Section {
                number: 90,
                suffix: "A",
                title: "Definitions"
            }
        );
        assert_eq!(
            classify_line("CHAPTER VIIA Offences relating to elections"),
            LineKind::Chapter {
                number: "VIIA",
                title: "Offences relating to elections"
            }
        );
        assert_eq!(
            classify_line("Chapter 12B: Transitional"),
            LineKind::Chapter {
                number: "12B",
                title: "Transitional"
            }
        );
    }

    #[test]
    fn lettered_headings_open_their_own_records() {
        let text = "CHAPTER XVI Of Offences Affecting the Human Body\n\
                    Section 365. Unnatural offences\n\
                    Whoever voluntarily has carnal intercourse shall be punished.\n\
                    Section 365A. Acts of gross indecency\n\
                    Any person who commits an act of gross indecency shall be guilty of an offence.\n\
                    CHAPTER VIIA Offences relating to elections\n\
                    Section 90A. Definitions\n\
                    Election means an election.";
        let records = parse_sections(text);
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].section_number, 365);
        assert_eq!(records[0].section_title, "Unnatural offences");
        assert_eq!(
            records[0].section_body,
            "Whoever voluntarily has carnal intercourse shall be punished."
        );

        assert_eq!(records[1].chapter, "XVI");
        assert_eq!(records[1].section_number, 365);
        assert_eq!(records[1].section_title, "A. Acts of gross indecency");

        assert_eq!(records[2].chapter, "VIIA");
        assert_eq!(records[2].chapter_title, "Offences relating to elections");
        assert_eq!(records[2].section_number, 90);
        assert_eq!(records[2].section_title, "A. Definitions");
        assert_eq!(records[2].section_body, "Election means an election.");
    }

    #[test]
    fn ordinary_lines_are_body() {
        assert_eq!(
            classify_line("This Code may be called the Penal Code."),
            LineKind::Body("This Code may be called the Penal Code.")
        );
        assert_eq!(classify_line("Chapters follow"), LineKind::Body("Chapters follow"));
        assert_eq!(classify_line("1.5 grams"), LineKind::Body("1.5 grams"));
        assert_eq!(classify_line(""), LineKind::Body(""));
    }

    #[test]
    fn zero_or_overflowing_section_number_is_body() {
        assert!(matches!(classify_line("Section 0. Nothing"), LineKind::Body(_)));
        assert!(matches!(
            classify_line("Section 99999999999. Huge"),
            LineKind::Body(_)
        ));
    }

    #[test]
    fn heading_followed_by_heading_is_dropped() {
        let text = "CHAPTER II Punishments\nSection 52. Punishments\nSection 53. Kinds of punishment\nThe punishments are death and imprisonment.";
        let records = parse_sections(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].section_number, 53);
        assert!(records.iter().all(|r| !r.section_body.is_empty()));
    }

    #[test]
    fn chapter_boundary_closes_section_and_updates_context() {
        let text = "CHAPTER I General\nSection 1. Title\nBody one.\nCHAPTER II Definitions\nSection 2. Gender\nBody two.";
        let records = parse_sections(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chapter, "I");
        assert_eq!(records[0].section_body, "Body one.");
        assert_eq!(records[1].chapter, "II");
        assert_eq!(records[1].chapter_title, "Definitions");
    }

    #[test]
    fn body_lines_are_joined_and_normalized() {
        let text = "Section 3. Offences\n  Every person shall be\n\n   liable   to punishment\n\tunder this Code.  ";
        let records = parse_sections(text);
        assert_eq!(
            records[0].section_body,
            "Every person shall be liable to punishment under this Code."
        );
    }

    #[test]
    fn sections_before_any_chapter_use_unknown_context() {
        let records = parse_sections("Section 1. Preliminary\nText.");
        assert_eq!(records[0].chapter, UNKNOWN_CHAPTER);
        assert_eq!(records[0].chapter_title, UNKNOWN_CHAPTER_TITLE);
    }

    #[test]
    fn preamble_is_ignored() {
        let text = "AN ORDINANCE TO PROVIDE A GENERAL PENAL CODE\nSection 1. Title\nBody.";
        let records = parse_sections(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].section_body, "Body.");
    }

    #[test]
    fn unrecognized_heading_folds_into_previous_body() {
        let text = "Section 1. First\nBody one.\nArt. 2 Second\nBody two.";
        let records = parse_sections(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].section_body, "Body one. Art. 2 Second Body two.");
    }

    #[test]
    fn n_headings_yield_n_records_in_order() {
        let text: String = (1..=25)
            .map(|n| format!("Section {n}. Title {n}\nBody of section {n}.\n"))
            .collect();
        let records = parse_sections(&text);
        assert_eq!(records.len(), 25);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.section_number as usize, i + 1);
            assert_eq!(r.section_body, format!("Body of section {}.", i + 1));
        }
    }

    #[test]
    fn duplicate_numbers_are_kept() {
        let text = "Section 5. A\nFirst.\nSection 5. B\nSecond.";
        let records = parse_sections(text);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.section_number == 5));
    }

    #[test]
    fn no_headings_reports_empty_corpus() {
        let report = structure_text("Just some prose.\nWith no headings.");
        assert!(report.is_empty());
        assert_eq!(report.warnings, vec![CorpusWarning::EmptyCorpus]);

        let report = structure_text(SAMPLE);
        assert!(report.warnings.is_empty());
        assert_eq!(report.records.len(), 2);
    }
}
