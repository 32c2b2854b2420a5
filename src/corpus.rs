//! The intermediate corpus file between the structurer and the builder.
//!
//! A pretty-printed JSON array of [`SectionRecord`]s. Loading and saving are
//! exact inverses.

use std::path::Path;

use anyhow::Result;

use crate::config::Config;
use crate::error::IndexError;
use crate::extract;
use crate::models::SectionRecord;
use crate::structure::{self, CorpusWarning};

/// Characters of extracted text shown when no sections were recognized.
const EMPTY_CORPUS_EXCERPT: usize = 500;

pub fn to_json(records: &[SectionRecord]) -> Result<String> {
    serde_json::to_string_pretty(records)
        .map_err(|e| IndexError::Corpus(format!("serialize: {}", e)).into())
}

pub fn from_json(json: &str) -> Result<Vec<SectionRecord>> {
    serde_json::from_str(json).map_err(|e| IndexError::Corpus(format!("parse: {}", e)).into())
}

/// Write the corpus file, creating parent directories as needed.
pub fn save_corpus(path: &Path, records: &[SectionRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, to_json(records)?).map_err(|e| {
        IndexError::Corpus(format!("write {}: {}", path.display(), e))
    })?;
    Ok(())
}

pub fn load_corpus(path: &Path) -> Result<Vec<SectionRecord>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| IndexError::Corpus(format!("read {}: {}", path.display(), e)))?;
    from_json(&json)
}

/// Print the first `n` records for a quick visual check of the patterns.
pub fn print_preview(records: &[SectionRecord], n: usize) {
    println!("preview");
    for (i, r) in records.iter().take(n).enumerate() {
        println!("  {}. chapter {}: {}", i + 1, r.chapter, r.chapter_title);
        println!("     section {}: {}", r.section_number, r.section_title);
        let excerpt: String = r.section_body.chars().take(200).collect();
        if excerpt.len() < r.section_body.len() {
            println!("     {}...", excerpt);
        } else {
            println!("     {}", excerpt);
        }
    }
}

fn print_empty_corpus_help(text: &str) {
    eprintln!("Warning: no sections found in the extracted text.");
    eprintln!("  - check that headings look like \"CHAPTER IV ...\" and \"Section 12. ...\" (or \"12. ...\")");
    eprintln!("  - scanned PDFs have no text layer; run OCR first");
    eprintln!("  - multi-column layouts may interleave lines; try a plain-text export");
    eprintln!();
    let excerpt: String = text.chars().take(EMPTY_CORPUS_EXCERPT).collect();
    eprintln!("First {} characters of extracted text:", EMPTY_CORPUS_EXCERPT);
    eprintln!("{}", excerpt);
}

/// `statute extract`: structure a source document into the corpus file.
pub fn run_extract(
    config: &Config,
    source: &Path,
    out: Option<&Path>,
    preview: usize,
    allow_empty: bool,
) -> Result<()> {
    let out_path = out
        .map(Path::to_path_buf)
        .or_else(|| config.corpus.path.clone())
        .ok_or_else(|| {
            IndexError::Configuration(
                "no output file given (pass --out or set corpus.path / STATUTE_CORPUS_PATH)".into(),
            )
        })?;

    let text = extract::read_source(source)?;
    let report = structure::structure_text(&text);

    for warning in &report.warnings {
        match warning {
            CorpusWarning::EmptyCorpus => print_empty_corpus_help(&text),
        }
    }
    if report.is_empty() && !allow_empty {
        return Err(IndexError::Corpus(format!(
            "no sections recognized in {}; rerun with --allow-empty to write an empty corpus",
            source.display()
        ))
        .into());
    }

    save_corpus(&out_path, &report.records)?;

    println!("extract {}", source.display());
    println!("  characters: {}", text.chars().count());
    println!("  sections: {}", report.records.len());
    println!("  written: {}", out_path.display());
    if preview > 0 && !report.records.is_empty() {
        println!();
        print_preview(&report.records, preview);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<SectionRecord> {
        vec![
            SectionRecord {
                chapter: "I".into(),
                chapter_title: "General".into(),
                section_number: 1,
                section_title: "Short title".into(),
                section_body: "This Code may be called the Penal Code.".into(),
            },
            SectionRecord {
                chapter: "XVI".into(),
                chapter_title: "Of Offences Affecting the Human Body".into(),
                section_number: 365,
                section_title: "Kidnapping — with intent".into(),
                section_body: "Whoever kidnaps \"any person\" shall be punished.".into(),
            },
        ]
    }

    #[test]
    fn file_roundtrip_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("slpc.json");
        save_corpus(&path, &records()).unwrap();
        assert_eq!(load_corpus(&path).unwrap(), records());
    }

    #[test]
    fn empty_corpus_roundtrips() {
        let json = to_json(&[]).unwrap();
        assert!(from_json(&json).unwrap().is_empty());
    }

    #[test]
    fn malformed_file_is_corpus_error() {
        let err = from_json(r#"[{"chapter": "I"}]"#).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::Corpus(_))
        ));
    }

    #[test]
    fn missing_file_is_corpus_error() {
        let err = load_corpus(Path::new("/nonexistent/slpc.json")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::Corpus(_))
        ));
    }

    #[test]
    fn extract_writes_corpus_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("code.txt");
        std::fs::write(
            &source,
            "CHAPTER I General\nSection 1. Short title\nThis Code may be called the Penal Code.\n",
        )
        .unwrap();
        let out = dir.path().join("out").join("slpc.json");
        run_extract(&Config::default(), &source, Some(&out), 0, false).unwrap();
        let records = load_corpus(&out).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].chapter, "I");
    }

    #[test]
    fn extract_refuses_empty_corpus_unless_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        std::fs::write(&source, "nothing that looks like a heading\n").unwrap();
        let out = dir.path().join("slpc.json");

        let err = run_extract(&Config::default(), &source, Some(&out), 0, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::Corpus(_))
        ));
        assert!(!out.exists());

        run_extract(&Config::default(), &source, Some(&out), 0, true).unwrap();
        assert!(load_corpus(&out).unwrap().is_empty());
    }

    #[test]
    fn extract_needs_an_output_path() {
        let err = run_extract(&Config::default(), Path::new("x.txt"), None, 0, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::Configuration(_))
        ));
    }
}
