//! Document chunking and content fingerprinting.
//!
//! [`chunk_markdown`] splits a document into heading-delimited sections;
//! [`fingerprint`] produces the digest the sync engine compares to detect
//! content drift. Fingerprints are for equality testing only.

use sha2::{Digest, Sha256};

/// Reserved heading for text that appears before the first `##` heading.
pub const PREAMBLE_HEADING: &str = "preamble";

/// Sections shorter than this (trimmed, in chars) are discarded.
const MIN_SECTION_CHARS: usize = 20;

/// One heading-delimited section of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub text: String,
}

/// Split a document into sections at level-2 (`##`) headings.
///
/// Text before the first heading goes under [`PREAMBLE_HEADING`]. Sections
/// whose trimmed body is 20 characters or fewer are dropped. Source order is
/// preserved and duplicate headings are kept as-is; when two headings
/// collide, the later section overwrites the earlier logical key at sync
/// time.
pub fn chunk_markdown(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut heading = PREAMBLE_HEADING.to_string();
    let mut lines: Vec<&str> = Vec::new();

    for line in content.lines() {
        if let Some(next_heading) = parse_heading(line) {
            flush(&mut sections, &heading, &lines);
            heading = next_heading.to_string();
            lines.clear();
        } else {
            lines.push(line);
        }
    }
    flush(&mut sections, &heading, &lines);

    sections
}

/// Match a level-2 heading: `##` followed by whitespace and a non-empty
/// title. Deeper headings (`###`) accumulate as body text.
fn parse_heading(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("##")?;
    if rest.starts_with('#') {
        return None;
    }
    let title = rest.trim();
    if rest.starts_with(char::is_whitespace) && !title.is_empty() {
        Some(title)
    } else {
        None
    }
}

fn flush(sections: &mut Vec<Section>, heading: &str, lines: &[&str]) {
    if lines.is_empty() {
        return;
    }
    let text = lines.join("\n").trim().to_string();
    if text.chars().count() > MIN_SECTION_CHARS {
        sections.push(Section {
            heading: heading.to_string(),
            text,
        });
    }
}

/// Deterministic content digest: SHA-256 hex truncated to 16 characters.
/// Equal iff the inputs are byte-identical; stable across runs and platforms.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = String::with_capacity(16);
    for byte in &digest[..8] {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_no_sections() {
        assert!(chunk_markdown("").is_empty());
    }

    #[test]
    fn preamble_gets_reserved_heading() {
        let doc = "Some opening context that is long enough to keep.\n\n## First\nBody of the first section, also long enough.";
        let sections = chunk_markdown(doc);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading, PREAMBLE_HEADING);
        assert_eq!(sections[1].heading, "First");
    }

    #[test]
    fn short_sections_are_dropped() {
        let doc = "## Tiny\nfifteen chars xx\n\n## Kept\nThis section body is comfortably past the limit.";
        let sections = chunk_markdown(doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "Kept");
    }

    #[test]
    fn document_with_only_short_sections_is_empty() {
        let sections = chunk_markdown("## A\nshort\n## B\nalso short");
        assert!(sections.is_empty());
    }

    #[test]
    fn final_section_is_flushed() {
        let doc = "## Last\nThe final accumulation must be flushed after input ends.";
        let sections = chunk_markdown(doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "Last");
        assert!(sections[0].text.starts_with("The final"));
    }

    #[test]
    fn deeper_headings_stay_in_body() {
        let doc = "## Top\nIntro line for the section body.\n### Nested\nNested lines belong to Top.";
        let sections = chunk_markdown(doc);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].text.contains("### Nested"));
    }

    #[test]
    fn heading_without_space_is_body_text() {
        let doc = "##NotAHeading\nmore of the same body, long enough to keep around.";
        let sections = chunk_markdown(doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, PREAMBLE_HEADING);
    }

    #[test]
    fn duplicate_headings_preserved_in_order() {
        let doc = "## Same\nFirst body, long enough to survive the filter.\n## Same\nSecond body, also long enough to survive.";
        let sections = chunk_markdown(doc);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading, "Same");
        assert_eq!(sections[1].heading, "Same");
        assert!(sections[0].text.starts_with("First"));
        assert!(sections[1].text.starts_with("Second"));
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive() {
        let a = fingerprint("the same content");
        let b = fingerprint("the same content");
        let c = fingerprint("the same content!");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
