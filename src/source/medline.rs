//! Parser for the MEDLINE flat-file format returned by Entrez `efetch`.
//!
//! Records are blank-line separated blocks of `TAG - value` lines; a line
//! starting with whitespace continues the previous field. Only the fields the
//! pipeline consumes are extracted (PMID, TI, AB, AU, DP).

use super::RawRecord;

/// Parses a MEDLINE payload into raw records. Unknown tags are ignored;
/// structurally broken lines are skipped rather than failing the batch.
pub fn parse_medline(payload: &str) -> Vec<RawRecord> {
    let mut records = Vec::new();
    let mut current: Option<RecordBuilder> = None;

    for line in payload.lines() {
        if line.trim().is_empty() {
            if let Some(builder) = current.take() {
                records.push(builder.finish());
            }
            continue;
        }

        let builder = current.get_or_insert_with(RecordBuilder::default);

        if line.starts_with(' ') {
            builder.continue_field(line.trim());
        } else if let Some((tag, value)) = split_tagged_line(line) {
            builder.start_field(tag, value);
        }
        // Lines that are neither continuations nor `TAG - value` are noise.
    }

    if let Some(builder) = current.take() {
        records.push(builder.finish());
    }

    records
}

/// Splits `TAG - value`. MEDLINE pads tags to four characters before the dash.
fn split_tagged_line(line: &str) -> Option<(&str, &str)> {
    let (prefix, value) = line.split_once("- ")?;
    let tag = prefix.trim();
    if tag.is_empty() {
        return None;
    }
    Some((tag, value.trim()))
}

#[derive(Default)]
struct RecordBuilder {
    record: RawRecord,
    last_tag: Option<String>,
}

impl RecordBuilder {
    fn start_field(&mut self, tag: &str, value: &str) {
        match tag {
            "PMID" => self.record.id = Some(value.to_string()),
            "TI" => self.record.title = Some(value.to_string()),
            "AB" => self.record.abstract_text = Some(value.to_string()),
            "AU" => self.record.authors.push(value.to_string()),
            "DP" => self.record.publication_date = Some(value.to_string()),
            _ => {}
        }
        self.last_tag = Some(tag.to_string());
    }

    fn continue_field(&mut self, value: &str) {
        let Some(tag) = self.last_tag.as_deref() else {
            return;
        };
        let target = match tag {
            "TI" => self.record.title.as_mut(),
            "AB" => self.record.abstract_text.as_mut(),
            _ => None,
        };
        if let Some(text) = target {
            text.push(' ');
            text.push_str(value);
        }
    }

    fn finish(self) -> RawRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
PMID- 12345678
TI  - A study of gene editing outcomes
      in model organisms.
AB  - Background sentence one. Method sentence two. Result
      sentence three.
AU  - Smith A
AU  - Jones B
DP  - 2023 Jan 15

PMID- 87654321
TI  - Second article
AB  - Only one sentence here.
AU  - Doe C
DP  - 2022
";

    #[test]
    fn parses_two_records() {
        let records = parse_medline(SAMPLE);
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.id.as_deref(), Some("12345678"));
        assert_eq!(
            first.title.as_deref(),
            Some("A study of gene editing outcomes in model organisms.")
        );
        assert_eq!(
            first.abstract_text.as_deref(),
            Some("Background sentence one. Method sentence two. Result sentence three.")
        );
        assert_eq!(first.authors, vec!["Smith A", "Jones B"]);
        assert_eq!(first.publication_date.as_deref(), Some("2023 Jan 15"));

        let second = &records[1];
        assert_eq!(second.id.as_deref(), Some("87654321"));
        assert_eq!(second.authors, vec!["Doe C"]);
        assert_eq!(second.publication_date.as_deref(), Some("2022"));
    }

    #[test]
    fn record_without_pmid_still_parses() {
        let records = parse_medline("TI  - Orphan title\nAU  - Nobody X\n");
        assert_eq!(records.len(), 1);
        assert!(records[0].id.is_none());
        assert_eq!(records[0].title.as_deref(), Some("Orphan title"));
    }

    #[test]
    fn empty_payload_yields_no_records() {
        assert!(parse_medline("").is_empty());
        assert!(parse_medline("\n\n").is_empty());
    }

    #[test]
    fn continuation_before_any_tag_is_ignored() {
        let records = parse_medline("      stray continuation\nPMID- 1\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_deref(), Some("1"));
    }
}
