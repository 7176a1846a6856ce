//! Line decoder for the CSV stream protocol.
//!
//! Protocol Overview:
//! - Format: unidirectional, line oriented, comma separated ASCII (NOT SCPI)
//! - Terminator: LF (`\n`), surrounding whitespace and CR are trimmed
//! - Every record starts with the marker `CSV-`; anything before the marker is discarded and
//!   lines without it (boot banners, debug prints) are ignored
//! - Commas cannot be escaped inside fields
//!
//! Records:
//! - `CSV-NAME,<name1>,<name2>,...` : display names, one per channel
//! - `CSV-UNIT,<unit1>,<unit2>,...` : Y-axis unit tags, one per channel
//! - `CSV-DATA,<timestamp_fs>,<value1>,<value2>,...` : one sample per channel
//!
//! A data row always updates every channel it carries at once; there is no way to express
//! a partial update of a single channel.

/// Marker that starts every record.
pub const RECORD_MARKER: &str = "CSV-";

/// Minimum number of fields in a usable `CSV-DATA` row: tag, timestamp, one value.
pub const MIN_DATA_FIELDS: usize = 3;

/// Record type tag (field 0 of a decoded line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// `CSV-NAME`
    Name,
    /// `CSV-UNIT`
    Unit,
    /// `CSV-DATA`
    Data,
    /// Starts with the marker but is not a known record
    Unknown,
}

impl RecordType {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "CSV-NAME" => RecordType::Name,
            "CSV-UNIT" => RecordType::Unit,
            "CSV-DATA" => RecordType::Data,
            _ => RecordType::Unknown,
        }
    }
}

/// One decoded line, borrowing its fields from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    /// Classification of the tag field
    pub kind: RecordType,
    /// All fields including the tag at index 0
    pub fields: Vec<&'a str>,
}

impl<'a> Record<'a> {
    /// The record-type tag exactly as received.
    pub fn tag(&self) -> &'a str {
        self.fields[0]
    }

    /// Fields after the tag.
    pub fn payload(&self) -> &[&'a str] {
        &self.fields[1..]
    }
}

/// Decode one raw line.
///
/// Returns `None` for empty lines and lines that do not contain [`RECORD_MARKER`]. Otherwise
/// the text from the first marker onward is split on `,`.
pub fn decode_line(line: &str) -> Option<Record<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let start = line.find(RECORD_MARKER)?;
    let fields: Vec<&str> = line[start..].split(',').collect();
    let kind = RecordType::from_tag(fields[0]);

    Some(Record { kind, fields })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_is_ignored() {
        assert_eq!(decode_line(""), None);
        assert_eq!(decode_line("   \r\n"), None);
        assert_eq!(decode_line("Booting firmware v2.1..."), None);
        assert_eq!(decode_line("1000,1.5,2.5"), None);
    }

    #[test]
    fn test_prefix_before_marker_is_discarded() {
        let record = decode_line("garbage\x07[log] CSV-DATA,1000,1.5").unwrap();
        assert_eq!(record.kind, RecordType::Data);
        assert_eq!(record.fields, vec!["CSV-DATA", "1000", "1.5"]);
        assert_eq!(record.payload(), &["1000", "1.5"]);
    }

    #[test]
    fn test_record_types() {
        assert_eq!(decode_line("CSV-NAME,A,B").unwrap().kind, RecordType::Name);
        assert_eq!(decode_line("CSV-UNIT,V,A").unwrap().kind, RecordType::Unit);
        assert_eq!(decode_line("CSV-DATA,0,1").unwrap().kind, RecordType::Data);

        let other = decode_line("CSV-HELLO,1").unwrap();
        assert_eq!(other.kind, RecordType::Unknown);
        assert_eq!(other.tag(), "CSV-HELLO");
    }

    #[test]
    fn test_crlf_and_empty_fields() {
        let record = decode_line("CSV-NAME,Vbat,,Temp\r\n").unwrap();
        assert_eq!(record.payload(), &["Vbat", "", "Temp"]);
    }

    #[test]
    fn test_bare_tag() {
        let record = decode_line("CSV-DATA").unwrap();
        assert_eq!(record.kind, RecordType::Data);
        assert!(record.payload().is_empty());
    }
}
