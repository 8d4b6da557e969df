//! Sectioned tabular store format.
//!
//! One text file per store. Each shard is a named section:
//!
//! ```text
//! #listingstore v1
//! [shard:M5]
//! DATE\tADDRESS\tCITY\tSTATE\tPOSTAL\tAGENT\tBROKER\tPRICE\tLATITUDE\tLONGITUDE
//! JAN 5, 2026\t1 MAIN ST\t...
//! ```
//!
//! Sections appear in lexicographic shard-key order. Text fields are
//! upper-cased on emit; date and the geo coordinates are written verbatim.
//! Parsing is raw: no deduplication, and row arity is handled leniently
//! (short rows padded, long rows truncated) so the health validator and
//! rebuilder can inspect damaged stores. Broken section structure is a
//! parse error.

use crate::error::{AppError, Result};
use crate::models::{Listing, normalize};
use crate::storage::store::ShardedStore;

/// First line of every store file.
pub const FORMAT_HEADER: &str = "#listingstore v1";

/// Fixed column order for every shard section.
pub const COLUMNS: [&str; 10] = [
    "DATE",
    "ADDRESS",
    "CITY",
    "STATE",
    "POSTAL",
    "AGENT",
    "BROKER",
    "PRICE",
    "LATITUDE",
    "LONGITUDE",
];

const SECTION_PREFIX: &str = "[shard:";
const SECTION_SUFFIX: &str = "]";

/// Escape tabs, newlines and backslashes inside a field.
fn escape_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape_field`]. Unknown escapes keep the escaped char.
fn unescape_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Emit one record as a tab-separated row.
///
/// Text fields are upper-cased; date, latitude and longitude verbatim.
fn serialize_row(listing: &Listing) -> String {
    let cells = [
        listing.date.clone(),
        normalize(&listing.address),
        normalize(&listing.city),
        normalize(&listing.state),
        normalize(&listing.postal),
        normalize(&listing.agent),
        normalize(&listing.broker),
        normalize(&listing.price),
        listing.latitude.clone(),
        listing.longitude.clone(),
    ];
    cells
        .iter()
        .map(|c| escape_field(c))
        .collect::<Vec<_>>()
        .join("\t")
}

fn parse_row(line: &str) -> Listing {
    let mut cells: Vec<String> = line.split('\t').map(unescape_field).collect();
    // Lenient arity: pad short rows, drop extra cells.
    cells.resize(COLUMNS.len(), String::new());
    let mut it = cells.into_iter();
    Listing {
        date: it.next().unwrap_or_default(),
        address: it.next().unwrap_or_default(),
        city: it.next().unwrap_or_default(),
        state: it.next().unwrap_or_default(),
        postal: it.next().unwrap_or_default(),
        agent: it.next().unwrap_or_default(),
        broker: it.next().unwrap_or_default(),
        price: it.next().unwrap_or_default(),
        latitude: it.next().unwrap_or_default(),
        longitude: it.next().unwrap_or_default(),
    }
}

/// Serialize a store: format line, then one section per shard in
/// lexicographic shard-key order.
pub fn serialize_store(store: &ShardedStore) -> String {
    let mut out = String::new();
    out.push_str(FORMAT_HEADER);
    out.push('\n');

    for shard in store.shards() {
        out.push_str(SECTION_PREFIX);
        out.push_str(shard.key());
        out.push_str(SECTION_SUFFIX);
        out.push('\n');
        out.push_str(&COLUMNS.join("\t"));
        out.push('\n');
        for row in shard.rows() {
            out.push_str(&serialize_row(row));
            out.push('\n');
        }
    }
    out
}

/// Raw-parse a store file into shard/row pairs, in file order.
///
/// No deduplication and no capacity enforcement happen here; that is the
/// health validator's and rebuilder's job.
pub fn parse_store(content: &str) -> Result<Vec<(String, Vec<Listing>)>> {
    let mut shards: Vec<(String, Vec<Listing>)> = Vec::new();
    let mut expect_header = false;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;

        if idx == 0 && line.starts_with('#') {
            if line != FORMAT_HEADER {
                return Err(AppError::corrupted(
                    format!("line {line_no}"),
                    format!("unsupported format line '{line}'"),
                ));
            }
            continue;
        }

        // Only length-zero lines are skippable blanks: an all-empty row
        // still serializes as nine tabs and must survive a reload.
        if line.is_empty() && !expect_header {
            continue;
        }

        if let Some(rest) = line.strip_prefix(SECTION_PREFIX) {
            let Some(key) = rest.strip_suffix(SECTION_SUFFIX) else {
                return Err(AppError::corrupted(
                    format!("line {line_no}"),
                    "unterminated shard section marker",
                ));
            };
            if key.is_empty() {
                return Err(AppError::corrupted(
                    format!("line {line_no}"),
                    "empty shard key",
                ));
            }
            shards.push((key.to_string(), Vec::new()));
            expect_header = true;
            continue;
        }

        if expect_header {
            let cells: Vec<&str> = line.split('\t').collect();
            if cells != COLUMNS {
                return Err(AppError::corrupted(
                    format!("line {line_no}"),
                    "shard section is missing the column header",
                ));
            }
            expect_header = false;
            continue;
        }

        let Some((_, rows)) = shards.last_mut() else {
            return Err(AppError::corrupted(
                format!("line {line_no}"),
                "row outside of any shard section",
            ));
        };
        rows.push(parse_row(line));
    }

    if expect_header {
        return Err(AppError::corrupted(
            "end of file",
            "shard section is missing the column header",
        ));
    }

    Ok(shards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::ShardedStore;

    fn listing(address: &str, postal: &str, price: &str, agent: &str) -> Listing {
        Listing {
            date: "Jan 5, 2026".into(),
            address: address.into(),
            city: "Toronto".into(),
            state: "ON".into(),
            postal: postal.into(),
            agent: agent.into(),
            broker: "Acme Realty".into(),
            price: price.into(),
            latitude: "43.6426".into(),
            longitude: "-79.3871".into(),
        }
    }

    #[test]
    fn escape_roundtrip() {
        let raw = "1\tMain\\St\napt 2";
        assert_eq!(unescape_field(&escape_field(raw)), raw);
    }

    #[test]
    fn serialize_orders_shards_lexicographically() {
        let mut store = ShardedStore::new(100);
        store.try_append(listing("9 Z Rd", "Z9X1Y2", "$1", "A"));
        store.try_append(listing("1 A Rd", "A1B2C3", "$1", "A"));

        let text = serialize_store(&store);
        let a_pos = text.find("[shard:A1]").unwrap();
        let z_pos = text.find("[shard:Z9]").unwrap();
        assert!(a_pos < z_pos);
        assert!(text.starts_with(FORMAT_HEADER));
    }

    #[test]
    fn serialize_uppercases_text_fields_only() {
        let mut store = ShardedStore::new(100);
        let mut l = listing("1 main st", "m5v3a8", "$800,000", "smith");
        l.date = "Jan 5, 2026".into();
        store.try_append(l);

        let text = serialize_store(&store);
        assert!(text.contains("1 MAIN ST"));
        assert!(text.contains("SMITH"));
        // Date stays verbatim
        assert!(text.contains("Jan 5, 2026"));
    }

    #[test]
    fn parse_reverses_serialize() {
        let mut store = ShardedStore::new(100);
        store.try_append(listing("1 Main St", "M5V3A8", "$800,000", "Smith"));
        store.try_append(listing("2 King St", "M5V9Z9", "$1,200,000", "Jones"));
        store.try_append(listing("5 Oak Ave", "K2P1L4", "$450,000", "Lee"));

        let parsed = parse_store(&serialize_store(&store)).unwrap();
        assert_eq!(parsed.len(), 2); // M5 and K2
        let total: usize = parsed.iter().map(|(_, rows)| rows.len()).sum();
        assert_eq!(total, 3);

        let (key, rows) = &parsed[1]; // file order follows shard order: K2, M5
        assert_eq!(key, "M5");
        assert_eq!(rows[0].address, "1 MAIN ST");
        assert_eq!(rows[0].postal, "M5V3A8");
    }

    #[test]
    fn parse_pads_short_rows() {
        let content = format!(
            "{FORMAT_HEADER}\n[shard:M5]\n{}\nJan 5\t1 MAIN ST\n",
            COLUMNS.join("\t")
        );
        let parsed = parse_store(&content).unwrap();
        let row = &parsed[0].1[0];
        assert_eq!(row.address, "1 MAIN ST");
        assert_eq!(row.postal, "");
    }

    #[test]
    fn empty_rows_survive_a_reload() {
        let blank = Listing {
            date: "".into(),
            address: "".into(),
            city: "".into(),
            state: "".into(),
            postal: "".into(),
            agent: "".into(),
            broker: "".into(),
            price: "".into(),
            latitude: "".into(),
            longitude: "".into(),
        };
        let store = ShardedStore::from_raw(vec![("M5".into(), vec![blank])], 100);

        let parsed = parse_store(&serialize_store(&store)).unwrap();
        assert_eq!(parsed[0].1.len(), 1);
        assert!(parsed[0].1[0].is_empty_row());
    }

    #[test]
    fn parse_rejects_row_before_section() {
        let content = format!("{FORMAT_HEADER}\nJan 5\t1 MAIN ST\n");
        assert!(matches!(
            parse_store(&content),
            Err(AppError::StoreCorrupted { .. })
        ));
    }

    #[test]
    fn parse_rejects_missing_column_header() {
        let content = format!("{FORMAT_HEADER}\n[shard:M5]\nJan 5\t1 MAIN ST\n");
        assert!(matches!(
            parse_store(&content),
            Err(AppError::StoreCorrupted { .. })
        ));
    }

    #[test]
    fn parse_rejects_unknown_format_line() {
        assert!(parse_store("#listingstore v99\n").is_err());
    }

    #[test]
    fn parse_empty_file_is_zero_shards() {
        assert!(parse_store("").unwrap().is_empty());
        assert!(parse_store(FORMAT_HEADER).unwrap().is_empty());
    }
}
