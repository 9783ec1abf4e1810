// Licensed under the Apache-2.0 license

//! CSV row source and the register sheet dialect.
//!
//! A register sheet looks like this:
//!
//! ```text
//! #,comment,,
//! ,# addr=0x0010,CTRL,
//! ,[0],enable,
//! ,[7:4],mode,
//! ```
//!
//! [`CsvRows`] turns any reader into [`Row`]s, and [`DemoClassifier`]
//! recognizes address rows (`# addr=0x...` in the second cell) and field rows
//! (a bracketed bit range in the second cell). The name of the register or
//! field is taken from the third cell.

use crate::error::{PackerError, PackerResult};
use crate::field::Address;
use crate::parser::{ClassifiedRow, Row, RowClassifier};
use std::io::BufRead;
use winnow::ascii::{digit1, hex_digit1, space0};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated};
use winnow::prelude::*;
use winnow::token::{any, none_of, take_till};

/// Lazily reads comma separated rows from a reader.
///
/// Cells may be double-quoted, in which case they can contain commas and
/// `""` stands for one quote. Line numbers start at 1.
pub struct CsvRows<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> CsvRows<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for CsvRows<R> {
    type Item = PackerResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_line(&mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line += 1;
                let text = self.buf.trim_end_matches(['\n', '\r']);
                Some(parse_row(text).map(|cells| Row::new(self.line, cells)).map_err(
                    |reason| PackerError::MalformedRow {
                        line: self.line,
                        reason,
                    },
                ))
            }
            Err(err) => Some(Err(err.into())),
        }
    }
}

fn quoted_cell(input: &mut &str) -> ModalResult<String> {
    delimited(
        '"',
        repeat(0.., alt((none_of('"'), "\"\"".value('"')))),
        '"',
    )
    .parse_next(input)
}

fn plain_cell(input: &mut &str) -> ModalResult<String> {
    take_till(0.., ',').map(str::to_string).parse_next(input)
}

fn cell(input: &mut &str) -> ModalResult<String> {
    alt((quoted_cell, plain_cell)).parse_next(input)
}

/// Split one line of text into cells.
pub fn parse_row(line: &str) -> Result<Vec<String>, String> {
    separated(1.., cell, ',')
        .parse(line)
        .map_err(|err| format!("cannot split row at column {}", err.offset() + 1))
}

fn bit_index(input: &mut &str) -> ModalResult<u32> {
    delimited(space0, digit1.try_map(str::parse::<u32>), space0).parse_next(input)
}

fn range_spec(input: &mut &str) -> ModalResult<(u32, Option<u32>)> {
    delimited(
        '[',
        (bit_index, opt(preceded(alt((":", "..", "-")), bit_index))),
        ']',
    )
    .parse_next(input)
}

/// Extract `(bits, shift)` from `[high:low]` or `[n]`.
///
/// The two ends may be given in either order.
pub fn extract_range(text: &str) -> Result<(u32, u32), String> {
    let (first, second) = range_spec
        .parse(text.trim())
        .map_err(|_| format!("unrecognized bit range {text:?}"))?;
    let (high, low) = match second {
        Some(second) if second > first => (second, first),
        Some(second) => (first, second),
        None => (first, first),
    };
    let bits = (high - low)
        .checked_add(1)
        .ok_or_else(|| format!("bit range {text:?} is too wide"))?;
    Ok((bits, low))
}

fn hex_literal(input: &mut &str) -> ModalResult<u64> {
    preceded(
        alt(("0x", "0X")),
        hex_digit1.try_map(|digits: &str| u64::from_str_radix(digits, 16)),
    )
    .parse_next(input)
}

/// Every `0x`/`0X` literal in `text`, in order of appearance.
pub fn extract_hex_values(text: &str) -> Vec<u64> {
    let mut input = text;
    let values: ModalResult<Vec<Option<u64>>> =
        repeat(0.., alt((hex_literal.map(Some), any.value(None)))).parse_next(&mut input);
    values
        .map(|values| values.into_iter().flatten().collect())
        .unwrap_or_default()
}

/// The first hex literal in `text`.
pub fn extract_hex(text: &str) -> Option<u64> {
    extract_hex_values(text).into_iter().next()
}

/// How address rows encode the register address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AddressShape {
    /// One hex literal, e.g. `# addr=0x0010`.
    #[default]
    Scalar,
    /// A device and an offset, e.g. `# addr=0x1,0x0020`.
    Device,
}

/// Classifier for register sheets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DemoClassifier {
    shape: AddressShape,
}

impl DemoClassifier {
    pub fn new(shape: AddressShape) -> Self {
        Self { shape }
    }

    fn address(&self, row: &Row) -> PackerResult<Address> {
        let values = extract_hex_values(row.cell(1));
        let malformed = |reason: &str| PackerError::MalformedRow {
            line: row.line,
            reason: format!("{reason} in {:?}", row.cell(1)),
        };
        match (self.shape, values.as_slice()) {
            (AddressShape::Scalar, [value, ..]) => Ok(Address::from(*value)),
            (AddressShape::Scalar, []) => Err(malformed("no hex address")),
            (AddressShape::Device, [dev, offset, ..]) => Ok(Address::from((*dev, *offset))),
            (AddressShape::Device, _) => Err(malformed("expected device and offset")),
        }
    }
}

impl RowClassifier for DemoClassifier {
    fn classify(&self, row: &Row) -> PackerResult<ClassifiedRow> {
        if row.cells.iter().all(|cell| cell.is_empty()) {
            return Ok(ClassifiedRow::Empty);
        }
        if row.cell(0).starts_with('#') {
            return Ok(ClassifiedRow::Comment);
        }
        if row.cells.len() < 2 {
            return Ok(ClassifiedRow::Unknown);
        }

        let spec = row.cell(1);
        if spec.starts_with("# addr=") {
            return Ok(ClassifiedRow::Address {
                address: self.address(row)?,
                name: row.cell(2).to_string(),
            });
        }
        if spec.starts_with('[') && spec.ends_with(']') {
            let (bits, shift) = extract_range(spec).map_err(|reason| PackerError::MalformedRow {
                line: row.line,
                reason,
            })?;
            return Ok(ClassifiedRow::Field {
                name: row.cell(2).to_string(),
                bits,
                shift,
                source: format!("{:?}", row.cells),
                line: row.line,
            });
        }
        Ok(ClassifiedRow::Unknown)
    }
}

/// Read and classify every row of `reader`.
pub fn classify_rows<'a, R, C>(
    reader: R,
    classifier: &'a C,
) -> impl Iterator<Item = PackerResult<ClassifiedRow>> + 'a
where
    R: BufRead + 'a,
    C: RowClassifier + ?Sized,
{
    CsvRows::new(reader).map(move |row| row.and_then(|row| classifier.classify(&row)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RowKind;

    fn row(cells: &[&str]) -> Row {
        Row::new(1, cells.iter().map(|c| c.to_string()).collect())
    }

    fn kind(cells: &[&str]) -> RowKind {
        DemoClassifier::default().classify(&row(cells)).unwrap().kind()
    }

    #[test]
    fn test_parse_row() {
        assert_eq!(parse_row("a,b,,d").unwrap(), ["a", "b", "", "d"]);
        assert_eq!(parse_row("").unwrap(), [""]);
        assert_eq!(
            parse_row(r##","# addr=0x1,0x20",name"##).unwrap(),
            ["", "# addr=0x1,0x20", "name"]
        );
        assert_eq!(
            parse_row(r#""say ""hi""",x"#).unwrap(),
            [r#"say "hi""#, "x"]
        );
    }

    #[test]
    fn test_rows_are_numbered() {
        let input = "#,header\r\n,[0],en\n\n";
        let rows: Vec<Row> = CsvRows::new(input.as_bytes())
            .collect::<PackerResult<_>>()
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].cells, ["#", "header"]);
        assert_eq!(rows[1].line, 2);
        assert_eq!(rows[1].cell(2), "en");
        assert_eq!(rows[2].cells, [""]);
    }

    #[test]
    fn test_extract_range() {
        assert_eq!(extract_range("[3]").unwrap(), (1, 3));
        assert_eq!(extract_range("[7:4]").unwrap(), (4, 4));
        assert_eq!(extract_range("[4:7]").unwrap(), (4, 4));
        assert_eq!(extract_range("[ 15 : 0 ]").unwrap(), (16, 0));
        assert!(extract_range("[a:b]").is_err());
        assert!(extract_range("[]").is_err());
        assert!(extract_range("[1:2:3]").is_err());
    }

    #[test]
    fn test_extract_range_too_wide() {
        assert!(extract_range("[4294967295:0]")
            .unwrap_err()
            .contains("too wide"));
        assert_eq!(extract_range("[4294967295:1]").unwrap(), (u32::MAX, 1));

        let input = ",# addr=0x10,R,\n,[4294967295:0],big,\n";
        let rows: Vec<_> = classify_rows(input.as_bytes(), &DemoClassifier::default()).collect();
        assert!(matches!(
            rows[1],
            Err(PackerError::MalformedRow { line: 2, .. })
        ));
    }

    #[test]
    fn test_extract_hex() {
        assert_eq!(extract_hex("# addr=0x0010"), Some(0x10));
        assert_eq!(extract_hex("# addr=0XbeeF"), Some(0xbeef));
        assert_eq!(extract_hex_values("# addr=0x1, 0x0020"), [0x1u64, 0x20]);
        assert_eq!(extract_hex("# addr=16"), None);
        assert_eq!(extract_hex("0x"), None);
    }

    #[test]
    fn test_row_kinds() {
        assert_eq!(kind(&["", "", ""]), RowKind::Empty);
        assert_eq!(kind(&["# note", "[0]", "x"]), RowKind::Comment);
        assert_eq!(kind(&["", "# addr=0x10", "CTRL"]), RowKind::Address);
        assert_eq!(kind(&["", "[3:0]", "mode"]), RowKind::Field);
        assert_eq!(kind(&["", "reserved", ""]), RowKind::Unknown);
        assert_eq!(kind(&["lonely"]), RowKind::Unknown);
    }

    #[test]
    fn test_classified_contents() {
        let classifier = DemoClassifier::default();
        assert_eq!(
            classifier.classify(&row(&["", "# addr=0x10", "CTRL"])).unwrap(),
            ClassifiedRow::address(0x10u64, "CTRL")
        );
        match classifier.classify(&row(&["", "[7:4]", "mode"])).unwrap() {
            ClassifiedRow::Field {
                name,
                bits,
                shift,
                source,
                line,
            } => {
                assert_eq!(name, "mode");
                assert_eq!((bits, shift), (4, 4));
                assert_eq!(source, r#"["", "[7:4]", "mode"]"#);
                assert_eq!(line, 1);
            }
            other => panic!("unexpected row: {other:?}"),
        }
    }

    #[test]
    fn test_device_addresses() {
        let classifier = DemoClassifier::new(AddressShape::Device);
        assert_eq!(
            classifier
                .classify(&row(&["", "# addr=0x1,0x20", "UART"]))
                .unwrap(),
            ClassifiedRow::address((1u64, 0x20u64), "UART")
        );
        assert!(matches!(
            classifier.classify(&row(&["", "# addr=0x20", "UART"])),
            Err(PackerError::MalformedRow { line: 1, .. })
        ));
    }

    #[test]
    fn test_bad_rows_report_line() {
        let input = "x,# addr=0x10,R\nx,[9:z],bad\n";
        let rows: Vec<_> = classify_rows(input.as_bytes(), &DemoClassifier::default()).collect();
        assert!(rows[0].is_ok());
        assert!(matches!(
            rows[1],
            Err(PackerError::MalformedRow { line: 2, .. })
        ));
    }
}
