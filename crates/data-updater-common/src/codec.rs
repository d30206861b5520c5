//! Row codec for `;`-delimited files
//!
//! The first line of a file is the header; every following line is a row aligned
//! positionally with it. Fields are never quoted or escaped, so a `;` inside a value
//! shifts every later column of that row. That is a property of the file format the
//! producers use and is not corrected here.
//!
//! Key and value composition join the selected values with the same delimiter. The
//! non-key positions are always taken in ascending order so a record value is
//! identical across runs.

use crate::error::CodecError;

/// Column separator for both parsing and key/value composition
pub const DELIMITER: char = ';';

/// Ordered column names taken from the first line of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of the first column with this exact name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// One data line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    line: u64,
    values: Vec<String>,
}

impl Row {
    pub fn new(values: Vec<String>) -> Self {
        Self { line: 0, values }
    }

    /// 1-based line number in the source file (0 when built by hand)
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }
}

/// A parsed file: header plus data rows (header excluded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    pub header: Header,
    pub rows: Vec<Row>,
}

/// Parse raw file content into a header and rows.
///
/// Lines end at `\n`, with one trailing `\r` dropped. Only the empty segment after a
/// final newline is ignored; any other blank line is a one-value row and fails like
/// every row with fewer values than the header. Invalid UTF-8 and a missing header
/// also fail. Values beyond the header width are kept but never addressed by key or
/// value composition.
pub fn parse(content: &[u8]) -> Result<ParsedFile, CodecError> {
    let text = std::str::from_utf8(content)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let text = text.strip_suffix('\n').unwrap_or(text);

    let mut lines = text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));

    let header = match lines.next() {
        Some(line) if !line.is_empty() => Header::new(split_line(line)),
        _ => return Err(CodecError::MissingHeader),
    };

    let mut rows = Vec::new();
    for (index, line) in lines.enumerate() {
        // header is line 1
        let line_number = index as u64 + 2;
        let values = split_line(line);

        if values.len() < header.len() {
            return Err(CodecError::RowTooShort {
                line: line_number,
                expected: header.len(),
                actual: values.len(),
            });
        }

        rows.push(Row {
            line: line_number,
            values,
        });
    }

    Ok(ParsedFile { header, rows })
}

fn split_line(line: &str) -> Vec<String> {
    line.split(DELIMITER).map(str::to_string).collect()
}

/// Join the values at `indexes`, in the order given, with [`DELIMITER`].
pub fn compose(row: &Row, indexes: &[usize]) -> Result<String, CodecError> {
    let mut parts = Vec::with_capacity(indexes.len());
    for &index in indexes {
        let value = row.get(index).ok_or(CodecError::IndexOutOfRange {
            index,
            width: row.values.len(),
        })?;
        parts.push(value);
    }
    Ok(parts.join(&DELIMITER.to_string()))
}

/// Record key: key-column values in key order
pub fn compose_key(row: &Row, key_indexes: &[usize]) -> Result<String, CodecError> {
    compose(row, key_indexes)
}

/// Record value: the remaining values, `non_key_indexes` expected ascending
pub fn compose_value(row: &Row, non_key_indexes: &[usize]) -> Result<String, CodecError> {
    compose(row, non_key_indexes)
}

/// Every position in `0..width` not in `key_indexes`, ascending.
pub fn complement(width: usize, key_indexes: &[usize]) -> Vec<usize> {
    (0..width).filter(|i| !key_indexes.contains(i)).collect()
}

/// Inverse of [`compose`] for values that do not contain the delimiter.
pub fn split(joined: &str) -> Vec<&str> {
    joined.split(DELIMITER).collect()
}

/// Render a header and rows back into file content (no trailing newline).
pub fn render<I, R>(header: &[String], rows: I) -> String
where
    I: IntoIterator<Item = R>,
    R: AsRef<[String]>,
{
    let delimiter = DELIMITER.to_string();
    let mut lines = vec![header.join(&delimiter)];
    lines.extend(rows.into_iter().map(|row| row.as_ref().join(&delimiter)));
    lines.join("\n")
}

/// Primary-key columns resolved against a header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumns {
    names: Vec<String>,
    indexes: Vec<usize>,
    value_indexes: Vec<usize>,
    width: usize,
}

impl KeyColumns {
    /// Locate each named key column in the header.
    pub fn resolve(header: &Header, names: &[String]) -> Result<Self, CodecError> {
        if names.is_empty() {
            return Err(CodecError::NoKeyColumns);
        }

        let mut indexes = Vec::with_capacity(names.len());
        for name in names {
            let index = header
                .index_of(name)
                .ok_or_else(|| CodecError::UnknownColumn(name.clone()))?;
            if indexes.contains(&index) {
                return Err(CodecError::DuplicateColumn(name.clone()));
            }
            indexes.push(index);
        }

        Ok(Self {
            names: names.to_vec(),
            value_indexes: complement(header.len(), &indexes),
            indexes,
            width: header.len(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn indexes(&self) -> &[usize] {
        &self.indexes
    }

    /// Non-key positions, ascending
    pub fn value_indexes(&self) -> &[usize] {
        &self.value_indexes
    }

    /// Name of the partition key attribute: the key column names joined
    pub fn attribute_name(&self) -> String {
        self.names.join(&DELIMITER.to_string())
    }

    pub fn compose(&self, row: &Row) -> Result<String, CodecError> {
        compose_key(row, &self.indexes)
    }

    pub fn compose_value(&self, row: &Row) -> Result<String, CodecError> {
        compose_value(row, &self.value_indexes)
    }

    /// Put a composed key and value back into header order.
    ///
    /// Missing parts become empty strings, surplus parts are dropped.
    pub fn reassemble(&self, key: &str, value: &str) -> Vec<String> {
        let mut row = vec![String::new(); self.width];

        for (index, part) in self.indexes.iter().zip(split(key)) {
            row[*index] = part.to_string();
        }
        if !self.value_indexes.is_empty() {
            for (index, part) in self.value_indexes.iter().zip(split(value)) {
                row[*index] = part.to_string();
            }
        }

        row
    }
}
