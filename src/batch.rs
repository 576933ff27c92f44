//! Transaction batch files
//!
//! A batch is a flat sequence of records, replayed by the node's stress
//! endpoints in file order:
//!
//! ```text
//! plain:  [u16 LE len][tx bytes]
//! tagged: [u16 LE len][tx bytes][tag]      len counts the tag byte
//! ```

use crate::error::{BenchError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::iter::FusedIterator;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Origin VM and intra/cross classification of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(u8)]
pub enum TxType {
    NativeAptos = 1,
    CrossAptos = 3,
    NativeEth = 5,
    CrossEth = 7,
}

impl TxType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(TxType::NativeAptos),
            3 => Some(TxType::CrossAptos),
            5 => Some(TxType::NativeEth),
            7 => Some(TxType::CrossEth),
            _ => None,
        }
    }

    pub fn is_move(self) -> bool {
        matches!(self, TxType::NativeAptos | TxType::CrossAptos)
    }

    pub fn is_cross(self) -> bool {
        matches!(self, TxType::CrossAptos | TxType::CrossEth)
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TxType::NativeAptos => "native-aptos",
            TxType::CrossAptos => "cross-aptos",
            TxType::NativeEth => "native-eth",
            TxType::CrossEth => "cross-eth",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchFormat {
    Plain,
    #[default]
    Tagged,
}

impl FromStr for BatchFormat {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(BatchFormat::Plain),
            "tagged" => Ok(BatchFormat::Tagged),
            other => Err(BenchError::BatchFormatError(format!(
                "unknown batch format '{}', expected plain or tagged",
                other
            ))),
        }
    }
}

impl fmt::Display for BatchFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BatchFormat::Plain => write!(f, "plain"),
            BatchFormat::Tagged => write!(f, "tagged"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord {
    pub tx: Vec<u8>,
    pub tag: Option<TxType>,
}

/// Record counts of a written or scanned batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub records: usize,
    pub bytes: u64,
    pub per_tag: BTreeMap<TxType, usize>,
}

impl BatchSummary {
    fn add(&mut self, record_len: usize, tag: Option<TxType>) {
        self.records += 1;
        self.bytes += (record_len + 2) as u64;
        if let Some(tag) = tag {
            *self.per_tag.entry(tag).or_insert(0) += 1;
        }
    }

    pub fn count(&self, tag: TxType) -> usize {
        self.per_tag.get(&tag).copied().unwrap_or(0)
    }
}

pub struct BatchWriter<W: Write> {
    out: W,
    format: BatchFormat,
    summary: BatchSummary,
}

impl BatchWriter<BufWriter<File>> {
    pub fn create(path: &Path, format: BatchFormat) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self::new(BufWriter::new(File::create(path)?), format))
    }
}

impl<W: Write> BatchWriter<W> {
    pub fn new(out: W, format: BatchFormat) -> Self {
        BatchWriter {
            out,
            format,
            summary: BatchSummary::default(),
        }
    }

    pub fn format(&self) -> BatchFormat {
        self.format
    }

    /// Append one transaction. Plain batches drop the tag.
    pub fn write(&mut self, tx: &[u8], tag: TxType) -> Result<()> {
        let (record_len, tag) = match self.format {
            BatchFormat::Plain => (tx.len(), None),
            BatchFormat::Tagged => (tx.len() + 1, Some(tag)),
        };
        let len = u16::try_from(record_len).map_err(|_| {
            BenchError::BatchFormatError(format!(
                "transaction of {} bytes does not fit a u16 length prefix",
                tx.len()
            ))
        })?;

        self.out.write_all(&len.to_le_bytes())?;
        self.out.write_all(tx)?;
        if let Some(tag) = tag {
            self.out.write_all(&[tag.tag()])?;
        }
        self.summary.add(record_len, tag);
        Ok(())
    }

    pub fn summary(&self) -> &BatchSummary {
        &self.summary
    }

    pub fn finish(mut self) -> Result<BatchSummary> {
        self.out.flush()?;
        Ok(self.summary)
    }
}

pub struct BatchReader<R: Read> {
    input: R,
    format: BatchFormat,
    offset: u64,
    /// Set at end of input or on the first error; the reader yields nothing after.
    done: bool,
}

impl BatchReader<BufReader<File>> {
    pub fn open(path: &Path, format: BatchFormat) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| BenchError::IoError(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(BufReader::new(file), format))
    }
}

impl<R: Read> BatchReader<R> {
    pub fn new(input: R, format: BatchFormat) -> Self {
        BatchReader {
            input,
            format,
            offset: 0,
            done: false,
        }
    }

    fn read_record(&mut self) -> Result<Option<BatchRecord>> {
        let mut len_bytes = [0u8; 2];
        match self.input.read(&mut len_bytes[..1]) {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => return self.read_record(),
            Err(e) => return Err(e.into()),
        }
        self.read_exact(&mut len_bytes[1..], "length prefix")?;
        let len = u16::from_le_bytes(len_bytes) as usize;

        let mut body = vec![0u8; len];
        self.read_exact(&mut body, "record body")?;
        let record_offset = self.offset;
        self.offset += 2 + len as u64;

        match self.format {
            BatchFormat::Plain => Ok(Some(BatchRecord { tx: body, tag: None })),
            BatchFormat::Tagged => {
                let tag_byte = body.pop().ok_or_else(|| {
                    BenchError::BatchFormatError(format!(
                        "empty tagged record at offset {}",
                        record_offset
                    ))
                })?;
                let tag = TxType::from_tag(tag_byte).ok_or_else(|| {
                    BenchError::BatchFormatError(format!(
                        "unknown tag {} at offset {}",
                        tag_byte, record_offset
                    ))
                })?;
                Ok(Some(BatchRecord {
                    tx: body,
                    tag: Some(tag),
                }))
            }
        }
    }

    fn read_exact(&mut self, buf: &mut [u8], what: &str) -> Result<()> {
        self.input.read_exact(buf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                BenchError::BatchFormatError(format!(
                    "truncated {} at offset {}",
                    what, self.offset
                ))
            } else {
                e.into()
            }
        })
    }
}

impl<R: Read> Iterator for BatchReader<R> {
    type Item = Result<BatchRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.read_record().transpose();
        self.done = !matches!(item, Some(Ok(_)));
        item
    }
}

impl<R: Read> FusedIterator for BatchReader<R> {}

/// Scan a batch file and count its records per tag.
pub fn summarize(path: &Path, format: BatchFormat) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    for record in BatchReader::open(path, format)? {
        let record = record?;
        let record_len = record.tx.len() + usize::from(record.tag.is_some());
        summary.add(record_len, record.tag);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_tagged_record_layout() {
        let mut writer = BatchWriter::new(Vec::new(), BatchFormat::Tagged);
        writer.write(&[0xaa, 0xbb, 0xcc], TxType::CrossEth).unwrap();
        let summary = writer.summary().clone();
        let bytes = writer.out;

        // length counts the trailing tag
        assert_eq!(bytes, vec![4, 0, 0xaa, 0xbb, 0xcc, 7]);
        assert_eq!(summary.records, 1);
        assert_eq!(summary.count(TxType::CrossEth), 1);
    }

    #[test]
    fn test_plain_record_layout() {
        let mut writer = BatchWriter::new(Vec::new(), BatchFormat::Plain);
        writer.write(&[1, 2], TxType::NativeAptos).unwrap();
        assert_eq!(writer.out, vec![2, 0, 1, 2]);
        assert!(writer.summary().per_tag.is_empty());
    }

    #[test]
    fn test_reader_yields_records_in_order() {
        let mut writer = BatchWriter::new(Vec::new(), BatchFormat::Tagged);
        writer.write(&[1; 300], TxType::NativeAptos).unwrap();
        writer.write(&[2; 5], TxType::NativeEth).unwrap();
        let bytes = writer.out;

        let records: Vec<BatchRecord> = BatchReader::new(Cursor::new(bytes), BatchFormat::Tagged)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tx, vec![1; 300]);
        assert_eq!(records[0].tag, Some(TxType::NativeAptos));
        assert_eq!(records[1].tag, Some(TxType::NativeEth));
    }

    #[test]
    fn test_oversized_transaction_rejected() {
        let mut writer = BatchWriter::new(Vec::new(), BatchFormat::Tagged);
        // fits plain but not with the tag byte
        let err = writer.write(&vec![0; 65_535], TxType::NativeEth).unwrap_err();
        assert!(matches!(err, BenchError::BatchFormatError(_)));
        assert!(writer.out.is_empty());

        let mut plain = BatchWriter::new(Vec::new(), BatchFormat::Plain);
        assert!(plain.write(&vec![0; 65_535], TxType::NativeEth).is_ok());
    }

    #[test]
    fn test_truncated_and_corrupt_input() {
        let truncated = vec![5, 0, 1, 2];
        let mut reader = BatchReader::new(Cursor::new(truncated), BatchFormat::Plain);
        assert!(matches!(
            reader.next(),
            Some(Err(BenchError::BatchFormatError(_)))
        ));

        let half_prefix = vec![5];
        let mut reader = BatchReader::new(Cursor::new(half_prefix), BatchFormat::Plain);
        assert!(matches!(
            reader.next(),
            Some(Err(BenchError::BatchFormatError(_)))
        ));

        let bad_tag = vec![2, 0, 9, 2];
        let mut reader = BatchReader::new(Cursor::new(bad_tag), BatchFormat::Tagged);
        assert!(matches!(
            reader.next(),
            Some(Err(BenchError::BatchFormatError(_)))
        ));

        let empty_tagged = vec![0, 0];
        let mut reader = BatchReader::new(Cursor::new(empty_tagged), BatchFormat::Tagged);
        assert!(reader.next().unwrap().is_err());
    }

    #[test]
    fn test_reader_stops_after_first_error() {
        // a bad tag, then a record that would read fine on its own
        let input = vec![2, 0, 9, 2, 2, 0, 9, 1];
        let mut reader = BatchReader::new(Cursor::new(input), BatchFormat::Tagged);
        assert!(matches!(
            reader.next(),
            Some(Err(BenchError::BatchFormatError(_)))
        ));
        assert!(reader.next().is_none());
        assert!(reader.next().is_none());

        let truncated = vec![1, 0, 7, 5, 0, 1];
        let results: Vec<_> = BatchReader::new(Cursor::new(truncated), BatchFormat::Plain).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_empty_input_is_empty_batch() {
        let mut reader = BatchReader::new(Cursor::new(Vec::new()), BatchFormat::Tagged);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_tx_type_tags() {
        for tag in [1u8, 3, 5, 7] {
            let tx_type = TxType::from_tag(tag).unwrap();
            assert_eq!(tx_type.tag(), tag);
        }
        assert!(TxType::from_tag(2).is_none());
        assert!(TxType::CrossAptos.is_move() && TxType::CrossAptos.is_cross());
        assert!(!TxType::NativeEth.is_move() && !TxType::NativeEth.is_cross());
    }
}
