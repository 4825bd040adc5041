use std::fs::File;
use std::io::{Read, Write};

use camino::Utf8Path;
use csv::{ByteRecord, ReaderBuilder, WriterBuilder};

use crate::error::ResolverError;

/// A raw row as read from the input, before schema validation. Fields are
/// kept as bytes so non-UTF-8 text is written back untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// 1-based position in the input.
    pub row: u64,
    pub fields: Vec<Vec<u8>>,
}

pub struct RecordReader<R: Read> {
    reader: csv::Reader<R>,
    buffer: ByteRecord,
    row: u64,
}

impl RecordReader<File> {
    pub fn open(path: &Utf8Path, delimiter: u8) -> Result<Self, ResolverError> {
        let file = File::open(path.as_std_path()).map_err(|err| ResolverError::InputOpen {
            path: path.as_std_path().to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Self::from_reader(file, delimiter))
    }
}

impl<R: Read> RecordReader<R> {
    pub fn from_reader(reader: R, delimiter: u8) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(reader);
        Self {
            reader,
            buffer: ByteRecord::new(),
            row: 0,
        }
    }

    /// Next row, or `None` at end of input.
    pub fn next_row(&mut self) -> Result<Option<TableRow>, ResolverError> {
        let more = self
            .reader
            .read_byte_record(&mut self.buffer)
            .map_err(|err| ResolverError::TableRead(err.to_string()))?;
        if !more {
            return Ok(None);
        }
        self.row += 1;
        Ok(Some(TableRow {
            row: self.row,
            fields: self.buffer.iter().map(<[u8]>::to_vec).collect(),
        }))
    }
}

/// Writes rows one at a time and flushes after each so the output is
/// always a complete prefix of the run.
pub struct RecordWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl RecordWriter<File> {
    pub fn create(path: &Utf8Path, delimiter: u8) -> Result<Self, ResolverError> {
        let file = File::create(path.as_std_path()).map_err(|err| ResolverError::OutputOpen {
            path: path.as_std_path().to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Self::from_writer(file, delimiter))
    }
}

impl<W: Write> RecordWriter<W> {
    pub fn from_writer(writer: W, delimiter: u8) -> Self {
        let writer = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_writer(writer);
        Self { writer }
    }

    pub fn write_row<I, T>(&mut self, fields: I) -> Result<(), ResolverError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(fields)
            .map_err(|err| ResolverError::TableWrite(err.to_string()))?;
        self.writer
            .flush()
            .map_err(|err| ResolverError::TableWrite(err.to_string()))
    }

    pub fn into_inner(self) -> Result<W, ResolverError> {
        self.writer
            .into_inner()
            .map_err(|err| ResolverError::TableWrite(err.to_string()))
    }
}
