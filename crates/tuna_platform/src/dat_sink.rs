//! DAT sink: framed binary records.
//!
//! Layout: a 4-byte big-endian magic `0x0BADBEEF` followed by a 4-byte
//! native-endian indicator `0x11223344` (lets a reader detect whether it
//! needs to byte-swap). Every record after the header starts with a 4-byte
//! big-endian type tag; tag `NULL` carries no length and no body, every
//! other tag is followed by a 4-byte big-endian length and that many bytes
//! of body.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tuna_core::{Sample, Sink, Timestamp};

const MAGIC: u32 = 0x0BAD_BEEF;
const NATIVE_ENDIAN_INDICATOR: u32 = 0x1122_3344;

const TAG_NULL: u32 = 0x0000_0000;
const TAG_START: u32 = 0x0100_0000;
const TAG_MISC_DATA: u32 = 0x0200_0000;
const TAG_RESYNC: u32 = 0x0300_0000;
const TAG_SIGNAL: u32 = 0x0400_0000;
const TAG_TIME_SLICE: u32 = 0x0500_0000;
const TAG_PULSE: u32 = 0x0600_0000;

/// Which record tag a [`DatSink`] stamps every `end_record` with. A single
/// sink instance writes one kind of analysis record; `START`/`RESYNC`
/// markers use their own fixed tags regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatRecordKind {
    Signal,
    TimeSlice,
    Pulse,
}

impl DatRecordKind {
    fn tag(self) -> u32 {
        match self {
            DatRecordKind::Signal => TAG_SIGNAL,
            DatRecordKind::TimeSlice => TAG_TIME_SLICE,
            DatRecordKind::Pulse => TAG_PULSE,
        }
    }
}

pub struct DatSink<W: Write> {
    writer: BufWriter<W>,
    kind: DatRecordKind,
    body: Vec<u8>,
}

impl DatSink<File> {
    pub fn create(path: impl AsRef<Path>, kind: DatRecordKind) -> io::Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&MAGIC.to_be_bytes())?;
        writer.write_all(&NATIVE_ENDIAN_INDICATOR.to_ne_bytes())?;
        Ok(DatSink {
            writer,
            kind,
            body: Vec::new(),
        })
    }
}

impl<W: Write> DatSink<W> {
    fn write_tagged(&mut self, tag: u32, body: &[u8]) -> io::Result<()> {
        self.writer.write_all(&tag.to_be_bytes())?;
        if tag != TAG_NULL {
            self.writer.write_all(&(body.len() as u32).to_be_bytes())?;
            self.writer.write_all(body)?;
        }
        Ok(())
    }

    fn write_padding(&mut self) -> io::Result<()> {
        self.write_tagged(TAG_NULL, &[])
    }

    fn timestamp_bytes(ts: Timestamp) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[..8].copy_from_slice(&ts.seconds().to_be_bytes());
        bytes[8..].copy_from_slice(&ts.nanos().to_be_bytes());
        bytes
    }

    #[cfg(test)]
    fn write_misc(&mut self, body: &[u8]) -> io::Result<()> {
        self.write_tagged(TAG_MISC_DATA, body)
    }
}

impl<W: Write + Send> Sink for DatSink<W> {
    fn write_start(&mut self, ts: Timestamp) -> io::Result<()> {
        let bytes = Self::timestamp_bytes(ts);
        self.write_tagged(TAG_START, &bytes)
    }

    fn write_resync(&mut self, ts: Timestamp) -> io::Result<()> {
        let bytes = Self::timestamp_bytes(ts);
        self.write_tagged(TAG_RESYNC, &bytes)
    }

    fn write_field_sample(&mut self, v: Sample) {
        self.body.extend_from_slice(&v.to_be_bytes());
    }

    fn write_field_uint(&mut self, v: u32) {
        self.body.extend_from_slice(&v.to_be_bytes());
    }

    fn write_field_float(&mut self, v: f32) {
        self.body.extend_from_slice(&v.to_be_bytes());
    }

    fn end_record(&mut self) -> io::Result<()> {
        let tag = self.kind.tag();
        let body = std::mem::take(&mut self.body);
        self.write_tagged(tag, &body)?;
        self.writer.flush()
    }
}
