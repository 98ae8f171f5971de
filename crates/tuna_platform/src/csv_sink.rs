//! CSV sink: one line per record, `START`/`RESYNC` markers carrying a
//! timestamp. Only the newer line-marker contract is implemented; an older
//! per-sample-folded variant existed in the source material but is not
//! reproduced here.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tuna_core::{Sample, Sink, Timestamp};

pub struct CsvSink<W: Write> {
    writer: BufWriter<W>,
    line: String,
    first_field: bool,
}

impl CsvSink<File> {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(CsvSink {
            writer: BufWriter::new(File::create(path)?),
            line: String::new(),
            first_field: true,
        })
    }
}

impl<W: Write> CsvSink<W> {
    fn write_field(&mut self, token: &str) {
        if !self.first_field {
            self.line.push(',');
        }
        self.line.push_str(token);
        self.first_field = false;
    }
}

impl<W: Write + Send> Sink for CsvSink<W> {
    fn write_start(&mut self, ts: Timestamp) -> io::Result<()> {
        writeln!(self.writer, "START,{ts}")
    }

    fn write_resync(&mut self, ts: Timestamp) -> io::Result<()> {
        writeln!(self.writer, "RESYNC,{ts}")
    }

    fn write_field_sample(&mut self, v: Sample) {
        self.write_field(&v.to_string());
    }

    fn write_field_uint(&mut self, v: u32) {
        self.write_field(&v.to_string());
    }

    fn write_field_float(&mut self, v: f32) {
        self.write_field(&v.to_string());
    }

    fn end_record(&mut self) -> io::Result<()> {
        let line = std::mem::take(&mut self.line);
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.first_field = true;
        self.writer.flush()
    }
}
