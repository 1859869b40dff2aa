// CSV persistence for flushed recordings: one file per recording.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use autapse_rt::{RecordHeader, RecordSink, Sample};

pub struct CsvSink {
    dir: PathBuf,
    seq: u32,
    last: Option<PathBuf>,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: 0,
            last: None,
        }
    }

    /// Path of the most recently written recording.
    pub fn last(&self) -> Option<&Path> {
        self.last.as_deref()
    }

    pub fn written(&self) -> u32 {
        self.seq
    }
}

impl RecordSink for CsvSink {
    type Error = io::Error;

    fn write_record(&mut self, header: &RecordHeader<'_>, samples: &[Sample]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.seq += 1;
        let path = self
            .dir
            .join(format!("{}_cell{}_{:03}.csv", header.prefix, header.cell, self.seq));

        let mut out = BufWriter::new(File::create(&path)?);
        writeln!(out, "# info: {}", header.info)?;
        writeln!(out, "# dt_s: {}", header.dt)?;
        writeln!(out, "# dropped: {}", header.dropped)?;
        writeln!(out, "t_s,v_mv,g_ns,i_a")?;
        for s in samples {
            writeln!(out, "{},{},{},{}", s.time, s.voltage, s.conductance, s.current)?;
        }
        out.flush()?;

        self.last = Some(path);
        Ok(())
    }
}
