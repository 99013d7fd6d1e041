use flate2::write::GzEncoder;
use flate2::Compression;
use itertools::Itertools;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::read::Mate;
use crate::core::tags::RecodedRecord;

/// Destination for recoded records. Records are written in the order given.
pub trait RecordSink {
    /// Append one record
    ///
    /// # Errors
    ///
    /// Returns any I/O error of the underlying destination.
    fn write(&mut self, record: &RecodedRecord) -> io::Result<()>;

    /// Flush and close the destination; no records may follow
    ///
    /// # Errors
    ///
    /// Returns any I/O error of the underlying destination.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

type GzWriter = BufWriter<GzEncoder<File>>;

/// Gzip-compressed FASTQ output, one file per mate.
///
/// Every mate of a record is written under the record's tag name.
pub struct FastqSink {
    writers: Vec<GzWriter>,
    paths: Vec<PathBuf>,
    written: u64,
}

impl FastqSink {
    /// Create (truncate) one output file per mate
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a file cannot be created.
    pub fn create<P: AsRef<Path>>(paths: &[P]) -> io::Result<Self> {
        let mut writers = Vec::with_capacity(paths.len());
        for path in paths {
            let file = File::create(path.as_ref())?;
            let encoder = GzEncoder::new(file, Compression::default());
            writers.push(BufWriter::new(encoder));
        }
        Ok(Self {
            writers,
            paths: paths.iter().map(|p| p.as_ref().to_path_buf()).collect(),
            written: 0,
        })
    }
}

impl RecordSink for FastqSink {
    fn write(&mut self, record: &RecodedRecord) -> io::Result<()> {
        if record.mates.len() > self.writers.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "record has {} mates but the sink has {} files",
                    record.mates.len(),
                    self.writers.len()
                ),
            ));
        }

        let name = record.read_name();
        for (writer, mate) in self.writers.iter_mut().zip(&record.mates) {
            write_fastq(writer, &name, mate)?;
        }
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        for writer in &mut self.writers {
            writer.flush()?;
            writer.get_mut().try_finish()?;
        }
        debug!(
            "Wrote {} records to {}",
            self.written,
            self.paths.iter().map(|p| p.display().to_string()).join(", ")
        );
        Ok(())
    }
}

fn write_fastq<W: Write>(writer: &mut W, name: &str, mate: &Mate) -> io::Result<()> {
    writer.write_all(b"@")?;
    writer.write_all(name.as_bytes())?;
    if !mate.description.is_empty() {
        writer.write_all(b" ")?;
        writer.write_all(mate.description.as_bytes())?;
    }
    writer.write_all(b"\n")?;
    writer.write_all(&mate.sequence)?;
    writer.write_all(b"\n+\n")?;
    writer.write_all(&mate.quality)?;
    writer.write_all(b"\n")
}

/// Keeps records in memory, in write order
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<RecodedRecord>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSink for MemorySink {
    fn write(&mut self, record: &RecodedRecord) -> io::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tags::TagSet;
    use crate::parsing::fastq::ReadPairReader;

    fn record(sm: &str) -> RecodedRecord {
        let mut tags = TagSet::new();
        tags.insert("SM", sm);
        tags.insert("RX", "ACG");
        RecodedRecord::new(
            tags,
            vec![
                Mate::new("r", "1:N:0:A", "ACGT", "IIII"),
                Mate::new("r", "2:N:0:A", "TT", "HH"),
            ],
        )
    }

    #[test]
    fn test_fastq_sink_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = [dir.path().join("R1.fastq.gz"), dir.path().join("R2.fastq.gz")];

        let mut sink = FastqSink::create(&paths).unwrap();
        sink.write(&record("lib_1")).unwrap();
        sink.write(&record("lib_2")).unwrap();
        sink.finish().unwrap();
        drop(sink);

        let pairs: Vec<_> = ReadPairReader::open(&paths)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].mates[0].name, "SM:lib_1;RX:ACG");
        assert_eq!(pairs[1].mates[1].sequence, b"TT");
        assert_eq!(pairs[1].mates[1].description, "2:N:0:A");
    }

    #[test]
    fn test_fastq_sink_rejects_extra_mates() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FastqSink::create(&[dir.path().join("R1.fastq.gz")]).unwrap();
        let err = sink.write(&record("x")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.write(&record("a")).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.len(), 1);
        assert!(sink.finished);
    }
}
