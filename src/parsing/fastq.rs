use flate2::read::MultiGzDecoder;
use noodles::fastq;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

use crate::core::read::{Mate, ReadPair};

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid FASTQ record {record} in '{path}': {source}")]
    Record {
        path: String,
        record: u64,
        source: std::io::Error,
    },

    #[error("Mate files are out of step: '{path}' ended at record {record} while other mates continue")]
    MateCountMismatch { path: String, record: u64 },

    #[error("Expected 1 or 2 mate files, got {0}")]
    MateFiles(usize),
}

/// Open a FASTQ file, decompressing when the name ends in `.gz`
///
/// # Errors
///
/// Returns `ReadError::Open` if the file cannot be opened.
pub fn open_fastq(path: &Path) -> Result<fastq::io::Reader<Box<dyn BufRead>>, ReadError> {
    let file = File::open(path).map_err(|source| ReadError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let gzipped = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"));

    let inner: Box<dyn BufRead> = if gzipped {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(fastq::io::Reader::new(inner))
}

/// Streams read pairs from one FASTQ reader per mate, in file order.
///
/// Records are pulled lazily, one pair at a time. The stream ends when every
/// mate file is exhausted; a mate file that ends before the others is an error.
pub struct ReadPairReader<R: BufRead> {
    readers: Vec<fastq::io::Reader<R>>,
    sources: Vec<String>,
    record: u64,
    done: bool,
}

impl ReadPairReader<Box<dyn BufRead>> {
    /// Open one file per mate
    ///
    /// # Errors
    ///
    /// Returns `ReadError::MateFiles` unless one or two paths are given, or
    /// `ReadError::Open` if a file cannot be opened.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ReadError> {
        if paths.is_empty() || paths.len() > 2 {
            return Err(ReadError::MateFiles(paths.len()));
        }
        let readers = paths
            .iter()
            .map(|p| open_fastq(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let sources = paths
            .iter()
            .map(|p| p.as_ref().display().to_string())
            .collect();
        Ok(Self::with_sources(readers, sources))
    }
}

impl<R: BufRead> ReadPairReader<R> {
    /// Stream pairs from in-memory or already opened sources
    pub fn from_readers(inners: Vec<R>) -> Self {
        let sources = (1..=inners.len()).map(|i| format!("R{i}")).collect();
        let readers = inners.into_iter().map(fastq::io::Reader::new).collect();
        Self::with_sources(readers, sources)
    }

    fn with_sources(readers: Vec<fastq::io::Reader<R>>, sources: Vec<String>) -> Self {
        Self {
            readers,
            sources,
            record: 0,
            done: false,
        }
    }

    fn next_pair(&mut self) -> Result<Option<ReadPair>, ReadError> {
        let mut mates = Vec::with_capacity(self.readers.len());
        let mut exhausted = Vec::new();

        for (i, reader) in self.readers.iter_mut().enumerate() {
            let mut record = fastq::Record::default();
            let n = reader
                .read_record(&mut record)
                .map_err(|source| ReadError::Record {
                    path: self.sources[i].clone(),
                    record: self.record + 1,
                    source,
                })?;
            if n == 0 {
                exhausted.push(i);
            } else {
                mates.push(Mate::from(record));
            }
        }

        if exhausted.len() == self.readers.len() {
            return Ok(None);
        }
        if let Some(&i) = exhausted.first() {
            return Err(ReadError::MateCountMismatch {
                path: self.sources[i].clone(),
                record: self.record + 1,
            });
        }

        self.record += 1;
        Ok(Some(ReadPair::new(mates)))
    }
}

impl<R: BufRead> Iterator for ReadPairReader<R> {
    type Item = Result<ReadPair, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_pair() {
            Ok(Some(pair)) => Some(Ok(pair)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
