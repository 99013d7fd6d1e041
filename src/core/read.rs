use noodles::fastq;

/// One sequenced mate of a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mate {
    /// Read name, without the leading `@`
    pub name: String,

    /// Text following the name on the header line (Illumina: `1:N:0:ACGTAC`)
    pub description: String,

    pub sequence: Vec<u8>,

    pub quality: Vec<u8>,
}

impl Mate {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        sequence: impl Into<Vec<u8>>,
        quality: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            sequence: sequence.into(),
            quality: quality.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// A copy of this mate with the first `n` bases and qualities removed
    #[must_use]
    pub fn trim_start(&self, n: usize) -> Self {
        let n = n.min(self.sequence.len());
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            sequence: self.sequence[n..].to_vec(),
            quality: self.quality[n.min(self.quality.len())..].to_vec(),
        }
    }
}

impl From<fastq::Record> for Mate {
    fn from(record: fastq::Record) -> Self {
        Self {
            name: String::from_utf8_lossy(record.name()).into_owned(),
            description: String::from_utf8_lossy(record.description()).into_owned(),
            sequence: record.sequence().to_vec(),
            quality: record.quality_scores().to_vec(),
        }
    }
}

impl std::fmt::Display for Mate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "@{} {}\n{}\n+\n{}",
            self.name,
            self.description,
            String::from_utf8_lossy(&self.sequence),
            String::from_utf8_lossy(&self.quality)
        )
    }
}

/// The mates of one sequencing fragment: one for single-end, two for paired-end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPair {
    pub mates: Vec<Mate>,
}

impl ReadPair {
    pub fn new(mates: Vec<Mate>) -> Self {
        Self { mates }
    }

    pub fn single(r1: Mate) -> Self {
        Self { mates: vec![r1] }
    }

    pub fn paired(r1: Mate, r2: Mate) -> Self {
        Self {
            mates: vec![r1, r2],
        }
    }

    /// The first mate, if any
    pub fn r1(&self) -> Option<&Mate> {
        self.mates.first()
    }

    /// The second mate, if any
    pub fn r2(&self) -> Option<&Mate> {
        self.mates.get(1)
    }

    pub fn is_paired(&self) -> bool {
        self.mates.len() == 2
    }
}

impl std::fmt::Display for ReadPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, mate) in self.mates.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{mate}")?;
        }
        Ok(())
    }
}
