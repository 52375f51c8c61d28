//! LibSVM format dataset implementation
//!
//! Supports loading datasets in the libsvm format:
//! label index:value index:value ...
//!
//! Example:
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1
//!
//! Indices are taken verbatim, so index 0 is legal; within a line they must
//! be strictly ascending. Labels are kept as written (class labels or
//! regression targets).

use crate::core::{Dataset, Result, SVMError, Sample, SparseVector};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Dataset implementation for LibSVM format files
#[derive(Debug, Clone)]
pub struct LibSVMDataset {
    samples: Vec<Sample>,
    max_index: Option<usize>,
}

impl LibSVMDataset {
    /// Load a dataset from a LibSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Load a dataset from a reader
    ///
    /// Blank lines and lines starting with `#` are skipped but still counted
    /// for error line numbers.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut samples = Vec::new();
        let mut max_index: Option<usize> = None;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(SVMError::IoError)?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let sample = parse_line(line).ok_or(SVMError::InputFormat { line: line_num + 1 })?;
            if let Some(idx) = sample.features.max_index() {
                max_index = Some(max_index.map_or(idx, |m| m.max(idx)));
            }
            samples.push(sample);
        }

        if samples.is_empty() {
            return Err(SVMError::EmptyDataset);
        }

        Ok(LibSVMDataset { samples, max_index })
    }

    /// Largest feature index seen in any line
    pub fn max_index(&self) -> Option<usize> {
        self.max_index
    }

    pub fn as_samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}

/// Parse one `label index:value ...` line, None on any malformed token
pub(crate) fn parse_line(line: &str) -> Option<Sample> {
    let mut tokens = line.split_whitespace();
    let label = tokens.next()?.parse::<f64>().ok()?;

    let mut indices = Vec::new();
    let mut values = Vec::new();
    for token in tokens {
        let (index, value) = token.split_once(':')?;
        let index = index.parse::<usize>().ok()?;
        let value = value.parse::<f64>().ok()?;

        if indices.last().is_some_and(|&last| index <= last) {
            return None;
        }
        indices.push(index);
        values.push(value);
    }

    Some(Sample::new(SparseVector { indices, values }, label))
}

impl Dataset for LibSVMDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn dim(&self) -> usize {
        self.max_index.map_or(0, |m| m + 1)
    }

    fn get_sample(&self, i: usize) -> Sample {
        self.samples[i].clone()
    }

    fn get_labels(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.label).collect()
    }
}
