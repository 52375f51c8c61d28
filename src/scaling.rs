//! Feature scaling in the manner of svm-scale
//!
//! Every feature is mapped linearly from its observed `[min, max]` onto
//! `[lower, upper]`; optionally the target is mapped the same way. Ranges
//! are computed over all samples with absent entries counting as 0, so a
//! sparse feature's range always includes 0. Features whose range is a
//! single point are dropped and zeros are never written.

use crate::core::{Result, SVMError, Sample};
use crate::data::LibSVMDataset;
use log::warn;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Options of one scale run
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleOptions {
    pub lower: f64,
    pub upper: f64,
    /// Target bounds; targets are left alone when `None`
    pub y_range: Option<(f64, f64)>,
    /// Write the scaling parameters to this file
    pub save: Option<PathBuf>,
    /// Read the scaling parameters from this file instead of the data
    pub restore: Option<PathBuf>,
}

impl Default for ScaleOptions {
    fn default() -> Self {
        Self {
            lower: -1.0,
            upper: 1.0,
            y_range: None,
            save: None,
            restore: None,
        }
    }
}

impl ScaleOptions {
    pub fn check(&self) -> Result<()> {
        if self.upper <= self.lower {
            return Err(SVMError::Usage(
                "inconsistent lower/upper specification".to_string(),
            ));
        }
        if let Some((y_lower, y_upper)) = self.y_range {
            if y_upper <= y_lower {
                return Err(SVMError::Usage(
                    "inconsistent y_lower/y_upper specification".to_string(),
                ));
            }
        }
        if self.save.is_some() && self.restore.is_some() {
            return Err(SVMError::Usage(
                "cannot use -r and -s simultaneously".to_string(),
            ));
        }
        Ok(())
    }
}

/// Observed range of one feature or of the target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    fn empty() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn include(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Map `value` from this range onto `[lower, upper]`
    ///
    /// The endpoints map exactly onto the bounds.
    pub fn map(&self, value: f64, lower: f64, upper: f64) -> f64 {
        if value == self.min {
            lower
        } else if value == self.max {
            upper
        } else {
            lower + (upper - lower) * (value - self.min) / (self.max - self.min)
        }
    }
}

/// Target bounds and observed target range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetScaling {
    pub lower: f64,
    pub upper: f64,
    pub range: Range,
}

/// Fitted or restored scaling parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingParams {
    pub lower: f64,
    pub upper: f64,
    pub target: Option<TargetScaling>,
    /// Ranges of the features that are kept (min != max), by index
    pub features: BTreeMap<usize, Range>,
}

impl ScalingParams {
    /// Compute ranges from data
    pub fn fit(samples: &[Sample], lower: f64, upper: f64, y_range: Option<(f64, f64)>) -> Self {
        let max_index = samples.iter().filter_map(|s| s.features.max_index()).max();

        let mut ranges = vec![Range::empty(); max_index.map_or(0, |m| m + 1)];
        for sample in samples {
            // Entries absent from a line count as zeros
            let mut next = 0;
            for (&index, &value) in sample.features.indices.iter().zip(&sample.features.values) {
                for range in &mut ranges[next..index] {
                    range.include(0.0);
                }
                ranges[index].include(value);
                next = index + 1;
            }
            for range in &mut ranges[next..] {
                range.include(0.0);
            }
        }

        let features = ranges
            .into_iter()
            .enumerate()
            .filter(|(_, r)| r.min < r.max)
            .collect();

        let target = y_range.map(|(y_lower, y_upper)| {
            let mut range = Range::empty();
            for sample in samples {
                range.include(sample.label);
            }
            TargetScaling {
                lower: y_lower,
                upper: y_upper,
                range,
            }
        });

        Self {
            lower,
            upper,
            target,
            features,
        }
    }

    /// Scale one sample, dropping zeros and constant features
    pub fn scale_sample(&self, sample: &Sample) -> (f64, Vec<(usize, f64)>) {
        let label = match &self.target {
            Some(t) => t.range.map(sample.label, t.lower, t.upper),
            None => sample.label,
        };

        let pairs = self
            .features
            .iter()
            .map(|(&index, range)| {
                let value = sample.features.get(index);
                (index, range.map(value, self.lower, self.upper))
            })
            .filter(|&(_, v)| v != 0.0)
            .collect();

        (label, pairs)
    }

    /// Write every sample in LibSVM format, one per line
    pub fn write_scaled<W: Write>(&self, samples: &[Sample], out: &mut W) -> Result<()> {
        let mut original_nonzeros = 0usize;
        let mut new_nonzeros = 0usize;

        for sample in samples {
            original_nonzeros += sample.features.values.iter().filter(|&&v| v != 0.0).count();

            let (label, pairs) = self.scale_sample(sample);
            new_nonzeros += pairs.len();

            write!(out, "{label}")?;
            for (index, value) in pairs {
                write!(out, " {index}:{value}")?;
            }
            writeln!(out)?;
        }
        out.flush()?;

        if new_nonzeros > original_nonzeros {
            warn!(
                "original #nonzeros {original_nonzeros}, new #nonzeros {new_nonzeros}; \
                 if many original values are zeros, use -l 0 to keep them zero"
            );
        }
        Ok(())
    }

    /// Write the range file
    pub fn write_ranges<W: Write>(&self, out: &mut W) -> Result<()> {
        if let Some(t) = &self.target {
            writeln!(out, "y")?;
            writeln!(out, "{} {}", t.lower, t.upper)?;
            writeln!(out, "{} {}", t.range.min, t.range.max)?;
        }
        writeln!(out, "x")?;
        writeln!(out, "{} {}", self.lower, self.upper)?;
        for (index, range) in &self.features {
            writeln!(out, "{} {} {}", index, range.min, range.max)?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_ranges(&mut writer)
    }

    /// Parse a range file written by [`write_ranges`](Self::write_ranges)
    pub fn read_ranges<R: BufRead>(reader: R) -> Result<Self> {
        let lines: Vec<String> = reader
            .lines()
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .filter(|l| !l.trim().is_empty())
            .collect();
        let mut lines = lines.iter().map(|l| l.trim());

        let bad = |what: &str| SVMError::ParseError(format!("range file: {what}"));
        let pair = |line: Option<&str>, what: &str| -> Result<(f64, f64)> {
            let numbers = parse_numbers(line.ok_or_else(|| bad(what))?).ok_or_else(|| bad(what))?;
            match numbers.as_slice() {
                [a, b] => Ok((*a, *b)),
                _ => Err(bad(what)),
            }
        };

        let mut header = lines.next();
        let mut target = None;
        if header == Some("y") {
            let (y_lower, y_upper) = pair(lines.next(), "y bounds")?;
            let (y_min, y_max) = pair(lines.next(), "y range")?;
            target = Some(TargetScaling {
                lower: y_lower,
                upper: y_upper,
                range: Range {
                    min: y_min,
                    max: y_max,
                },
            });
            header = lines.next();
        }

        if header != Some("x") {
            return Err(bad("missing x section"));
        }
        let (lower, upper) = pair(lines.next(), "x bounds")?;

        let mut features = BTreeMap::new();
        for line in lines {
            let mut tokens = line.split_whitespace();
            let index = tokens
                .next()
                .and_then(|t| t.parse::<usize>().ok())
                .ok_or_else(|| bad(line))?;
            let numbers = parse_numbers(&tokens.collect::<Vec<_>>().join(" ")).ok_or_else(|| bad(line))?;
            let &[min, max] = numbers.as_slice() else {
                return Err(bad(line));
            };
            if min != max {
                features.insert(index, Range { min, max });
            }
        }

        Ok(Self {
            lower,
            upper,
            target,
            features,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_ranges(BufReader::new(File::open(path)?))
    }
}

fn parse_numbers(line: &str) -> Option<Vec<f64>> {
    line.split_whitespace().map(|t| t.parse::<f64>().ok()).collect()
}

/// Read the data file, scale it and write the result to `out`
pub fn scale_file<W: Write>(options: &ScaleOptions, data: &Path, out: &mut W) -> Result<()> {
    options.check()?;

    let samples = match LibSVMDataset::from_file(data) {
        Ok(dataset) => dataset.into_samples(),
        Err(SVMError::EmptyDataset) => Vec::new(),
        Err(e) => return Err(e),
    };

    let fitted = ScalingParams::fit(&samples, options.lower, options.upper, options.y_range);
    let params = match &options.restore {
        Some(path) => {
            let restored = ScalingParams::load(path)?;
            for index in fitted.features.keys() {
                if !restored.features.contains_key(index) {
                    warn!(
                        "feature index {index} appeared in {} was not seen in the scaling factor file {}; \
                         the feature is dropped",
                        data.display(),
                        path.display()
                    );
                }
            }
            restored
        }
        None => fitted,
    };

    if let Some(path) = &options.save {
        params.save(path)?;
    }

    params.write_scaled(&samples, out)
}
