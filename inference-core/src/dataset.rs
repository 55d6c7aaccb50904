use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Tabular classification data: one feature row per target label
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<i64>,
}

impl Dataset {
    pub fn new(features: Vec<Vec<f64>>, targets: Vec<i64>) -> Result<Self> {
        let dataset = Self { features, targets };
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.len() != self.targets.len() {
            bail!(
                "{} feature rows but {} targets",
                self.features.len(),
                self.targets.len()
            );
        }

        let width = self.n_features();
        if let Some(idx) = self.features.iter().position(|row| row.len() != width) {
            bail!(
                "row {} has {} features, expected {}",
                idx,
                self.features[idx].len(),
                width
            );
        }

        if self.features.iter().flatten().any(|v| !v.is_finite()) {
            bail!("dataset contains non-finite feature values");
        }

        Ok(())
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Self::from_reader(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parse numeric CSV where the last column is the class label.
    ///
    /// A first line that is not entirely numeric is taken as a header.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut features = Vec::new();
        let mut targets = Vec::new();
        let mut width: Option<usize> = None;
        let mut seen_first = false;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let parsed: Result<Vec<f64>, _> = trimmed.split(',').map(|f| f.trim().parse::<f64>()).collect();
            let values = match parsed {
                Ok(values) => values,
                Err(_) if !seen_first => {
                    seen_first = true;
                    continue;
                }
                Err(e) => bail!("line {}: {}", line_no, e),
            };
            seen_first = true;

            if values.len() < 2 {
                bail!("line {}: need at least one feature and a target", line_no);
            }
            match width {
                Some(w) if w != values.len() => {
                    bail!("line {}: expected {} columns, found {}", line_no, w, values.len())
                }
                _ => width = Some(values.len()),
            }

            let (row, target) = values.split_at(values.len() - 1);
            if row.iter().any(|v| !v.is_finite()) {
                bail!("line {}: non-finite feature value", line_no);
            }
            targets.push(parse_label(target[0]).with_context(|| format!("line {}", line_no))?);
            features.push(row.to_vec());
        }

        Ok(Self { features, targets })
    }

    /// Headerless CSV with the target as the last column
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = BufWriter::new(writer);
        for (row, target) in self.features.iter().zip(&self.targets) {
            for value in row {
                write!(writer, "{},", value)?;
            }
            writeln!(writer, "{}", target)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_csv_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        self.write_csv(file)
    }

    /// Shuffle with a fixed seed, then cut off `ceil(len * test_fraction)` rows for testing
    pub fn train_test_split(&self, test_fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            bail!("test fraction must be between 0 and 1, got {}", test_fraction);
        }

        let n_test = (self.len() as f64 * test_fraction).ceil() as usize;
        if n_test == 0 || n_test >= self.len() {
            bail!("cannot split {} rows with test fraction {}", self.len(), test_fraction);
        }

        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        let (test_idx, train_idx) = order.split_at(n_test);
        Ok((self.select(train_idx), self.select(test_idx)))
    }

    fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }

    /// Two-class synthetic data, column by column:
    ///
    /// * `n_informative` columns: unit Gaussian blobs around opposite
    ///   corners of a hypercube, one corner per class.
    /// * `n_redundant` columns: fixed random linear combinations of the
    ///   informative columns.
    /// * the rest: pure noise.
    ///
    /// Columns keep that order; they are not shuffled.
    pub fn make_classification(
        n_samples: usize,
        n_features: usize,
        n_informative: usize,
        n_redundant: usize,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let n_informative = n_informative.min(n_features);
        let n_redundant = n_redundant.min(n_features - n_informative);

        let centroid: Vec<f64> = (0..n_informative)
            .map(|_| if rng.gen_bool(0.5) { 1.0 } else { -1.0 })
            .collect();
        let centroids = [centroid.iter().map(|c| -c).collect::<Vec<f64>>(), centroid];

        let weights: Vec<Vec<f64>> = (0..n_redundant)
            .map(|_| (0..n_informative).map(|_| rng.gen_range(-1.0..=1.0)).collect())
            .collect();

        let mut targets: Vec<i64> = (0..n_samples).map(|i| (i % 2) as i64).collect();
        targets.shuffle(&mut rng);

        let features = targets
            .iter()
            .map(|&class| {
                let mut row: Vec<f64> = centroids[class as usize]
                    .iter()
                    .map(|c| c + standard_normal(&mut rng))
                    .collect();
                let redundant: Vec<f64> = weights
                    .iter()
                    .map(|w| w.iter().zip(&row).map(|(w, x)| w * x).sum())
                    .collect();
                row.extend(redundant);
                row.extend((row.len()..n_features).map(|_| standard_normal(&mut rng)));
                row
            })
            .collect();

        Self { features, targets }
    }
}

// Largest magnitude below which every integer is exactly representable as f64
const MAX_EXACT_LABEL: f64 = 9_007_199_254_740_992.0;

fn parse_label(value: f64) -> Result<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        bail!("target {} is not an integer class label", value);
    }
    if value.abs() >= MAX_EXACT_LABEL {
        bail!("target {} is too large to be an exact class label", value);
    }
    Ok(value as i64)
}

// Box-Muller transform
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
