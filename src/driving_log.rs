use super::*;

#[derive(Debug, Deserialize)]
struct Record {
  center: String,
  left: String,
  right: String,
  steering: f32,
}

/// One row of the driving log: three camera frames and the recorded angle.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Sample {
  pub(crate) center: PathBuf,
  pub(crate) left: PathBuf,
  pub(crate) right: PathBuf,
  pub(crate) steering: f32,
}

impl Sample {
  pub(crate) fn path(&self, camera: Camera) -> &Path {
    match camera {
      Camera::Center => &self.center,
      Camera::Left => &self.left,
      Camera::Right => &self.right,
    }
  }
}

#[derive(Debug)]
pub(crate) struct DrivingLog {
  pub(crate) samples: Vec<Sample>,
}

impl DrivingLog {
  pub(crate) fn load(
    csv_path: impl AsRef<Path>,
    image_dir: impl AsRef<Path>,
  ) -> Result<Self> {
    let csv_path = csv_path.as_ref();
    let image_dir = image_dir.as_ref();

    let mut reader = csv::ReaderBuilder::new()
      .has_headers(true)
      .trim(csv::Trim::All)
      .from_path(csv_path)
      .with_context(|| {
        format!("failed to open driving log {}", csv_path.display())
      })?;

    let mut samples = Vec::new();

    for (index, record) in reader.deserialize::<Record>().enumerate() {
      let record = record.with_context(|| {
        format!(
          "failed to parse row {} of {}",
          index + 1,
          csv_path.display()
        )
      })?;

      samples.push(Sample {
        center: image_dir.join(record.center.trim()),
        left: image_dir.join(record.left.trim()),
        right: image_dir.join(record.right.trim()),
        steering: record.steering,
      });
    }

    debug!(
      "read {} rows from driving log {}",
      samples.len(),
      csv_path.display()
    );

    Ok(Self { samples })
  }

  pub(crate) fn len(&self) -> usize {
    self.samples.len()
  }

  /// Shuffles the rows and splits them into training and validation sets.
  pub(crate) fn split(
    mut self,
    training_fraction: f32,
    rng: &mut StdRng,
  ) -> Result<(Vec<Sample>, Vec<Sample>)> {
    ensure!(
      (0.0..=1.0).contains(&training_fraction),
      "training fraction must be between 0 and 1, got {training_fraction}"
    );

    self.samples.shuffle(rng);

    let training_rows = (self.samples.len() as f32 * training_fraction) as usize;

    let validation = self.samples.split_off(training_rows);

    Ok((self.samples, validation))
  }

  /// First `count` rows with a non-zero steering angle.
  pub(crate) fn steering_samples(&self, count: usize) -> Vec<&Sample> {
    self
      .samples
      .iter()
      .filter(|sample| sample.steering != 0.0)
      .take(count)
      .collect()
  }
}
