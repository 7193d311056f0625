use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Camera {
  Center,
  Left,
  Right,
}

impl Camera {
  pub(crate) const ALL: [Camera; 3] = [Self::Center, Self::Left, Self::Right];

  /// Correction that maps a side camera's view back onto the center line.
  pub(crate) fn steering_offset(self) -> f32 {
    match self {
      Self::Center => 0.0,
      Self::Left => STEERING_CORRECTION,
      Self::Right => -STEERING_CORRECTION,
    }
  }

  pub(crate) fn name(self) -> &'static str {
    match self {
      Self::Center => "center",
      Self::Left => "left",
      Self::Right => "right",
    }
  }
}

pub(crate) fn augmented_row(
  sample: &Sample,
  rng: &mut StdRng,
) -> Result<(Array3<f32>, f32)> {
  let camera = *Camera::ALL
    .choose(rng)
    .context("no camera to choose from")?;

  let steering = sample.steering + camera.steering_offset();

  let image = pre_process(sample.path(camera), rng)?;

  if rng.gen::<f32>() > 0.5 {
    Ok((flip_horizontal(&image), -steering))
  } else {
    Ok((image, steering))
  }
}

#[derive(Debug)]
pub(crate) struct Batch {
  pub(crate) images: Array4<f32>,
  pub(crate) angles: Array1<f32>,
}

impl Batch {
  pub(crate) fn from_rows(rows: Vec<(Array3<f32>, f32)>) -> Result<Self> {
    let (height, width, channels) = rows
      .first()
      .map(|(image, _)| image.dim())
      .context("cannot build an empty batch")?;

    let mut images = Array4::zeros((rows.len(), height, width, channels));
    let mut angles = Array1::zeros(rows.len());

    for (index, (image, angle)) in rows.into_iter().enumerate() {
      ensure!(
        image.dim() == (height, width, channels),
        "frame {index} has shape {:?}, expected {:?}",
        image.dim(),
        (height, width, channels)
      );

      images.index_axis_mut(Axis(0), index).assign(&image);
      angles[index] = angle;
    }

    Ok(Self { images, angles })
  }

  pub(crate) fn len(&self) -> usize {
    self.angles.len()
  }
}

#[derive(Debug)]
pub(crate) struct BatchGenerator {
  samples: Vec<Sample>,
  batch_size: usize,
  batches_per_epoch: usize,
  index: usize,
  rng: StdRng,
}

impl BatchGenerator {
  pub(crate) fn new(
    samples: Vec<Sample>,
    batch_size: usize,
    seed: u64,
  ) -> Result<Self> {
    ensure!(batch_size > 0, "batch size must be positive");

    let batches_per_epoch = samples.len() / batch_size;

    ensure!(
      batches_per_epoch > 0,
      "need at least {batch_size} rows for one batch, got {}",
      samples.len()
    );

    Ok(Self {
      samples,
      batch_size,
      batches_per_epoch,
      index: 0,
      rng: StdRng::seed_from_u64(seed),
    })
  }

  pub(crate) fn batches_per_epoch(&self) -> usize {
    self.batches_per_epoch
  }

  fn next_batch(&mut self) -> Result<Batch> {
    let start = self.index * self.batch_size;
    let rows = &self.samples[start..start + self.batch_size];

    // rows past the last full batch are never visited
    self.index = (self.index + 1) % self.batches_per_epoch;

    let seeds = (0..rows.len())
      .map(|_| self.rng.gen())
      .collect::<Vec<u64>>();

    let rows = rows
      .par_iter()
      .zip(seeds.par_iter())
      .map(|(sample, &seed)| {
        augmented_row(sample, &mut StdRng::seed_from_u64(seed))
      })
      .collect::<Result<Vec<_>>>()?;

    Batch::from_rows(rows)
  }
}

impl Iterator for BatchGenerator {
  type Item = Result<Batch>;

  fn next(&mut self) -> Option<Self::Item> {
    Some(self.next_batch())
  }
}

#[cfg(test)]
pub(crate) fn write_samples(dir: &Path, angles: &[f32]) -> Vec<Sample> {
  angles
    .iter()
    .enumerate()
    .map(|(index, &steering)| {
      let sample = Sample {
        center: dir.join(format!("center_{index}.png")),
        left: dir.join(format!("left_{index}.png")),
        right: dir.join(format!("right_{index}.png")),
        steering,
      };

      for camera in Camera::ALL {
        write_frame(sample.path(camera), 320, 160);
      }

      sample
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use {super::*, tempdir::TempDir};

  fn possible_angles(steering: f32) -> Vec<f32> {
    Camera::ALL
      .iter()
      .flat_map(|camera| {
        let adjusted = steering + camera.steering_offset();
        [adjusted, -adjusted]
      })
      .collect()
  }

  #[test]
  fn camera_offsets() {
    assert_eq!(Camera::Center.steering_offset(), 0.0);
    assert_eq!(Camera::Left.steering_offset(), 0.25);
    assert_eq!(Camera::Right.steering_offset(), -0.25);
  }

  // Brightens left to right, tinted by the dominant channel of each camera.
  fn write_camera_frame(path: &Path, camera: Camera) {
    let channel = match camera {
      Camera::Center => 0,
      Camera::Left => 1,
      Camera::Right => 2,
    };

    RgbImage::from_fn(320, 160, |x, _| {
      let value = (40 + x / 2) as u8;
      let mut pixel = [value / 4; 3];
      pixel[channel] = value;
      image::Rgb(pixel)
    })
    .save(path)
    .unwrap();
  }

  fn camera_of(image: &Array3<f32>) -> Camera {
    let pixel: ndarray::ArrayView1<f32> = image.slice(s![32, 32, ..]);

    if pixel[0] > pixel[1] && pixel[0] > pixel[2] {
      Camera::Center
    } else if pixel[1] > pixel[2] {
      Camera::Left
    } else {
      Camera::Right
    }
  }

  #[test]
  fn augmented_row_negates_steering_exactly_when_mirrored() {
    let dir = TempDir::new("generator").unwrap();

    let sample = Sample {
      center: dir.path().join("center.png"),
      left: dir.path().join("left.png"),
      right: dir.path().join("right.png"),
      steering: 0.1,
    };

    for camera in Camera::ALL {
      write_camera_frame(sample.path(camera), camera);
    }

    let mut rng = StdRng::seed_from_u64(11);

    let mut seen = Vec::new();

    for _ in 0..48 {
      let (image, steering) = augmented_row(&sample, &mut rng).unwrap();

      assert_eq!(image.dim(), (64, 64, 3));

      let camera = camera_of(&image);

      let mirrored = image.slice(s![.., 0, ..]).sum()
        > image.slice(s![.., 63, ..]).sum();

      let adjusted = 0.1 + camera.steering_offset();

      let expected = if mirrored { -adjusted } else { adjusted };

      assert!((steering - expected).abs() < 1e-6);

      let unmirrored = if mirrored {
        flip_horizontal(&image)
      } else {
        image
      };

      let reference = prepare(sample.path(camera)).unwrap();

      let factor = unmirrored.sum() / reference.sum();

      assert!(
        (BRIGHTNESS_FLOOR - 0.01..=BRIGHTNESS_FLOOR + 1.01).contains(&factor)
      );

      for (&actual, &original) in unmirrored.iter().zip(reference.iter()) {
        assert!((actual - original * factor).abs() < 0.5);
      }

      if !seen.contains(&(camera, mirrored)) {
        seen.push((camera, mirrored));
      }
    }

    assert_eq!(seen.len(), 6);
  }

  #[test]
  fn generator_yields_full_batches_and_wraps() {
    let dir = TempDir::new("generator").unwrap();

    let samples = write_samples(dir.path(), &[0.0, 0.1, 0.2, 0.3, 0.4]);

    let mut generator = BatchGenerator::new(samples, 2, 5).unwrap();

    assert_eq!(generator.batches_per_epoch(), 2);

    let batches = (0..3)
      .map(|_| generator.next().unwrap().unwrap())
      .collect::<Vec<Batch>>();

    for batch in &batches {
      assert_eq!(batch.len(), 2);
      assert_eq!(batch.images.dim(), (2, 64, 64, 3));
    }

    for (index, &expected) in [0.0, 0.1].iter().enumerate() {
      assert!(possible_angles(expected)
        .iter()
        .any(|&angle| (angle - batches[2].angles[index]).abs() < 1e-6));
    }

    assert!(possible_angles(0.3)
      .iter()
      .any(|&angle| (angle - batches[1].angles[1]).abs() < 1e-6));
  }

  #[test]
  fn generator_is_deterministic_for_a_seed() {
    let dir = TempDir::new("generator").unwrap();

    let samples = write_samples(dir.path(), &[0.0, 0.1, 0.2, 0.3]);

    let mut a = BatchGenerator::new(samples.clone(), 4, 9).unwrap();
    let mut b = BatchGenerator::new(samples, 4, 9).unwrap();

    let (a, b) = (a.next().unwrap().unwrap(), b.next().unwrap().unwrap());

    assert_eq!(a.angles, b.angles);
    assert_eq!(a.images, b.images);
  }

  #[test]
  fn generator_requires_a_full_batch() {
    let dir = TempDir::new("generator").unwrap();

    let samples = write_samples(dir.path(), &[0.0, 0.1]);

    assert!(BatchGenerator::new(samples, 3, 0).is_err());
  }

  #[test]
  fn generator_surfaces_missing_frames() {
    let samples = vec![Sample {
      center: PathBuf::from("missing/center.png"),
      left: PathBuf::from("missing/left.png"),
      right: PathBuf::from("missing/right.png"),
      steering: 0.0,
    }];

    let mut generator = BatchGenerator::new(samples, 1, 0).unwrap();

    assert!(generator.next().unwrap().is_err());
  }
}
