use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Preview {
  #[clap(long, default_value = "data")]
  image_dir: PathBuf,
  #[clap(long, default_value = "data/driving_log.csv")]
  driving_log: PathBuf,
  #[clap(short, long, default_value = "5")]
  count: usize,
  #[clap(short, long, default_value = "preview")]
  output: PathBuf,
  #[clap(long)]
  seed: Option<u64>,
}

impl Preview {
  pub(crate) fn run(self) -> Result {
    let mut rng = match self.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };

    let driving_log = DrivingLog::load(&self.driving_log, &self.image_dir)
      .context("failed to load driving log")?;

    fs::create_dir_all(&self.output).with_context(|| {
      format!("failed to create output directory {}", self.output.display())
    })?;

    for (index, sample) in
      driving_log.steering_samples(self.count).into_iter().enumerate()
    {
      for camera in Camera::ALL {
        let image = pre_process(sample.path(camera), &mut rng)?;

        let path = self.output.join(format!(
          "{}_{index}_{:+.4}.png",
          camera.name(),
          sample.steering
        ));

        to_rgb_image(&image)?
          .save(&path)
          .with_context(|| format!("failed to write {}", path.display()))?;

        println!(
          "{:<8}{:>+9.4}  {}",
          camera.name(),
          sample.steering,
          path.display()
        );
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use {super::*, tempdir::TempDir};

  #[test]
  fn preview_names_frames_by_camera_row_and_angle() {
    let dir = TempDir::new("preview").unwrap();

    for name in ["center", "left", "right"] {
      for row in 0..3 {
        write_frame(&dir.path().join(format!("{name}_{row}.png")), 320, 160);
      }
    }

    let log = dir.path().join("driving_log.csv");

    fs::write(
      &log,
      "\
center,left,right,steering
center_0.png,left_0.png,right_0.png,0
center_1.png,left_1.png,right_1.png,0.1
center_2.png,left_2.png,right_2.png,-0.25
",
    )
    .unwrap();

    let output = dir.path().join("preview");

    Preview::try_parse_from([
      "preview",
      "--image-dir",
      dir.path().to_str().unwrap(),
      "--driving-log",
      log.to_str().unwrap(),
      "--output",
      output.to_str().unwrap(),
      "--seed",
      "3",
    ])
    .unwrap()
    .run()
    .unwrap();

    let mut names = fs::read_dir(&output)
      .unwrap()
      .map(|entry| entry.unwrap().file_name().into_string().unwrap())
      .collect::<Vec<String>>();

    names.sort();

    assert_eq!(
      names,
      [
        "center_0_+0.1000.png",
        "center_1_-0.2500.png",
        "left_0_+0.1000.png",
        "left_1_-0.2500.png",
        "right_0_+0.1000.png",
        "right_1_-0.2500.png",
      ]
    );

    let frame = load_rgb(&output.join("left_0_+0.1000.png")).unwrap();

    assert_eq!(frame.dimensions(), (TARGET_WIDTH, TARGET_HEIGHT));
  }
}
