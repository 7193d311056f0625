use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Predict {
  #[clap(short, long, default_value = "model.json")]
  model: PathBuf,
  #[clap(short, long, default_value = "model_weights.json")]
  weights: PathBuf,
  #[clap(required = true)]
  images: Vec<PathBuf>,
}

impl Predict {
  pub(crate) fn run(self) -> Result {
    let mut model = Model::load(&self.model, &self.weights)?;

    let frames = self
      .images
      .par_iter()
      .map(|path| -> Result<(Array3<f32>, f32)> {
        Ok((prepare(path)?, 0.0))
      })
      .collect::<Result<Vec<_>>>()?;

    let batch = Batch::from_rows(frames)?;

    let predictions = model.predict(&batch.images)?;

    for (path, angle) in self.images.iter().zip(predictions.iter()) {
      println!("{}: {angle:.4}", path.display());
    }

    Ok(())
  }
}
