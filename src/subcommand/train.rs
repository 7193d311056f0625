use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Train {
  #[clap(long, default_value = "data")]
  image_dir: PathBuf,
  #[clap(long, default_value = "data/driving_log.csv")]
  driving_log: PathBuf,
  #[clap(short, long, default_value = "10")]
  epochs: usize,
  #[clap(short, long, default_value = "32")]
  batch_size: usize,
  #[clap(long, default_value = "20000")]
  samples_per_epoch: usize,
  #[clap(long, default_value = "3000")]
  validation_samples: usize,
  #[clap(short, long, default_value = "0.0001")]
  learning_rate: f32,
  #[clap(long, default_value = "0.8")]
  training_split: f32,
  #[clap(short, long, default_value = "model.json")]
  model: PathBuf,
  #[clap(short, long, default_value = "model_weights.json")]
  weights: PathBuf,
  #[clap(long, help = "Ignore a previously saved model and start over")]
  fresh: bool,
  #[clap(long, help = "Seed for shuffling, initialization, and augmentation")]
  seed: Option<u64>,
}

impl Train {
  fn initial_model(&self, rng: &mut StdRng) -> Result<Model> {
    if self.fresh || !self.model.is_file() {
      return Model::new(ModelConfig::default(), rng);
    }

    let model = Model::load(&self.model, &self.weights).with_context(|| {
      format!("unable to load model {}", self.model.display())
    })?;

    println!("Loaded trained model from {}", self.model.display());

    Ok(model)
  }

  pub(crate) fn run(self) -> Result {
    let mut rng = match self.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };

    let driving_log = DrivingLog::load(&self.driving_log, &self.image_dir)
      .context("failed to load driving log")?;

    let rows = driving_log.len();

    let (training, validation) =
      driving_log.split(self.training_split, &mut rng)?;

    println!("Driving log loaded successfully:");
    println!("  Rows: {rows}");
    println!("  Training rows: {}", training.len());
    println!("  Validation rows: {}", validation.len());

    let mut training =
      BatchGenerator::new(training, self.batch_size, rng.gen())
        .context("failed to build training generator")?;

    let mut validation =
      BatchGenerator::new(validation, self.batch_size, rng.gen())
        .context("failed to build validation generator")?;

    debug!(
      "{} training and {} validation batches per pass over the data",
      training.batches_per_epoch(),
      validation.batches_per_epoch()
    );

    let mut model = self.initial_model(&mut rng)?;

    println!("{model}");

    let optimizer = Adam::new(AdamConfig {
      learning_rate: self.learning_rate,
      ..AdamConfig::default()
    });

    let options = FitOptions {
      epochs: self.epochs,
      batch_size: self.batch_size,
      samples_per_epoch: self.samples_per_epoch,
      validation_samples: self.validation_samples,
    };

    let history = Trainer::new(
      &mut model,
      optimizer,
      options,
      StdRng::seed_from_u64(rng.gen()),
    )?
    .fit(&mut training, &mut validation)?;

    if let Some(last) = history.last() {
      println!(
        "Final loss: {:.4}, validation loss: {:.4}",
        last.loss, last.validation_loss
      );
    }

    model
      .save(&self.model, &self.weights)
      .context("failed to save model")?;

    println!(
      "Saved model to {} and {}",
      self.model.display(),
      self.weights.display()
    );

    Ok(())
  }
}
