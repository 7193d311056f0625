use super::*;

#[derive(Clone, Copy, Debug)]
pub(crate) struct FitOptions {
  pub(crate) epochs: usize,
  pub(crate) batch_size: usize,
  pub(crate) samples_per_epoch: usize,
  pub(crate) validation_samples: usize,
}

impl FitOptions {
  fn training_steps(&self) -> usize {
    self.samples_per_epoch.div_ceil(self.batch_size)
  }

  fn validation_steps(&self) -> usize {
    self.validation_samples.div_ceil(self.batch_size)
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct EpochStats {
  pub(crate) epoch: usize,
  pub(crate) loss: f32,
  pub(crate) validation_loss: f32,
}

impl Display for EpochStats {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(
      f,
      "epoch {}: loss {:.4}, validation loss {:.4}",
      self.epoch, self.loss, self.validation_loss
    )
  }
}

pub(crate) struct Trainer<'a> {
  model: &'a mut Model,
  optimizer: Adam,
  options: FitOptions,
  rng: StdRng,
}

impl<'a> Trainer<'a> {
  pub(crate) fn new(
    model: &'a mut Model,
    optimizer: Adam,
    options: FitOptions,
    rng: StdRng,
  ) -> Result<Self> {
    ensure!(options.batch_size > 0, "batch size must be positive");
    ensure!(options.epochs > 0, "epoch count must be positive");
    ensure!(
      options.samples_per_epoch > 0,
      "samples per epoch must be positive"
    );
    ensure!(
      options.validation_samples > 0,
      "validation samples must be positive"
    );

    Ok(Self {
      model,
      optimizer,
      options,
      rng,
    })
  }

  fn progress_bar(&self, length: usize) -> Result<ProgressBar> {
    let progress_bar = ProgressBar::new(length as u64);

    progress_bar.set_style(
      ProgressStyle::default_bar()
        .template(
          "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} Batches {msg}",
        )?
        .progress_chars("=>-"),
    );

    Ok(progress_bar)
  }

  /// Trains for the configured number of epochs, drawing training and
  /// validation batches from the given streams.
  pub(crate) fn fit<T, V>(
    &mut self,
    training: &mut T,
    validation: &mut V,
  ) -> Result<Vec<EpochStats>>
  where
    T: Iterator<Item = Result<Batch>>,
    V: Iterator<Item = Result<Batch>>,
  {
    let training_steps = self.options.training_steps();
    let validation_steps = self.options.validation_steps();

    info!(
      "fitting {} epochs of {training_steps} training and {validation_steps} validation batches",
      self.options.epochs
    );

    let mut history = Vec::with_capacity(self.options.epochs);

    for epoch in 1..=self.options.epochs {
      println!("Epoch {epoch}/{}", self.options.epochs);

      let progress_bar = self.progress_bar(training_steps)?;

      let mut loss = 0.0;

      for step in 0..training_steps {
        let batch = training
          .next()
          .context("training batch stream ended")?
          .context("failed to generate training batch")?;

        ensure!(
          batch.len() == self.options.batch_size,
          "training batch has {} rows, expected {}",
          batch.len(),
          self.options.batch_size
        );

        let batch_loss =
          self
            .model
            .train_batch(&batch, &mut self.optimizer, &mut self.rng)?;

        loss += (batch_loss - loss) / (step + 1) as f32;

        progress_bar.set_message(format!("loss: {loss:.4}"));
        progress_bar.inc(1);
      }

      let mut validation_loss = 0.0;

      for step in 0..validation_steps {
        let batch = validation
          .next()
          .context("validation batch stream ended")?
          .context("failed to generate validation batch")?;

        let batch_loss = self.model.evaluate_batch(&batch)?;

        validation_loss += (batch_loss - validation_loss) / (step + 1) as f32;
      }

      progress_bar.finish_with_message(format!(
        "loss: {loss:.4} - val_loss: {validation_loss:.4}"
      ));

      let stats = EpochStats {
        epoch,
        loss,
        validation_loss,
      };

      debug!("{stats}");

      history.push(stats);
    }

    Ok(history)
  }
}
