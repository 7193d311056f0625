use super::*;

/// A sequential stack of layers mapping camera frames to steering angles.
#[derive(Debug)]
pub(crate) struct Model {
  config: ModelConfig,
  layers: Vec<Box<dyn Layer>>,
  output_shapes: Vec<Vec<usize>>,
}

impl Model {
  pub(crate) fn new(config: ModelConfig, rng: &mut StdRng) -> Result<Self> {
    ensure!(!config.layers.is_empty(), "model has no layers");

    let mut shape = config.input_shape.clone();
    let mut layers = Vec::with_capacity(config.layers.len());
    let mut output_shapes = Vec::with_capacity(config.layers.len());

    for (index, layer_config) in config.layers.iter().enumerate() {
      let (layer, output_shape) = layer::build(layer_config, &shape, rng)
        .with_context(|| {
          format!("invalid layer {index} ({})", layer_config.name())
        })?;

      layers.push(layer);
      output_shapes.push(output_shape.clone());
      shape = output_shape;
    }

    ensure!(
      shape == [1],
      "model must produce one steering value per frame, got output shape {shape:?}"
    );

    Ok(Self {
      config,
      layers,
      output_shapes,
    })
  }

  pub(crate) fn forward(
    &mut self,
    images: &Array4<f32>,
    pass: &mut Pass,
  ) -> Result<Array1<f32>> {
    ensure!(
      images.shape()[1..] == self.config.input_shape[..],
      "model expects frames of shape {:?}, got {:?}",
      self.config.input_shape,
      &images.shape()[1..]
    );

    let mut activation = images.clone().into_dyn();

    for layer in &mut self.layers {
      activation = layer.forward(activation, pass)?;
    }

    Ok(
      activation
        .into_dimensionality::<Ix2>()?
        .index_axis_move(Axis(1), 0),
    )
  }

  pub(crate) fn predict(&mut self, images: &Array4<f32>) -> Result<Array1<f32>> {
    self.forward(images, &mut Pass::inference())
  }

  /// One optimization step on `batch`, returning the mean squared error
  /// measured before the update.
  pub(crate) fn train_batch(
    &mut self,
    batch: &Batch,
    optimizer: &mut Adam,
    rng: &mut StdRng,
  ) -> Result<f32> {
    let mut pass = Pass::training(StdRng::seed_from_u64(rng.gen()));

    let predictions = self.forward(&batch.images, &mut pass)?;

    let (loss, gradient) = mean_squared_error(&predictions, &batch.angles)?;

    let mut gradient = gradient.insert_axis(Axis(1)).into_dyn();

    for layer in self.layers.iter_mut().rev() {
      gradient = layer.backward(gradient)?;
    }

    optimizer.step(self.parameters_mut())?;

    Ok(loss)
  }

  pub(crate) fn evaluate_batch(&mut self, batch: &Batch) -> Result<f32> {
    let predictions = self.predict(&batch.images)?;
    Ok(mean_squared_error(&predictions, &batch.angles)?.0)
  }

  fn parameters(&self) -> Vec<&Parameter> {
    self
      .layers
      .iter()
      .flat_map(|layer| layer.parameters())
      .collect()
  }

  fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
    self
      .layers
      .iter_mut()
      .flat_map(|layer| layer.parameters_mut())
      .collect()
  }

  pub(crate) fn save(&self, architecture: &Path, weights: &Path) -> Result {
    let file = File::create(architecture).with_context(|| {
      format!("failed to create architecture file {}", architecture.display())
    })?;

    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, &self.config)
      .context("failed to serialize model architecture")?;

    writer.flush()?;

    let serializable_weights = SerializableWeights {
      layers: self
        .layers
        .iter()
        .map(|layer| {
          layer
            .parameters()
            .into_iter()
            .map(|parameter| parameter.value.clone())
            .collect()
        })
        .collect(),
    };

    let file = File::create(weights).with_context(|| {
      format!("failed to create weights file {}", weights.display())
    })?;

    let mut writer = BufWriter::new(file);

    serde_json::to_writer(&mut writer, &serializable_weights)
      .context("failed to serialize model weights")?;

    writer.flush()?;

    Ok(())
  }

  pub(crate) fn load(architecture: &Path, weights: &Path) -> Result<Self> {
    let file = File::open(architecture).with_context(|| {
      format!("failed to open architecture file {}", architecture.display())
    })?;

    let config: ModelConfig = serde_json::from_reader(BufReader::new(file))
      .context("failed to deserialize model architecture")?;

    let mut model = Self::new(config, &mut StdRng::seed_from_u64(0))?;

    let file = File::open(weights).with_context(|| {
      format!("failed to open weights file {}", weights.display())
    })?;

    let serializable_weights: SerializableWeights =
      serde_json::from_reader(BufReader::new(file))
        .context("failed to deserialize model weights")?;

    model.set_weights(serializable_weights)?;

    Ok(model)
  }

  fn set_weights(&mut self, weights: SerializableWeights) -> Result {
    ensure!(
      weights.layers.len() == self.layers.len(),
      "weights describe {} layers, model has {}",
      weights.layers.len(),
      self.layers.len()
    );

    for (index, (layer, tensors)) in
      self.layers.iter_mut().zip(weights.layers).enumerate()
    {
      let mut parameters = layer.parameters_mut();

      ensure!(
        parameters.len() == tensors.len(),
        "layer {index} expects {} weight tensors, got {}",
        parameters.len(),
        tensors.len()
      );

      for (parameter, tensor) in parameters.iter_mut().zip(tensors) {
        ensure!(
          parameter.value.shape() == tensor.shape(),
          "layer {index} expects weights of shape {:?}, got {:?}",
          parameter.value.shape(),
          tensor.shape()
        );

        parameter.value = tensor.as_standard_layout().into_owned();
      }
    }

    Ok(())
  }
}

impl Display for Model {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    writeln!(f, "{:<16}{:<24}{:>10}", "Layer", "Output Shape", "Param #")?;
    writeln!(f, "{}", "=".repeat(50))?;

    for ((layer_config, layer), shape) in self
      .config
      .layers
      .iter()
      .zip(&self.layers)
      .zip(&self.output_shapes)
    {
      let shape = shape
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<String>>()
        .join(", ");

      let count = layer
        .parameters()
        .iter()
        .map(|parameter| parameter.len())
        .sum::<usize>();

      writeln!(
        f,
        "{:<16}{:<24}{:>10}",
        layer_config.name(),
        format!("(None, {shape})"),
        count
      )?;
    }

    let parameters = self.parameters();

    let total = parameters.iter().map(|p| p.len()).sum::<usize>();

    let trainable = parameters
      .iter()
      .filter(|p| p.trainable)
      .map(|p| p.len())
      .sum::<usize>();

    writeln!(f, "{}", "=".repeat(50))?;
    writeln!(f, "Total params: {total}")?;
    writeln!(f, "Trainable params: {trainable}")?;
    write!(f, "Non-trainable params: {}", total - trainable)
  }
}
