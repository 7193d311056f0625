use {
  super::*,
  batch_norm::BatchNorm,
  conv2d::Conv2d,
  dense::Dense,
  dropout::Dropout,
  flatten::Flatten,
  max_pool2d::MaxPool2d,
  relu::Relu,
  rescale::Rescale,
};

mod batch_norm;
mod conv2d;
mod dense;
mod dropout;
mod flatten;
mod max_pool2d;
mod relu;
mod rescale;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Parameter {
  pub(crate) value: ArrayD<f32>,
  pub(crate) gradient: ArrayD<f32>,
  pub(crate) trainable: bool,
}

impl Parameter {
  pub(crate) fn trainable(value: ArrayD<f32>) -> Self {
    Self {
      gradient: ArrayD::zeros(value.raw_dim()),
      value,
      trainable: true,
    }
  }

  /// State that is persisted with the weights but never touched by the
  /// optimizer, like batch norm moving statistics.
  pub(crate) fn frozen(value: ArrayD<f32>) -> Self {
    Self {
      gradient: ArrayD::zeros(value.raw_dim()),
      value,
      trainable: false,
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.value.len()
  }
}

/// State shared by every layer during one forward pass.
#[derive(Debug)]
pub(crate) struct Pass {
  pub(crate) training: bool,
  pub(crate) rng: StdRng,
}

impl Pass {
  pub(crate) fn training(rng: StdRng) -> Self {
    Self {
      training: true,
      rng,
    }
  }

  pub(crate) fn inference() -> Self {
    Self {
      training: false,
      rng: StdRng::seed_from_u64(0),
    }
  }
}

pub(crate) trait Layer: fmt::Debug {
  fn forward(&mut self, input: ArrayD<f32>, pass: &mut Pass)
    -> Result<ArrayD<f32>>;

  /// Takes the loss gradient with respect to this layer's output, stores
  /// parameter gradients, and returns the gradient with respect to its input.
  fn backward(&mut self, gradient: ArrayD<f32>) -> Result<ArrayD<f32>>;

  fn parameters(&self) -> Vec<&Parameter> {
    Vec::new()
  }

  fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
    Vec::new()
  }
}

/// Placement of a sliding window along one spatial axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Window {
  pub(crate) input: usize,
  pub(crate) size: usize,
  pub(crate) stride: usize,
  pub(crate) pad_before: usize,
  pub(crate) output: usize,
}

impl Window {
  pub(crate) fn new(
    input: usize,
    size: usize,
    stride: usize,
    padding: Padding,
  ) -> Result<Self> {
    ensure!(size > 0 && stride > 0, "window size and stride must be positive");

    let (output, pad_before) = match padding {
      Padding::Same => {
        let output = input.div_ceil(stride);
        let total = ((output.saturating_sub(1)) * stride + size)
          .saturating_sub(input);
        (output, total / 2)
      }
      Padding::Valid => {
        ensure!(
          input >= size,
          "window of {size} does not fit in input of {input}"
        );
        ((input - size) / stride + 1, 0)
      }
    };

    ensure!(output > 0, "window produces an empty output");

    Ok(Self {
      input,
      size,
      stride,
      pad_before,
      output,
    })
  }

  /// Input coordinate read by `offset` within output position `out`, or
  /// `None` when it falls in the padding.
  pub(crate) fn source(&self, out: usize, offset: usize) -> Option<usize> {
    (out * self.stride + offset)
      .checked_sub(self.pad_before)
      .filter(|&index| index < self.input)
  }
}

fn expect_rank(config: &LayerConfig, shape: &[usize], rank: usize) -> Result {
  ensure!(
    shape.len() == rank,
    "{} layer expects input of rank {rank}, got shape {shape:?}",
    config.name()
  );
  Ok(())
}

/// Instantiates the layer described by `config` for inputs of `input_shape`
/// (batch axis excluded), returning it with its output shape.
pub(crate) fn build(
  config: &LayerConfig,
  input_shape: &[usize],
  rng: &mut StdRng,
) -> Result<(Box<dyn Layer>, Vec<usize>)> {
  let (layer, output_shape): (Box<dyn Layer>, Vec<usize>) = match *config {
    LayerConfig::Rescale { scale, offset } => (
      Box::new(Rescale::new(scale, offset)),
      input_shape.to_vec(),
    ),
    LayerConfig::Conv2d {
      filters,
      kernel_size,
      strides,
      padding,
      use_bias,
    } => {
      expect_rank(config, input_shape, 3)?;

      let rows = Window::new(input_shape[0], kernel_size, strides, padding)?;
      let cols = Window::new(input_shape[1], kernel_size, strides, padding)?;

      (
        Box::new(Conv2d::new(
          input_shape[2],
          filters,
          rows,
          cols,
          use_bias,
          rng,
        )),
        vec![rows.output, cols.output, filters],
      )
    }
    LayerConfig::Relu => (Box::new(Relu::default()), input_shape.to_vec()),
    LayerConfig::MaxPool2d { pool_size, strides } => {
      expect_rank(config, input_shape, 3)?;

      let rows =
        Window::new(input_shape[0], pool_size, strides, Padding::Valid)?;
      let cols =
        Window::new(input_shape[1], pool_size, strides, Padding::Valid)?;

      (
        Box::new(MaxPool2d::new(rows, cols)),
        vec![rows.output, cols.output, input_shape[2]],
      )
    }
    LayerConfig::Flatten => (
      Box::new(Flatten::default()),
      vec![input_shape.iter().product()],
    ),
    LayerConfig::Dropout { rate } => {
      ensure!(
        (0.0..1.0).contains(&rate),
        "dropout rate must be in [0, 1), got {rate}"
      );
      (Box::new(Dropout::new(rate)), input_shape.to_vec())
    }
    LayerConfig::Dense { units } => {
      expect_rank(config, input_shape, 1)?;
      (
        Box::new(Dense::new(input_shape[0], units, rng)),
        vec![units],
      )
    }
    LayerConfig::BatchNorm { momentum, epsilon } => {
      expect_rank(config, input_shape, 1)?;
      (
        Box::new(BatchNorm::new(input_shape[0], momentum, epsilon)),
        input_shape.to_vec(),
      )
    }
  };

  Ok((layer, output_shape))
}

fn cached<T>(cache: Option<T>) -> Result<T> {
  cache.context("backward pass requested before a training forward pass")
}

#[cfg(test)]
pub(crate) mod tests {
  use {super::*, approx::assert_abs_diff_eq};

  /// Compares a layer's input gradient against central finite differences of
  /// `sum(output * weights)`.
  pub(crate) fn check_input_gradient(
    layer: &mut dyn Layer,
    input: ArrayD<f32>,
    tolerance: f32,
  ) {
    let mut rng = StdRng::seed_from_u64(99);

    let output = layer
      .forward(input.clone(), &mut Pass::training(rng.clone()))
      .unwrap();

    let weights = ArrayD::random_using(
      output.raw_dim(),
      Uniform::new(-1.0f32, 1.0),
      &mut rng,
    );

    let analytic = layer.backward(weights.clone()).unwrap();

    let step = 1e-2;

    for index in 0..input.len() {
      let mut loss = |delta: f32| {
        let mut shifted = input.clone();
        shifted.as_slice_mut().unwrap()[index] += delta;
        let output = layer
          .forward(shifted, &mut Pass::training(StdRng::seed_from_u64(99)))
          .unwrap();
        (&output * &weights).sum()
      };

      let numeric = (loss(step) - loss(-step)) / (2.0 * step);

      assert_abs_diff_eq!(
        *analytic.iter().nth(index).unwrap(),
        numeric,
        epsilon = tolerance
      );
    }
  }

  #[test]
  fn same_window_pads_bottom_right_first() {
    let window = Window::new(64, 3, 2, Padding::Same).unwrap();
    assert_eq!((window.output, window.pad_before), (32, 0));

    let window = Window::new(31, 3, 2, Padding::Same).unwrap();
    assert_eq!((window.output, window.pad_before), (16, 1));

    assert_eq!(window.source(0, 0), None);
    assert_eq!(window.source(0, 1), Some(0));
    assert_eq!(window.source(15, 2), None);
  }

  #[test]
  fn valid_window_shrinks() {
    let window = Window::new(32, 2, 1, Padding::Valid).unwrap();
    assert_eq!(window.output, 31);

    let window = Window::new(8, 2, 2, Padding::Valid).unwrap();
    assert_eq!(window.output, 4);

    assert!(Window::new(1, 2, 2, Padding::Valid).is_err());
  }

  #[test]
  fn build_infers_shapes() {
    let mut rng = StdRng::seed_from_u64(0);

    let (_, shape) = build(
      &LayerConfig::Conv2d {
        filters: 8,
        kernel_size: 3,
        strides: 2,
        padding: Padding::Same,
        use_bias: false,
      },
      &[64, 64, 3],
      &mut rng,
    )
    .unwrap();

    assert_eq!(shape, vec![32, 32, 8]);

    let (_, shape) = build(&LayerConfig::Flatten, &[4, 4, 2], &mut rng).unwrap();

    assert_eq!(shape, vec![32]);
  }

  #[test]
  fn build_rejects_bad_configs() {
    let mut rng = StdRng::seed_from_u64(0);

    assert!(build(&LayerConfig::Dense { units: 4 }, &[4, 4, 2], &mut rng)
      .is_err());

    assert!(build(&LayerConfig::Dropout { rate: 1.0 }, &[4], &mut rng)
      .is_err());
  }
}
