use super::*;

pub(crate) const CHANNELS: usize = 3;
pub(crate) const CROP_TOP: u32 = 55;
pub(crate) const CROP_BOTTOM: u32 = 135;
pub(crate) const TARGET_HEIGHT: u32 = 64;
pub(crate) const TARGET_WIDTH: u32 = 64;

/// Added to the steering angle for the left camera, subtracted for the right.
pub(crate) const STEERING_CORRECTION: f32 = 0.25;

/// Lower bound of the brightness factor, keeps jittered frames from going black.
pub(crate) const BRIGHTNESS_FLOOR: f32 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Padding {
  Same,
  Valid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum LayerConfig {
  Rescale {
    scale: f32,
    offset: f32,
  },
  Conv2d {
    filters: usize,
    kernel_size: usize,
    strides: usize,
    padding: Padding,
    use_bias: bool,
  },
  Relu,
  MaxPool2d {
    pool_size: usize,
    strides: usize,
  },
  Flatten,
  Dropout {
    rate: f32,
  },
  Dense {
    units: usize,
  },
  BatchNorm {
    momentum: f32,
    epsilon: f32,
  },
}

impl LayerConfig {
  pub(crate) fn name(&self) -> &'static str {
    match self {
      Self::Rescale { .. } => "rescale",
      Self::Conv2d { .. } => "conv2d",
      Self::Relu => "relu",
      Self::MaxPool2d { .. } => "max_pool2d",
      Self::Flatten => "flatten",
      Self::Dropout { .. } => "dropout",
      Self::Dense { .. } => "dense",
      Self::BatchNorm { .. } => "batch_norm",
    }
  }

  fn conv(filters: usize, strides: usize) -> Self {
    Self::Conv2d {
      filters,
      kernel_size: 3,
      strides,
      padding: Padding::Same,
      use_bias: false,
    }
  }

  fn batch_norm() -> Self {
    Self::BatchNorm {
      momentum: 0.99,
      epsilon: 1e-3,
    }
  }
}

/// Architecture of a model, persisted as the architecture file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ModelConfig {
  pub(crate) input_shape: Vec<usize>,
  pub(crate) layers: Vec<LayerConfig>,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      input_shape: vec![
        TARGET_HEIGHT as usize,
        TARGET_WIDTH as usize,
        CHANNELS,
      ],
      layers: vec![
        LayerConfig::Rescale {
          scale: 1.0 / 127.5,
          offset: -1.0,
        },
        LayerConfig::conv(32, 2),
        LayerConfig::Relu,
        LayerConfig::MaxPool2d {
          pool_size: 2,
          strides: 1,
        },
        LayerConfig::conv(64, 2),
        LayerConfig::Relu,
        LayerConfig::MaxPool2d {
          pool_size: 2,
          strides: 2,
        },
        LayerConfig::conv(128, 1),
        LayerConfig::Relu,
        LayerConfig::MaxPool2d {
          pool_size: 2,
          strides: 2,
        },
        LayerConfig::Flatten,
        LayerConfig::Dropout { rate: 0.5 },
        LayerConfig::Dense { units: 128 },
        LayerConfig::batch_norm(),
        LayerConfig::Relu,
        LayerConfig::Dropout { rate: 0.75 },
        LayerConfig::Dense { units: 128 },
        LayerConfig::batch_norm(),
        LayerConfig::Dense { units: 1 },
        LayerConfig::batch_norm(),
      ],
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct AdamConfig {
  pub(crate) learning_rate: f32,
  pub(crate) beta_1: f32,
  pub(crate) beta_2: f32,
  pub(crate) epsilon: f32,
  pub(crate) decay: f32,
}

impl Default for AdamConfig {
  fn default() -> Self {
    Self {
      learning_rate: 1e-4,
      beta_1: 0.9,
      beta_2: 0.999,
      epsilon: 1e-8,
      decay: 0.0,
    }
  }
}

/// Weight blob: every layer's tensors, in layer order.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SerializableWeights {
  pub(crate) layers: Vec<Vec<ArrayD<f32>>>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn model_config_round_trips_through_json() {
    let config = ModelConfig::default();

    let json = serde_json::to_string(&config).unwrap();

    assert!(json.contains(r#""type":"max_pool2d""#));
    assert!(json.contains(r#""padding":"same""#));

    assert_eq!(
      serde_json::from_str::<ModelConfig>(&json).unwrap(),
      config
    );
  }

  #[test]
  fn default_model_ends_in_single_unit() {
    let config = ModelConfig::default();

    assert_eq!(config.input_shape, vec![64, 64, 3]);

    assert_eq!(
      config.layers[config.layers.len() - 2],
      LayerConfig::Dense { units: 1 }
    );
  }
}
