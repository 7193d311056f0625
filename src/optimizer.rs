use super::*;

#[derive(Debug)]
pub(crate) struct Adam {
  config: AdamConfig,
  iterations: u64,
  moments: Vec<(ArrayD<f32>, ArrayD<f32>)>,
}

impl Adam {
  pub(crate) fn new(config: AdamConfig) -> Self {
    Self {
      config,
      iterations: 0,
      moments: Vec::new(),
    }
  }

  pub(crate) fn learning_rate(&self) -> f32 {
    self.config.learning_rate
      / (1.0 + self.config.decay * self.iterations as f32)
  }

  /// Applies one update to every trainable parameter using its stored
  /// gradient. Moment buffers are created on the first step.
  pub(crate) fn step(&mut self, parameters: Vec<&mut Parameter>) -> Result {
    let parameters = parameters
      .into_iter()
      .filter(|parameter| parameter.trainable)
      .collect::<Vec<&mut Parameter>>();

    if self.moments.is_empty() {
      self.moments = parameters
        .iter()
        .map(|parameter| {
          (
            ArrayD::zeros(parameter.value.raw_dim()),
            ArrayD::zeros(parameter.value.raw_dim()),
          )
        })
        .collect();
    }

    ensure!(
      self.moments.len() == parameters.len(),
      "optimizer tracks {} parameters, got {}",
      self.moments.len(),
      parameters.len()
    );

    let learning_rate = self.learning_rate();

    self.iterations += 1;

    let AdamConfig {
      beta_1,
      beta_2,
      epsilon,
      ..
    } = self.config;

    let t = self.iterations as i32;

    let step_size =
      learning_rate * (1.0 - beta_2.powi(t)).sqrt() / (1.0 - beta_1.powi(t));

    for (parameter, (m, v)) in parameters.into_iter().zip(&mut self.moments) {
      ensure!(
        parameter.gradient.shape() == parameter.value.shape()
          && m.shape() == parameter.value.shape(),
        "gradient shape {:?} does not match parameter shape {:?}",
        parameter.gradient.shape(),
        parameter.value.shape()
      );

      Zip::from(&mut parameter.value)
        .and(&parameter.gradient)
        .and(m)
        .and(v)
        .for_each(|value, &gradient, m, v| {
          *m = beta_1 * *m + (1.0 - beta_1) * gradient;
          *v = beta_2 * *v + (1.0 - beta_2) * gradient * gradient;
          *value -= step_size * *m / (v.sqrt() + epsilon);
        });
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use {super::*, approx::assert_relative_eq, ndarray::array};

  #[test]
  fn first_step_moves_by_learning_rate() {
    let mut optimizer = Adam::new(AdamConfig {
      learning_rate: 0.01,
      ..AdamConfig::default()
    });

    let mut parameter = Parameter::trainable(array![1.0, -1.0].into_dyn());
    parameter.gradient = array![0.5, -3.0].into_dyn();

    optimizer.step(vec![&mut parameter]).unwrap();

    assert_relative_eq!(parameter.value[[0]], 0.99, epsilon = 1e-5);
    assert_relative_eq!(parameter.value[[1]], -0.99, epsilon = 1e-5);
  }

  #[test]
  fn frozen_parameters_are_skipped() {
    let mut optimizer = Adam::new(AdamConfig::default());

    let mut frozen = Parameter::frozen(array![2.0].into_dyn());
    frozen.gradient = array![1.0].into_dyn();

    let mut trainable = Parameter::trainable(array![2.0].into_dyn());
    trainable.gradient = array![1.0].into_dyn();

    optimizer.step(vec![&mut frozen, &mut trainable]).unwrap();

    assert_eq!(frozen.value[[0]], 2.0);
    assert!(trainable.value[[0]] < 2.0);
  }

  #[test]
  fn decay_shrinks_learning_rate() {
    let mut optimizer = Adam::new(AdamConfig {
      decay: 1.0,
      ..AdamConfig::default()
    });

    let mut parameter = Parameter::trainable(array![0.0].into_dyn());

    optimizer.step(vec![&mut parameter]).unwrap();

    assert_relative_eq!(optimizer.learning_rate(), 0.5e-4);
  }
}
