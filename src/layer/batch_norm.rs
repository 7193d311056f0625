use super::*;

#[derive(Debug)]
struct Cache {
  normalized: Array2<f32>,
  inverse_std: Array1<f32>,
}

/// Batch normalization over the feature axis of a `(batch, features)` input.
///
/// Training passes normalize with batch statistics and fold them into the
/// moving averages; inference passes use the moving averages.
#[derive(Debug)]
pub(crate) struct BatchNorm {
  gamma: Parameter,
  beta: Parameter,
  moving_mean: Parameter,
  moving_variance: Parameter,
  momentum: f32,
  epsilon: f32,
  cache: Option<Cache>,
}

impl BatchNorm {
  pub(crate) fn new(features: usize, momentum: f32, epsilon: f32) -> Self {
    let shape = IxDyn(&[features]);

    Self {
      gamma: Parameter::trainable(ArrayD::ones(shape.clone())),
      beta: Parameter::trainable(ArrayD::zeros(shape.clone())),
      moving_mean: Parameter::frozen(ArrayD::zeros(shape.clone())),
      moving_variance: Parameter::frozen(ArrayD::ones(shape)),
      momentum,
      epsilon,
      cache: None,
    }
  }
}

impl Layer for BatchNorm {
  fn forward(
    &mut self,
    input: ArrayD<f32>,
    pass: &mut Pass,
  ) -> Result<ArrayD<f32>> {
    let input = input.into_dimensionality::<Ix2>()?;

    let gamma = self.gamma.value.view().into_dimensionality::<Ix1>()?;
    let beta = self.beta.value.view().into_dimensionality::<Ix1>()?;

    if !pass.training {
      let mean = self.moving_mean.value.view().into_dimensionality::<Ix1>()?;

      let inverse_std = self
        .moving_variance
        .value
        .mapv(|variance| 1.0 / (variance + self.epsilon).sqrt())
        .into_dimensionality::<Ix1>()?;

      let normalized = (&input - &mean) * &inverse_std;

      return Ok((normalized * &gamma + &beta).into_dyn());
    }

    let mean = input
      .mean_axis(Axis(0))
      .context("batch norm needs a non-empty batch")?;

    let centered = &input - &mean;

    let variance = centered
      .mapv(|x| x * x)
      .mean_axis(Axis(0))
      .context("batch norm needs a non-empty batch")?;

    let inverse_std = variance.mapv(|v| 1.0 / (v + self.epsilon).sqrt());

    let normalized = centered * &inverse_std;

    let output = &normalized * &gamma + &beta;

    let momentum = self.momentum;

    Zip::from(&mut self.moving_mean.value)
      .and(mean.view().into_dyn())
      .for_each(|moving, &batch| {
        *moving = momentum * *moving + (1.0 - momentum) * batch;
      });

    Zip::from(&mut self.moving_variance.value)
      .and(variance.view().into_dyn())
      .for_each(|moving, &batch| {
        *moving = momentum * *moving + (1.0 - momentum) * batch;
      });

    self.cache = Some(Cache {
      normalized,
      inverse_std,
    });

    Ok(output.into_dyn())
  }

  fn backward(&mut self, gradient: ArrayD<f32>) -> Result<ArrayD<f32>> {
    let Cache {
      normalized,
      inverse_std,
    } = cached(self.cache.take())?;

    let gradient = gradient.into_dimensionality::<Ix2>()?;

    let gamma = self.gamma.value.view().into_dimensionality::<Ix1>()?;

    let n = gradient.nrows() as f32;

    let normalized_gradient = &gradient * &gamma;

    let sum = normalized_gradient.sum_axis(Axis(0));

    let dot = (&normalized_gradient * &normalized).sum_axis(Axis(0));

    let input_gradient = (&normalized_gradient * n - &sum - &normalized * &dot)
      * &(inverse_std / n);

    self.gamma.gradient = (&gradient * &normalized).sum_axis(Axis(0)).into_dyn();
    self.beta.gradient = gradient.sum_axis(Axis(0)).into_dyn();

    Ok(input_gradient.into_dyn())
  }

  fn parameters(&self) -> Vec<&Parameter> {
    vec![
      &self.gamma,
      &self.beta,
      &self.moving_mean,
      &self.moving_variance,
    ]
  }

  fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
    vec![
      &mut self.gamma,
      &mut self.beta,
      &mut self.moving_mean,
      &mut self.moving_variance,
    ]
  }
}
