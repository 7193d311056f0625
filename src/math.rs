use super::*;

pub(crate) fn relu(x: f32) -> f32 {
  x.max(0.0)
}

pub(crate) fn relu_derivative(x: f32) -> f32 {
  if x > 0.0 {
    1.0
  } else {
    0.0
  }
}

/// Mean squared error and its gradient with respect to `predictions`.
pub(crate) fn mean_squared_error(
  predictions: &Array1<f32>,
  targets: &Array1<f32>,
) -> Result<(f32, Array1<f32>)> {
  ensure!(
    predictions.len() == targets.len(),
    "prediction count {} does not match target count {}",
    predictions.len(),
    targets.len()
  );

  ensure!(!predictions.is_empty(), "cannot compute loss of an empty batch");

  let n = predictions.len() as f32;

  let error = predictions - targets;

  let loss = error.mapv(|e| e * e).sum() / n;

  Ok((loss, error * (2.0 / n)))
}

pub(crate) fn glorot_uniform(
  shape: &[usize],
  fan_in: usize,
  fan_out: usize,
  rng: &mut StdRng,
) -> ArrayD<f32> {
  let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
  ArrayD::random_using(IxDyn(shape), Uniform::new(-limit, limit), rng)
}
