use super::*;

/// Inverted dropout: during training each unit is zeroed with probability
/// `rate` and survivors are scaled by `1 / (1 - rate)`.
#[derive(Debug)]
pub(crate) struct Dropout {
  rate: f32,
  mask: Option<ArrayD<f32>>,
}

impl Dropout {
  pub(crate) fn new(rate: f32) -> Self {
    Self { rate, mask: None }
  }
}

impl Layer for Dropout {
  fn forward(
    &mut self,
    input: ArrayD<f32>,
    pass: &mut Pass,
  ) -> Result<ArrayD<f32>> {
    if !pass.training || self.rate == 0.0 {
      self.mask = None;
      return Ok(input);
    }

    let keep = 1.0 - self.rate;

    let mask = ArrayD::random_using(
      input.raw_dim(),
      Uniform::new(0.0f32, 1.0),
      &mut pass.rng,
    )
    .mapv_into(|u| if u < keep { 1.0 / keep } else { 0.0 });

    let output = input * &mask;

    self.mask = Some(mask);

    Ok(output)
  }

  fn backward(&mut self, gradient: ArrayD<f32>) -> Result<ArrayD<f32>> {
    match self.mask.take() {
      Some(mask) => Ok(gradient * &mask),
      None => Ok(gradient),
    }
  }
}

#[cfg(test)]
mod tests {
  use {super::*, approx::assert_relative_eq};

  #[test]
  fn dropout_is_identity_at_inference() {
    let mut layer = Dropout::new(0.5);

    let input = ArrayD::from_elem(IxDyn(&[4, 8]), 3.0);

    assert_eq!(
      layer.forward(input.clone(), &mut Pass::inference()).unwrap(),
      input
    );
  }

  #[test]
  fn dropout_scales_survivors() {
    let mut layer = Dropout::new(0.75);

    let input = ArrayD::from_elem(IxDyn(&[64, 64]), 1.0);

    let output = layer
      .forward(input, &mut Pass::training(StdRng::seed_from_u64(4)))
      .unwrap();

    assert!(output.iter().all(|&x| x == 0.0 || x == 4.0));

    let kept = output.iter().filter(|&&x| x > 0.0).count() as f32;

    assert_relative_eq!(kept / output.len() as f32, 0.25, epsilon = 0.05);

    let gradient = layer
      .backward(ArrayD::from_elem(IxDyn(&[64, 64]), 1.0))
      .unwrap();

    assert_eq!(gradient, output);
  }
}
