use super::*;

/// Affine map applied to raw pixels, `x * scale + offset`.
#[derive(Debug)]
pub(crate) struct Rescale {
  scale: f32,
  offset: f32,
}

impl Rescale {
  pub(crate) fn new(scale: f32, offset: f32) -> Self {
    Self { scale, offset }
  }
}

impl Layer for Rescale {
  fn forward(
    &mut self,
    input: ArrayD<f32>,
    _pass: &mut Pass,
  ) -> Result<ArrayD<f32>> {
    Ok(input.mapv(|x| x * self.scale + self.offset))
  }

  fn backward(&mut self, gradient: ArrayD<f32>) -> Result<ArrayD<f32>> {
    Ok(gradient * self.scale)
  }
}

#[cfg(test)]
mod tests {
  use {super::*, approx::assert_relative_eq, ndarray::array};

  #[test]
  fn rescale_maps_pixels_to_unit_range() {
    let mut layer = Rescale::new(1.0 / 127.5, -1.0);

    let output = layer
      .forward(array![0.0, 127.5, 255.0].into_dyn(), &mut Pass::inference())
      .unwrap();

    assert_relative_eq!(output[[0]], -1.0);
    assert_relative_eq!(output[[1]], 0.0);
    assert_relative_eq!(output[[2]], 1.0);

    let gradient = layer.backward(array![2.0].into_dyn()).unwrap();

    assert_relative_eq!(gradient[[0]], 2.0 / 127.5);
  }
}
