use super::*;

#[derive(Debug, Default)]
pub(crate) struct Relu {
  mask: Option<ArrayD<f32>>,
}

impl Layer for Relu {
  fn forward(
    &mut self,
    input: ArrayD<f32>,
    _pass: &mut Pass,
  ) -> Result<ArrayD<f32>> {
    self.mask = Some(input.mapv(relu_derivative));
    Ok(input.mapv_into(relu))
  }

  fn backward(&mut self, gradient: ArrayD<f32>) -> Result<ArrayD<f32>> {
    Ok(gradient * &cached(self.mask.take())?)
  }
}

#[cfg(test)]
mod tests {
  use {super::*, ndarray::array};

  #[test]
  fn relu_gates_gradient_by_sign() {
    let mut layer = Relu::default();

    let output = layer
      .forward(array![-1.0, 0.0, 2.0].into_dyn(), &mut Pass::inference())
      .unwrap();

    assert_eq!(output, array![0.0, 0.0, 2.0].into_dyn());

    let gradient = layer.backward(array![5.0, 5.0, 5.0].into_dyn()).unwrap();

    assert_eq!(gradient, array![0.0, 0.0, 5.0].into_dyn());
  }

  #[test]
  fn relu_backward_requires_forward() {
    assert!(Relu::default().backward(array![1.0].into_dyn()).is_err());
  }
}
