use super::*;

#[derive(Debug)]
pub(crate) struct Dense {
  kernel: Parameter,
  bias: Parameter,
  input: Option<Array2<f32>>,
}

impl Dense {
  pub(crate) fn new(inputs: usize, units: usize, rng: &mut StdRng) -> Self {
    Self {
      kernel: Parameter::trainable(glorot_uniform(
        &[inputs, units],
        inputs,
        units,
        rng,
      )),
      bias: Parameter::trainable(ArrayD::zeros(IxDyn(&[units]))),
      input: None,
    }
  }

  #[cfg(test)]
  fn from_weights(kernel: Array2<f32>, bias: Array1<f32>) -> Self {
    Self {
      kernel: Parameter::trainable(kernel.into_dyn()),
      bias: Parameter::trainable(bias.into_dyn()),
      input: None,
    }
  }
}

impl Layer for Dense {
  fn forward(
    &mut self,
    input: ArrayD<f32>,
    _pass: &mut Pass,
  ) -> Result<ArrayD<f32>> {
    let input = input.into_dimensionality::<Ix2>()?;

    let kernel = self.kernel.value.view().into_dimensionality::<Ix2>()?;
    let bias = self.bias.value.view().into_dimensionality::<Ix1>()?;

    let output = input.dot(&kernel) + &bias;

    self.input = Some(input);

    Ok(output.into_dyn())
  }

  fn backward(&mut self, gradient: ArrayD<f32>) -> Result<ArrayD<f32>> {
    let input = cached(self.input.take())?;

    let gradient = gradient.into_dimensionality::<Ix2>()?;

    let kernel = self.kernel.value.view().into_dimensionality::<Ix2>()?;

    let input_gradient = gradient.dot(&kernel.t());

    self.kernel.gradient = input.t().dot(&gradient).into_dyn();
    self.bias.gradient = gradient.sum_axis(Axis(0)).into_dyn();

    Ok(input_gradient.into_dyn())
  }

  fn parameters(&self) -> Vec<&Parameter> {
    vec![&self.kernel, &self.bias]
  }

  fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
    vec![&mut self.kernel, &mut self.bias]
  }
}
