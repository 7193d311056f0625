use super::*;

#[derive(Debug, Default)]
pub(crate) struct Flatten {
  input_shape: Option<IxDyn>,
}

impl Layer for Flatten {
  fn forward(
    &mut self,
    input: ArrayD<f32>,
    _pass: &mut Pass,
  ) -> Result<ArrayD<f32>> {
    let batch = input.shape()[0];
    let features = input.len() / batch.max(1);

    self.input_shape = Some(input.raw_dim());

    Ok(
      input
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order((batch, features))?
        .into_dyn(),
    )
  }

  fn backward(&mut self, gradient: ArrayD<f32>) -> Result<ArrayD<f32>> {
    let shape = cached(self.input_shape.take())?;

    Ok(
      gradient
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order(shape)?,
    )
  }
}
