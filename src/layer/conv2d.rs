use super::*;

#[derive(Debug)]
struct Cache {
  columns: Array2<f32>,
  input_dim: (usize, usize, usize, usize),
}

/// 2-D convolution over NHWC input, computed as an im2col matrix product.
/// The kernel is stored as `(kernel, kernel, channels, filters)`.
#[derive(Debug)]
pub(crate) struct Conv2d {
  channels: usize,
  filters: usize,
  rows: Window,
  cols: Window,
  kernel: Parameter,
  bias: Option<Parameter>,
  cache: Option<Cache>,
}

impl Conv2d {
  pub(crate) fn new(
    channels: usize,
    filters: usize,
    rows: Window,
    cols: Window,
    use_bias: bool,
    rng: &mut StdRng,
  ) -> Self {
    let receptive_field = rows.size * cols.size;

    Self {
      channels,
      filters,
      rows,
      cols,
      kernel: Parameter::trainable(glorot_uniform(
        &[rows.size, cols.size, channels, filters],
        receptive_field * channels,
        receptive_field * filters,
        rng,
      )),
      bias: use_bias
        .then(|| Parameter::trainable(ArrayD::zeros(IxDyn(&[filters])))),
      cache: None,
    }
  }

  fn kernel_matrix(&self) -> Result<ArrayView2<'_, f32>> {
    Ok(self.kernel.value.view().into_shape_with_order((
      self.rows.size * self.cols.size * self.channels,
      self.filters,
    ))?)
  }

  /// Unrolls every receptive field into a row, ordered `(ky, kx, channel)`
  /// to match the kernel's memory layout. Padding reads as zero.
  fn im2col(&self, input: ArrayView4<f32>) -> Array2<f32> {
    let batch = input.dim().0;

    let mut columns = Array2::zeros((
      batch * self.rows.output * self.cols.output,
      self.rows.size * self.cols.size * self.channels,
    ));

    for b in 0..batch {
      for oy in 0..self.rows.output {
        for ox in 0..self.cols.output {
          let row = (b * self.rows.output + oy) * self.cols.output + ox;

          for ky in 0..self.rows.size {
            let Some(y) = self.rows.source(oy, ky) else {
              continue;
            };

            for kx in 0..self.cols.size {
              let Some(x) = self.cols.source(ox, kx) else {
                continue;
              };

              let offset = (ky * self.cols.size + kx) * self.channels;

              columns
                .slice_mut(s![row, offset..offset + self.channels])
                .assign(&input.slice(s![b, y, x, ..]));
            }
          }
        }
      }
    }

    columns
  }

  /// Scatter-adds unrolled gradients back onto the input positions they
  /// were read from.
  fn col2im(
    &self,
    columns: ArrayView2<f32>,
    input_dim: (usize, usize, usize, usize),
  ) -> Array4<f32> {
    let mut output = Array4::zeros(input_dim);

    for b in 0..input_dim.0 {
      for oy in 0..self.rows.output {
        for ox in 0..self.cols.output {
          let row = (b * self.rows.output + oy) * self.cols.output + ox;

          for ky in 0..self.rows.size {
            let Some(y) = self.rows.source(oy, ky) else {
              continue;
            };

            for kx in 0..self.cols.size {
              let Some(x) = self.cols.source(ox, kx) else {
                continue;
              };

              let offset = (ky * self.cols.size + kx) * self.channels;

              let mut pixel = output.slice_mut(s![b, y, x, ..]);
              pixel += &columns.slice(s![row, offset..offset + self.channels]);
            }
          }
        }
      }
    }

    output
  }
}

impl Layer for Conv2d {
  fn forward(
    &mut self,
    input: ArrayD<f32>,
    _pass: &mut Pass,
  ) -> Result<ArrayD<f32>> {
    let input = input.into_dimensionality::<Ix4>()?;

    let (batch, height, width, channels) = input.dim();

    ensure!(
      (height, width, channels)
        == (self.rows.input, self.cols.input, self.channels),
      "conv2d expects {}x{}x{} input, got {height}x{width}x{channels}",
      self.rows.input,
      self.cols.input,
      self.channels
    );

    let columns = self.im2col(input.view());

    let mut output = columns.dot(&self.kernel_matrix()?);

    if let Some(bias) = &self.bias {
      output += &bias.value.view().into_dimensionality::<Ix1>()?;
    }

    self.cache = Some(Cache {
      columns,
      input_dim: input.dim(),
    });

    Ok(
      output
        .into_shape_with_order((
          batch,
          self.rows.output,
          self.cols.output,
          self.filters,
        ))?
        .into_dyn(),
    )
  }

  fn backward(&mut self, gradient: ArrayD<f32>) -> Result<ArrayD<f32>> {
    let Cache { columns, input_dim } = cached(self.cache.take())?;

    let gradient = gradient
      .as_standard_layout()
      .into_owned()
      .into_shape_with_order((columns.nrows(), self.filters))?;

    let column_gradient = gradient.dot(&self.kernel_matrix()?.t());

    let input_gradient = self.col2im(column_gradient.view(), input_dim);

    self.kernel.gradient = columns
      .t()
      .dot(&gradient)
      .into_shape_with_order(self.kernel.value.raw_dim())?;

    if let Some(bias) = &mut self.bias {
      bias.gradient = gradient.sum_axis(Axis(0)).into_dyn();
    }

    Ok(input_gradient.into_dyn())
  }

  fn parameters(&self) -> Vec<&Parameter> {
    let mut parameters = vec![&self.kernel];
    parameters.extend(&self.bias);
    parameters
  }

  fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
    let mut parameters = vec![&mut self.kernel];
    parameters.extend(&mut self.bias);
    parameters
  }
}
