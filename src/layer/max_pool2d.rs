use super::*;

#[derive(Debug)]
struct Cache {
  input_dim: (usize, usize, usize, usize),
  switches: Vec<(usize, usize)>,
}

#[derive(Debug)]
pub(crate) struct MaxPool2d {
  rows: Window,
  cols: Window,
  cache: Option<Cache>,
}

impl MaxPool2d {
  pub(crate) fn new(rows: Window, cols: Window) -> Self {
    Self {
      rows,
      cols,
      cache: None,
    }
  }
}

impl Layer for MaxPool2d {
  fn forward(
    &mut self,
    input: ArrayD<f32>,
    _pass: &mut Pass,
  ) -> Result<ArrayD<f32>> {
    let input = input.into_dimensionality::<Ix4>()?;

    let (batch, height, width, channels) = input.dim();

    ensure!(
      (height, width) == (self.rows.input, self.cols.input),
      "max pool expects {}x{} input, got {height}x{width}",
      self.rows.input,
      self.cols.input
    );

    let mut output =
      Array4::zeros((batch, self.rows.output, self.cols.output, channels));

    let mut switches = Vec::with_capacity(output.len());

    for b in 0..batch {
      for oy in 0..self.rows.output {
        for ox in 0..self.cols.output {
          for c in 0..channels {
            let mut best = f32::NEG_INFINITY;
            let mut position = (oy * self.rows.stride, ox * self.cols.stride);

            for py in 0..self.rows.size {
              let y = oy * self.rows.stride + py;

              for px in 0..self.cols.size {
                let x = ox * self.cols.stride + px;

                let value = input[[b, y, x, c]];

                if value > best {
                  best = value;
                  position = (y, x);
                }
              }
            }

            output[[b, oy, ox, c]] = best;
            switches.push(position);
          }
        }
      }
    }

    self.cache = Some(Cache {
      input_dim: input.dim(),
      switches,
    });

    Ok(output.into_dyn())
  }

  fn backward(&mut self, gradient: ArrayD<f32>) -> Result<ArrayD<f32>> {
    let Cache {
      input_dim,
      switches,
    } = cached(self.cache.take())?;

    let gradient = gradient.into_dimensionality::<Ix4>()?;

    ensure!(
      gradient.len() == switches.len(),
      "max pool gradient has {} elements, expected {}",
      gradient.len(),
      switches.len()
    );

    let mut input_gradient = Array4::zeros(input_dim);

    for (((b, _, _, c), &value), &(y, x)) in
      gradient.indexed_iter().zip(&switches)
    {
      input_gradient[[b, y, x, c]] += value;
    }

    Ok(input_gradient.into_dyn())
  }
}
