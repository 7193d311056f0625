use super::*;

pub(crate) fn load_rgb(path: &Path) -> Result<RgbImage> {
  Ok(
    image::open(path)
      .with_context(|| format!("failed to load image {}", path.display()))?
      .to_rgb8(),
  )
}

pub(crate) fn crop_and_resize(image: &RgbImage) -> Result<Array3<f32>> {
  let (width, height) = image.dimensions();

  if height < CROP_BOTTOM {
    bail!(
      "image is {width}x{height}, expected at least {CROP_BOTTOM} rows to crop"
    );
  }

  let cropped =
    imageops::crop_imm(image, 0, CROP_TOP, width, CROP_BOTTOM - CROP_TOP)
      .to_image();

  let resized = imageops::resize(
    &cropped,
    TARGET_WIDTH,
    TARGET_HEIGHT,
    FilterType::Triangle,
  );

  Ok(Array3::from_shape_vec(
    (TARGET_HEIGHT as usize, TARGET_WIDTH as usize, CHANNELS),
    resized.into_raw().into_iter().map(f32::from).collect(),
  )?)
}

/// Hue in degrees, saturation in `[0, 1]`, value on the input's scale.
pub(crate) fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
  let max = r.max(g).max(b);
  let min = r.min(g).min(b);
  let delta = max - min;

  let hue = if delta == 0.0 {
    0.0
  } else if max == r {
    60.0 * ((g - b) / delta).rem_euclid(6.0)
  } else if max == g {
    60.0 * ((b - r) / delta + 2.0)
  } else {
    60.0 * ((r - g) / delta + 4.0)
  };

  let saturation = if max == 0.0 { 0.0 } else { delta / max };

  (hue, saturation, max)
}

pub(crate) fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
  let chroma = v * s;
  let sector = h.rem_euclid(360.0) / 60.0;
  let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
  let m = v - chroma;

  let (r, g, b) = match sector as u32 {
    0 => (chroma, x, 0.0),
    1 => (x, chroma, 0.0),
    2 => (0.0, chroma, x),
    3 => (0.0, x, chroma),
    4 => (x, 0.0, chroma),
    _ => (chroma, 0.0, x),
  };

  (r + m, g + m, b + m)
}

pub(crate) fn scale_brightness(image: &mut Array3<f32>, factor: f32) {
  for mut pixel in image.lanes_mut(Axis(2)) {
    let (h, s, v) = rgb_to_hsv(pixel[0], pixel[1], pixel[2]);

    let (r, g, b) = hsv_to_rgb(h, s, (v * factor).min(255.0));

    pixel[0] = r;
    pixel[1] = g;
    pixel[2] = b;
  }
}

pub(crate) fn augment_brightness(image: &mut Array3<f32>, rng: &mut StdRng) {
  let factor = BRIGHTNESS_FLOOR + rng.gen::<f32>();
  scale_brightness(image, factor);
}

pub(crate) fn flip_horizontal(image: &Array3<f32>) -> Array3<f32> {
  image.slice(s![.., ..;-1, ..]).to_owned()
}

pub(crate) fn to_rgb_image(image: &Array3<f32>) -> Result<RgbImage> {
  let (height, width, channels) = image.dim();

  ensure!(channels == CHANNELS, "expected an RGB frame, got {channels} channels");

  let pixels = image
    .iter()
    .map(|&value| value.round().clamp(0.0, 255.0) as u8)
    .collect();

  RgbImage::from_raw(width as u32, height as u32, pixels)
    .context("frame buffer does not match its dimensions")
}

/// Frame as seen at inference time: cropped and resized only.
pub(crate) fn prepare(path: &Path) -> Result<Array3<f32>> {
  crop_and_resize(&load_rgb(path)?)
    .with_context(|| format!("failed to pre-process {}", path.display()))
}

/// Frame as seen during training, with brightness jitter applied.
pub(crate) fn pre_process(path: &Path, rng: &mut StdRng) -> Result<Array3<f32>> {
  let mut image = prepare(path)?;
  augment_brightness(&mut image, rng);
  Ok(image)
}

#[cfg(test)]
pub(crate) fn write_frame(path: &Path, width: u32, height: u32) {
  RgbImage::from_fn(width, height, |x, y| {
    image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
  })
  .save(path)
  .unwrap();
}
