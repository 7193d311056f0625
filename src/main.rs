use {
  crate::{
    arguments::Arguments,
    config::*,
    driving_log::{DrivingLog, Sample},
    generator::{Batch, BatchGenerator, Camera},
    layer::{Layer, Parameter, Pass},
    math::*,
    model::Model,
    optimizer::Adam,
    preprocess::*,
    subcommand::Subcommand,
    trainer::{FitOptions, Trainer},
  },
  anyhow::{bail, ensure, Context},
  clap::Parser,
  image::{
    imageops::{self, FilterType},
    RgbImage,
  },
  indicatif::{ProgressBar, ProgressStyle},
  log::{debug, info},
  ndarray::{
    s, Array1, Array2, Array3, Array4, ArrayD, ArrayView2, ArrayView4, Axis,
    Ix1, Ix2, Ix4, IxDyn, Zip,
  },
  ndarray_rand::{rand_distr::Uniform, RandomExt},
  rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng},
  rayon::prelude::*,
  serde::{Deserialize, Serialize},
  std::{
    fmt::{self, Display, Formatter},
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    process,
  },
};

mod arguments;
mod config;
mod driving_log;
mod generator;
mod layer;
mod math;
mod model;
mod optimizer;
mod preprocess;
mod subcommand;
mod trainer;

type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;

fn main() {
  env_logger::Builder::from_env(
    env_logger::Env::default().default_filter_or("warn"),
  )
  .init();

  if let Err(error) = Arguments::parse().run() {
    eprintln!("error: {error:#}");
    process::exit(1);
  }
}
