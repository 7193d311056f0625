use {super::*, predict::Predict, preview::Preview, train::Train};

mod predict;
mod preview;
mod train;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
  #[clap(name = "predict", about = "Predict steering angles for camera frames")]
  Predict(Predict),
  #[clap(
    name = "preview",
    about = "Write pre-processed camera frames for inspection"
  )]
  Preview(Preview),
  #[clap(name = "train", about = "Train the steering model")]
  Train(Train),
}

impl Subcommand {
  pub(crate) fn run(self) -> Result {
    match self {
      Self::Predict(predict) => predict.run(),
      Self::Preview(preview) => preview.run(),
      Self::Train(train) => train.run(),
    }
  }
}
