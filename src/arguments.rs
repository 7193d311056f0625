use super::*;

#[derive(Debug, Parser)]
#[clap(
  version,
  about = "Train a CNN to predict steering angles from dashboard camera frames"
)]
pub(crate) struct Arguments {
  #[clap(subcommand)]
  subcommand: Subcommand,
}

impl Arguments {
  pub(crate) fn run(self) -> Result {
    info!("running {}", env!("CARGO_PKG_NAME"));
    self.subcommand.run()
  }
}
