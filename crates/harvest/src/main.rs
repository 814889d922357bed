use anyhow::Result;
use clap::Parser;

mod cli;
mod logging;
mod ui;

use cli::app::App;

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();
    logging::init(app.verbosity());
    app.run().await
}
