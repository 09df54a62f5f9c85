mod cli;

use clap::Parser;
use cli::Cli;
use env_logger::{Builder, Env};
use log::LevelFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut builder = Builder::from_env(Env::default().filter_or("RUST_LOG", "warn"));
    match cli.verbose() {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.format_timestamp(None).init();
    cli.execute()?;
    Ok(())
}
