use anyhow::Result;
use landlead::{run_pipeline, ArcGisSource, Config, CsvStore};

use crate::cli::{Cli, RunArgs};

pub fn run(cli: &Cli, args: &RunArgs) -> Result<()> {
    let mut cfg = Config::from_env()?;
    if let Some(store) = &args.store {
        cfg.store_dir = store.clone();
    }

    let source = ArcGisSource::new(cli.verbose)?;
    let mut store = CsvStore::new(&cfg.store_dir);

    let summary = run_pipeline(&cfg, &source, &mut store, cli.verbose)?;
    print!("{}", summary.render());
    Ok(())
}
