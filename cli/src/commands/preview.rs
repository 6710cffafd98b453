use anyhow::Result;
use chrono::Utc;
use landlead::{collect_leads, ArcGisSource, Config};

use crate::cli::{Cli, PreviewArgs};

pub fn run(cli: &Cli, args: &PreviewArgs) -> Result<()> {
    let cfg = Config::from_env()?;
    let source = ArcGisSource::new(cli.verbose)?;

    let (pulled, leads) = collect_leads(&cfg, &source, Utc::now(), cli.verbose)?;
    println!("Pulled: {pulled}");
    println!("Filtered leads: {}", leads.len());
    if args.ids {
        for lead in &leads {
            println!("{}", lead.parcel_id);
        }
    }
    Ok(())
}
