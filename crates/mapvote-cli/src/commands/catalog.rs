//! `mapvote catalog`

use std::path::Path;

use anyhow::Result;
use clap::Args;
use mapvote_core::{MapVoteController, NominationMenu};
use mapvote_testkit::TestEnv;

use super::common;

#[derive(Args)]
pub struct CatalogArgs {
    /// Map treated as currently playing
    #[arg(long, default_value = "surf_beginner")]
    current: String,
}

pub async fn run(config_path: &Path, maplist: &Path, args: CatalogArgs) -> Result<()> {
    let config = common::load_config(config_path).await?;
    let env = TestEnv::new(args.current.as_str(), 0);
    let catalog = common::load_catalog_for(&config, maplist, &env).await?;

    println!("{} maps in catalog", catalog.len());
    let mut controller = MapVoteController::with_catalog(config, catalog);
    controller.start_map(&env);

    match controller.nomination_menu() {
        NominationMenu::Flat(maps) => {
            for meta in maps {
                println!("  {}", meta.id);
            }
        }
        NominationMenu::Tiered(groups) => {
            for group in groups {
                match group.tier {
                    Some(tier) => println!("Tier {} ({} maps)", tier, group.maps.len()),
                    None => println!("Untiered ({} maps)", group.maps.len()),
                }
                for map in group.maps {
                    println!("  {map}");
                }
            }
        }
    }
    Ok(())
}
