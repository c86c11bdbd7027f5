use std::path::Path;

use anyhow::Result;
use wakefleet::SiteRegistry;

pub fn execute(path: &Path) -> Result<()> {
    let registry = SiteRegistry::new(path);
    let targets = registry.load()?;

    if targets.is_empty() {
        println!("no sites configured in {}", path.display());
        return Ok(());
    }
    for target in &targets {
        println!("{target}");
    }
    Ok(())
}
