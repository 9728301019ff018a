use anyhow::{bail, Result};

use slideprint::site::SiteRouter;

pub fn cmd_sites() -> Result<()> {
    let router = SiteRouter::new()?;
    println!("🎞️  Supported viewers ({}):\n", router.entries().len());
    for entry in router.entries() {
        println!("   {:<12} {}", entry.name(), entry.pattern());
    }
    Ok(())
}

pub fn cmd_match(url: &str) -> Result<()> {
    let router = SiteRouter::new()?;
    match router.resolve(url) {
        Some(entry) => {
            println!("✅ {}", entry.name());
            Ok(())
        }
        None => bail!("no site adapter for {url}"),
    }
}
