use anyhow::Result;

use slideprint::config::{config_path, Config};

pub fn cmd_config() -> Result<()> {
    let path = config_path();
    let config = Config::load()?;

    if path.exists() {
        println!("📄 {}", path.display());
    } else {
        println!("📄 {} (not found, using defaults)", path.display());
    }
    println!("\n{}", config.to_toml()?);
    Ok(())
}
