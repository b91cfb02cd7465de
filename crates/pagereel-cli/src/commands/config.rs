use anyhow::Result;

use pagereel_core::AppConfig;

pub fn init() -> Result<()> {
    let path = AppConfig::config_path()?;
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    AppConfig::default().save()?;
    println!("Wrote default config to {}", path.display());

    Ok(())
}

pub fn path() -> Result<()> {
    println!("{}", AppConfig::config_path()?.display());
    Ok(())
}

pub fn show() -> Result<()> {
    let config = AppConfig::load()?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
