use anyhow::Result;
use deskbot_infrastructure::ConfigService;

pub fn path(service: &ConfigService) {
    println!("{}", service.path().display());
}

pub fn show(service: &ConfigService) -> Result<()> {
    let config = service.get_config()?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
