// Effective configuration display

use anyhow::Context;
use bnms_core::NodeConfig;
use std::path::Path;

/// Print the configuration after file and environment layering.
pub fn show(path: Option<&Path>) -> anyhow::Result<()> {
    let config = NodeConfig::load(path).context("failed to load configuration")?;
    let rendered = toml::to_string_pretty(&config).context("failed to render configuration")?;

    match path {
        Some(path) => println!("# effective configuration ({})", path.display()),
        None => println!("# effective configuration (defaults)"),
    }
    print!("{rendered}");
    Ok(())
}
