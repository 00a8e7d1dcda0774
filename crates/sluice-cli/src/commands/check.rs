use std::path::Path;

use anyhow::Result;

use crate::config;

/// Execute the `check` command: parse and validate the config.
pub fn execute(config_path: &Path) -> Result<()> {
    let config = config::load(config_path)?;

    println!("Config:            OK");
    println!("{:18} {}", "Queue:", config.target.queue());
    println!("{:18} {}", "Function:", config.target.function());
    println!("{:18} {}", "Invoker:", config.invoker.kind());
    println!("{:18} {}", "Max concurrency:", config.dispatch.max_concurrency);
    println!("{:18} {}", "Seed messages:", config.seeded_messages());
    Ok(())
}
