//! CLI command implementations.

pub mod run;

use anyhow::Result;

pub fn validate(path: &str) -> Result<()> {
    match pchqueue_config::load_queue_config(path) {
        Ok(config) => {
            println!("Configuration is valid");
            println!("  system slots:  {}", config.system_slots);
            println!("  project slots: {}", config.project_slots);
            println!("  tick interval: {} ms", config.tick_interval.as_millis());
            println!("  output dir:    {}", config.output_dir.display());
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}
