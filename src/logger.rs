use std::path::Path;

/// Initializes the logging system from the default `log4rs.yaml` in the
/// working directory. Call once, before any store operations.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    init_from("log4rs.yaml")
}

/// Initializes the logging system from an explicit log4rs config file.
pub fn init_from<P: AsRef<Path>>(config: P) -> Result<(), Box<dyn std::error::Error>> {
    log4rs::init_file(config, Default::default())?;
    Ok(())
}
