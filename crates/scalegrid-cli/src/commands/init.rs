//! `scalegrid init`: write a starter config for one scaling group.

use std::path::Path;

use anyhow::{Result, bail};

use scalegrid_core::ScalegridConfig;

pub fn init(config_path: &Path, group: &str, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let config = ScalegridConfig::scaffold(group);
    std::fs::write(config_path, config.to_toml_string()?)?;
    println!("✓ Generated {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffold_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalegrid.toml");

        init(&path, "web", false).unwrap();

        let config = ScalegridConfig::from_file(&path).unwrap();
        assert!(config.groups.contains_key("web"));
        assert!(config.policies.contains_key("web-scale-up"));
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalegrid.toml");
        std::fs::write(&path, "# mine").unwrap();

        assert!(init(&path, "web", false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        init(&path, "web", true).unwrap();
        assert!(ScalegridConfig::from_file(&path).is_ok());
    }
}
