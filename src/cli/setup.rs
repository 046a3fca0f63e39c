use anyhow::{Context, Result};
use std::path::Path;

const EXAMPLE_FOLLOW_LIST: &str = include_str!("../../docs/example_follow_list.json");

/// Creates an example follow list at the specified path
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        anyhow::bail!("Follow list already exists at {}", path.display());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, EXAMPLE_FOLLOW_LIST)
        .with_context(|| format!("Failed to write follow list to {}", path.display()))?;

    tracing::info!("Created example follow list at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FollowList;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_setup_creates_follow_list() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("follow_list.json");

        setup_at_path(&path)?;

        assert!(path.exists());
        let content = fs::read_to_string(&path)?;
        assert!(content.contains("\"stocks\""));
        assert!(content.contains("\"conversions\""));

        Ok(())
    }

    #[test]
    fn test_setup_fails_if_follow_list_exists() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("follow_list.json");
        fs::write(&path, "{}")?;

        let result = setup_at_path(&path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already exists"));
        assert_eq!(fs::read_to_string(&path)?, "{}");

        Ok(())
    }

    #[test]
    fn test_example_follow_list_is_valid() -> Result<()> {
        let follow_list: FollowList = serde_json::from_str(EXAMPLE_FOLLOW_LIST)
            .context("Failed to parse example follow list")?;

        assert_eq!(follow_list.stocks.len(), 2);
        assert_eq!(follow_list.conversions.len(), 2);
        assert_eq!(
            follow_list.providers.alpha_vantage_url(),
            "https://www.alphavantage.co"
        );
        Ok(())
    }
}
