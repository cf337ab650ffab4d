use crate::error::{CssError, Result};
use crate::PseudoClasses;
use serde::{Deserialize, Serialize};
use std::fs;

/// Defaults for `transform`; command-line flags take precedence.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub targets: Option<String>,
    pub minify: Option<bool>,
    pub nesting: Option<bool>,
    pub custom_media: Option<bool>,
    pub css_modules: Option<bool>,
    pub css_modules_pattern: Option<String>,
    pub dashed_idents: Option<bool>,
    pub error_recovery: Option<bool>,
    pub unused_symbols: Option<Vec<String>>,
    pub source_map: Option<bool>,
    pub project_root: Option<String>,
    pub analyze_dependencies: Option<bool>,
    pub fail_on_unsupported: Option<bool>,
    pub pseudo_classes: Option<PseudoClasses>,
    pub output_directory: Option<String>,
}

pub fn load(config_path: &str) -> Result<ConfigFile> {
    log::info!("Loaded configuration from {}", config_path);
    let config_content = fs::read_to_string(config_path).map_err(|e| CssError::FileNotFound {
        path: format!("Config file {}: {}", config_path, e),
    })?;

    if config_path.ends_with(".json") {
        serde_json::from_str(&config_content).map_err(|e| CssError::InvalidFormat {
            message: format!("Invalid JSON config: {}", e),
        })
    } else if config_path.ends_with(".toml") {
        toml::from_str(&config_content).map_err(|e| CssError::InvalidFormat {
            message: format!("Invalid TOML config: {}", e),
        })
    } else {
        Err(CssError::InvalidFormat {
            message: "Config file must be .json or .toml format".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_toml_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flint.toml");
        fs::write(
            &path,
            "targets = \"safari 13\"\nminify = true\nunused_symbols = [\"unused\"]\n\n[pseudo_classes]\nhover = \"is-hovered\"\n",
        )
        .unwrap();

        let config = load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.targets.as_deref(), Some("safari 13"));
        assert_eq!(config.minify, Some(true));
        assert_eq!(config.unused_symbols, Some(vec!["unused".to_string()]));
        assert_eq!(
            config.pseudo_classes.and_then(|p| p.hover),
            Some("is-hovered".to_string())
        );
    }

    #[test]
    fn test_load_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flint.json");
        fs::write(
            &path,
            r#"{"css_modules": true, "css_modules_pattern": "[name]__[local]", "pseudo_classes": {"focus-visible": "fv"}}"#,
        )
        .unwrap();

        let config = load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.css_modules, Some(true));
        assert_eq!(config.css_modules_pattern.as_deref(), Some("[name]__[local]"));
        assert_eq!(
            config.pseudo_classes.and_then(|p| p.focus_visible),
            Some("fv".to_string())
        );
    }

    #[test]
    fn test_unknown_config_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flint.yaml");
        fs::write(&path, "minify: true").unwrap();
        assert!(matches!(
            load(path.to_str().unwrap()),
            Err(CssError::InvalidFormat { .. })
        ));
    }
}
