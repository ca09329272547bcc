// file: src/config/loader.rs
// version: 2.0.0
// guid: d4e5f6g7-h8i9-0123-4567-890123defghi

//! Inventory file loading and environment variable substitution

use super::InventoryFile;
use crate::error::MultirouterError;
use crate::inventory::HostInventory;
use crate::Result;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Inventory loader with `${VAR}` substitution from the environment
pub struct ConfigLoader {
    env_vars: HashMap<String, String>,
}

impl ConfigLoader {
    /// Create a new loader seeded from the process environment
    pub fn new() -> Self {
        Self {
            env_vars: std::env::vars().collect(),
        }
    }

    /// Load and validate a JSON inventory file
    pub fn load_inventory<P: AsRef<Path>>(&self, path: P) -> Result<HostInventory> {
        let content = fs::read_to_string(&path).map_err(|e| {
            MultirouterError::config(format!(
                "Failed to read inventory file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let file = self.parse_inventory(&content)?;
        info!(
            "Loaded {} hosts from {}",
            file.hosts.len(),
            path.as_ref().display()
        );
        Ok(file.into_inventory())
    }

    /// Parse inventory text after expanding environment variables
    pub fn parse_inventory(&self, content: &str) -> Result<InventoryFile> {
        let expanded = self.expand_env_vars(content)?;
        let file: InventoryFile = serde_json::from_str(&expanded)?;
        file.validate()?;
        Ok(file)
    }

    /// Expand environment variables in configuration content
    fn expand_env_vars(&self, content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| MultirouterError::config(format!("Invalid regex pattern: {}", e)))?;

        let mut missing_vars = Vec::new();
        let result = re.replace_all(content, |cap: &regex::Captures| {
            let var_name = &cap[1];
            match self.env_vars.get(var_name) {
                Some(value) => json_escape(value),
                None => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });

        if !missing_vars.is_empty() {
            return Err(MultirouterError::config(format!(
                "Missing environment variables: {}",
                missing_vars.join(", ")
            )));
        }

        Ok(result.into_owned())
    }

    /// Set environment variable for substitution
    pub fn set_env_var(&mut self, key: String, value: String) {
        self.env_vars.insert(key, value);
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape a substituted value so it stays valid inside a JSON string
fn json_escape(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
