//! `cardfleet config`: show the effective configuration.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

/// Effective configuration after all layers are merged.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ConfigOutput(pub Config);

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.0).unwrap_or_default()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.0).unwrap_or_default()
    }
}

/// Print the effective configuration.
pub fn execute(config: Config, json_mode: bool) -> Result<()> {
    output(&ConfigOutput(config), json_mode);
    Ok(())
}
