use std::io::Write;

use anyhow::Result;

use crate::config::Mode;
use crate::output::{print_kv_table, print_value};
use crate::services::Services;

pub fn list(services: &Services, json_mode: bool, out: &mut dyn Write) -> Result<()> {
    let config = services.config.read_config()?;
    let value = serde_json::to_value(&config)?;
    print_value(out, &value, json_mode, |out, v| {
        print_kv_table(out, v, &["mode", "resource_manager_url"])
    })
}

pub fn mode(services: &Services, mode: Mode, json_mode: bool, out: &mut dyn Write) -> Result<()> {
    let mut config = services.config.read_config()?;
    config.mode = mode;
    services.config.write_config(&config)?;

    let value = serde_json::to_value(&config)?;
    print_value(out, &value, json_mode, |out, _| {
        writeln!(out, "Mode set to {}.", mode)?;
        Ok(())
    })
}
