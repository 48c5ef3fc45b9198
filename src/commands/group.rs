use std::io::Write;

use anyhow::Result;
use serde_json::{json, Value};

use crate::client::ArmClient;
use crate::output::{print_kv_table, print_table, print_value, write_json};

const GROUP_FIELDS: &[&str] = &["name", "location", "properties.provisioningState", "id"];

pub fn create(
    client: &ArmClient,
    name: &str,
    location: &str,
    json_mode: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let group = client.create_group(name, location)?;
    tracing::info!(group = %name, %location, "created resource group");
    print_value(out, &group, json_mode, |out, g| {
        writeln!(out, "Resource group '{}' created.", name)?;
        print_kv_table(out, g, GROUP_FIELDS)
    })
}

pub fn show(client: &ArmClient, name: &str, json_mode: bool, out: &mut dyn Write) -> Result<()> {
    let mut group = client.get_group(name)?;
    let resources = client.list_group_resources(name)?;

    if let Some(obj) = group.as_object_mut() {
        obj.insert("resources".to_string(), Value::Array(resources));
    }

    print_value(out, &group, json_mode, |out, g| {
        print_kv_table(out, g, GROUP_FIELDS)?;
        let resources = &g["resources"];
        if resources.as_array().is_some_and(|r| !r.is_empty()) {
            writeln!(out)?;
            print_table(out, resources, &["name", "type", "location"])?;
        } else {
            writeln!(out, "\nNo resources.")?;
        }
        Ok(())
    })
}

pub fn list(client: &ArmClient, json_mode: bool, out: &mut dyn Write) -> Result<()> {
    let groups = Value::Array(client.list_groups()?);
    print_value(out, &groups, json_mode, |out, g| {
        if g.as_array().is_some_and(|a| a.is_empty()) {
            writeln!(out, "No resource groups found.")?;
            return Ok(());
        }
        print_table(out, g, &["name", "location", "properties.provisioningState"])
    })
}

pub fn delete(
    client: &ArmClient,
    name: &str,
    quiet: bool,
    json_mode: bool,
    out: &mut dyn Write,
) -> Result<()> {
    if !quiet && !super::confirm(&format!("Delete resource group '{}'?", name))? {
        return super::write_aborted(out, name, json_mode);
    }

    client.delete_group(name)?;
    tracing::info!(group = %name, "deleted resource group");

    if json_mode {
        write_json(out, &json!({ "name": name, "deleted": true }))
    } else {
        writeln!(out, "Resource group '{}' deleted.", name)?;
        Ok(())
    }
}
