use std::io::Write;

use anyhow::Result;
use serde_json::{json, Value};

use crate::cli::ResourceSelector;
use crate::client::{ArmClient, ResourceIdentity};
use crate::error::ArmError;
use crate::output::{print_kv_table, print_table, print_value, write_json};

use super::{parse_properties, pick};

fn identity(selector: &ResourceSelector, parent: Option<&str>) -> Result<ResourceIdentity> {
    let group = pick(selector.group.as_ref(), selector.group_pos.as_ref(), "resource group")?;
    let name = pick(selector.name.as_ref(), selector.name_pos.as_ref(), "name")?;
    let resource_type = pick(
        selector.resource_type.as_ref(),
        selector.type_pos.as_ref(),
        "resource type",
    )?;
    Ok(ResourceIdentity::new(&group, &name, &resource_type, parent)?)
}

fn print_resource(out: &mut dyn Write, resource: &Value, json_mode: bool) -> Result<()> {
    print_value(out, resource, json_mode, |out, r| {
        print_kv_table(out, r, &["name", "type", "location", "id"])?;
        if let Some(props) = r.get("properties") {
            writeln!(out, "properties:")?;
            writeln!(out, "{}", serde_json::to_string_pretty(props)?)?;
        }
        Ok(())
    })
}

pub struct ResourceArgs<'a> {
    pub selector: &'a ResourceSelector,
    pub location: Option<&'a str>,
    pub properties: Option<&'a str>,
    pub parent: Option<&'a str>,
}

/// Create a resource. The group is created first, in the same location, when missing.
pub fn create(
    client: &ArmClient,
    args: ResourceArgs<'_>,
    json_mode: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let id = identity(args.selector, args.parent)?;
    let location = args.location.ok_or(ArmError::MissingArgument("location"))?;
    let properties = parse_properties(args.properties)?;

    if !client.group_exists(&id.group)? {
        tracing::info!(group = %id.group, %location, "resource group missing, creating it");
        client.create_group(&id.group, location)?;
    }

    if client
        .get_resource(&id, &args.selector.api_version)?
        .is_some()
    {
        return Err(ArmError::AlreadyExists(id.to_string()).into());
    }

    let resource = client.put_resource(&id, &args.selector.api_version, location, &properties)?;
    tracing::info!(resource = %id.name, group = %id.group, "created resource");
    print_resource(out, &resource, json_mode)
}

/// Replace the properties of an existing resource.
pub fn set(
    client: &ArmClient,
    args: ResourceArgs<'_>,
    json_mode: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let id = identity(args.selector, args.parent)?;
    let properties = parse_properties(args.properties)?;

    let existing = client
        .get_resource(&id, &args.selector.api_version)?
        .ok_or_else(|| ArmError::NotFound(id.to_string()))?;

    let location = match args.location {
        Some(l) => l.to_string(),
        None => existing
            .get("location")
            .and_then(|l| l.as_str())
            .map(str::to_string)
            .ok_or(ArmError::MissingArgument("location"))?,
    };

    let resource = client.put_resource(&id, &args.selector.api_version, &location, &properties)?;
    tracing::info!(resource = %id.name, group = %id.group, "updated resource");
    print_resource(out, &resource, json_mode)
}

pub fn show(
    client: &ArmClient,
    selector: &ResourceSelector,
    parent: Option<&str>,
    json_mode: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let id = identity(selector, parent)?;
    let resource = client
        .get_resource(&id, &selector.api_version)?
        .ok_or_else(|| ArmError::NotFound(id.to_string()))?;
    print_resource(out, &resource, json_mode)
}

pub fn list(
    client: &ArmClient,
    group: Option<&str>,
    json_mode: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let resources = match group {
        Some(g) => client.list_group_resources(g)?,
        None => client.list_resources()?,
    };
    let resources = Value::Array(resources);
    print_value(out, &resources, json_mode, |out, r| {
        if r.as_array().is_some_and(|a| a.is_empty()) {
            writeln!(out, "No resources found.")?;
            return Ok(());
        }
        print_table(out, r, &["name", "type", "location"])
    })
}

pub fn delete(
    client: &ArmClient,
    selector: &ResourceSelector,
    parent: Option<&str>,
    quiet: bool,
    json_mode: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let id = identity(selector, parent)?;

    // DELETE of a missing resource still returns 204.
    client
        .get_resource(&id, &selector.api_version)?
        .ok_or_else(|| ArmError::NotFound(id.to_string()))?;

    if !quiet && !super::confirm(&format!("Delete {}?", id))? {
        return super::write_aborted(out, &id.name, json_mode);
    }

    client.delete_resource(&id, &selector.api_version)?;
    tracing::info!(resource = %id.name, group = %id.group, "deleted resource");

    if json_mode {
        write_json(
            out,
            &json!({ "name": id.name, "type": id.full_type(), "deleted": true }),
        )
    } else {
        writeln!(out, "Deleted {}.", id)?;
        Ok(())
    }
}
