pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod identity;
pub mod output;
pub mod profile;
pub mod services;
pub mod testkit;

use std::io::Write;

use anyhow::Result;

use cli::{AccountCommands, Cli, Commands, ConfigCommands, GroupCommands, ResourceCommands};
use commands::account::LoginArgs;
use commands::arm_client;
use commands::resource::ResourceArgs;
use services::Services;

/// Run a parsed command against `services`, writing command output to `out`.
pub fn run(cli: Cli, services: &Services, out: &mut dyn Write) -> Result<()> {
    let json = cli.global_opts.json;
    let subscription = cli.subscription.as_deref();

    match cli.command {
        Commands::Group { command } => {
            let client = arm_client(services, subscription)?;
            match command {
                GroupCommands::Create { name, location } => {
                    commands::group::create(&client, &name, &location, json, out)
                }
                GroupCommands::Show { name } => commands::group::show(&client, &name, json, out),
                GroupCommands::List => commands::group::list(&client, json, out),
                GroupCommands::Delete { name, quiet } => {
                    commands::group::delete(&client, &name, quiet, json, out)
                }
            }
        }
        Commands::Resource { command } => {
            let client = arm_client(services, subscription)?;
            match command {
                ResourceCommands::Create {
                    selector,
                    location_pos,
                    location,
                    properties,
                    parent,
                } => commands::resource::create(
                    &client,
                    ResourceArgs {
                        selector: &selector,
                        location: location.as_deref().or(location_pos.as_deref()),
                        properties: properties.as_deref(),
                        parent: parent.as_deref(),
                    },
                    json,
                    out,
                ),
                ResourceCommands::Set {
                    selector,
                    location_pos,
                    location,
                    properties,
                    parent,
                } => commands::resource::set(
                    &client,
                    ResourceArgs {
                        selector: &selector,
                        location: location.as_deref().or(location_pos.as_deref()),
                        properties: Some(&properties),
                        parent: parent.as_deref(),
                    },
                    json,
                    out,
                ),
                ResourceCommands::Show { selector, parent } => {
                    commands::resource::show(&client, &selector, parent.as_deref(), json, out)
                }
                ResourceCommands::List { group_pos, group } => commands::resource::list(
                    &client,
                    group.as_deref().or(group_pos.as_deref()),
                    json,
                    out,
                ),
                ResourceCommands::Delete {
                    selector,
                    parent_pos,
                    parent,
                    quiet,
                } => commands::resource::delete(
                    &client,
                    &selector,
                    parent.as_deref().or(parent_pos.as_deref()),
                    quiet,
                    json,
                    out,
                ),
            }
        }
        Commands::Account { command } => match command {
            AccountCommands::Login {
                username,
                password,
                environment,
                tenant,
            } => commands::account::login(
                services,
                LoginArgs {
                    username: &username,
                    password: password.as_deref(),
                    environment: &environment,
                    tenant: tenant.as_deref(),
                },
                json,
                out,
            ),
            AccountCommands::List => commands::account::list(services, json, out),
            AccountCommands::Show => commands::account::show(services, subscription, json, out),
            AccountCommands::Set { target } => commands::account::set(services, &target, json, out),
        },
        Commands::Config { command } => match command {
            ConfigCommands::List => commands::config::list(services, json, out),
            ConfigCommands::Mode { mode } => commands::config::mode(services, mode, json, out),
        },
    }
}
