use clap::{Args, Parser, Subcommand};

use crate::client::DEFAULT_RESOURCE_API_VERSION;
use crate::config::Mode;

#[derive(Parser, Debug)]
#[command(
    name = "armctl",
    version,
    about = "Resource Manager CLI for resource groups, resources and subscriptions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Subscription id or name to use (overrides the default subscription)
    #[arg(long, global = true, env = "ARMCTL_SUBSCRIPTION")]
    pub subscription: Option<String>,

    #[command(flatten)]
    pub global_opts: GlobalOpts,
}

#[derive(Args, Debug)]
pub struct GlobalOpts {
    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage resource groups
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },
    /// Manage resources inside resource groups
    Resource {
        #[command(subcommand)]
        command: ResourceCommands,
    },
    /// Log in and select subscriptions
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Inspect and change CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommands {
    /// Create a resource group
    Create {
        /// Resource group name
        name: String,
        /// Location, e.g. "West US"
        #[arg(short, long)]
        location: String,
    },
    /// Show a resource group and the resources it contains
    Show {
        /// Resource group name
        name: String,
    },
    /// List resource groups
    List,
    /// Delete a resource group and everything in it
    Delete {
        /// Resource group name
        name: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        quiet: bool,
    },
}

/// Resource selection, positionally (`<group> <name> <type>`) or with switches.
#[derive(Args, Debug, Default)]
pub struct ResourceSelector {
    /// Resource group name
    #[arg(value_name = "GROUP")]
    pub group_pos: Option<String>,
    /// Resource name
    #[arg(value_name = "NAME")]
    pub name_pos: Option<String>,
    /// Resource type, e.g. Microsoft.Web/sites
    #[arg(value_name = "TYPE")]
    pub type_pos: Option<String>,

    /// Resource group name
    #[arg(short = 'g', long = "resource-group", conflicts_with = "group_pos")]
    pub group: Option<String>,
    /// Resource name
    #[arg(short = 'n', long = "name", conflicts_with = "name_pos")]
    pub name: Option<String>,
    /// Resource type, e.g. Microsoft.Web/sites
    #[arg(short = 'r', long = "resource-type", conflicts_with = "type_pos")]
    pub resource_type: Option<String>,

    /// API version used for the provider resource
    #[arg(short = 'o', long, default_value = DEFAULT_RESOURCE_API_VERSION)]
    pub api_version: String,
}

#[derive(Subcommand, Debug)]
pub enum ResourceCommands {
    /// Create a resource (and its group if it does not exist)
    Create {
        #[command(flatten)]
        selector: ResourceSelector,
        /// Location, e.g. "West US"
        #[arg(value_name = "LOCATION")]
        location_pos: Option<String>,
        /// Location, e.g. "West US"
        #[arg(short, long, conflicts_with = "location_pos")]
        location: Option<String>,
        /// Resource properties as a JSON object
        #[arg(short, long)]
        properties: Option<String>,
        /// Parent resource path, e.g. servers/myserver
        #[arg(long)]
        parent: Option<String>,
    },
    /// Replace the properties of an existing resource
    Set {
        #[command(flatten)]
        selector: ResourceSelector,
        /// Location (defaults to the resource's current location)
        #[arg(value_name = "LOCATION")]
        location_pos: Option<String>,
        /// Location (defaults to the resource's current location)
        #[arg(short, long, conflicts_with = "location_pos")]
        location: Option<String>,
        /// Resource properties as a JSON object
        #[arg(short, long)]
        properties: String,
        /// Parent resource path, e.g. servers/myserver
        #[arg(long)]
        parent: Option<String>,
    },
    /// Show a resource
    Show {
        #[command(flatten)]
        selector: ResourceSelector,
        /// Parent resource path, e.g. servers/myserver
        #[arg(long)]
        parent: Option<String>,
    },
    /// List resources, optionally only those in one group
    List {
        /// Resource group name
        #[arg(value_name = "GROUP")]
        group_pos: Option<String>,
        /// Resource group name
        #[arg(short = 'g', long = "resource-group", conflicts_with = "group_pos")]
        group: Option<String>,
    },
    /// Delete a resource
    Delete {
        #[command(flatten)]
        selector: ResourceSelector,
        /// Parent resource path, e.g. servers/myserver
        #[arg(value_name = "PARENT")]
        parent_pos: Option<String>,
        /// Parent resource path, e.g. servers/myserver
        #[arg(long, conflicts_with = "parent_pos")]
        parent: Option<String>,
        /// Do not ask for confirmation
        #[arg(short, long)]
        quiet: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum AccountCommands {
    /// Log in with an organizational account and import its subscriptions
    Login {
        /// User name, e.g. someone@contoso.onmicrosoft.com
        #[arg(short, long)]
        username: String,
        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
        /// Environment to log into
        #[arg(short, long, default_value = crate::profile::environment::DEFAULT_ENVIRONMENT)]
        environment: String,
        /// Tenant to authenticate against (defaults to the environment's common tenant)
        #[arg(long)]
        tenant: Option<String>,
    },
    /// List imported subscriptions
    List,
    /// Show the current subscription
    Show,
    /// Select the default subscription
    Set {
        /// Subscription id or name
        #[arg(value_name = "SUBSCRIPTION")]
        target: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the configuration
    List,
    /// Switch the API mode
    Mode {
        #[arg(value_enum)]
        mode: Mode,
    },
}
