use serde::{Deserialize, Serialize};

use super::subscription::AuthConfig;

/// Client id registered for the command-line tools.
pub const CLI_CLIENT_ID: &str = "04b07795-8ddb-461a-bbee-02f9e1bf7b46";

pub const DEFAULT_ENVIRONMENT: &str = "AzureCloud";

/// A named set of API endpoints representing one deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publishing_profile_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portal_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_endpoint_url: Option<String>,
    pub resource_management_endpoint_url: String,
    pub active_directory_endpoint_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_management_endpoint_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_gallery_endpoint_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name_suffix: Option<String>,
    #[serde(default = "default_common_tenant")]
    pub common_tenant_name: String,
    /// Resource id tokens are requested for. Defaults to the management endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_directory_resource_id: Option<String>,
}

fn default_common_tenant() -> String {
    "common".to_string()
}

impl Environment {
    /// The public cloud.
    pub fn azure_cloud() -> Self {
        Self {
            name: DEFAULT_ENVIRONMENT.to_string(),
            publishing_profile_url: Some(
                "https://go.microsoft.com/fwlink/?LinkId=254432".to_string(),
            ),
            portal_url: Some("http://go.microsoft.com/fwlink/?LinkId=254433".to_string()),
            management_endpoint_url: Some("https://management.core.windows.net".to_string()),
            resource_management_endpoint_url: "https://management.azure.com/".to_string(),
            active_directory_endpoint_url: "https://login.windows.net".to_string(),
            sql_management_endpoint_url: Some(
                "https://management.core.windows.net:8443/".to_string(),
            ),
            public_gallery_endpoint_url: Some("https://gallery.azure.com/".to_string()),
            host_name_suffix: Some("azurewebsites.net".to_string()),
            common_tenant_name: default_common_tenant(),
            active_directory_resource_id: Some(
                "https://management.core.windows.net/".to_string(),
            ),
        }
    }

    /// Environments every profile knows about, even an empty one.
    pub fn builtin() -> Vec<Environment> {
        vec![Self::azure_cloud()]
    }

    /// Auth configuration for requesting tokens against this environment.
    pub fn auth_config(&self, tenant_id: Option<&str>) -> AuthConfig {
        let resource_id = self
            .active_directory_resource_id
            .clone()
            .or_else(|| {
                self.management_endpoint_url
                    .as_ref()
                    .map(|u| format!("{}/", u.trim_end_matches('/')))
            })
            .unwrap_or_else(|| self.resource_management_endpoint_url.clone());
        AuthConfig {
            authority_url: self.active_directory_endpoint_url.clone(),
            tenant_id: tenant_id.unwrap_or(&self.common_tenant_name).to_string(),
            resource_id,
            client_id: CLI_CLIENT_ID.to_string(),
        }
    }
}
