use serde::{Deserialize, Deserializer, Serialize};

pub const RENEWED_AT_TAG: &str = "yale:renewed_at";
pub const NOTIFIED_AT_TAG: &str = "yale:notified_at";

/// Lifecycle status as stored on the resource document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceStatus {
    Created,
    Decom,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Created => "created",
            ResourceStatus::Decom => "decom",
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource document from the search index.
///
/// The backend's `_id` is copied into `id` after deserialization since the
/// stored document usually doesn't carry it. Every field tolerates being
/// absent or `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    #[serde(rename = "yale:org", deserialize_with = "nullable")]
    pub org: String,
    #[serde(deserialize_with = "nullable")]
    pub status: String,
    #[serde(rename = "yale:renewed_at", deserialize_with = "nullable")]
    pub renewed_at: String,
    #[serde(rename = "yale:notified_at", deserialize_with = "nullable")]
    pub notified_at: String,
    #[serde(rename = "yale:fqdn", deserialize_with = "nullable")]
    pub fqdn: String,
    #[serde(rename = "yale:created_by", deserialize_with = "nullable")]
    pub created_by: String,
    #[serde(
        rename = "yale:support_department_contact",
        deserialize_with = "nullable"
    )]
    pub support_contact: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub account: String,
    #[serde(deserialize_with = "nullable")]
    pub provider: String,
}

impl Resource {
    /// Identifier of the person responsible for the resource.
    pub fn owner(&self) -> &str {
        if self.support_contact.is_empty() {
            &self.created_by
        } else {
            &self.support_contact
        }
    }
}

fn nullable<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
