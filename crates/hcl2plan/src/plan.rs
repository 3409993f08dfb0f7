//! terraform plan json output model
//!
//! Only the subset of the plan format that downstream consumers read. Field names are part of
//! the wire format.
use crate::marshal::JsonMap;
use crate::references::Expressions;
use indexmap::IndexMap;
use serde::Serialize;

pub const FORMAT_VERSION: &str = "1.0";
pub const TERRAFORM_VERSION: &str = "1.1.0";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlanSchema {
    pub format_version: String,
    pub terraform_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
    pub planned_values: PlannedValues,
    pub resource_changes: Vec<ResourceChanges>,
    pub configuration: Configuration,
}

impl Default for PlanSchema {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            terraform_version: TERRAFORM_VERSION.to_string(),
            variables: None,
            planned_values: PlannedValues::default(),
            resource_changes: vec![],
            configuration: Configuration::default(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct PlannedValues {
    pub root_module: PlanRootModule,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlanRootModule {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceJson>,
    /// always exactly one entry collecting the resources of every module call
    pub child_modules: Vec<ChildModule>,
}

impl Default for PlanRootModule {
    fn default() -> Self {
        Self {
            resources: vec![],
            child_modules: vec![ChildModule::default()],
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct ChildModule {
    pub resources: Vec<ResourceJson>,
}

/// A planned resource
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ResourceJson {
    pub address: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub name: String,
    pub schema_version: u32,
    pub values: Option<JsonMap>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ResourceChanges {
    pub address: String,
    pub module_address: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub name: String,
    pub change: ResourceChange,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ResourceChange {
    pub actions: Vec<String>,
    pub before: Option<JsonMap>,
    pub after: Option<JsonMap>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct Configuration {
    pub provider_config: IndexMap<String, ProviderConfig>,
    pub root_module: ConfigurationRootModule,
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct ConfigurationRootModule {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceData>,
    pub module_calls: IndexMap<String, ModuleCall>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub name: String,
    pub expressions: ProviderExpressions,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expressions: ProviderExpressions {
                region: ConstantValue {
                    constant_value: region.into(),
                },
            },
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProviderExpressions {
    pub region: ConstantValue,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ConstantValue {
    pub constant_value: String,
}

/// A resource declaration of the `configuration` section
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ResourceData {
    pub address: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub name: String,
    pub provider_config_key: String,
    pub expressions: Expressions,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ModuleCall {
    pub source: String,
    pub module: ModuleCallModule,
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct ModuleCallModule {
    pub resources: Vec<ResourceData>,
}
