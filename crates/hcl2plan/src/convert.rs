//! build a [PlanSchema] from loaded [Module]s
//!
//! Every module is walked twice. The first pass collects provider configurations and picks the
//! module's default provider (the first one declared). The second pass turns each resource into a
//! planned resource, a resource change and a configuration entry.
//!
//! Resources of module calls are all collected in one child module, regardless of how deeply the
//! calls are nested.
use crate::marshal::{marshal_block_values, MarshalError};
use crate::plan::{
    ModuleCall, ModuleCallModule, PlanSchema, ProviderConfig, ResourceChange, ResourceChanges,
    ResourceData, ResourceJson,
};
use crate::references::block_to_references;
use crate::tree::{BlockKind, Module};

const MODE_MANAGED: &str = "managed";
const ACTION_CREATE: &str = "create";

#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("unable to marshal values of {address}")]
    Marshal {
        address: String,
        #[source]
        source: MarshalError,
    },
    #[error("error handling built plan json from hcl")]
    Serialize(#[source] serde_json::Error),
}

#[tracing::instrument(level = "debug", skip_all, fields(modules = modules.len()))]
pub fn modules_to_plan(modules: &[Module]) -> Result<PlanSchema, ConvertError> {
    let mut sch = PlanSchema::default();

    for module in modules {
        let mut provider_key: Option<String> = None;

        for block in &module.blocks {
            if block.kind != BlockKind::Provider {
                continue;
            }

            let name = block
                .get_string("alias")
                .unwrap_or(block.type_label())
                .to_string();

            if provider_key.is_none() {
                provider_key = Some(name.clone());
            }

            let region = block.get_string("region").unwrap_or_default();
            tracing::debug!(module = %module.address, provider = %name, region, "provider");

            sch.configuration
                .provider_config
                .insert(name.clone(), ProviderConfig::new(name, region));
        }

        let provider_key = provider_key.unwrap_or_default();

        for block in &module.blocks {
            if block.kind != BlockKind::Resource {
                continue;
            }

            let address = block.full_name();
            tracing::debug!(%address, "resource");

            let json_values =
                marshal_block_values(block).map_err(|source| ConvertError::Marshal {
                    address: address.clone(),
                    source,
                })?;

            let r = ResourceJson {
                address: address.clone(),
                mode: MODE_MANAGED.to_string(),
                type_: block.type_label().to_string(),
                name: block.name_label().to_string(),
                schema_version: 1,
                values: json_values.clone(),
            };

            let c = ResourceChanges {
                address: address.clone(),
                module_address: block.module_address().to_string(),
                mode: MODE_MANAGED.to_string(),
                type_: block.type_label().to_string(),
                name: block.name_label().to_string(),
                change: ResourceChange {
                    actions: vec![ACTION_CREATE.to_string()],
                    before: None,
                    after: json_values,
                },
            };

            let provider_config_key = block
                .get_string("provider")
                .map(ToString::to_string)
                .unwrap_or_else(|| provider_key.clone());

            if block.has_module_block() {
                let mod_call = sch
                    .configuration
                    .root_module
                    .module_calls
                    .entry(block.module_name().to_string())
                    .or_insert_with(|| ModuleCall {
                        source: block.module_source().to_string(),
                        module: ModuleCallModule::default(),
                    });

                mod_call.module.resources.push(ResourceData {
                    address: block.local_name(),
                    mode: MODE_MANAGED.to_string(),
                    type_: block.type_label().to_string(),
                    name: block.name_label().to_string(),
                    provider_config_key: format!("{}:{}", block.module_name(), block.provider()),
                    expressions: block_to_references(block),
                });

                // PlanRootModule::default always holds exactly one child module
                if let Some(child_module) = sch.planned_values.root_module.child_modules.first_mut()
                {
                    child_module.resources.push(r);
                }
            } else {
                sch.configuration.root_module.resources.push(ResourceData {
                    address,
                    mode: MODE_MANAGED.to_string(),
                    type_: block.type_label().to_string(),
                    name: block.local_name(),
                    provider_config_key,
                    expressions: block_to_references(block),
                });

                sch.planned_values.root_module.resources.push(r);
            }

            sch.resource_changes.push(c);
        }
    }

    Ok(sch)
}

/// Convert `modules` and serialize the resulting plan
pub fn to_plan_json(modules: &[Module]) -> Result<Vec<u8>, ConvertError> {
    let sch = modules_to_plan(modules)?;
    serde_json::to_vec(&sch).map_err(ConvertError::Serialize)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tree::{Attribute, Block, ModuleCallInfo, Reference};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn attr(name: &str, value: impl Into<hcl::Value>) -> Attribute {
        Attribute::new(name.to_string(), Some(value.into()))
    }

    fn provider(name: &str) -> Block {
        Block::new("provider", [name])
    }

    fn resource(type_label: &str, name: &str) -> Block {
        Block::new("resource", [type_label, name])
    }

    fn net_call() -> ModuleCallInfo {
        ModuleCallInfo::new(
            "net".to_string(),
            "./modules/net".to_string(),
            "module.net".to_string(),
        )
    }

    fn resource_count(modules: &[Module]) -> usize {
        modules
            .iter()
            .flat_map(|module| &module.blocks)
            .filter(|block| block.kind == BlockKind::Resource)
            .count()
    }

    #[test]
    fn single_provider_and_resource() {
        let modules = vec![Module::new(
            "",
            vec![
                provider("aws").with_attribute(attr("region", "us-east-1")),
                resource("aws_instance", "web"),
            ],
        )];

        let sch = modules_to_plan(&modules).unwrap();
        let json = serde_json::to_value(&sch).unwrap();

        assert_eq!(
            json["configuration"]["provider_config"]["aws"]["expressions"]["region"]
                ["constant_value"],
            json!("us-east-1")
        );
        assert_eq!(sch.resource_changes.len(), 1);
        assert_eq!(sch.resource_changes[0].change.actions, vec!["create"]);
        assert_eq!(json["resource_changes"][0]["change"]["before"], json!(null));
        assert_eq!(sch.configuration.root_module.resources.len(), 1);
        assert_eq!(
            sch.configuration.root_module.resources[0].provider_config_key,
            "aws"
        );
        // root declarations are named by their local address, planned resources by their label
        assert_eq!(
            sch.configuration.root_module.resources[0].name,
            "aws_instance.web"
        );
        assert_eq!(
            json["planned_values"]["root_module"]["resources"][0],
            json!({
                "address": "aws_instance.web",
                "mode": "managed",
                "type": "aws_instance",
                "name": "web",
                "schema_version": 1,
                "values": {},
            })
        );
    }

    #[test]
    fn module_call_resources() {
        let modules = vec![
            Module::new("", vec![resource("aws_instance", "web")]),
            Module::new(
                "module.net",
                vec![resource("aws_subnet", "private")
                    .with_attribute(
                        Attribute::new("vpc_id".into(), None)
                            .with_references(vec![Reference::new(["var", "vpc_id"])]),
                    )
                    .with_module_call(net_call())],
            ),
        ];

        let sch = modules_to_plan(&modules).unwrap();

        let call = &sch.configuration.root_module.module_calls["net"];
        assert_eq!(call.source, "./modules/net");
        assert_eq!(call.module.resources.len(), 1);
        assert_eq!(call.module.resources[0].address, "aws_subnet.private");
        assert_eq!(call.module.resources[0].provider_config_key, "net:aws");
        assert_eq!(
            serde_json::to_value(&call.module.resources[0].expressions).unwrap(),
            json!({"vpc_id": {"references": ["var.vpc_id"]}})
        );

        let root_addresses: Vec<_> = sch
            .configuration
            .root_module
            .resources
            .iter()
            .map(|r| r.address.as_str())
            .collect();
        assert_eq!(root_addresses, vec!["aws_instance.web"]);

        let planned = &sch.planned_values.root_module;
        assert_eq!(planned.resources.len(), 1);
        assert_eq!(planned.child_modules.len(), 1);
        assert_eq!(
            planned.child_modules[0].resources[0].address,
            "module.net.aws_subnet.private"
        );

        assert_eq!(sch.resource_changes.len(), 2);
        assert_eq!(sch.resource_changes[1].module_address, "module.net");
        assert_eq!(sch.resource_changes[0].module_address, "");
    }

    #[test]
    fn nested_module_calls_share_one_child_module() {
        let inner = ModuleCallInfo::new(
            "subnets".to_string(),
            "./subnets".to_string(),
            "module.net.module.subnets".to_string(),
        );
        let modules = vec![
            Module::new(
                "module.net",
                vec![resource("aws_vpc", "main").with_module_call(net_call())],
            ),
            Module::new(
                "module.net.module.subnets",
                vec![resource("aws_subnet", "a").with_module_call(inner)],
            ),
        ];

        let sch = modules_to_plan(&modules).unwrap();
        let planned = &sch.planned_values.root_module;
        assert!(planned.resources.is_empty());
        assert_eq!(planned.child_modules.len(), 1);
        assert_eq!(planned.child_modules[0].resources.len(), 2);

        let calls: Vec<_> = sch.configuration.root_module.module_calls.keys().collect();
        assert_eq!(calls, vec!["net", "subnets"]);
        assert!(sch.configuration.root_module.resources.is_empty());
    }

    #[test]
    fn count_is_not_a_value() {
        let modules = vec![Module::new(
            "",
            vec![resource("aws_instance", "web")
                .with_attribute(attr("count", 3))
                .with_attribute(attr("instance_type", "t3.micro"))],
        )];

        let sch = modules_to_plan(&modules).unwrap();
        let values = sch.planned_values.root_module.resources[0]
            .values
            .as_ref()
            .unwrap();
        assert!(!values.contains_key("count"));
        assert_eq!(values["instance_type"], json!("t3.micro"));

        let after = sch.resource_changes[0].change.after.as_ref().unwrap();
        assert!(!after.contains_key("count"));
    }

    #[test]
    fn provider_aliases_and_defaults() {
        let modules = vec![Module::new(
            "",
            vec![
                resource("aws_instance", "before_providers"),
                provider("aws")
                    .with_attribute(attr("alias", "west"))
                    .with_attribute(attr("region", "us-west-2")),
                provider("aws").with_attribute(attr("region", "us-east-1")),
                provider("google"),
                resource("aws_instance", "default"),
                resource("aws_instance", "explicit").with_attribute(attr("provider", "aws.east")),
            ],
        )];

        let sch = modules_to_plan(&modules).unwrap();

        let keys: Vec<_> = sch.configuration.provider_config.keys().collect();
        assert_eq!(keys, vec!["west", "aws", "google"]);
        assert_eq!(
            sch.configuration.provider_config["google"]
                .expressions
                .region
                .constant_value,
            ""
        );

        let provider_keys: Vec<_> = sch
            .configuration
            .root_module
            .resources
            .iter()
            .map(|r| r.provider_config_key.as_str())
            .collect();
        // the first declared provider is the default, even for resources declared before it
        assert_eq!(provider_keys, vec!["west", "west", "aws.east"]);
    }

    #[test]
    fn later_providers_overwrite_earlier_ones() {
        let modules = vec![Module::new(
            "",
            vec![
                provider("aws").with_attribute(attr("region", "us-east-1")),
                provider("aws").with_attribute(attr("region", "eu-central-1")),
            ],
        )];

        let sch = modules_to_plan(&modules).unwrap();
        assert_eq!(sch.configuration.provider_config.len(), 1);
        assert_eq!(
            sch.configuration.provider_config["aws"]
                .expressions
                .region
                .constant_value,
            "eu-central-1"
        );
    }

    #[test]
    fn non_string_region_is_empty() {
        let modules = vec![Module::new(
            "",
            vec![provider("aws").with_attribute(attr("region", 1))],
        )];

        let sch = modules_to_plan(&modules).unwrap();
        assert_eq!(
            sch.configuration.provider_config["aws"]
                .expressions
                .region
                .constant_value,
            ""
        );
    }

    #[test]
    fn other_blocks_are_skipped() {
        let modules = vec![Module::new(
            "",
            vec![
                Block::new("data", ["aws_ami", "ubuntu"]),
                Block::new("variable", ["region"]),
                Block::nested("locals"),
                Block::new("output", ["ip"]),
                Block::new("module", ["net"]),
                resource("aws_instance", "web"),
            ],
        )];

        let sch = modules_to_plan(&modules).unwrap();
        assert_eq!(sch.resource_changes.len(), resource_count(&modules));
        assert_eq!(sch.planned_values.root_module.resources.len(), 1);
        assert!(sch.configuration.provider_config.is_empty());
        assert!(sch.configuration.root_module.module_calls.is_empty());
    }

    #[test]
    fn one_change_per_resource() {
        let modules = vec![
            Module::new(
                "",
                vec![
                    resource("aws_instance", "a"),
                    resource("aws_instance", "b"),
                    provider("aws"),
                ],
            ),
            Module::new(
                "module.net",
                vec![
                    resource("aws_vpc", "main").with_module_call(net_call()),
                    resource("aws_subnet", "a").with_module_call(net_call()),
                    resource("aws_subnet", "b").with_module_call(net_call()),
                ],
            ),
        ];

        let sch = modules_to_plan(&modules).unwrap();
        let planned = &sch.planned_values.root_module;
        assert_eq!(sch.resource_changes.len(), resource_count(&modules));
        assert_eq!(
            planned.resources.len() + planned.child_modules[0].resources.len(),
            resource_count(&modules)
        );
    }

    #[test]
    fn conversion_is_idempotent() {
        let modules = vec![Module::new(
            "",
            vec![
                provider("aws").with_attribute(attr("region", "us-east-1")),
                resource("aws_instance", "web")
                    .with_attribute(attr("ami", "ami-123"))
                    .with_attribute(attr("instance_type", "t3.micro"))
                    .with_child(
                        Block::nested("ebs_block_device").with_attribute(attr("volume_size", 10)),
                    ),
            ],
        )];

        assert_eq!(to_plan_json(&modules).unwrap(), to_plan_json(&modules).unwrap());
    }
}
