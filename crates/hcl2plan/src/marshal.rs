//! hcl values to plan json values
use crate::tree::{Block, BlockKind};

pub type JsonMap = serde_json::Map<String, serde_json::Value>;

#[derive(thiserror::Error, Debug)]
pub enum MarshalError {
    #[error("expected an object of attribute values, found {0}")]
    NotAnObject(&'static str),
    #[error("unable to encode attribute `{key}`")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Marshal a block's attribute values into a json object
///
/// Returns `None` for absent or `null` values. The `count` meta-attribute is dropped for
/// `resource` and `module` blocks.
pub fn marshal_attribute_values(
    kind: &BlockKind,
    values: Option<&hcl::Value>,
) -> Result<Option<JsonMap>, MarshalError> {
    let object = match values {
        None | Some(hcl::Value::Null) => return Ok(None),
        Some(hcl::Value::Object(object)) => object,
        Some(other) => return Err(MarshalError::NotAnObject(value_type_name(other))),
    };

    let skip_count = matches!(kind, BlockKind::Resource | BlockKind::Module);

    let mut ret = JsonMap::new();
    for (key, value) in object {
        if skip_count && key == "count" {
            continue;
        }

        let json = serde_json::to_value(value).map_err(|source| MarshalError::Encode {
            key: key.clone(),
            source,
        })?;
        ret.insert(key.clone(), json);
    }

    Ok(Some(ret))
}

/// Add the marshalled values of all child blocks to `json_values`
///
/// Every child is appended to the list stored under its kind, in declaration order.
#[tracing::instrument(level = "trace", skip_all, fields(block = %block.kind))]
pub fn marshal_block(block: &Block, mut json_values: JsonMap) -> Result<JsonMap, MarshalError> {
    for child in &block.children {
        let child_values = marshal_attribute_values(&child.kind, child.values().as_ref())?;
        let child_values = match child_values {
            Some(values) if !child.children.is_empty() => {
                serde_json::Value::Object(marshal_block(child, values)?)
            }
            Some(values) => serde_json::Value::Object(values),
            None => serde_json::Value::Null,
        };

        let entry = json_values
            .entry(child.kind.as_str())
            .or_insert_with(|| serde_json::Value::Array(vec![]));

        match entry {
            serde_json::Value::Array(list) => list.push(child_values),
            // an attribute of the same name: the child blocks win
            other => *other = serde_json::Value::Array(vec![child_values]),
        }
    }

    Ok(json_values)
}

/// Marshalled values of `block` including all of its children
pub fn marshal_block_values(block: &Block) -> Result<Option<JsonMap>, MarshalError> {
    match marshal_attribute_values(&block.kind, block.values().as_ref())? {
        Some(values) => marshal_block(block, values).map(Some),
        None if block.children.is_empty() => Ok(None),
        None => marshal_block(block, JsonMap::new()).map(Some),
    }
}

fn value_type_name(value: &hcl::Value) -> &'static str {
    match value {
        hcl::Value::Null => "null",
        hcl::Value::Bool(_) => "bool",
        hcl::Value::Number(_) => "number",
        hcl::Value::String(_) => "string",
        hcl::Value::Array(_) => "array",
        hcl::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tree::Attribute;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn attr(name: &str, value: impl Into<hcl::Value>) -> Attribute {
        Attribute::new(name.to_string(), Some(value.into()))
    }

    #[test]
    fn absent_values() {
        assert!(marshal_attribute_values(&BlockKind::Resource, None)
            .unwrap()
            .is_none());
        assert!(
            marshal_attribute_values(&BlockKind::Resource, Some(&hcl::Value::Null))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn non_object_errors() {
        let err = marshal_attribute_values(&BlockKind::Resource, Some(&hcl::Value::from(1)))
            .expect_err("must error");
        assert!(matches!(err, MarshalError::NotAnObject("number")));
    }

    #[test]
    fn count_is_skipped_for_resources_and_modules() {
        let block = Block::new("resource", ["aws_instance", "web"])
            .with_attribute(attr("count", 3))
            .with_attribute(attr("instance_type", "t3.micro"));

        for kind in [BlockKind::Resource, BlockKind::Module] {
            let values = marshal_attribute_values(&kind, block.values().as_ref())
                .unwrap()
                .unwrap();
            assert_eq!(
                serde_json::Value::Object(values),
                json!({"instance_type": "t3.micro"})
            );
        }

        let values = marshal_attribute_values(&BlockKind::Data, block.values().as_ref())
            .unwrap()
            .unwrap();
        assert_eq!(values.get("count"), Some(&json!(3)));
    }

    #[test]
    fn shapes_are_preserved() {
        let tags: hcl::value::Map<String, hcl::Value> =
            [("env".to_string(), hcl::Value::from("prod"))].into_iter().collect();
        let block = Block::new("resource", ["aws_instance", "web"])
            .with_attribute(attr("monitoring", true))
            .with_attribute(attr("cpu", 2))
            .with_attribute(attr("zones", vec!["a", "b"]))
            .with_attribute(attr("tags", hcl::Value::Object(tags)));

        let values = marshal_block_values(&block).unwrap().unwrap();
        assert_eq!(
            serde_json::Value::Object(values),
            json!({
                "monitoring": true,
                "cpu": 2,
                "zones": ["a", "b"],
                "tags": {"env": "prod"},
            })
        );
    }

    #[test]
    fn children_are_grouped_by_kind_in_order() {
        let block = Block::new("resource", ["aws_security_group", "sg"])
            .with_attribute(attr("name", "sg"))
            .with_child(Block::nested("ingress").with_attribute(attr("from_port", 80)))
            .with_child(Block::nested("egress").with_attribute(attr("from_port", 0)))
            .with_child(
                Block::nested("ingress")
                    .with_attribute(attr("from_port", 443))
                    .with_child(
                        Block::nested("options").with_attribute(attr("strict", true)),
                    ),
            );

        let values = marshal_block_values(&block).unwrap().unwrap();
        assert_eq!(
            serde_json::Value::Object(values),
            json!({
                "name": "sg",
                "ingress": [
                    {"from_port": 80},
                    {"from_port": 443, "options": [{"strict": true}]},
                ],
                "egress": [{"from_port": 0}],
            })
        );
    }

    #[test]
    fn empty_block_marshals_to_empty_object() {
        let block = Block::new("resource", ["aws_instance", "web"]);
        let values = marshal_block_values(&block).unwrap().unwrap();
        assert!(values.is_empty());
    }
}
