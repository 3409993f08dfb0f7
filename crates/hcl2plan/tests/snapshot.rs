//! Snapshot tests
//!
//! Loads each directory in /tests/fixtures/ and compares if the plan json changes.
use hcl2plan::hcl_modules::ModuleLoader;
use std::path::Path;

#[test]
fn snapshots() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("HCL2PLAN_LOG"))
        .with_writer(std::io::stderr)
        .try_init();

    for fixture in ["simple", "security_group"] {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(fixture);

        let modules = ModuleLoader::new(path)
            .parse_directory()
            .expect("fixture must load");
        let plan = hcl2plan::convert::modules_to_plan(&modules).expect("fixture must convert");

        insta::assert_json_snapshot!(fixture, plan);
    }
}

#[test]
fn resource_changes_match_resource_blocks() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/simple");
    let modules = ModuleLoader::new(path).parse_directory().unwrap();

    let resource_blocks = modules
        .iter()
        .flat_map(|module| &module.blocks)
        .filter(|block| block.kind == hcl2plan::tree::BlockKind::Resource)
        .count();

    let plan = hcl2plan::convert::modules_to_plan(&modules).unwrap();
    assert_eq!(plan.resource_changes.len(), resource_blocks);
    assert_eq!(resource_blocks, 2);

    let first = hcl2plan::convert::to_plan_json(&modules).unwrap();
    let second = hcl2plan::convert::to_plan_json(&modules).unwrap();
    assert_eq!(first, second);
}
