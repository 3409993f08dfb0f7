//! load resources of a terraform directory without running terraform
//!
//! [HclProvider] loads the configuration statically, builds a shallow plan json document from it
//! and hands that to a [PlanJsonConsumer], which does the actual work of turning plan json into
//! projects.
use crate::convert::to_plan_json;
use crate::hcl_modules::ModuleLoader;
use crate::plan_flags::vars_from_plan_flags;
use anyhow::Context;
use indexmap::IndexMap;
use std::path::PathBuf;

/// Usage data keyed by resource address
pub type UsageMap = IndexMap<String, serde_json::Value>;

/// Project settings relevant to loading a terraform directory
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    pub path: PathBuf,
    /// flags as they would be passed to `terraform plan`
    pub terraform_plan_flags: String,
    pub terraform_var_files: Vec<PathBuf>,
    pub terraform_vars: Vec<String>,
}

/// Consumer of plan json documents
pub trait PlanJsonConsumer {
    type Project;

    fn load_resources_from_src(
        &self,
        usage: &UsageMap,
        plan_json: &[u8],
        extra: Option<&serde_json::Value>,
    ) -> anyhow::Result<Vec<Self::Project>>;
}

/// Module loader for a project
///
/// Variables come from `terraform_plan_flags` first, then the explicit var files and vars.
pub fn project_loader(project: &ProjectConfig) -> anyhow::Result<ModuleLoader> {
    let mut v = vars_from_plan_flags(&project.terraform_plan_flags)
        .context("could not parse vars from plan flags")?;

    v.files.extend(project.terraform_var_files.iter().cloned());
    v.vars.extend(project.terraform_vars.iter().cloned());

    tracing::debug!(files = ?v.files, vars = v.vars.len(), "project variables");

    Ok(ModuleLoader::new(&project.path)
        .with_tfvars_paths(v.files)
        .with_input_vars(v.vars))
}

#[derive(Debug)]
pub struct HclProvider<C> {
    loader: ModuleLoader,
    consumer: C,
}

impl<C: PlanJsonConsumer> HclProvider<C> {
    pub fn new(project: &ProjectConfig, consumer: C) -> anyhow::Result<Self> {
        Ok(Self {
            loader: project_loader(project)?,
            consumer,
        })
    }

    pub fn kind(&self) -> &'static str {
        "terraform_hcl"
    }

    pub fn display_type(&self) -> &'static str {
        "Terraform directory (HCL)"
    }

    /// Parse the directory and build its plan json
    pub fn load_plan_json(&self) -> anyhow::Result<Vec<u8>> {
        let modules = self.loader.parse_directory().with_context(|| {
            format!(
                "could not load terraform directory {}",
                self.loader.path().display()
            )
        })?;

        tracing::info!(modules = modules.len(), "building plan json");
        Ok(to_plan_json(&modules)?)
    }

    pub fn load_resources(&self, usage: &UsageMap) -> anyhow::Result<Vec<C::Project>> {
        let plan_json = self.load_plan_json()?;
        self.consumer.load_resources_from_src(usage, &plan_json, None)
    }
}
