//! static loading of terraform modules into [Module]s
//!
//! [ModuleLoader] reads all `.tf` files of a directory and turns each top level block into a
//! [Block]. Nothing is planned or applied, so only what is known statically ends up as a value:
//!
//! - `var.*` from variable defaults, `.tfvars` files, `-var` flags and module call inputs
//! - `local.*` as far as locals can be resolved from the above
//! - literals and anything computed from the two
//!
//! Expressions referring to resources, data sources or module outputs can not be evaluated. These
//! attributes keep their [Reference]s but have no value.
//!
//! Local module calls (`source = "./..."`) are followed and loaded as additional [Module]s. Their
//! blocks are tagged with the call they were loaded through.
use crate::tree::{Attribute, Block, BlockKind, Module, ModuleCallInfo, Reference};
use crate::visit::VisitTraversals;
use hcl::eval::{Context, Evaluate};
use hcl::{Expression, Identifier, Traversal, TraversalOperator};
use std::path::{Path, PathBuf};

/// Roots of traversals that never point at another configuration element
const META_ROOTS: &[&str] = &["count", "each", "self"];

/// `module` block attributes that are not module inputs
const MODULE_META_ATTRIBUTES: &[&str] = &[
    "source",
    "version",
    "providers",
    "count",
    "for_each",
    "depends_on",
];

type Vars = hcl::value::Map<String, hcl::Value>;

#[derive(Debug, Clone)]
pub struct ModuleLoader {
    path: PathBuf,
    tfvars_paths: Vec<PathBuf>,
    input_vars: Vec<String>,
}

impl ModuleLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tfvars_paths: vec![],
            input_vars: vec![],
        }
    }

    /// `.tfvars` files to read root module variables from, later files win
    pub fn with_tfvars_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.tfvars_paths.extend(paths);
        self
    }

    /// `name=value` pairs as passed to `-var`, these win over `.tfvars` files
    pub fn with_input_vars(mut self, vars: impl IntoIterator<Item = String>) -> Self {
        self.input_vars.extend(vars);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the root module directory and all local module calls
    ///
    /// The root module is always first, module calls follow depth first in declaration order.
    pub fn parse_directory(&self) -> Result<Vec<Module>, LoadError> {
        let bodies = load_directory(&self.path)?;
        self.parse_bodies(bodies)
    }

    /// Load the root module from source, module calls are resolved relative to the loader path
    pub fn parse_str(&self, source: &str) -> Result<Vec<Module>, LoadError> {
        let body = hcl_edit::parser::parse_body(source)?;
        self.parse_bodies(vec![body.into()])
    }

    fn parse_bodies(&self, bodies: Vec<hcl::Body>) -> Result<Vec<Module>, LoadError> {
        // module calls are detected as cycles by their canonical path
        let dir = self
            .path
            .canonicalize()
            .unwrap_or_else(|_| self.path.clone());

        let root = ModuleScope {
            dir,
            address: String::new(),
            call: None,
            inputs: self.root_inputs()?,
        };

        let mut modules = vec![];
        let mut stack = vec![];
        load_module(root, bodies, &mut stack, &mut modules)?;
        Ok(modules)
    }

    fn root_inputs(&self) -> Result<Vars, LoadError> {
        let mut inputs = Vars::new();

        for path in &self.tfvars_paths {
            tracing::info!(path=%path.display(), "loading tfvars");
            let body = load_file(path)?;
            let ctx = Context::new();
            for attribute in body.attributes() {
                let value = attribute
                    .expr
                    .evaluate(&ctx)
                    .map_err(|source| LoadError::TfVarsEvalFailed {
                        path: path.clone(),
                        source,
                    })?;
                inputs.insert(attribute.key.as_str().to_string(), value);
            }
        }

        for var in &self.input_vars {
            let Some((name, value)) = var.split_once('=') else {
                return Err(LoadError::InvalidInputVar(var.clone()));
            };
            inputs.insert(name.trim().to_string(), hcl::Value::from(value));
        }

        Ok(inputs)
    }
}

struct ModuleScope {
    dir: PathBuf,
    address: String,
    call: Option<ModuleCallInfo>,
    inputs: Vars,
}

#[tracing::instrument(level = "debug", skip_all, fields(module = %scope.address))]
fn load_module(
    scope: ModuleScope,
    bodies: Vec<hcl::Body>,
    stack: &mut Vec<PathBuf>,
    modules: &mut Vec<Module>,
) -> Result<(), LoadError> {
    let hcl_blocks: Vec<hcl::Block> = bodies
        .into_iter()
        .flat_map(|body| body.into_blocks())
        .collect();

    let mut ctx = Context::new();
    ctx.declare_var(
        Identifier::unchecked("var"),
        hcl::Value::Object(variables(&hcl_blocks, scope.inputs)),
    );
    let locals = locals(&hcl_blocks, &ctx);
    ctx.declare_var(Identifier::unchecked("local"), hcl::Value::Object(locals));

    let blocks = hcl_blocks
        .iter()
        .map(|block| {
            let mut block = convert_block(block, &ctx);
            block.module_call = scope.call.clone();
            block
        })
        .collect();

    modules.push(Module::new(scope.address.clone(), blocks));

    stack.push(scope.dir.clone());
    for call in hcl_blocks
        .iter()
        .filter(|block| block.identifier.as_str() == "module")
    {
        let Some(name) = call.labels.first().map(|label| label.as_str().to_string()) else {
            continue;
        };

        let source = match call.body.attributes().find(|a| a.key.as_str() == "source") {
            Some(attribute) => match attribute.expr.evaluate(&ctx) {
                Ok(hcl::Value::String(source)) => source,
                _ => continue,
            },
            None => continue,
        };

        if !is_local_source(&source) {
            tracing::warn!(module = %name, %source, "skipping module call with non-local source");
            continue;
        }

        let dir = scope.dir.join(&source);
        let canonical = dir.canonicalize()?;
        if stack.iter().any(|loaded| loaded == &canonical) {
            return Err(LoadError::ModuleCycle(canonical));
        }

        let inputs = call
            .body
            .attributes()
            .filter(|a| !MODULE_META_ATTRIBUTES.contains(&a.key.as_str()))
            .filter_map(|a| Some((a.key.as_str().to_string(), a.expr.evaluate(&ctx).ok()?)))
            .collect();

        let address = if scope.address.is_empty() {
            format!("module.{name}")
        } else {
            format!("{}.module.{name}", scope.address)
        };

        tracing::info!(%address, %source, "loading module call");
        let bodies = load_directory(&dir)?;
        let child = ModuleScope {
            dir: canonical,
            call: Some(ModuleCallInfo::new(name, source, address.clone())),
            address,
            inputs,
        };
        load_module(child, bodies, stack, modules)?;
    }
    stack.pop();

    Ok(())
}

/// Variable defaults overridden by `inputs`
fn variables(blocks: &[hcl::Block], mut inputs: Vars) -> Vars {
    let ctx = Context::new();
    let mut vars = Vars::new();

    for block in blocks {
        if block.identifier.as_str() != "variable" {
            continue;
        }
        let Some(name) = block.labels.first().map(|label| label.as_str().to_string()) else {
            continue;
        };

        let default = block
            .body
            .attributes()
            .find(|a| a.key.as_str() == "default")
            .and_then(|a| a.expr.evaluate(&ctx).ok());

        match inputs.swap_remove(&name).or(default) {
            Some(value) => {
                vars.insert(name, value);
            }
            None => tracing::debug!(variable = %name, "variable has no value"),
        }
    }

    // inputs for undeclared variables are kept, terraform would only warn about them
    vars.extend(inputs);
    vars
}

/// Evaluate all locals that can be resolved statically
///
/// Locals may refer to each other in any order, so evaluation is repeated until no more locals
/// resolve.
fn locals(blocks: &[hcl::Block], ctx: &Context) -> Vars {
    let mut pending: Vec<&hcl::Attribute> = blocks
        .iter()
        .filter(|block| block.identifier.as_str() == "locals")
        .flat_map(|block| block.body.attributes())
        .collect();

    let mut resolved = Vars::new();
    loop {
        let mut local_ctx = ctx.clone();
        local_ctx.declare_var(
            Identifier::unchecked("local"),
            hcl::Value::Object(resolved.clone()),
        );

        let before = pending.len();
        pending.retain(|attribute| match attribute.expr.evaluate(&local_ctx) {
            Ok(value) => {
                resolved.insert(attribute.key.as_str().to_string(), value);
                false
            }
            Err(_) => true,
        });

        if pending.is_empty() || pending.len() == before {
            break;
        }
    }

    for attribute in pending {
        tracing::debug!(local = %attribute.key.as_str(), "local can not be resolved statically");
    }

    resolved
}

fn convert_block(block: &hcl::Block, ctx: &Context) -> Block {
    let mut converted = Block::new(
        BlockKind::from(block.identifier.as_str()),
        block.labels.iter().map(|label| label.as_str().to_string()),
    );

    for attribute in block.body.attributes() {
        converted
            .attributes
            .push(convert_attribute(attribute, ctx));
    }

    for child in block.body.blocks() {
        converted.children.push(convert_block(child, ctx));
    }

    converted
}

fn convert_attribute(attribute: &hcl::Attribute, ctx: &Context) -> Attribute {
    let name = attribute.key.as_str();

    // `provider = aws.west` names a provider configuration, it is neither a value nor a reference
    if let (Expression::Traversal(traversal), "provider") = (&attribute.expr, name) {
        let value = traversal_path(traversal).map(|path| hcl::Value::from(path.join(".")));
        return Attribute::new(name.to_string(), value);
    }

    let value = match attribute.expr.evaluate(ctx) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::trace!(attribute = name, %err, "attribute has no static value");
            None
        }
    };

    Attribute::new(name.to_string(), value).with_references(collect_references(&attribute.expr))
}

/// All references of an expression in order of appearance
pub fn collect_references(expr: &Expression) -> Vec<Reference> {
    let mut references = vec![];
    let mut collect = |traversal: &Traversal| {
        let Some(path) = traversal_path(traversal) else {
            return;
        };
        if path.len() < 2 || META_ROOTS.contains(&path[0].as_str()) {
            return;
        }
        references.push(Reference::new(path));
    };
    expr.visit_traversals(&mut collect);
    references
}

/// Longest attribute path of a traversal, `a.b.c` for `a.b.c[0].d`
fn traversal_path(traversal: &Traversal) -> Option<Vec<String>> {
    let Expression::Variable(var) = &traversal.expr else {
        return None;
    };

    let mut path = vec![var.as_str().to_string()];
    for operator in &traversal.operators {
        let TraversalOperator::GetAttr(ident) = operator else {
            break;
        };

        path.push(ident.as_str().to_string());
    }

    Some(path)
}

fn is_local_source(source: &str) -> bool {
    source.starts_with("./") || source.starts_with("../")
}

fn load_file(file_path: &Path) -> Result<hcl::Body, LoadError> {
    tracing::info!(path=%file_path.display(), "loading file");

    let file_contents = std::fs::read_to_string(file_path)?;
    let body = hcl_edit::parser::parse_body(&file_contents)?;
    Ok(body.into())
}

/// Parse all `.tf` files of a directory, sorted by file name
fn load_directory(dir_path: &Path) -> Result<Vec<hcl::Body>, LoadError> {
    let mut file_paths = vec![];
    for dir_entry in std::fs::read_dir(dir_path)? {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type()?.is_file() {
            continue;
        }

        let is_tf_file = dir_entry.file_name().to_string_lossy().ends_with(".tf");
        if !is_tf_file {
            continue;
        }

        file_paths.push(dir_entry.path());
    }

    if file_paths.is_empty() {
        return Err(LoadError::NoFilesFound(dir_path.to_path_buf()));
    }

    file_paths.sort();
    file_paths.iter().map(|path| load_file(path)).collect()
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("No .tf files found in {}", .0.display())]
    NoFilesFound(PathBuf),
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse hcl file")]
    HclParseFailed(#[from] hcl_edit::parser::Error),
    #[error("Unable to evaluate tfvars file {}", .path.display())]
    TfVarsEvalFailed {
        path: PathBuf,
        #[source]
        source: hcl::eval::Error,
    },
    #[error("Invalid input variable `{0}`, expected name=value")]
    InvalidInputVar(String),
    #[error("Module {} calls itself", .0.display())]
    ModuleCycle(PathBuf),
}

/// Utility macro to load [Module]s from hcl source
///
/// ```
/// # use hcl2plan::hcl_modules;
/// let modules = hcl_modules!(r#"resource "aws_instance" "web" {}"#);
/// assert_eq!(modules.len(), 1);
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use hcl2plan::hcl_modules;
/// hcl_modules!("not = valid = hcl");
/// ```
#[macro_export]
macro_rules! hcl_modules {
    { $expr:expr } => {
        $crate::hcl_modules::ModuleLoader::new(".")
            .parse_str($expr)
            .expect("modules must load")
    };
    { $expr:expr, vars: [$($var:expr),* $(,)?] } => {
        $crate::hcl_modules::ModuleLoader::new(".")
            .with_input_vars([$($var.to_string()),*])
            .parse_str($expr)
            .expect("modules must load")
    };
}
