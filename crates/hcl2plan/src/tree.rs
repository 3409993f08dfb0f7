//! the parsed configuration tree
//!
//! A [Module] is one directory worth of top level [Block]s. Blocks carry their already evaluated
//! attribute values (where static evaluation was possible) as well as the [Reference]s each
//! attribute expression contains.
//!
//! Nothing in here evaluates anything. The tree is produced by [crate::hcl_modules] (or built by
//! hand) and only read by [crate::convert].
use std::fmt::Formatter;

/// A loaded module (the root directory or a module call)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    /// module address, empty for the root module
    pub address: String,
    pub blocks: Vec<Block>,
}

impl Module {
    pub fn new(address: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            address: address.into(),
            blocks,
        }
    }
}

/// Block identifier
///
/// Only the top level kinds relevant to building a plan get their own variant, every other
/// identifier (nested blocks like `ingress`, `root_block_device`, ...) ends up in
/// [BlockKind::Other].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Provider,
    Resource,
    Data,
    Module,
    Variable,
    Locals,
    Output,
    Terraform,
    Other(String),
}

impl BlockKind {
    pub fn as_str(&self) -> &str {
        match self {
            BlockKind::Provider => "provider",
            BlockKind::Resource => "resource",
            BlockKind::Data => "data",
            BlockKind::Module => "module",
            BlockKind::Variable => "variable",
            BlockKind::Locals => "locals",
            BlockKind::Output => "output",
            BlockKind::Terraform => "terraform",
            BlockKind::Other(ident) => ident,
        }
    }
}

impl From<&str> for BlockKind {
    fn from(value: &str) -> Self {
        match value {
            "provider" => BlockKind::Provider,
            "resource" => BlockKind::Resource,
            "data" => BlockKind::Data,
            "module" => BlockKind::Module,
            "variable" => BlockKind::Variable,
            "locals" => BlockKind::Locals,
            "output" => BlockKind::Output,
            "terraform" => BlockKind::Terraform,
            other => BlockKind::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The module call a block was loaded through
#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct ModuleCallInfo {
    /// name of the (innermost) module call
    pub name: String,
    /// declared `source` of that call
    pub source: String,
    /// full address, e.g. `module.network.module.subnets`
    pub address: String,
}

/// A symbolic dependency of an attribute expression, e.g. `aws_vpc.main.id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    segments: Vec<String>,
}

impl Reference {
    pub fn new<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct Attribute {
    pub name: String,
    /// `None` when the expression could not be evaluated statically
    pub value: Option<hcl::Value>,
    #[new(default)]
    pub references: Vec<Reference>,
}

impl Attribute {
    pub fn with_references(mut self, references: Vec<Reference>) -> Self {
        self.references = references;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub labels: Vec<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Block>,
    pub module_call: Option<ModuleCallInfo>,
}

impl Block {
    pub fn new<L: Into<String>>(
        kind: impl Into<BlockKind>,
        labels: impl IntoIterator<Item = L>,
    ) -> Self {
        Self {
            kind: kind.into(),
            labels: labels.into_iter().map(Into::into).collect(),
            attributes: vec![],
            children: vec![],
            module_call: None,
        }
    }

    /// A block without labels, like the nested `ingress {}` of a security group
    pub fn nested(kind: impl Into<BlockKind>) -> Self {
        Self::new(kind, Vec::<String>::new())
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_child(mut self, child: Block) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_module_call(mut self, module_call: ModuleCallInfo) -> Self {
        self.module_call = Some(module_call);
        self
    }

    /// First label, e.g. `aws_instance` for `resource "aws_instance" "web" {}`
    pub fn type_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or_default()
    }

    /// Second label, e.g. `web` for `resource "aws_instance" "web" {}`
    pub fn name_label(&self) -> &str {
        self.labels.get(1).map(String::as_str).unwrap_or_default()
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    /// Value of attribute `name` if it evaluated to a string
    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get_attribute(name)?.value.as_ref()? {
            hcl::Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// All evaluated attribute values as one object
    ///
    /// Attributes without a value are left out, as is the `provider` meta-argument of resources and
    /// data sources. A block without attributes yields an empty object.
    pub fn values(&self) -> Option<hcl::Value> {
        let has_provider_meta = matches!(self.kind, BlockKind::Resource | BlockKind::Data);

        Some(hcl::Value::Object(
            self.attributes
                .iter()
                .filter(|attribute| !(has_provider_meta && attribute.name == "provider"))
                .filter_map(|attribute| Some((attribute.name.clone(), attribute.value.clone()?)))
                .collect(),
        ))
    }

    pub fn has_module_block(&self) -> bool {
        self.module_call.is_some()
    }

    pub fn module_name(&self) -> &str {
        self.module_call
            .as_ref()
            .map(|call| call.name.as_str())
            .unwrap_or_default()
    }

    pub fn module_source(&self) -> &str {
        self.module_call
            .as_ref()
            .map(|call| call.source.as_str())
            .unwrap_or_default()
    }

    pub fn module_address(&self) -> &str {
        self.module_call
            .as_ref()
            .map(|call| call.address.as_str())
            .unwrap_or_default()
    }

    /// Address within its own module: `aws_instance.web`, `data.aws_ami.ubuntu`
    pub fn local_name(&self) -> String {
        match self.kind {
            BlockKind::Resource => self.labels.join("."),
            _ => std::iter::once(self.kind.as_str())
                .chain(self.labels.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join("."),
        }
    }

    /// Address including the module path: `module.network.aws_subnet.private`
    pub fn full_name(&self) -> String {
        match self.module_call {
            Some(ref call) => format!("{}.{}", call.address, self.local_name()),
            None => self.local_name(),
        }
    }

    /// Provider name this block is bound to
    ///
    /// Uses the `provider` attribute when set, otherwise the type label's prefix
    /// (`aws` for `aws_instance`).
    pub fn provider(&self) -> String {
        if let Some(provider) = self.get_string("provider") {
            return provider.to_string();
        }

        let type_label = self.type_label();
        type_label
            .split_once('_')
            .map(|(prefix, _)| prefix)
            .unwrap_or(type_label)
            .to_string()
    }
}
