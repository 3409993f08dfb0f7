//! # hcl2plan - terraform plan json from static hcl
//!
//! Tools that work on terraform plans (cost estimation, policy checks, ...) usually need a plan
//! json document, which requires credentials, state and a `terraform plan` run. `hcl2plan` builds
//! a *shallow* version of that document from the configuration alone.
//!
//! ## Introduction for developers
//!
//! ### Loading
//!
//! see [hcl_modules::ModuleLoader]
//!
//! All `.tf` files of a directory are parsed as one module. Local module calls are followed and
//! loaded as further modules. Every top level block becomes a [tree::Block] which carries
//!
//! - its kind (`resource`, `provider`, ... or the identifier of a nested block)
//! - its labels
//! - each attribute with its statically evaluated value (if any) and its references
//! - its nested blocks
//! - the module call it was loaded through
//!
//! ```hcl
//! variable "size" {
//!   default = "t3.micro"
//! }
//!
//! resource "aws_instance" "web" {
//!   instance_type = var.size              # value "t3.micro", references [var.size]
//!   subnet_id     = aws_subnet.private.id # no value, references [aws_subnet.private.id]
//!
//!   ebs_block_device {                    # nested block of kind `ebs_block_device`
//!     volume_size = 10
//!   }
//! }
//! ```
//!
//! ### Converting
//!
//! see [convert::modules_to_plan]
//!
//! Each module is walked twice:
//!
//! 1. `provider` blocks become `configuration.provider_config` entries, keyed by alias or name.
//!    The first one declared is the module's default provider.
//! 2. `resource` blocks become
//!    - a planned resource with the marshalled values ([marshal])
//!    - a resource change that creates exactly these values
//!    - a resource declaration with the references of each attribute ([references])
//!
//! Resources loaded through a module call go into a single child module and the matching
//! `module_calls` entry instead of the root module. Nested module calls are not represented as a
//! tree, every module call resource lands in that one child module.
//!
//! Any other block (`data`, `variable`, `locals`, `output`, ...) is not part of the output.
//!
//! ### Output
//!
//! [plan::PlanSchema] is serialized via [serde]. [provider::HclProvider] wraps loading, converting
//! and handing the bytes to a [provider::PlanJsonConsumer].
//!
pub mod convert;
pub mod hcl_modules;
pub mod marshal;
pub mod plan;
pub mod plan_flags;
pub mod provider;
pub mod references;
pub mod tree;
mod visit;
