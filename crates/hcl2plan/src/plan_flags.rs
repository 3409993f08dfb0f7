//! `terraform plan` flags
//!
//! Projects may be configured with the flags they would pass to `terraform plan`. Only the flags
//! that feed variables into the configuration are understood.
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vars {
    pub files: Vec<PathBuf>,
    pub vars: Vec<String>,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PlanFlagsError {
    #[error("flag provided but not defined: {0}")]
    UnknownFlag(String),
    #[error("flag needs an argument: {0}")]
    MissingArgument(String),
}

/// Extract `-var` and `-var-file` values from a plan flag string
///
/// Both `-var x=1` and `-var=x=1` are accepted, as are double dashes. Parsing stops at the first
/// positional argument (like the plan file of `terraform plan -out plan.out`) or at `--`.
pub fn vars_from_plan_flags(plan_flags: &str) -> Result<Vars, PlanFlagsError> {
    let mut ret = Vars::default();
    let mut args = plan_flags.split_whitespace();

    while let Some(arg) = args.next() {
        if arg == "--" || arg == "-" {
            break;
        }
        let Some(flag) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
            tracing::debug!(argument = arg, "stopping at positional argument");
            break;
        };

        let (name, value) = match flag.split_once('=') {
            Some((name, value)) => (name, value.to_string()),
            None => {
                if flag != "var" && flag != "var-file" {
                    return Err(PlanFlagsError::UnknownFlag(flag.to_string()));
                }
                let value = args
                    .next()
                    .ok_or_else(|| PlanFlagsError::MissingArgument(flag.to_string()))?;
                (flag, value.to_string())
            }
        };

        match name {
            "var" => ret.vars.push(value),
            "var-file" => ret.files.push(PathBuf::from(value)),
            other => return Err(PlanFlagsError::UnknownFlag(other.to_string())),
        }
    }

    Ok(ret)
}
