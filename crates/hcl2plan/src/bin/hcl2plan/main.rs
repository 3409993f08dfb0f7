mod cli;

use hcl2plan::provider::{project_loader, ProjectConfig};

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("HCL2PLAN_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Convert(convert_cli) => convert(convert_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn convert(cli: cli::ConvertCommand) -> anyhow::Result<()> {
    let modules = load(&cli.input)?;
    let plan = hcl2plan::convert::modules_to_plan(&modules)?;

    match cli.output.format {
        cli::OutputFormat::Json if cli.output.pretty => {
            serde_json::to_writer_pretty(std::io::stdout(), &plan)?
        }
        cli::OutputFormat::Json => serde_json::to_writer(std::io::stdout(), &plan)?,
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), &plan)?,
    };

    Ok(())
}

fn load(input: &cli::InputArgs) -> anyhow::Result<Vec<hcl2plan::tree::Module>> {
    let path = match &input.path {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    let project = ProjectConfig {
        path,
        terraform_plan_flags: input.plan_flags.clone(),
        terraform_var_files: input.var_files.clone(),
        terraform_vars: input.vars.clone(),
    };

    let modules = project_loader(&project)?.parse_directory()?;
    tracing::info!(modules = modules.len(), "loaded");

    Ok(modules)
}

/// (hcl2plan-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    use cli::DevSubCommand::*;

    let modules = load(&cli.input)?;

    match cli.command {
        Modules => println!("{modules:#?}"),
        Plan => println!("{:#?}", hcl2plan::convert::modules_to_plan(&modules)?),
    }

    Ok(())
}
