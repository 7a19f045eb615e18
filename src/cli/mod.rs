//! CLI module for cfnforge
//!
//! Argument parsing and subcommand handling. The document is written to
//! stdout; logs and summaries go to stderr.

pub mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use cfnforge::config::Config;
use cfnforge::stacks::docker_registry;
use cfnforge::template::JsonStyle;

use output::OutputFormatter;

/// cfnforge - CloudFormation templates from typed building blocks
#[derive(Parser, Debug, Clone)]
#[command(name = "cfnforge")]
#[command(version)]
#[command(about = "Generates the Docker registry CloudFormation template", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute (defaults to generate)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "CFNFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Assemble the template and print it
    Generate(GenerateArgs),

    /// Assemble and validate the template, printing a summary
    Validate,
}

/// Arguments for generate command
#[derive(Parser, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Print the document on a single line
    #[arg(long)]
    pub compact: bool,

    /// Write the document to a file instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Run the selected command
    pub fn execute(&self, config: &Config) -> Result<()> {
        match &self.command {
            None => generate(&GenerateArgs::default(), config),
            Some(Commands::Generate(args)) => generate(args, config),
            Some(Commands::Validate) => validate(self, config),
        }
    }
}

fn generate(args: &GenerateArgs, config: &Config) -> Result<()> {
    let style = if args.compact {
        JsonStyle::Compact
    } else {
        config.json_style()
    };
    let stack = docker_registry::build()?;
    let json = stack.template.to_json(style)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write template: {}", path.display()))?;
            info!(path = %path.display(), "Wrote template");
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn validate(cli: &Cli, _config: &Config) -> Result<()> {
    let stack = docker_registry::build()?;
    stack.template.validate()?;
    OutputFormatter::new(!cli.no_color).stack_summary(&stack);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_generate() {
        let cli = Cli::try_parse_from(["cfnforge"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["cfnforge", "-vvvvv", "validate"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
        assert!(matches!(cli.command, Some(Commands::Validate)));
    }

    #[test]
    fn test_generate_args() {
        let cli = Cli::try_parse_from(["cfnforge", "generate", "--compact", "-o", "out.json"]).unwrap();
        match cli.command {
            Some(Commands::Generate(args)) => {
                assert!(args.compact);
                assert_eq!(args.output, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
