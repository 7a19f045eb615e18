//! Human-readable diagnostics for cfnforge
//!
//! Everything here writes to stderr; stdout is reserved for the document.

use colored::Colorize;

use cfnforge::bootstrap::BootstrapSet;
use cfnforge::stacks::Stack;

/// Output formatter for summaries and errors
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        Self { use_color }
    }

    /// Print a banner/header
    pub fn banner(&self, title: &str) {
        let line = "=".repeat(title.len() + 4);
        if self.use_color {
            eprintln!("\n{}", line.bright_blue());
            eprintln!("{}", format!("  {}  ", title).bright_blue().bold());
            eprintln!("{}\n", line.bright_blue());
        } else {
            eprintln!("\n{}", line);
            eprintln!("  {}  ", title);
            eprintln!("{}\n", line);
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.use_color {
            eprintln!("\n{}", title.cyan().bold());
            eprintln!("{}", "-".repeat(title.len()).cyan());
        } else {
            eprintln!("\n{}", title);
            eprintln!("{}", "-".repeat(title.len()));
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a success line
    pub fn ok(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "ok:".green(), message);
        } else {
            eprintln!("ok: {}", message);
        }
    }

    /// Print a list of items
    pub fn list(&self, title: &str, items: &[String]) {
        if self.use_color {
            eprintln!("\n{}:", title.bright_white().bold());
        } else {
            eprintln!("\n{}:", title);
        }

        for item in items {
            if self.use_color {
                eprintln!("  {} {}", "-".bright_black(), item);
            } else {
                eprintln!("  - {}", item);
            }
        }
    }

    /// Summarize a validated stack
    pub fn stack_summary(&self, stack: &Stack) {
        let template = &stack.template;
        self.banner("CFNFORGE VALIDATE");
        self.ok(&format!(
            "{} parameters, {} resources, {} outputs",
            template.parameters().count(),
            template.resources().count(),
            template.outputs().count()
        ));

        let resources: Vec<String> = template
            .resources()
            .map(|r| format!("{} ({})", r.logical_id(), r.resource_type()))
            .collect();
        self.list("Resources", &resources);

        for (resource, set) in &stack.bootstraps {
            self.section(&format!("Bootstrap: {}", resource));
            self.list("Command sequence", &command_lines(set));
        }
    }
}

/// One line per cfn-init command, in execution order
pub fn command_lines(set: &BootstrapSet) -> Vec<String> {
    set.command_sequence()
        .iter()
        .map(|step| {
            let command = step
                .command
                .command()
                .as_static_str()
                .unwrap_or_else(|| "<resolved at deploy time>".to_string());
            format!("{}/{}: {}", step.fragment, step.key, command)
        })
        .collect()
}
