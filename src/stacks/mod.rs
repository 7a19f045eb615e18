//! Concrete stacks emitted by the binary.

pub mod docker_registry;

use crate::bootstrap::BootstrapSet;
use crate::template::Template;

/// A finished template plus the bootstrap sets attached while building it.
#[derive(Debug, Clone)]
pub struct Stack {
    pub template: Template,
    /// Bootstrapped resource logical id and its composed set, in declaration order
    pub bootstraps: Vec<(String, BootstrapSet)>,
}

impl Stack {
    pub fn new(template: Template) -> Self {
        Self {
            template,
            bootstraps: Vec::new(),
        }
    }
}
