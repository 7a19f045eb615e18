//! AMI lookup custom resource.
//!
//! Registers a Lambda function that resolves the latest Amazon Linux image
//! id for the stack's region, and a custom resource invoking it. The image id
//! is read back with `Fn::GetAtt [AMI, Id]`.

use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::iam::{self, PolicySource, Principal};
use crate::template::{Handle, Resource, ResourceType, Template};

/// Logical id of the lookup function; the role is `<id>Role`.
pub const FUNCTION_ID: &str = "AMILookupFunction";
/// Logical id of the custom resource.
pub const RESOURCE_ID: &str = "AMI";
/// Attribute holding the resolved image id.
pub const IMAGE_ID_ATTRIBUTE: &str = "Id";
/// Maximum size of inline `ZipFile` source.
pub const ZIP_FILE_LIMIT: usize = 4096;
/// Lambda runtime the inline source targets.
pub const RUNTIME: &str = "nodejs20.x";
/// Function timeout in seconds.
pub const TIMEOUT_SECS: u32 = 30;

const FUNCTION_SOURCE: &str = include_str!("function.js");

/// Image virtualization flavor to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Architecture {
    /// 64-bit HVM
    #[default]
    Hvm64,
    /// 64-bit HVM with GPU drivers
    Hvmg2,
    /// 64-bit paravirtual
    Pv64,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Hvm64 => "HVM64",
            Architecture::Hvmg2 => "HVMG2",
            Architecture::Pv64 => "PV64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for the lookup resources.
#[derive(Debug, Clone)]
pub struct AmiLookup {
    architecture: Architecture,
    source: String,
}

impl Default for AmiLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl AmiLookup {
    pub fn new() -> Self {
        Self {
            architecture: Architecture::default(),
            source: FUNCTION_SOURCE.to_string(),
        }
    }

    pub fn architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    /// Replaces the bundled function source.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Registers role, function and custom resource; returns the custom resource.
    pub fn register(self, template: &mut Template) -> Result<Handle> {
        if self.source.len() > ZIP_FILE_LIMIT {
            return Err(Error::InlineCodeTooLarge {
                function: FUNCTION_ID.to_string(),
                size: self.source.len(),
                limit: ZIP_FILE_LIMIT,
            });
        }

        let role = iam::make_role(
            template,
            FUNCTION_ID,
            &Principal::lambda(),
            vec![
                PolicySource::factory(iam::describe_images),
                PolicySource::factory(iam::logs_writer),
            ],
        )?;

        let function = template.add_resource(
            Resource::new(FUNCTION_ID, ResourceType::LambdaFunction)
                .property("Code", Expr::object([("ZipFile", Expr::lines(&self.source))]))
                .property("Handler", "index.handler")
                .property("Role", role.get_att("Arn"))
                .property("Runtime", RUNTIME)
                .property("Timeout", TIMEOUT_SECS),
        )?;

        debug!(architecture = %self.architecture, bytes = self.source.len(), "Registered AMI lookup");
        template.add_resource(
            Resource::new(RESOURCE_ID, ResourceType::CustomResource)
                .property("ServiceToken", function.get_att("Arn"))
                .property("Region", Expr::region())
                .property("Architecture", self.architecture.as_str()),
        )
    }
}

/// Registers the default HVM64 lookup and returns the expression for its image id.
pub fn ami_lookup(template: &mut Template) -> Result<Expr> {
    let ami = AmiLookup::new().register(template)?;
    Ok(ami.get_att(IMAGE_ID_ATTRIBUTE))
}
