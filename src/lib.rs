//! # cfnforge - CloudFormation Templates from Typed Building Blocks
//!
//! cfnforge assembles AWS CloudFormation templates in Rust. Instead of
//! writing JSON by hand, a stack is built from composable fragments: a
//! resource, the IAM policy it needs, and the instance bootstrap that
//! provisions it. The result is validated as a whole before one JSON
//! document is written.
//!
//! ## Core Concepts
//!
//! - **Expressions**: property values, literal or resolved at deploy time
//!   (`Ref`, `Fn::GetAtt`, `Fn::Join`, `Fn::Base64`)
//! - **Template**: parameters, resources and outputs with unique logical ids
//! - **Policies**: IAM roles and instance profiles built from literal or
//!   generated policy documents
//! - **Bootstrap**: cfn-init fragments merged into instance metadata plus
//!   the user-data script that applies them
//! - **AMI lookup**: a Lambda-backed custom resource resolving an image id
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLI Interface                             │
//! │                  (generate / validate, clap-based)                  │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Stacks (docker_registry)                        │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!          ┌─────────────────────────┼─────────────────────────┐
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │ Policy Factory  │   │ Bootstrap Composer  │   │     AMI Lookup      │
//! │  (iam roles,    │   │ (cfn-init metadata  │   │  (Lambda + custom   │
//! │   profiles)     │   │   + user data)      │   │    resource)        │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//!          │                         │                         │
//!          └─────────────────────────┼─────────────────────────┘
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                Template Builder + Expression AST                    │
//! │                  (validation, JSON serialization)                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust
//! use cfnforge::prelude::*;
//!
//! let mut template = Template::new();
//! let bucket = template.add_resource(Resource::new("Storage", ResourceType::S3Bucket))?;
//! iam::make_instance_profile(&mut template, "App", vec![iam::bucket_full_access(&bucket)])?;
//!
//! let mut instance = Resource::new("AppInstance", ResourceType::Ec2Instance)
//!     .property("ImageId", "ami-12345678")
//!     .property("IamInstanceProfile", Expr::reference("App"));
//! bootstrap::add_init(&mut instance, vec![catalog::docker().into()])?;
//! template.add_resource(instance)?;
//!
//! let json = template.to_json(JsonStyle::default())?;
//! assert!(json.contains("AWS::CloudFormation::Init"));
//! # Ok::<(), cfnforge::error::Error>(())
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::bootstrap::{self, catalog, BootstrapComposer, Fragment, FragmentSource};
    pub use crate::error::{Error, Result};
    pub use crate::expr::Expr;
    pub use crate::iam::{self, PolicySource, Principal};
    pub use crate::template::{
        Handle, JsonStyle, Output, Parameter, ParameterType, Resource, ResourceType, Template,
    };
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases for cfnforge operations.
pub mod error;

/// Deploy-time expression AST and its intrinsic-function serialization.
pub mod expr;

/// Template builder: parameters, resources, outputs and validation.
pub mod template;

// ============================================================================
// Building Blocks
// ============================================================================

/// IAM roles, instance profiles and reusable policies.
pub mod iam;

/// cfn-init fragments and the composer attaching them to instances.
pub mod bootstrap;

/// Lambda-backed AMI lookup custom resource.
pub mod amilookup;

/// Concrete stacks.
pub mod stacks;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration loading.
pub mod config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
