//! Error types for cfnforge.
//!
//! Every error is raised while a template is being assembled. Nothing is
//! retried: the first error aborts generation and is reported to the user.

use thiserror::Error;

/// Result type alias for cfnforge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for cfnforge.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Template Errors
    // ========================================================================
    /// A logical id was declared twice in the same template.
    #[error("Duplicate logical id '{id}': already declared as a {existing}")]
    DuplicateLogicalId {
        /// Logical id
        id: String,
        /// What the id is already bound to (parameter, resource, output)
        existing: &'static str,
    },

    /// A logical id contains characters CloudFormation rejects.
    #[error("Invalid logical id '{0}': must be non-empty and alphanumeric")]
    InvalidLogicalId(String),

    /// A resource is missing a property its type requires.
    #[error("Resource '{resource}' ({resource_type}) is missing required property '{property}'")]
    MissingProperty {
        /// Resource logical id
        resource: String,
        /// CloudFormation type
        resource_type: String,
        /// Property name
        property: String,
    },

    /// A `Ref`, `Fn::GetAtt` or `DependsOn` points at nothing.
    #[error("Dangling reference in '{from}': '{target}' is not declared{hint}")]
    DanglingReference {
        /// Logical id of the referencing entity
        from: String,
        /// Referenced logical id
        target: String,
        /// Extra explanation
        hint: String,
    },

    /// Resources reach themselves through `Ref`, `Fn::GetAtt` or `DependsOn`.
    #[error("Circular dependency: {0}")]
    CircularDependency(String),

    /// A template with no resources cannot be deployed.
    #[error("Template declares no resources")]
    EmptyTemplate,

    /// Parameter constraints are inconsistent.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter logical id
        name: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Policy Errors
    // ========================================================================
    /// A policy document is malformed.
    #[error("Invalid policy '{name}': {message}")]
    InvalidPolicy {
        /// Policy name
        name: String,
        /// Error message
        message: String,
    },

    /// A bucket-scoped policy was requested without a bucket.
    #[error("Bucket policy for '{target}' requires a bucket resource reference")]
    MissingBucket {
        /// Identity the policy was generated for
        target: String,
    },

    // ========================================================================
    // Bootstrap Errors
    // ========================================================================
    /// Two fragments with the same name were composed.
    #[error("Bootstrap fragment '{0}' was supplied more than once")]
    DuplicateFragment(String),

    /// A fragment name is empty or reserved.
    #[error("Invalid bootstrap fragment name '{0}'")]
    InvalidFragment(String),

    /// Bootstrap was requested for a resource that cannot run cfn-init.
    #[error("Resource '{resource}' of type {resource_type} cannot be bootstrapped")]
    UnsupportedBootstrapTarget {
        /// Resource logical id
        resource: String,
        /// CloudFormation type
        resource_type: String,
    },

    // ========================================================================
    // Lambda Errors
    // ========================================================================
    /// Inline Lambda source exceeds the `ZipFile` limit.
    #[error("Inline code for '{function}' is {size} bytes, limit is {limit}")]
    InlineCodeTooLarge {
        /// Function logical id
        function: String,
        /// Source size in bytes
        size: usize,
        /// Allowed size in bytes
        limit: usize,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // ========================================================================
    // IO / Serialization Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Creates a new missing property error.
    pub fn missing_property(
        resource: impl Into<String>,
        resource_type: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self::MissingProperty {
            resource: resource.into(),
            resource_type: resource_type.into(),
            property: property.into(),
        }
    }

    /// Creates a new dangling reference error.
    pub fn dangling(from: impl Into<String>, target: impl Into<String>) -> Self {
        Self::DanglingReference {
            from: from.into(),
            target: target.into(),
            hint: String::new(),
        }
    }

    /// Creates a new invalid policy error.
    pub fn invalid_policy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a new invalid parameter error.
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::DuplicateLogicalId { .. }
            | Error::InvalidLogicalId(_)
            | Error::MissingProperty { .. }
            | Error::DanglingReference { .. }
            | Error::CircularDependency(_)
            | Error::EmptyTemplate
            | Error::InvalidParameter { .. } => 2,
            Error::InvalidPolicy { .. } | Error::MissingBucket { .. } => 3,
            Error::DuplicateFragment(_)
            | Error::InvalidFragment(_)
            | Error::UnsupportedBootstrapTarget { .. } => 4,
            Error::InvalidConfig { .. } | Error::TomlParse(_) => 5,
            _ => 1,
        }
    }
}
