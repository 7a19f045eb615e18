//! Policy factory: IAM roles, instance profiles and reusable policies.
//!
//! Roles are built from a target identity name and a list of
//! [`PolicySource`]s. A source is either a finished [`Policy`] or a factory
//! that receives the target name, which lets reusable policies embed the
//! name of the identity they are attached to:
//!
//! ```rust
//! use cfnforge::iam::{self, PolicySource};
//! use cfnforge::template::{Resource, ResourceType, Template};
//!
//! let mut template = Template::new();
//! let bucket = template.add_resource(Resource::new("Storage", ResourceType::S3Bucket))?;
//! let profile = iam::make_instance_profile(
//!     &mut template,
//!     "WebProfile",
//!     vec![iam::bucket_full_access(&bucket)],
//! )?;
//! assert_eq!(profile.id(), "WebProfile");
//! assert!(template.resource("WebProfileRole").is_some());
//! # Ok::<(), cfnforge::error::Error>(())
//! ```

mod policy;

pub use policy::{Action, Effect, Policy, PolicyDocument, Principal, Statement, POLICY_VERSION};

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::template::{Handle, Resource, ResourceType, Template};

type PolicyFactory = Box<dyn Fn(&str) -> Result<Policy>>;

/// A policy given either literally or as a function of the target name.
pub enum PolicySource {
    /// Ready-made policy
    Literal(Policy),
    /// Called with the target identity name
    Factory(PolicyFactory),
}

impl PolicySource {
    /// Wraps a policy-generating function.
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<Policy> + 'static,
    {
        PolicySource::Factory(Box::new(f))
    }

    /// Produces the concrete policy for `target`.
    pub fn resolve(&self, target: &str) -> Result<Policy> {
        match self {
            PolicySource::Literal(policy) => Ok(policy.clone()),
            PolicySource::Factory(f) => f(target),
        }
    }
}

impl From<Policy> for PolicySource {
    fn from(policy: Policy) -> Self {
        PolicySource::Literal(policy)
    }
}

impl fmt::Debug for PolicySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicySource::Literal(policy) => f.debug_tuple("Literal").field(&policy.name()).finish(),
            PolicySource::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Builds the `<target>Role` resource without registering it.
///
/// The trust policy lets `principal` assume the role; inline policies keep
/// the order of `policies`.
pub fn build_role(target: &str, principal: &Principal, policies: &[PolicySource]) -> Result<Resource> {
    let role_id = format!("{}Role", target);

    let trust = PolicyDocument::new(vec![Statement::allow()
        .action(Action::assume_role())
        .principal(principal.clone())]);
    trust.validate(&format!("{}AssumeRole", role_id))?;

    let mut resolved = Vec::with_capacity(policies.len());
    let mut names = HashSet::new();
    for source in policies {
        let policy = source.resolve(target)?;
        if !names.insert(policy.name().to_string()) {
            return Err(Error::invalid_policy(
                policy.name(),
                format!("attached to '{}' more than once", role_id),
            ));
        }
        resolved.push(policy);
    }

    debug!(role = %role_id, policies = resolved.len(), "Built role");
    Ok(Resource::new(role_id, ResourceType::IamRole)
        .property("Path", "/")
        .property("AssumeRolePolicyDocument", Expr::from(&trust))
        .property(
            "Policies",
            Expr::List(resolved.iter().map(Expr::from).collect()),
        ))
}

/// Registers a role assumable by `principal`.
pub fn make_role(
    template: &mut Template,
    target: &str,
    principal: &Principal,
    policies: Vec<PolicySource>,
) -> Result<Handle> {
    let role = build_role(target, principal, &policies)?;
    template.add_resource(role)
}

/// Registers an EC2 role and the instance profile `target` wrapping it.
pub fn make_instance_profile(
    template: &mut Template,
    target: &str,
    policies: Vec<PolicySource>,
) -> Result<Handle> {
    let role = make_role(template, target, &Principal::default(), policies)?;
    template.add_resource(
        Resource::new(target, ResourceType::IamInstanceProfile)
            .property("Roles", Expr::list(vec![role.reference()])),
    )
}

/// Builder for the `s3:*` policy over one bucket and its objects.
#[derive(Debug, Clone, Default)]
pub struct BucketFullAccess {
    bucket: Option<String>,
    target: Option<String>,
}

impl BucketFullAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical id of the bucket resource.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Identity the policy is generated for; prefixes the policy name.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Fails if no bucket was supplied.
    pub fn build(self) -> Result<Policy> {
        let target = self.target.unwrap_or_default();
        let bucket = match self.bucket {
            Some(bucket) if !bucket.is_empty() => bucket,
            _ => return Err(Error::MissingBucket { target }),
        };

        let name = format!("{}{}S3BucketFullAccess", capitalize(&target), bucket);
        let arn = |suffix: &str| {
            let mut parts = vec![Expr::from("arn:aws:s3:::"), Expr::reference(bucket.clone())];
            if !suffix.is_empty() {
                parts.push(Expr::from(suffix));
            }
            Expr::join("", parts)
        };

        Policy::new(
            name,
            vec![Statement::allow()
                .action(Action::new("s3", "*"))
                .resource(arn(""))
                .resource(arn("/*"))],
        )
    }
}

/// Full S3 access to `bucket`, named after whichever identity receives it.
pub fn bucket_full_access(bucket: &Handle) -> PolicySource {
    let bucket = bucket.id().to_string();
    PolicySource::factory(move |target| {
        BucketFullAccess::new()
            .bucket(bucket.clone())
            .target(target)
            .build()
    })
}

/// `ec2:DescribeImages` on everything.
pub fn describe_images(target: &str) -> Result<Policy> {
    Policy::new(
        format!("{}DescribeImages", target),
        vec![Statement::allow()
            .action(Action::new("ec2", "DescribeImages"))
            .resource("*")],
    )
}

/// Lets the identity write CloudWatch Logs.
pub fn logs_writer(target: &str) -> Result<Policy> {
    Policy::new(
        format!("{}LogsWriter", target),
        vec![Statement::allow()
            .action(Action::new("logs", "CreateLogGroup"))
            .action(Action::new("logs", "CreateLogStream"))
            .action(Action::new("logs", "PutLogEvents"))
            .resource("arn:aws:logs:*:*:*")],
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("dockerRegistry"), "DockerRegistry");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_bucket_policy_name_uses_target() {
        let policy = BucketFullAccess::new()
            .bucket("Storage")
            .target("web")
            .build()
            .unwrap();
        assert_eq!(policy.name(), "WebStorageS3BucketFullAccess");
    }

    #[test]
    fn test_bucket_policy_without_target() {
        let policy = BucketFullAccess::new().bucket("Storage").build().unwrap();
        assert_eq!(policy.name(), "StorageS3BucketFullAccess");
    }

    #[test]
    fn test_bucket_policy_requires_bucket() {
        let err = BucketFullAccess::new().target("Web").build().unwrap_err();
        assert!(matches!(err, Error::MissingBucket { ref target } if target == "Web"));
        assert!(BucketFullAccess::new().bucket("").build().is_err());
    }

    #[test]
    fn test_literal_source_ignores_target() {
        let policy = describe_images("Lookup").unwrap();
        let source = PolicySource::from(policy.clone());
        assert_eq!(source.resolve("Other").unwrap(), policy);
    }

    #[test]
    fn test_factory_source_receives_target() {
        let source = PolicySource::factory(logs_writer);
        assert_eq!(source.resolve("Fn").unwrap().name(), "FnLogsWriter");
    }

    #[test]
    fn test_duplicate_policy_names_rejected() {
        let sources = vec![
            PolicySource::factory(describe_images),
            PolicySource::factory(describe_images),
        ];
        assert!(build_role("Lookup", &Principal::lambda(), &sources).is_err());
    }

    #[test]
    fn test_role_shape() {
        let role = build_role(
            "Lookup",
            &Principal::lambda(),
            &[PolicySource::factory(describe_images)],
        )
        .unwrap();
        assert_eq!(role.logical_id(), "LookupRole");
        let value = serde_json::to_value(&role).unwrap();
        assert_eq!(value["Properties"]["Path"], json!("/"));
        assert_eq!(
            value["Properties"]["AssumeRolePolicyDocument"]["Statement"][0]["Principal"],
            json!({"Service": ["lambda.amazonaws.com"]})
        );
        assert_eq!(
            value["Properties"]["Policies"][0]["PolicyName"],
            json!("LookupDescribeImages")
        );
    }
}
