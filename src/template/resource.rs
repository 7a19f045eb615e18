//! Resource declarations.

use std::fmt;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::Handle;
use crate::error::{Error, Result};
use crate::expr::{Expr, Reference};

/// CloudFormation resource types known to the builder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// `AWS::EC2::Instance`
    Ec2Instance,
    /// `AWS::EC2::SecurityGroup`
    Ec2SecurityGroup,
    /// `AWS::EC2::EIPAssociation`
    Ec2EipAssociation,
    /// `AWS::AutoScaling::LaunchConfiguration`
    LaunchConfiguration,
    /// `AWS::S3::Bucket`
    S3Bucket,
    /// `AWS::IAM::Role`
    IamRole,
    /// `AWS::IAM::InstanceProfile`
    IamInstanceProfile,
    /// `AWS::Lambda::Function`
    LambdaFunction,
    /// `AWS::CloudFormation::CustomResource`
    CustomResource,
    /// Any other type, passed through verbatim
    Other(String),
}

impl ResourceType {
    /// The CloudFormation type name.
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Ec2Instance => "AWS::EC2::Instance",
            ResourceType::Ec2SecurityGroup => "AWS::EC2::SecurityGroup",
            ResourceType::Ec2EipAssociation => "AWS::EC2::EIPAssociation",
            ResourceType::LaunchConfiguration => "AWS::AutoScaling::LaunchConfiguration",
            ResourceType::S3Bucket => "AWS::S3::Bucket",
            ResourceType::IamRole => "AWS::IAM::Role",
            ResourceType::IamInstanceProfile => "AWS::IAM::InstanceProfile",
            ResourceType::LambdaFunction => "AWS::Lambda::Function",
            ResourceType::CustomResource => "AWS::CloudFormation::CustomResource",
            ResourceType::Other(name) => name,
        }
    }

    /// Properties CloudFormation rejects the resource without.
    pub fn required_properties(&self) -> &'static [&'static str] {
        match self {
            ResourceType::Ec2Instance => &["ImageId"],
            ResourceType::Ec2SecurityGroup => &["GroupDescription"],
            ResourceType::LaunchConfiguration => &["ImageId", "InstanceType"],
            ResourceType::IamRole => &["AssumeRolePolicyDocument"],
            ResourceType::IamInstanceProfile => &["Roles"],
            ResourceType::LambdaFunction => &["Code", "Role"],
            ResourceType::CustomResource => &["ServiceToken"],
            ResourceType::Ec2EipAssociation | ResourceType::S3Bucket | ResourceType::Other(_) => &[],
        }
    }

    /// Whether cfn-init metadata and user data can be attached.
    pub fn supports_bootstrap(&self) -> bool {
        matches!(
            self,
            ResourceType::Ec2Instance | ResourceType::LaunchConfiguration
        )
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single declared infrastructure object.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    logical_id: String,
    resource_type: ResourceType,
    properties: IndexMap<String, Expr>,
    metadata: Option<Expr>,
    creation_policy: Option<Expr>,
    depends_on: Vec<String>,
}

impl Resource {
    /// Creates a resource with no properties.
    pub fn new(logical_id: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type,
            properties: IndexMap::new(),
            metadata: None,
            creation_policy: None,
            depends_on: Vec::new(),
        }
    }

    /// Sets a property, builder style.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.set_property(name, value);
        self
    }

    /// Sets a property in place, replacing any previous value.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Expr>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Sets the `Metadata` attribute, builder style.
    pub fn with_metadata(mut self, metadata: impl Into<Expr>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Sets the `Metadata` attribute in place.
    pub fn set_metadata(&mut self, metadata: impl Into<Expr>) {
        self.metadata = Some(metadata.into());
    }

    /// Sets the `CreationPolicy` attribute.
    pub fn with_creation_policy(mut self, policy: impl Into<Expr>) -> Self {
        self.creation_policy = Some(policy.into());
        self
    }

    /// Waits for `count` cfn-signal calls within `timeout` (ISO 8601, e.g. `PT15M`).
    pub fn with_signal_timeout(self, count: u32, timeout: &str) -> Self {
        self.with_creation_policy(Expr::object([(
            "ResourceSignal",
            Expr::object([("Count", Expr::from(count)), ("Timeout", Expr::from(timeout))]),
        )]))
    }

    /// Adds a `DependsOn` entry.
    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    /// The logical id.
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// The resource type.
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// A handle for referencing this resource.
    pub fn handle(&self) -> Handle {
        Handle::new(self.logical_id.clone())
    }

    /// A single property value.
    pub fn get_property(&self, name: &str) -> Option<&Expr> {
        self.properties.get(name)
    }

    /// All properties, in declaration order.
    pub fn properties(&self) -> &IndexMap<String, Expr> {
        &self.properties
    }

    /// The `Metadata` attribute.
    pub fn metadata(&self) -> Option<&Expr> {
        self.metadata.as_ref()
    }

    /// The `CreationPolicy` attribute.
    pub fn creation_policy(&self) -> Option<&Expr> {
        self.creation_policy.as_ref()
    }

    /// The `DependsOn` list.
    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    /// Fails if a property required by the resource type is absent.
    pub fn check_required(&self) -> Result<()> {
        for property in self.resource_type.required_properties() {
            if !self.properties.contains_key(*property) {
                return Err(Error::missing_property(
                    &self.logical_id,
                    self.resource_type.as_str(),
                    *property,
                ));
            }
        }
        Ok(())
    }

    /// Every logical id referenced from properties and attributes.
    pub fn references(&self) -> Vec<Reference<'_>> {
        self.properties
            .values()
            .chain(self.metadata.iter())
            .chain(self.creation_policy.iter())
            .flat_map(Expr::references)
            .collect()
    }
}

impl Serialize for Resource {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("Type", self.resource_type.as_str())?;
        if !self.depends_on.is_empty() {
            map.serialize_entry("DependsOn", &self.depends_on)?;
        }
        if let Some(metadata) = &self.metadata {
            map.serialize_entry("Metadata", metadata)?;
        }
        if let Some(policy) = &self.creation_policy {
            map.serialize_entry("CreationPolicy", policy)?;
        }
        if !self.properties.is_empty() {
            map.serialize_entry("Properties", &self.properties)?;
        }
        map.end()
    }
}
