//! Template parameters.

use std::fmt;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// CloudFormation parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    /// `String`
    String,
    /// `Number`
    Number,
    /// `List<Number>`
    NumberList,
    /// `CommaDelimitedList`
    CommaDelimitedList,
    /// `AWS::EC2::AvailabilityZone::Name`
    AvailabilityZoneName,
    /// `AWS::EC2::KeyPair::KeyName`
    KeyPairName,
    /// `AWS::EC2::Image::Id`
    ImageId,
    /// `AWS::EC2::SecurityGroup::Id`
    SecurityGroupId,
    /// `AWS::EC2::Subnet::Id`
    SubnetId,
    /// `AWS::EC2::VPC::Id`
    VpcId,
}

impl ParameterType {
    /// The CloudFormation type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "String",
            ParameterType::Number => "Number",
            ParameterType::NumberList => "List<Number>",
            ParameterType::CommaDelimitedList => "CommaDelimitedList",
            ParameterType::AvailabilityZoneName => "AWS::EC2::AvailabilityZone::Name",
            ParameterType::KeyPairName => "AWS::EC2::KeyPair::KeyName",
            ParameterType::ImageId => "AWS::EC2::Image::Id",
            ParameterType::SecurityGroupId => "AWS::EC2::SecurityGroup::Id",
            ParameterType::SubnetId => "AWS::EC2::Subnet::Id",
            ParameterType::VpcId => "AWS::EC2::VPC::Id",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ParameterType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A typed input to the template, supplied at deploy time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(skip)]
    logical_id: String,
    #[serde(rename = "Type")]
    param_type: ParameterType,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_value: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    allowed_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    constraint_description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    no_echo: bool,
}

impl Parameter {
    /// Creates an unconstrained parameter.
    pub fn new(logical_id: impl Into<String>, param_type: ParameterType) -> Self {
        Self {
            logical_id: logical_id.into(),
            param_type,
            description: None,
            default: None,
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            allowed_values: Vec::new(),
            allowed_pattern: None,
            constraint_description: None,
            no_echo: false,
        }
    }

    /// Shorthand for a `String` parameter.
    pub fn string(logical_id: impl Into<String>) -> Self {
        Self::new(logical_id, ParameterType::String)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn length(mut self, min: u32, max: u32) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub fn min_length(mut self, min: u32) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: u32) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn value_range(mut self, min: i64, max: i64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.allowed_pattern = Some(pattern.into());
        self
    }

    pub fn constraint_description(mut self, text: impl Into<String>) -> Self {
        self.constraint_description = Some(text.into());
        self
    }

    /// Masks the value in the console and API output.
    pub fn no_echo(mut self) -> Self {
        self.no_echo = true;
        self
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn param_type(&self) -> ParameterType {
        self.param_type
    }

    pub fn get_default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn get_allowed_values(&self) -> &[String] {
        &self.allowed_values
    }

    /// Checks that the constraints agree with each other and with the default.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(Error::invalid_parameter(&self.logical_id, message));

        if (self.min_length.is_some() || self.max_length.is_some())
            && self.param_type != ParameterType::String
        {
            return fail(format!(
                "length constraints apply to String parameters, not {}",
                self.param_type
            ));
        }
        if self.allowed_pattern.is_some()
            && !matches!(
                self.param_type,
                ParameterType::String | ParameterType::CommaDelimitedList
            )
        {
            return fail(format!(
                "AllowedPattern applies to String and CommaDelimitedList parameters, not {}",
                self.param_type
            ));
        }
        if (self.min_value.is_some() || self.max_value.is_some())
            && self.param_type != ParameterType::Number
        {
            return fail(format!(
                "value constraints apply to Number parameters, not {}",
                self.param_type
            ));
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return fail(format!("MinLength {} exceeds MaxLength {}", min, max));
            }
        }
        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if min > max {
                return fail(format!("MinValue {} exceeds MaxValue {}", min, max));
            }
        }

        let pattern = match &self.allowed_pattern {
            // CloudFormation matches the whole value
            Some(p) => match Regex::new(&format!("^(?:{})$", p)) {
                Ok(re) => Some(re),
                Err(e) => return fail(format!("AllowedPattern does not compile: {}", e)),
            },
            None => None,
        };

        let Some(default) = self.default.as_deref() else {
            return Ok(());
        };

        if !self.allowed_values.is_empty() && !self.allowed_values.iter().any(|v| v == default) {
            return fail(format!(
                "default '{}' is not one of the allowed values",
                default
            ));
        }
        let len = default.chars().count() as u32;
        if self.min_length.is_some_and(|min| len < min)
            || self.max_length.is_some_and(|max| len > max)
        {
            return fail(format!(
                "default '{}' violates the length constraints",
                default
            ));
        }
        if let Some(re) = pattern {
            // lists are matched element by element
            let mismatch = if self.param_type == ParameterType::CommaDelimitedList {
                default.split(',').any(|item| !re.is_match(item))
            } else {
                !re.is_match(default)
            };
            if mismatch {
                return fail(format!(
                    "default '{}' does not match AllowedPattern",
                    default
                ));
            }
        }
        if self.param_type == ParameterType::Number {
            let value: f64 = default.parse().map_err(|_| {
                Error::invalid_parameter(&self.logical_id, format!("default '{}' is not a number", default))
            })?;
            if self.min_value.is_some_and(|min| value < min as f64)
                || self.max_value.is_some_and(|max| value > max as f64)
            {
                return fail(format!("default {} is out of range", default));
            }
        }
        Ok(())
    }
}
