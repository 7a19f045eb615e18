//! IAM policy documents.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::expr::Expr;

/// IAM policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

/// A `service:Operation` action, wildcards allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Action {
    service: String,
    name: String,
}

impl Action {
    pub fn new(service: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            name: name.into(),
        }
    }

    /// `sts:AssumeRole`
    pub fn assume_role() -> Self {
        Self::new("sts", "AssumeRole")
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.name)
    }
}

/// Who a trust policy statement applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    /// AWS service principals, e.g. `ec2.amazonaws.com`
    Service(Vec<String>),
    /// Account or role ARNs
    Aws(Vec<Expr>),
}

impl Principal {
    pub fn service(name: impl Into<String>) -> Self {
        Principal::Service(vec![name.into()])
    }

    /// The EC2 compute service.
    pub fn ec2() -> Self {
        Self::service("ec2.amazonaws.com")
    }

    /// The Lambda service.
    pub fn lambda() -> Self {
        Self::service("lambda.amazonaws.com")
    }
}

impl Default for Principal {
    fn default() -> Self {
        Self::ec2()
    }
}

impl From<&Principal> for Expr {
    fn from(principal: &Principal) -> Self {
        match principal {
            Principal::Service(names) => Expr::object([("Service", Expr::list(names.iter()))]),
            Principal::Aws(arns) => Expr::object([("AWS", Expr::List(arns.clone()))]),
        }
    }
}

/// One (effect, actions, resources) entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    effect: Effect,
    actions: Vec<Action>,
    resources: Vec<Expr>,
    principal: Option<Principal>,
}

impl Statement {
    pub fn new(effect: Effect) -> Self {
        Self {
            effect,
            actions: Vec::new(),
            resources: Vec::new(),
            principal: None,
        }
    }

    pub fn allow() -> Self {
        Self::new(Effect::Allow)
    }

    pub fn deny() -> Self {
        Self::new(Effect::Deny)
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn resource(mut self, resource: impl Into<Expr>) -> Self {
        self.resources.push(resource.into());
        self
    }

    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn resources(&self) -> &[Expr] {
        &self.resources
    }

    pub fn get_principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}

impl From<&Statement> for Expr {
    fn from(statement: &Statement) -> Self {
        let mut entries = vec![("Effect", Expr::from(statement.effect.as_str()))];
        if let Some(principal) = &statement.principal {
            entries.push(("Principal", Expr::from(principal)));
        }
        entries.push((
            "Action",
            Expr::list(statement.actions.iter().map(|a| a.to_string())),
        ));
        if !statement.resources.is_empty() {
            entries.push(("Resource", Expr::List(statement.resources.clone())));
        }
        Expr::object(entries)
    }
}

/// A versioned list of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDocument {
    statements: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Checks the document is well formed. `name` is used in error messages.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.statements.is_empty() {
            return Err(Error::invalid_policy(name, "document has no statements"));
        }
        for (i, statement) in self.statements.iter().enumerate() {
            if statement.actions.is_empty() {
                return Err(Error::invalid_policy(
                    name,
                    format!("statement {} has no actions", i + 1),
                ));
            }
            if statement.principal.is_none() && statement.resources.is_empty() {
                return Err(Error::invalid_policy(
                    name,
                    format!("statement {} has neither a principal nor resources", i + 1),
                ));
            }
        }
        Ok(())
    }
}

impl From<&PolicyDocument> for Expr {
    fn from(document: &PolicyDocument) -> Self {
        Expr::object([
            ("Version", Expr::from(POLICY_VERSION)),
            (
                "Statement",
                Expr::List(document.statements.iter().map(Expr::from).collect()),
            ),
        ])
    }
}

impl Serialize for PolicyDocument {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Expr::from(self).serialize(serializer)
    }
}

/// A named inline policy, as listed in a role's `Policies`.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    name: String,
    document: PolicyDocument,
}

impl Policy {
    /// Creates a validated policy.
    pub fn new(name: impl Into<String>, statements: Vec<Statement>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_policy(name, "policy name is empty"));
        }
        let document = PolicyDocument::new(statements);
        document.validate(&name)?;
        Ok(Self { name, document })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }
}

impl From<&Policy> for Expr {
    fn from(policy: &Policy) -> Self {
        Expr::object([
            ("PolicyName", Expr::from(policy.name.as_str())),
            ("PolicyDocument", Expr::from(&policy.document)),
        ])
    }
}
