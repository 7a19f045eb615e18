//! Bootstrap composer: cfn-init metadata and the user-data script that runs it.
//!
//! Fragments are composed in the order given. The composer writes two things
//! onto the target resource:
//!
//! - `Metadata.AWS::CloudFormation::Init`, with one config set listing the
//!   fragment names in order and one config block per fragment
//! - `UserData`, a base64 shell script that updates the OS, runs `cfn-init`
//!   for the config set and reports the exit status with `cfn-signal`
//!
//! Because `-e` is set in the script, a failing `cfn-init` skips the success
//! signal and the stack times out on the resource's creation policy.
//!
//! ```rust
//! use cfnforge::bootstrap::{self, catalog, FragmentSource};
//! use cfnforge::template::{Resource, ResourceType};
//!
//! let mut instance = Resource::new("Web", ResourceType::Ec2Instance).property("ImageId", "ami-1");
//! let set = bootstrap::add_init(&mut instance, vec![FragmentSource::from(catalog::docker())])?;
//! assert_eq!(set.fragment_names(), vec!["Docker"]);
//! assert!(instance.get_property("UserData").is_some());
//! # Ok::<(), cfnforge::error::Error>(())
//! ```

pub mod catalog;
mod fragment;

pub use fragment::{Fragment, InitCommand, InitFile, PackageManager, ServiceManager, ServiceSpec};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::template::Resource;

/// Config set used when none is given.
pub const DEFAULT_CONFIG_SET: &str = "default";

/// Metadata key read by cfn-init.
pub const INIT_METADATA_KEY: &str = "AWS::CloudFormation::Init";

const RESERVED_NAMES: &[&str] = &["configSets"];

type FragmentFactory = Box<dyn FnOnce() -> Result<Fragment>>;

/// A fragment given directly or produced on demand.
pub enum FragmentSource {
    Literal(Fragment),
    Factory(FragmentFactory),
}

impl FragmentSource {
    /// Wraps a fragment-producing function.
    pub fn factory<F>(f: F) -> Self
    where
        F: FnOnce() -> Fragment + 'static,
    {
        FragmentSource::Factory(Box::new(move || Ok(f())))
    }

    /// Wraps a fallible fragment-producing function.
    pub fn try_factory<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<Fragment> + 'static,
    {
        FragmentSource::Factory(Box::new(f))
    }

    /// Produces the fragment.
    pub fn resolve(self) -> Result<Fragment> {
        match self {
            FragmentSource::Literal(fragment) => Ok(fragment),
            FragmentSource::Factory(f) => f(),
        }
    }
}

impl From<Fragment> for FragmentSource {
    fn from(fragment: Fragment) -> Self {
        FragmentSource::Literal(fragment)
    }
}

impl std::fmt::Debug for FragmentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FragmentSource::Literal(fragment) => {
                f.debug_tuple("Literal").field(&fragment.name()).finish()
            }
            FragmentSource::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Operating system family of the bootstrapped image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OsFamily {
    /// Amazon Linux: yum, helper scripts preinstalled in `/opt/aws/bin`
    #[default]
    AmazonLinux,
    /// Debian/Ubuntu: apt, helper scripts installed with pip
    Debian,
}

impl OsFamily {
    /// Commands run before cfn-init.
    pub fn setup_commands(&self) -> &'static [&'static str] {
        match self {
            OsFamily::AmazonLinux => &["yum update -y"],
            OsFamily::Debian => &[
                "apt-get update -y",
                "apt-get install -y python3-pip",
                "pip3 install https://s3.amazonaws.com/cloudformation-examples/aws-cfn-bootstrap-py3-latest.tar.gz",
            ],
        }
    }

    /// Directory holding `cfn-init` and `cfn-signal`.
    pub fn helper_dir(&self) -> &'static str {
        match self {
            OsFamily::AmazonLinux => "/opt/aws/bin",
            OsFamily::Debian => "/usr/local/bin",
        }
    }
}

/// Composes fragments into a bootstrap set.
#[derive(Debug)]
pub struct BootstrapComposer {
    config_set: String,
    os: OsFamily,
    sources: Vec<FragmentSource>,
}

impl Default for BootstrapComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapComposer {
    pub fn new() -> Self {
        Self {
            config_set: DEFAULT_CONFIG_SET.to_string(),
            os: OsFamily::default(),
            sources: Vec::new(),
        }
    }

    pub fn config_set(mut self, name: impl Into<String>) -> Self {
        self.config_set = name.into();
        self
    }

    pub fn os(mut self, os: OsFamily) -> Self {
        self.os = os;
        self
    }

    /// Appends a fragment; fragments run in the order they are added.
    pub fn fragment(mut self, source: impl Into<FragmentSource>) -> Self {
        self.sources.push(source.into());
        self
    }

    /// Resolves every source and checks names.
    pub fn compose(self) -> Result<BootstrapSet> {
        check_name(&self.config_set)?;

        let mut fragments = IndexMap::with_capacity(self.sources.len());
        for source in self.sources {
            let fragment = source.resolve()?;
            let name = fragment.name().to_string();
            check_name(&name)?;
            if name == self.config_set {
                return Err(Error::InvalidFragment(name));
            }
            if fragments.contains_key(&name) {
                return Err(Error::DuplicateFragment(name));
            }
            debug!(fragment = %name, "Composed fragment");
            fragments.insert(name, fragment);
        }

        Ok(BootstrapSet {
            config_set: self.config_set,
            os: self.os,
            fragments,
        })
    }

    /// Composes and writes `Metadata` and `UserData` onto `resource`.
    ///
    /// Existing metadata and user data are replaced.
    pub fn apply(self, resource: &mut Resource) -> Result<BootstrapSet> {
        if !resource.resource_type().supports_bootstrap() {
            return Err(Error::UnsupportedBootstrapTarget {
                resource: resource.logical_id().to_string(),
                resource_type: resource.resource_type().to_string(),
            });
        }
        let set = self.compose()?;
        resource.set_metadata(set.metadata());
        resource.set_property("UserData", set.user_data(resource.logical_id()));
        info!(
            resource = %resource.logical_id(),
            fragments = set.fragments.len(),
            "Attached bootstrap"
        );
        Ok(set)
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || RESERVED_NAMES.contains(&name) {
        return Err(Error::InvalidFragment(name.to_string()));
    }
    Ok(())
}

/// One step of the provisioning sequence.
#[derive(Debug, Clone, Copy)]
pub struct CommandStep<'a> {
    pub fragment: &'a str,
    pub key: &'a str,
    pub command: &'a InitCommand,
}

/// The composed result for one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapSet {
    config_set: String,
    os: OsFamily,
    fragments: IndexMap<String, Fragment>,
}

impl BootstrapSet {
    pub fn config_set(&self) -> &str {
        &self.config_set
    }

    pub fn os(&self) -> OsFamily {
        self.os
    }

    /// Fragment names in execution order.
    pub fn fragment_names(&self) -> Vec<&str> {
        self.fragments.keys().map(String::as_str).collect()
    }

    pub fn fragment(&self, name: &str) -> Option<&Fragment> {
        self.fragments.get(name)
    }

    /// Every command in the order cfn-init runs them.
    pub fn command_sequence(&self) -> Vec<CommandStep<'_>> {
        self.fragments
            .values()
            .flat_map(|fragment| {
                fragment.commands().map(move |(key, command)| CommandStep {
                    fragment: fragment.name(),
                    key,
                    command,
                })
            })
            .collect()
    }

    /// The `Metadata` value for the resource.
    pub fn metadata(&self) -> Expr {
        let mut init = IndexMap::new();
        init.insert(
            "configSets".to_string(),
            Expr::object([(
                self.config_set.as_str(),
                Expr::list(self.fragments.keys()),
            )]),
        );
        for (name, fragment) in &self.fragments {
            init.insert(name.clone(), Expr::from(fragment));
        }
        Expr::object([(INIT_METADATA_KEY, Expr::Map(init))])
    }

    /// The `UserData` value for the resource `logical_id`.
    pub fn user_data(&self, logical_id: &str) -> Expr {
        let helpers = self.os.helper_dir();
        let mut lines: Vec<Expr> = vec![Expr::from("#!/bin/bash -xe")];
        lines.extend(self.os.setup_commands().iter().map(|c| Expr::from(*c)));
        lines.push(Expr::join(
            "",
            vec![
                Expr::from("export CFN_PARAMS='"),
                Expr::from(" --region "),
                Expr::region(),
                Expr::from(" --stack "),
                Expr::stack_name(),
                Expr::from(format!(" --resource {}'", logical_id)),
            ],
        ));
        lines.push(Expr::from(format!(
            "{}/cfn-init -v -c {} $CFN_PARAMS",
            helpers, self.config_set
        )));
        lines.push(Expr::from(format!("{}/cfn-signal -e 0 $CFN_PARAMS", helpers)));
        Expr::base64(Expr::join("\n", lines))
    }
}

/// Attaches `sources` to `resource` using the default config set.
pub fn add_init(resource: &mut Resource, sources: Vec<FragmentSource>) -> Result<BootstrapSet> {
    sources
        .into_iter()
        .fold(BootstrapComposer::new(), |composer, source| composer.fragment(source))
        .apply(resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ResourceType;
    use serde_json::json;

    fn instance() -> Resource {
        Resource::new("Web", ResourceType::Ec2Instance).property("ImageId", "ami-123")
    }

    fn named(name: &str) -> FragmentSource {
        FragmentSource::from(Fragment::new(name))
    }

    #[test]
    fn test_config_set_preserves_order() {
        let set = BootstrapComposer::new()
            .fragment(named("B"))
            .fragment(named("A"))
            .fragment(FragmentSource::factory(|| Fragment::new("C")))
            .compose()
            .unwrap();
        assert_eq!(set.fragment_names(), vec!["B", "A", "C"]);
        assert_eq!(
            serde_json::to_value(set.metadata()).unwrap()[INIT_METADATA_KEY]["configSets"],
            json!({"default": ["B", "A", "C"]})
        );
    }

    #[test]
    fn test_duplicate_fragment_rejected() {
        let err = BootstrapComposer::new()
            .fragment(named("Docker"))
            .fragment(named("Docker"))
            .compose()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateFragment(ref n) if n == "Docker"));
    }

    #[test]
    fn test_reserved_names_rejected() {
        for name in ["", "configSets", "default"] {
            let result = BootstrapComposer::new().fragment(named(name)).compose();
            assert!(matches!(result, Err(Error::InvalidFragment(_))), "{}", name);
        }
    }

    #[test]
    fn test_factory_error_propagates() {
        let result = BootstrapComposer::new()
            .fragment(FragmentSource::try_factory(|| {
                Err(Error::InvalidFragment("broken".into()))
            }))
            .compose();
        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_target() {
        let mut bucket = Resource::new("Storage", ResourceType::S3Bucket);
        let err = add_init(&mut bucket, vec![named("Docker")]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedBootstrapTarget { .. }));
        assert!(bucket.metadata().is_none());
    }

    #[test]
    fn test_user_data_script() {
        let mut resource = instance();
        add_init(&mut resource, vec![named("Docker")]).unwrap();
        let value = serde_json::to_value(resource.get_property("UserData").unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"Fn::Base64": {"Fn::Join": ["\n", [
                "#!/bin/bash -xe",
                "yum update -y",
                {"Fn::Join": ["", [
                    "export CFN_PARAMS='",
                    " --region ", {"Ref": "AWS::Region"},
                    " --stack ", {"Ref": "AWS::StackName"},
                    " --resource Web'"
                ]]},
                "/opt/aws/bin/cfn-init -v -c default $CFN_PARAMS",
                "/opt/aws/bin/cfn-signal -e 0 $CFN_PARAMS"
            ]]}})
        );
    }

    #[test]
    fn test_debian_installs_helpers() {
        let set = BootstrapComposer::new()
            .os(OsFamily::Debian)
            .config_set("setup")
            .fragment(named("Docker"))
            .compose()
            .unwrap();
        let script = serde_json::to_string(&set.user_data("Web")).unwrap();
        assert!(script.contains("apt-get update -y"));
        assert!(script.contains("/usr/local/bin/cfn-init -v -c setup"));
        assert!(!script.contains("yum"));
    }

    #[test]
    fn test_command_sequence_spans_fragments() {
        let set = BootstrapComposer::new()
            .fragment(Fragment::new("First").command("2_b", InitCommand::new("b")).command("1_a", InitCommand::new("a")))
            .fragment(Fragment::new("Second").command("1_c", InitCommand::new("c")))
            .compose()
            .unwrap();
        let steps: Vec<_> = set
            .command_sequence()
            .iter()
            .map(|s| format!("{}/{}", s.fragment, s.key))
            .collect();
        assert_eq!(steps, vec!["First/1_a", "First/2_b", "Second/1_c"]);
    }
}
