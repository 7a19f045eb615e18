//! cfn-init configuration fragments.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::warn;

use crate::expr::Expr;

/// Package managers cfn-init knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    Yum,
    Apt,
    Rpm,
    Python,
    Rubygems,
    Msi,
}

impl PackageManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Yum => "yum",
            PackageManager::Apt => "apt",
            PackageManager::Rpm => "rpm",
            PackageManager::Python => "python",
            PackageManager::Rubygems => "rubygems",
            PackageManager::Msi => "msi",
        }
    }
}

/// Service managers cfn-init knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceManager {
    Sysvinit,
    Systemd,
    Windows,
}

impl ServiceManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceManager::Sysvinit => "sysvinit",
            ServiceManager::Systemd => "systemd",
            ServiceManager::Windows => "windows",
        }
    }
}

/// A file written by cfn-init, from inline content or a URL.
#[derive(Debug, Clone, PartialEq)]
pub struct InitFile {
    content: Option<Expr>,
    source: Option<Expr>,
    mode: String,
    owner: String,
    group: String,
}

impl InitFile {
    /// File with inline content.
    pub fn content(content: impl Into<Expr>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::empty()
        }
    }

    /// File downloaded from `url`.
    pub fn source(url: impl Into<Expr>) -> Self {
        Self {
            source: Some(url.into()),
            ..Self::empty()
        }
    }

    fn empty() -> Self {
        Self {
            content: None,
            source: None,
            mode: "000644".to_string(),
            owner: "root".to_string(),
            group: "root".to_string(),
        }
    }

    /// Six-digit octal mode, e.g. `000755`.
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn get_content(&self) -> Option<&Expr> {
        self.content.as_ref()
    }

    pub fn get_source(&self) -> Option<&Expr> {
        self.source.as_ref()
    }

    pub fn get_mode(&self) -> &str {
        &self.mode
    }

    pub fn get_owner(&self) -> &str {
        &self.owner
    }

    pub fn get_group(&self) -> &str {
        &self.group
    }
}

impl From<&InitFile> for Expr {
    fn from(file: &InitFile) -> Self {
        let mut entries = Vec::new();
        if let Some(content) = &file.content {
            entries.push(("content", content.clone()));
        }
        if let Some(source) = &file.source {
            entries.push(("source", source.clone()));
        }
        entries.push(("mode", Expr::from(file.mode.as_str())));
        entries.push(("owner", Expr::from(file.owner.as_str())));
        entries.push(("group", Expr::from(file.group.as_str())));
        Expr::object(entries)
    }
}

/// A shell command run by cfn-init.
#[derive(Debug, Clone, PartialEq)]
pub struct InitCommand {
    command: Expr,
    env: IndexMap<String, Expr>,
    cwd: Option<String>,
    test: Option<String>,
    ignore_errors: bool,
}

impl InitCommand {
    pub fn new(command: impl Into<Expr>) -> Self {
        Self {
            command: command.into(),
            env: IndexMap::new(),
            cwd: None,
            test: None,
            ignore_errors: false,
        }
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Only run the command when `test` exits 0.
    pub fn test(mut self, test: impl Into<String>) -> Self {
        self.test = Some(test.into());
        self
    }

    pub fn ignore_errors(mut self) -> Self {
        self.ignore_errors = true;
        self
    }

    pub fn command(&self) -> &Expr {
        &self.command
    }

    pub fn get_env(&self, name: &str) -> Option<&Expr> {
        self.env.get(name)
    }

    pub fn get_cwd(&self) -> Option<&str> {
        self.cwd.as_deref()
    }
}

impl From<&InitCommand> for Expr {
    fn from(command: &InitCommand) -> Self {
        let mut entries = vec![("command", command.command.clone())];
        if !command.env.is_empty() {
            entries.push(("env", Expr::Map(command.env.clone())));
        }
        if let Some(cwd) = &command.cwd {
            entries.push(("cwd", Expr::from(cwd.as_str())));
        }
        if let Some(test) = &command.test {
            entries.push(("test", Expr::from(test.as_str())));
        }
        if command.ignore_errors {
            entries.push(("ignoreErrors", Expr::from(true)));
        }
        Expr::object(entries)
    }
}

/// Desired state of a service once cfn-init finishes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceSpec {
    enabled: bool,
    ensure_running: bool,
    files: Vec<String>,
}

impl ServiceSpec {
    /// Enabled at boot and started now.
    pub fn running() -> Self {
        Self {
            enabled: true,
            ensure_running: true,
            files: Vec::new(),
        }
    }

    /// Restart the service when cfn-init changes `path`.
    pub fn restart_on(mut self, path: impl Into<String>) -> Self {
        self.files.push(path.into());
        self
    }
}

impl From<&ServiceSpec> for Expr {
    fn from(spec: &ServiceSpec) -> Self {
        let mut entries = vec![
            ("enabled", Expr::from(spec.enabled)),
            ("ensureRunning", Expr::from(spec.ensure_running)),
        ];
        if !spec.files.is_empty() {
            entries.push(("files", Expr::list(spec.files.iter())));
        }
        Expr::object(entries)
    }
}

/// A named unit of instance provisioning.
///
/// Commands are kept sorted by key because cfn-init runs them in
/// alphabetical order; prefix keys with `1_`, `2_`, ... to sequence them.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    name: String,
    packages: IndexMap<PackageManager, IndexMap<String, Vec<String>>>,
    files: IndexMap<String, InitFile>,
    commands: BTreeMap<String, InitCommand>,
    services: IndexMap<ServiceManager, IndexMap<String, ServiceSpec>>,
}

impl Fragment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            packages: IndexMap::new(),
            files: IndexMap::new(),
            commands: BTreeMap::new(),
            services: IndexMap::new(),
        }
    }

    /// Installs the latest version of a package.
    pub fn package(mut self, manager: PackageManager, name: impl Into<String>) -> Self {
        self.packages
            .entry(manager)
            .or_default()
            .insert(name.into(), Vec::new());
        self
    }

    /// Installs a pinned version of a package.
    pub fn package_version(
        mut self,
        manager: PackageManager,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.packages
            .entry(manager)
            .or_default()
            .entry(name.into())
            .or_default()
            .push(version.into());
        self
    }

    pub fn file(mut self, path: impl Into<String>, file: InitFile) -> Self {
        let path = path.into();
        if self.files.insert(path.clone(), file).is_some() {
            warn!(fragment = %self.name, path = %path, "Replaced file in fragment");
        }
        self
    }

    pub fn command(mut self, key: impl Into<String>, command: InitCommand) -> Self {
        let key = key.into();
        if self.commands.insert(key.clone(), command).is_some() {
            warn!(fragment = %self.name, command = %key, "Replaced command in fragment");
        }
        self
    }

    pub fn service(mut self, manager: ServiceManager, name: impl Into<String>, spec: ServiceSpec) -> Self {
        self.services
            .entry(manager)
            .or_default()
            .insert(name.into(), spec);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Packages for one manager, in declaration order.
    pub fn packages(&self, manager: PackageManager) -> Vec<&str> {
        self.packages
            .get(&manager)
            .map(|p| p.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn get_file(&self, path: &str) -> Option<&InitFile> {
        self.files.get(path)
    }

    pub fn file_paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Commands in execution order.
    pub fn commands(&self) -> impl Iterator<Item = (&str, &InitCommand)> {
        self.commands.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_command(&self, key: &str) -> Option<&InitCommand> {
        self.commands.get(key)
    }

    pub fn get_service(&self, manager: ServiceManager, name: &str) -> Option<&ServiceSpec> {
        self.services.get(&manager).and_then(|s| s.get(name))
    }
}

impl From<&Fragment> for Expr {
    fn from(fragment: &Fragment) -> Self {
        let mut entries = Vec::new();
        if !fragment.packages.is_empty() {
            entries.push((
                "packages",
                Expr::object(fragment.packages.iter().map(|(manager, packages)| {
                    (
                        manager.as_str(),
                        Expr::object(
                            packages
                                .iter()
                                .map(|(name, versions)| (name.as_str(), Expr::list(versions.iter()))),
                        ),
                    )
                })),
            ));
        }
        if !fragment.files.is_empty() {
            entries.push((
                "files",
                Expr::object(fragment.files.iter().map(|(path, file)| (path.as_str(), Expr::from(file)))),
            ));
        }
        if !fragment.commands.is_empty() {
            entries.push((
                "commands",
                Expr::object(
                    fragment
                        .commands
                        .iter()
                        .map(|(key, command)| (key.as_str(), Expr::from(command))),
                ),
            ));
        }
        if !fragment.services.is_empty() {
            entries.push((
                "services",
                Expr::object(fragment.services.iter().map(|(manager, services)| {
                    (
                        manager.as_str(),
                        Expr::object(services.iter().map(|(name, spec)| (name.as_str(), Expr::from(spec)))),
                    )
                })),
            ));
        }
        Expr::object(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_commands_sorted_by_key() {
        let fragment = Fragment::new("Order")
            .command("3_last", InitCommand::new("c"))
            .command("1_first", InitCommand::new("a"))
            .command("2_middle", InitCommand::new("b"));
        let keys: Vec<_> = fragment.commands().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["1_first", "2_middle", "3_last"]);
    }

    #[test]
    fn test_empty_sections_omitted() {
        let fragment = Fragment::new("Empty");
        assert_eq!(serde_json::to_value(Expr::from(&fragment)).unwrap(), json!({}));
    }

    #[test]
    fn test_fragment_serialization() {
        let fragment = Fragment::new("Web")
            .package(PackageManager::Yum, "nginx")
            .package_version(PackageManager::Python, "awscli", "1.32.0")
            .file("/etc/motd", InitFile::content("hello\n").mode("000600"))
            .command(
                "1_reload",
                InitCommand::new("nginx -s reload")
                    .env("LANG", "C")
                    .cwd("/tmp")
                    .ignore_errors(),
            )
            .service(
                ServiceManager::Sysvinit,
                "nginx",
                ServiceSpec::running().restart_on("/etc/nginx/nginx.conf"),
            );

        assert_eq!(
            serde_json::to_value(Expr::from(&fragment)).unwrap(),
            json!({
                "packages": {"yum": {"nginx": []}, "python": {"awscli": ["1.32.0"]}},
                "files": {"/etc/motd": {
                    "content": "hello\n", "mode": "000600", "owner": "root", "group": "root"
                }},
                "commands": {"1_reload": {
                    "command": "nginx -s reload",
                    "env": {"LANG": "C"},
                    "cwd": "/tmp",
                    "ignoreErrors": true
                }},
                "services": {"sysvinit": {"nginx": {
                    "enabled": true,
                    "ensureRunning": true,
                    "files": ["/etc/nginx/nginx.conf"]
                }}}
            })
        );
    }

    #[test]
    fn test_replaced_command_keeps_latest() {
        let fragment = Fragment::new("Dup")
            .command("run", InitCommand::new("first"))
            .command("run", InitCommand::new("second"));
        assert_eq!(
            fragment.get_command("run").unwrap().command().as_static_str().as_deref(),
            Some("second")
        );
    }
}
