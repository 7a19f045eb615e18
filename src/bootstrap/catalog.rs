//! Ready-made fragments for the Docker registry host.

use crate::expr::Expr;
use crate::template::Handle;

use super::{Fragment, FragmentSource, InitCommand, InitFile, PackageManager, ServiceManager, ServiceSpec};

const COMPOSE_YML: &str = include_str!("../../docker-compose.yml");
const NGINX_CONF: &str = include_str!("../../proxy/nginx.conf");
const REGISTRY_CONF: &str = include_str!("../../proxy/registry.conf");

/// Rendered compose file on the instance.
pub const COMPOSE_FILE: &str = "/opt/registry/docker-compose.yml";
/// Directory holding the registry files.
pub const REGISTRY_DIR: &str = "/opt/registry";
/// Where the certbot wrapper is installed.
pub const CERTBOT_SCRIPT: &str = "/opt/certbot-auto";
/// Download location of the certbot wrapper.
pub const CERTBOT_URL: &str = "https://dl.eff.org/certbot-auto";
/// Default certbot configuration directory.
pub const DEFAULT_CERTBOT_CONF_DIR: &str = "/opt/certs/";

/// Docker engine and docker-compose.
pub fn docker() -> Fragment {
    Fragment::new("Docker")
        .package(PackageManager::Yum, "docker")
        .command("docker_user", InitCommand::new("usermod -aG docker ec2-user"))
        .command("install_compose", InitCommand::new("pip install docker-compose"))
        .service(ServiceManager::Sysvinit, "docker", ServiceSpec::running())
}

/// Registry behind an nginx TLS proxy, storing layers in `bucket`.
///
/// `certs_dir` must hold `fullchain.pem` and `privkey.pem` by the time the
/// fragment runs; a DH group is generated into it.
pub fn registry(certs_dir: &str, bucket: &Handle) -> Fragment {
    let certs_dir = certs_dir.trim_end_matches('/');
    let compose_tpl = format!("{}.template", COMPOSE_FILE);

    Fragment::new("Registry")
        .package(PackageManager::Yum, "openssl")
        .package(PackageManager::Yum, "gettext")
        .file(
            compose_tpl.clone(),
            InitFile::content(Expr::lines(COMPOSE_YML))
                .mode("000664")
                .group("docker"),
        )
        .file(
            format!("{}/nginx.conf", REGISTRY_DIR),
            InitFile::content(Expr::lines(NGINX_CONF)).mode("000664"),
        )
        .file(
            format!("{}/registry.conf", REGISTRY_DIR),
            InitFile::content(Expr::lines(REGISTRY_CONF)).mode("000664"),
        )
        .command(
            "1_make_compose",
            InitCommand::new(format!("envsubst < {} > {}", compose_tpl, COMPOSE_FILE))
                .env("AWS_REGION", Expr::region())
                .env("STORAGE_BUCKET", bucket.reference())
                .env("CERTS_DIR", certs_dir),
        )
        .command(
            "2_gen_dh",
            InitCommand::new(format!("openssl dhparam -out {}/dh.pem 2048", certs_dir)),
        )
        .command(
            "3_up",
            InitCommand::new(format!("/usr/local/bin/docker-compose -f {} up -d", COMPOSE_FILE)),
        )
}

/// Let's Encrypt certificate for one domain, renewed daily.
#[derive(Debug, Clone)]
pub struct Certbot {
    domain: Expr,
    email: Expr,
    conf_dir: String,
    copy_to: Option<String>,
    reload: Option<String>,
}

/// Starts a certbot fragment for `domain`, registering with `email`.
pub fn certbot(domain: impl Into<Expr>, email: impl Into<Expr>) -> Certbot {
    Certbot {
        domain: domain.into(),
        email: email.into(),
        conf_dir: DEFAULT_CERTBOT_CONF_DIR.to_string(),
        copy_to: None,
        reload: None,
    }
}

impl Certbot {
    pub fn conf_dir(mut self, dir: impl Into<String>) -> Self {
        self.conf_dir = dir.into();
        self
    }

    /// Copies the issued `*.pem` files into `dir`.
    pub fn copy_to(mut self, dir: impl Into<String>) -> Self {
        self.copy_to = Some(dir.into());
        self
    }

    /// Command run by the daily renewal after the certificates are copied.
    pub fn reload(mut self, command: impl Into<String>) -> Self {
        self.reload = Some(command.into());
        self
    }

    fn renew_script(&self) -> Expr {
        let mut parts = vec![
            Expr::from("#!/bin/bash -e\n"),
            Expr::from(format!("{} renew --config-dir {}", CERTBOT_SCRIPT, self.conf_dir)),
        ];
        if let Some(copy_to) = &self.copy_to {
            parts.push(Expr::from(format!(
                "\ncp {}/live/",
                self.conf_dir.trim_end_matches('/')
            )));
            parts.push(self.domain.clone());
            parts.push(Expr::from(format!("/*.pem {}", copy_to)));
        }
        if let Some(reload) = &self.reload {
            parts.push(Expr::from(format!("\n{}", reload)));
        }
        Expr::join("", parts)
    }

    pub fn build(self) -> Fragment {
        let mut fragment = Fragment::new("Certbot")
            .file(
                CERTBOT_SCRIPT,
                InitFile::source(CERTBOT_URL).mode("000755"),
            )
            .file(
                "/etc/cron.daily/certbot_renew",
                InitFile::content(self.renew_script()).mode("000755"),
            )
            .command(
                "1_get_cert",
                InitCommand::new(Expr::join(
                    " ",
                    vec![
                        Expr::from(CERTBOT_SCRIPT),
                        Expr::from("certonly"),
                        Expr::from("--config-dir"),
                        Expr::from(self.conf_dir.as_str()),
                        Expr::from("--standalone --debug --agree-tos --non-interactive"),
                        Expr::from("-d"),
                        self.domain.clone(),
                        Expr::from("--email"),
                        self.email,
                    ],
                )),
            );

        if let Some(copy_to) = self.copy_to {
            let live = format!("cp {}/live/", self.conf_dir.trim_end_matches('/'));
            fragment = fragment
                .command("2_certs_dest", InitCommand::new(format!("mkdir -p {}", copy_to)))
                .command(
                    "3_copy_certs",
                    InitCommand::new(Expr::join(
                        "",
                        vec![Expr::from(live), self.domain, Expr::from("/*.pem .")],
                    ))
                    .cwd(copy_to),
                );
        }
        fragment
    }
}

impl From<Certbot> for Fragment {
    fn from(certbot: Certbot) -> Self {
        certbot.build()
    }
}

impl From<Certbot> for FragmentSource {
    fn from(certbot: Certbot) -> Self {
        FragmentSource::factory(move || certbot.build())
    }
}
