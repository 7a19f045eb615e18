//! Private Docker registry on a single EC2 instance.
//!
//! Layers are stored in a private S3 bucket the instance can fully access.
//! nginx terminates TLS with a Let's Encrypt certificate issued for the
//! domain pointing at the associated Elastic IP.

use tracing::info;

use super::Stack;
use crate::amilookup;
use crate::bootstrap::{catalog, BootstrapComposer};
use crate::error::Result;
use crate::expr::Expr;
use crate::iam;
use crate::template::{Output, Parameter, ParameterType, Resource, ResourceType, Template};

/// Prefix of every registry-specific logical id.
pub const SERVICE_NAME: &str = "DockerRegistry";

/// Instance types the registry may run on.
pub const INSTANCE_TYPES: &[&str] = &["t2.micro", "t2.small", "t2.medium", "m4.large", "c4.large"];

/// Where certificates are copied for the proxy.
pub const CERTS_DIR: &str = "/opt/registry/certs";

const DESCRIPTION: &str = "Private Docker registry backed by S3 and served over TLS";
const CIDR_PATTERN: &str = r"(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})/(\d{1,2})";
const SIGNAL_TIMEOUT: &str = "PT15M";

fn id(suffix: &str) -> String {
    format!("{}{}", SERVICE_NAME, suffix)
}

fn ingress(port: i64, cidr: impl Into<Expr>) -> Expr {
    Expr::object([
        ("IpProtocol", Expr::from("tcp")),
        ("FromPort", Expr::from(port)),
        ("ToPort", Expr::from(port)),
        ("CidrIp", cidr.into()),
    ])
}

/// Assembles the registry stack.
pub fn build() -> Result<Stack> {
    let mut template = Template::new().with_description(DESCRIPTION);

    let az = template.add_parameter(
        Parameter::new("AvailabilityZone", ParameterType::AvailabilityZoneName)
            .description("Availability Zone of the Subnet"),
    )?;
    let ssh_key = template.add_parameter(
        Parameter::new("SSHKeyName", ParameterType::KeyPairName)
            .description("Name of an existing EC2 KeyPair to enable SSH access to the instance"),
    )?;
    let ssh_location = template.add_parameter(
        Parameter::string("SSHLocation")
            .description("The IP address range that can be used to SSH to the EC2 instances")
            .length(9, 18)
            .default_value("0.0.0.0/0")
            .allowed_pattern(CIDR_PATTERN)
            .constraint_description("must be a valid IP CIDR range of the form x.x.x.x/x."),
    )?;
    let instance_type = template.add_parameter(
        Parameter::string(id("InstanceType"))
            .description("EC2 instance type of the registry host")
            .default_value(INSTANCE_TYPES[0])
            .allowed_values(INSTANCE_TYPES.iter().copied()),
    )?;
    let volume_size = template.add_parameter(
        Parameter::string(id("BlockDeviceSize"))
            .description(format!("{} root file system size (GB)", SERVICE_NAME))
            .default_value("30"),
    )?;
    let eip = template.add_parameter(Parameter::string(id("EIP")).description(
        "Allocation ID for the VPC Elastic IP address you want to associate \
         with Docker Registry instance. You should already have domain name \
         configured for this IP",
    ))?;
    let domain = template.add_parameter(
        Parameter::string(id("Domain"))
            .description("Domain name resolving to the Elastic IP, used for the TLS certificate"),
    )?;
    let email = template.add_parameter(
        Parameter::string(id("Email")).description("Contact email for Let's Encrypt registration"),
    )?;

    let ami_id = amilookup::ami_lookup(&mut template)?;

    let ssh_sg = template.add_resource(
        Resource::new("SSHSecurityGroup", ResourceType::Ec2SecurityGroup)
            .property("SecurityGroupIngress", Expr::list(vec![ingress(22, ssh_location.reference())]))
            .property("GroupDescription", "Enable SSH on port 22 for given location"),
    )?;
    let web_sg = template.add_resource(
        Resource::new(id("SecurityGroup"), ResourceType::Ec2SecurityGroup)
            .property(
                "SecurityGroupIngress",
                Expr::list(vec![ingress(80, "0.0.0.0/0"), ingress(443, "0.0.0.0/0")]),
            )
            .property("GroupDescription", "Enable HTTP for certificate issuance and HTTPS for the registry"),
    )?;

    let bucket = template.add_resource(
        Resource::new(id("Storage"), ResourceType::S3Bucket).property("AccessControl", "Private"),
    )?;
    let profile = iam::make_instance_profile(
        &mut template,
        &id("InstanceProfile"),
        vec![iam::bucket_full_access(&bucket)],
    )?;

    let mut instance = Resource::new(id("Instance"), ResourceType::Ec2Instance)
        .property("AvailabilityZone", az.reference())
        .property("IamInstanceProfile", profile.reference())
        .property("InstanceType", instance_type.reference())
        .property("ImageId", ami_id)
        .property("KeyName", ssh_key.reference())
        .property(
            "SecurityGroupIds",
            Expr::list(vec![ssh_sg.reference(), web_sg.reference()]),
        )
        .property(
            "BlockDeviceMappings",
            Expr::list(vec![Expr::object([
                ("DeviceName", Expr::from("/dev/xvda")),
                (
                    "Ebs",
                    Expr::object([
                        ("VolumeSize", volume_size.reference()),
                        ("VolumeType", Expr::from("gp2")),
                    ]),
                ),
            ])]),
        )
        .property(
            "Tags",
            Expr::list(vec![Expr::object([
                ("Key", Expr::from("Name")),
                ("Value", Expr::from("docker-registry")),
            ])]),
        )
        .with_signal_timeout(1, SIGNAL_TIMEOUT);

    let bootstrap = BootstrapComposer::new()
        .fragment(catalog::docker())
        .fragment(
            catalog::certbot(domain.reference(), email.reference())
                .copy_to(CERTS_DIR)
                .reload(format!(
                    "/usr/local/bin/docker-compose -f {} restart proxy",
                    catalog::COMPOSE_FILE
                )),
        )
        .fragment(catalog::registry(CERTS_DIR, &bucket))
        .apply(&mut instance)?;
    let registry = template.add_resource(instance)?;

    template.add_resource(
        Resource::new(id("EIPAssociation"), ResourceType::Ec2EipAssociation)
            .property("AllocationId", eip.reference())
            .property("InstanceId", registry.reference()),
    )?;

    template.add_output(
        Output::new(format!("{}Ip", registry.id()), registry.get_att("PublicIp"))
            .description("Public IP of the registry host"),
    )?;
    template.add_output(
        Output::new(format!("{}Bucket", bucket.id()), bucket.reference())
            .description("Bucket holding registry layers"),
    )?;

    info!(resources = template.resources().count(), "Assembled docker registry stack");
    let mut stack = Stack::new(template);
    stack.bootstraps.push((registry.id().to_string(), bootstrap));
    Ok(stack)
}
