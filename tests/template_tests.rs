//! Template builder tests for cfnforge
//!
//! This test suite covers:
//! - Logical id uniqueness across parameters and resources
//! - Parameter constraint validation
//! - Reference validation (Ref, Fn::GetAtt, DependsOn)
//! - Document layout and declaration order
//! - Resource attributes (Metadata, CreationPolicy, DependsOn)

mod common;

use cfnforge::error::Error;
use cfnforge::expr::Expr;
use cfnforge::template::{
    JsonStyle, Output, Parameter, ParameterType, Resource, ResourceType, Template,
};
use common::{bucket, instance, render, resource_order};
use pretty_assertions::assert_eq;
use serde_json::json;

// ============================================================================
// Logical Id Tests
// ============================================================================

#[test]
fn test_duplicate_ids_rejected_across_kinds() {
    let mut template = Template::new();
    template.add_resource(bucket("Shared")).unwrap();

    let err = template.add_parameter(Parameter::string("Shared")).unwrap_err();
    assert!(matches!(err, Error::DuplicateLogicalId { existing: "resource", .. }));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_outputs_have_own_namespace() {
    let mut template = Template::new();
    let storage = template.add_resource(bucket("Storage")).unwrap();
    template
        .add_output(Output::new("Storage", storage.reference()))
        .unwrap();
    assert!(template
        .add_output(Output::new("Storage", storage.reference()))
        .is_err());
}

#[test]
fn test_rejected_resource_is_not_registered() {
    let mut template = Template::new();
    assert!(template.add_resource(bucket("bad_id")).is_err());
    assert_eq!(template.resources().count(), 0);
}

// ============================================================================
// Parameter Tests
// ============================================================================

#[test]
fn test_parameter_serialization() {
    let mut template = Template::new();
    template
        .add_parameter(
            Parameter::string("SSHLocation")
                .description("CIDR allowed to SSH")
                .length(9, 18)
                .default_value("0.0.0.0/0")
                .allowed_pattern(r"(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})/(\d{1,2})")
                .constraint_description("must be a CIDR"),
        )
        .unwrap();
    template.add_resource(bucket("Storage")).unwrap();

    let doc = render(&template);
    assert_eq!(
        doc["Parameters"]["SSHLocation"],
        json!({
            "Type": "String",
            "Description": "CIDR allowed to SSH",
            "Default": "0.0.0.0/0",
            "MinLength": 9,
            "MaxLength": 18,
            "AllowedPattern": r"(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})/(\d{1,2})",
            "ConstraintDescription": "must be a CIDR"
        })
    );
}

#[test]
fn test_default_outside_allowed_values() {
    let mut template = Template::new();
    let err = template
        .add_parameter(
            Parameter::string("InstanceType")
                .allowed_values(["t2.micro", "t2.small"])
                .default_value("m4.large"),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { ref name, .. } if name == "InstanceType"));
}

#[test]
fn test_default_must_match_pattern() {
    let mut template = Template::new();
    let result = template.add_parameter(
        Parameter::string("Cidr")
            .allowed_pattern(r"\d+\.\d+\.\d+\.\d+/\d+")
            .default_value("anywhere"),
    );
    assert!(result.is_err());
}

#[test]
fn test_min_length_above_max_rejected() {
    let mut template = Template::new();
    assert!(template
        .add_parameter(Parameter::string("Name").length(10, 2))
        .is_err());
}

#[test]
fn test_length_constraint_requires_string() {
    let mut template = Template::new();
    let result = template.add_parameter(
        Parameter::new("Key", ParameterType::KeyPairName).max_length(10),
    );
    assert!(result.is_err());
}

#[test]
fn test_numeric_parameter_range() {
    let mut template = Template::new();
    template
        .add_parameter(
            Parameter::new("Size", ParameterType::Number)
                .value_range(8, 100)
                .default_value("30"),
        )
        .unwrap();
    assert!(template
        .add_parameter(
            Parameter::new("Count", ParameterType::Number)
                .value_range(1, 3)
                .default_value("7"),
        )
        .is_err());
}

// ============================================================================
// Reference Validation Tests
// ============================================================================

#[test]
fn test_dangling_reference_message_names_both_sides() {
    let mut template = Template::new();
    template
        .add_resource(instance("Web").property("KeyName", Expr::reference("SSHKeyName")))
        .unwrap();
    let err = template.to_json(JsonStyle::default()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("'Web'"));
    assert!(message.contains("'SSHKeyName'"));
}

#[test]
fn test_references_inside_join_and_base64_checked() {
    let mut template = Template::new();
    template
        .add_resource(instance("Web").property(
            "UserData",
            Expr::base64(Expr::join("", vec![Expr::from("x"), Expr::get_att("Ghost", "Arn")])),
        ))
        .unwrap();
    assert!(matches!(template.validate(), Err(Error::DanglingReference { .. })));
}

#[test]
fn test_metadata_references_checked() {
    let mut template = Template::new();
    template
        .add_resource(instance("Web").with_metadata(Expr::object([("Bucket", Expr::reference("Nope"))])))
        .unwrap();
    assert!(template.validate().is_err());
}

#[test]
fn test_depends_on_declared_resource() {
    let mut template = Template::new();
    template.add_resource(bucket("Storage")).unwrap();
    template.add_resource(instance("Web").depends_on("Storage")).unwrap();

    let doc = render(&template);
    assert_eq!(doc["Resources"]["Web"]["DependsOn"], json!(["Storage"]));
}

// ============================================================================
// Document Layout Tests
// ============================================================================

#[test]
fn test_resources_keep_declaration_order() {
    let mut template = Template::new();
    for id in ["Zulu", "Alpha", "Mike"] {
        template.add_resource(bucket(id)).unwrap();
    }
    assert_eq!(resource_order(&template), vec!["Zulu", "Alpha", "Mike"]);
}

#[test]
fn test_resource_attributes_layout() {
    let mut template = Template::new();
    template
        .add_resource(
            instance("Web")
                .with_metadata(Expr::object([("Owner", Expr::from("ops"))]))
                .with_signal_timeout(1, "PT5M"),
        )
        .unwrap();

    let doc = render(&template);
    assert_eq!(
        doc["Resources"]["Web"],
        json!({
            "Type": "AWS::EC2::Instance",
            "Metadata": {"Owner": "ops"},
            "CreationPolicy": {"ResourceSignal": {"Count": 1, "Timeout": "PT5M"}},
            "Properties": {"ImageId": "ami-12345678"}
        })
    );
}

#[test]
fn test_resource_without_properties_omits_key() {
    let mut template = Template::new();
    template.add_resource(bucket("Storage")).unwrap();
    let doc = render(&template);
    assert_eq!(doc["Resources"]["Storage"], json!({"Type": "AWS::S3::Bucket"}));
}

#[test]
fn test_other_resource_type_passes_through() {
    let mut template = Template::new();
    template
        .add_resource(
            Resource::new("Topic", ResourceType::Other("AWS::SNS::Topic".to_string()))
                .property("TopicName", Expr::stack_name()),
        )
        .unwrap();
    let doc = render(&template);
    assert_eq!(doc["Resources"]["Topic"]["Type"], json!("AWS::SNS::Topic"));
}

#[test]
fn test_output_export() {
    let mut template = Template::new();
    let storage = template.add_resource(bucket("Storage")).unwrap();
    template
        .add_output(
            Output::new("BucketName", storage.reference())
                .description("layers")
                .export(Expr::join("-", vec![Expr::stack_name(), Expr::from("bucket")])),
        )
        .unwrap();

    let doc = render(&template);
    assert_eq!(
        doc["Outputs"]["BucketName"],
        json!({
            "Description": "layers",
            "Value": {"Ref": "Storage"},
            "Export": {"Name": {"Fn::Join": ["-", [{"Ref": "AWS::StackName"}, "bucket"]]}}
        })
    );
}

#[test]
fn test_compact_and_pretty_parse_equal() {
    let mut template = Template::new().with_description("same");
    template.add_resource(bucket("Storage")).unwrap();

    let compact = template.to_json(JsonStyle::Compact).unwrap();
    let pretty = template.to_json(JsonStyle::Pretty { indent: 2 }).unwrap();
    assert!(!compact.contains('\n'));
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&compact).unwrap(),
        serde_json::from_str::<serde_json::Value>(&pretty).unwrap()
    );
}
