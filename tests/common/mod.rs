//! Shared test utilities for the cfnforge test suite.
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use cfnforge::template::{JsonStyle, Resource, ResourceType, Template};

/// A minimal bootstrappable instance.
pub fn instance(id: &str) -> Resource {
    Resource::new(id, ResourceType::Ec2Instance).property("ImageId", "ami-12345678")
}

/// A bare bucket.
pub fn bucket(id: &str) -> Resource {
    Resource::new(id, ResourceType::S3Bucket)
}

/// Renders compactly and parses the document back.
pub fn render(template: &Template) -> Value {
    let json = template
        .to_json(JsonStyle::Compact)
        .expect("template should render");
    serde_json::from_str(&json).expect("rendered template should be valid JSON")
}

#[derive(Deserialize)]
struct Sections {
    #[serde(rename = "Resources")]
    resources: IndexMap<String, Value>,
}

/// Resource logical ids in the order they appear in the document.
pub fn resource_order(template: &Template) -> Vec<String> {
    let json = template
        .to_json(JsonStyle::Compact)
        .expect("template should render");
    let sections: Sections = serde_json::from_str(&json).expect("document should have resources");
    sections.resources.keys().cloned().collect()
}
