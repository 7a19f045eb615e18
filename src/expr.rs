//! Deploy-time expressions.
//!
//! Property values in a template are either plain JSON literals or
//! CloudFormation intrinsic functions that the platform resolves when the
//! stack is deployed. [`Expr`] models both as one tree so that references can
//! be validated before the document is written, and serializes each node to
//! its intrinsic-function form:
//!
//! | Node | JSON |
//! |------|------|
//! | `Literal(v)` | `v` |
//! | `Ref(id)` | `{"Ref": id}` |
//! | `GetAtt { resource, attribute }` | `{"Fn::GetAtt": [resource, attribute]}` |
//! | `Join { delimiter, parts }` | `{"Fn::Join": [delimiter, [parts...]]}` |
//! | `Base64(e)` | `{"Fn::Base64": e}` |
//! | `List(items)` | `[items...]` |
//! | `Map(entries)` | `{entries...}` |

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

/// `AWS::Region` pseudo parameter.
pub const REGION: &str = "AWS::Region";
/// `AWS::StackName` pseudo parameter.
pub const STACK_NAME: &str = "AWS::StackName";
/// `AWS::AccountId` pseudo parameter.
pub const ACCOUNT_ID: &str = "AWS::AccountId";
/// `AWS::Partition` pseudo parameter.
pub const PARTITION: &str = "AWS::Partition";

/// A template value, either literal or resolved at deploy time.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Plain JSON value
    Literal(Value),
    /// Value of a parameter, resource or pseudo parameter
    Ref(String),
    /// Attribute of a resource
    GetAtt {
        /// Resource logical id
        resource: String,
        /// Attribute name (e.g. `Arn`)
        attribute: String,
    },
    /// Concatenation of parts with a delimiter
    Join {
        /// Separator placed between parts
        delimiter: String,
        /// Joined values
        parts: Vec<Expr>,
    },
    /// Base64 encoding of the inner value
    Base64(Box<Expr>),
    /// JSON array of expressions
    List(Vec<Expr>),
    /// JSON object of expressions, in insertion order
    Map(IndexMap<String, Expr>),
}

/// A logical id mentioned by an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    /// Target of a `Ref`
    Ref(&'a str),
    /// Resource of a `Fn::GetAtt`
    GetAtt(&'a str),
}

impl Reference<'_> {
    /// The referenced logical id.
    pub fn target(&self) -> &str {
        match self {
            Reference::Ref(id) | Reference::GetAtt(id) => id,
        }
    }
}

impl Expr {
    /// Creates a literal expression.
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Creates a `Ref` to a logical id.
    pub fn reference(id: impl Into<String>) -> Self {
        Expr::Ref(id.into())
    }

    /// Creates a `Fn::GetAtt` on a resource.
    pub fn get_att(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Expr::GetAtt {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    /// Creates a `Fn::Join`.
    pub fn join<I, E>(delimiter: impl Into<String>, parts: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Expr::Join {
            delimiter: delimiter.into(),
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a `Fn::Base64`.
    pub fn base64(inner: impl Into<Expr>) -> Self {
        Expr::Base64(Box::new(inner.into()))
    }

    /// Creates a JSON array.
    pub fn list<I, E>(items: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Expr::List(items.into_iter().map(Into::into).collect())
    }

    /// Creates a JSON object from key/value pairs.
    pub fn object<I, K, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, E)>,
        K: Into<String>,
        E: Into<Expr>,
    {
        Expr::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Inlines a text file as a `Fn::Join` of its lines.
    ///
    /// Every part keeps its trailing newline, so joining with an empty
    /// delimiter reproduces the text byte for byte.
    pub fn lines(text: &str) -> Self {
        Expr::join("", text.split_inclusive('\n').map(str::to_string))
    }

    /// `Ref AWS::Region`
    pub fn region() -> Self {
        Expr::reference(REGION)
    }

    /// `Ref AWS::StackName`
    pub fn stack_name() -> Self {
        Expr::reference(STACK_NAME)
    }

    /// Returns true for `Ref`s to `AWS::` pseudo parameters.
    pub fn is_pseudo_parameter(id: &str) -> bool {
        id.starts_with("AWS::")
    }

    /// Folds the expression to a string when it has no deploy-time parts.
    ///
    /// Used for inspection only; the serialized document always keeps the
    /// original tree.
    pub fn as_static_str(&self) -> Option<String> {
        match self {
            Expr::Literal(Value::String(s)) => Some(s.clone()),
            Expr::Literal(Value::Number(n)) => Some(n.to_string()),
            Expr::Literal(Value::Bool(b)) => Some(b.to_string()),
            Expr::Join { delimiter, parts } => {
                let parts = parts
                    .iter()
                    .map(Expr::as_static_str)
                    .collect::<Option<Vec<_>>>()?;
                Some(parts.join(delimiter))
            }
            _ => None,
        }
    }

    /// Collects every logical id this expression refers to.
    pub fn references(&self) -> Vec<Reference<'_>> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<Reference<'a>>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ref(id) => refs.push(Reference::Ref(id)),
            Expr::GetAtt { resource, .. } => refs.push(Reference::GetAtt(resource)),
            Expr::Join { parts, .. } => parts.iter().for_each(|p| p.collect_references(refs)),
            Expr::Base64(inner) => inner.collect_references(refs),
            Expr::List(items) => items.iter().for_each(|i| i.collect_references(refs)),
            Expr::Map(entries) => entries.values().for_each(|v| v.collect_references(refs)),
        }
    }

    /// Looks up a key when the expression is a map.
    pub fn get(&self, key: &str) -> Option<&Expr> {
        match self {
            Expr::Map(entries) => entries.get(key),
            _ => None,
        }
    }
}

impl Serialize for Expr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Expr::Literal(value) => value.serialize(serializer),
            Expr::List(items) => items.serialize(serializer),
            Expr::Map(entries) => entries.serialize(serializer),
            Expr::Ref(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", id)?;
                map.end()
            }
            Expr::GetAtt {
                resource,
                attribute,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[resource, attribute])?;
                map.end()
            }
            Expr::Join { delimiter, parts } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &(delimiter, parts))?;
                map.end()
            }
            Expr::Base64(inner) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Base64", inner.as_ref())?;
                map.end()
            }
        }
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Literal(Value::String(s.to_string()))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Literal(Value::String(s))
    }
}

impl From<&String> for Expr {
    fn from(s: &String) -> Self {
        Expr::Literal(Value::String(s.clone()))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Literal(Value::Bool(b))
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Expr::Literal(Value::from(n))
    }
}

impl From<u32> for Expr {
    fn from(n: u32) -> Self {
        Expr::Literal(Value::from(n))
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Literal(value)
    }
}

impl From<Vec<Expr>> for Expr {
    fn from(items: Vec<Expr>) -> Self {
        Expr::List(items)
    }
}

impl From<IndexMap<String, Expr>> for Expr {
    fn from(entries: IndexMap<String, Expr>) -> Self {
        Expr::Map(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intrinsic_serialization() {
        let expr = Expr::join(
            "",
            vec![
                Expr::from("arn:aws:s3:::"),
                Expr::reference("Bucket"),
                Expr::from("/*"),
            ],
        );
        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!({"Fn::Join": ["", ["arn:aws:s3:::", {"Ref": "Bucket"}, "/*"]]})
        );

        let expr = Expr::base64(Expr::get_att("Function", "Arn"));
        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!({"Fn::Base64": {"Fn::GetAtt": ["Function", "Arn"]}})
        );
    }

    #[test]
    fn test_map_keeps_insertion_order() {
        let expr = Expr::object([("Zeta", Expr::from(1_i64)), ("Alpha", Expr::from(2_i64))]);
        assert_eq!(
            serde_json::to_string(&expr).unwrap(),
            r#"{"Zeta":1,"Alpha":2}"#
        );
    }

    #[test]
    fn test_lines_round_trip() {
        let text = "first\nsecond\n\nlast";
        let expr = Expr::lines(text);
        match &expr {
            Expr::Join { parts, .. } => assert_eq!(parts.len(), 4),
            other => panic!("expected join, got {:?}", other),
        }
        assert_eq!(expr.as_static_str().as_deref(), Some(text));
    }

    #[test]
    fn test_as_static_str_stops_at_refs() {
        let expr = Expr::join(" ", vec![Expr::from("a"), Expr::region()]);
        assert_eq!(expr.as_static_str(), None);
        assert_eq!(Expr::from(30_i64).as_static_str().as_deref(), Some("30"));
    }

    #[test]
    fn test_references() {
        let expr = Expr::object([
            ("A", Expr::reference("Param")),
            (
                "B",
                Expr::list(vec![Expr::get_att("Res", "Arn"), Expr::region()]),
            ),
        ]);
        let targets: Vec<_> = expr.references().iter().map(|r| r.target().to_string()).collect();
        assert_eq!(targets, vec!["Param", "Res", "AWS::Region"]);
        assert!(Expr::is_pseudo_parameter("AWS::Region"));
        assert!(!Expr::is_pseudo_parameter("Param"));
    }
}
