// Definitions shared across the schema implementation: names, field
// ordering and record field declarations.

use crate::error::AnsonErr;
use crate::schema::Variant;
use crate::value::Value;
use serde_json::Value as JsonValue;
use std::fmt::{self, Display};
use std::str::FromStr;

///////////////////////////////////////////////////////////////////////////////
/// Name implementation for named types: record, fixed, enum
///////////////////////////////////////////////////////////////////////////////

// Names, namespace segments, enum symbols and field names all share the
// grammar [A-Za-z_][A-Za-z0-9_]*
pub(crate) fn validate_name(name: &str) -> Result<(), AnsonErr> {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return Err(AnsonErr::InvalidName),
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(AnsonErr::InvalidName)
    }
}

// Follows the grammar: <empty> | <name>[(<dot><name>)*]
pub(crate) fn validate_namespace(s: &str) -> Result<(), AnsonErr> {
    for n in s.split('.') {
        validate_name(n).map_err(|_| AnsonErr::InvalidNamespace)?;
    }
    Ok(())
}

/// Represents the `fullname` attribute
/// of a named avro type i.e, Record, Fixed and Enum.
#[derive(Debug, Clone, Eq, PartialOrd, Ord)]
pub struct Name {
    pub(crate) name: String,
    pub(crate) namespace: Option<String>,
}

impl Name {
    // Creates a new name with validation. This will extract the namespace if a dot is present in `name`.
    // Any further calls to set_namespace will be a noop if the name already contains a dot.
    pub(crate) fn new(name: &str) -> Result<Self, AnsonErr> {
        let mut namespace = None;
        let name = if name.contains('.') {
            validate_namespace(name)?;
            // the final segment is the name proper, the rest is the namespace
            let idx = name.rfind('.').unwrap();
            namespace = Some(name[..idx].to_string());
            let name = &name[idx + 1..];
            validate_name(name)?;
            name
        } else {
            validate_name(name)?;
            name
        };

        Ok(Self {
            name: name.to_string(),
            namespace,
        })
    }

    pub(crate) fn from_json(
        json: &serde_json::map::Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> Result<Self, AnsonErr> {
        let mut name = if let Some(JsonValue::String(ref s)) = json.get("name") {
            Name::new(s)
        } else {
            return Err(AnsonErr::NameParseFailed);
        }?;

        // A dotted name is a fullname and any namespace attribute is ignored.
        // Otherwise the namespace attribute wins, then the enclosing namespace.
        if name.namespace.is_none() {
            if let Some(JsonValue::String(s)) = json.get("namespace") {
                validate_namespace(s)?;
                name.set_namespace(s)?;
            } else if let Some(a) = enclosing_namespace {
                validate_namespace(a)?;
                name.set_namespace(a)?;
            }
        }

        Ok(name)
    }

    pub(crate) fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub(crate) fn set_namespace(&mut self, namespace: &str) -> Result<(), AnsonErr> {
        // empty string is a null namespace
        if namespace.is_empty() {
            return Ok(());
        }

        validate_namespace(namespace)?;
        // noop when a namespace was already extracted from a dotted name
        if self.namespace.is_none() {
            self.namespace = Some(namespace.to_string());
        }
        Ok(())
    }

    pub(crate) fn fullname(&self) -> String {
        match &self.namespace {
            Some(n) if !n.is_empty() => format!("{}.{}", n, self.name),
            _ => self.name.to_string(),
        }
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fullname())
    }
}

impl FromStr for Name {
    type Err = AnsonErr;

    fn from_str(s: &str) -> Result<Self, AnsonErr> {
        Name::new(s)
    }
}

impl std::convert::TryFrom<&str> for Name {
    type Error = AnsonErr;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Name::new(value)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.fullname() == other.fullname()
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Ordering for record fields
///////////////////////////////////////////////////////////////////////////////

/// Sort ordering of a record field, from the field's `order` attribute.
#[derive(Debug, PartialEq, Clone)]
pub enum Order {
    /// The default ordering.
    Ascending,
    /// Reversed comparison.
    Descending,
    /// The field is skipped in comparisons.
    Ignore,
}

impl FromStr for Order {
    type Err = AnsonErr;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascending" => Ok(Order::Ascending),
            "descending" => Ok(Order::Descending),
            "ignore" => Ok(Order::Ignore),
            _ => Err(AnsonErr::UnknownFieldOrdering),
        }
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Record field definition.
///////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) ty: Variant,
    pub(crate) default: Option<Value>,
    pub(crate) order: Order,
    pub(crate) aliases: Option<Vec<String>>,
}

impl std::cmp::PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.ty == other.ty
    }
}

impl Field {
    pub(crate) fn new(
        name: &str,
        ty: Variant,
        default: Option<Value>,
        order: Order,
        aliases: Option<Vec<String>>,
    ) -> Result<Self, AnsonErr> {
        // field names adhere to the same grammar as type names
        validate_name(name)?;
        Ok(Field {
            name: name.to_string(),
            ty,
            default,
            order,
            aliases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::validate_name;
    use super::validate_namespace;
    use super::Name;

    #[test]
    fn name_starts_with_number() {
        assert!(Name::new("2org").is_err());
    }

    #[test]
    fn name_grammar() {
        assert!(validate_name("_ok_1").is_ok());
        assert!(validate_name("Ok2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("has-dash").is_err());
        assert!(validate_name("1leading").is_err());
    }

    #[test]
    fn invalid_namespace() {
        let mut name = Name::new("avro").unwrap();
        assert!(name.set_namespace("23").is_err());
    }

    #[test]
    fn name_with_separate_namespace() {
        let mut name = Name::new("hello").unwrap();
        let _ = name.set_namespace("org.foo");
        assert_eq!("org.foo.hello", name.fullname());
    }

    #[test]
    fn name_contains_dots() {
        let name = Name::new("org.apache.avro").unwrap();
        assert_eq!("avro", name.name);
        assert_eq!("org.apache.avro", name.fullname());
    }

    #[test]
    fn fullname_with_empty_namespace() {
        let mut name = Name::new("org.apache.avro").unwrap();
        name.set_namespace("").unwrap();
        assert_eq!("org.apache.avro", name.fullname());
    }

    #[test]
    fn multiple_dots_invalid() {
        assert!(validate_namespace("some.namespace..foo").is_err());
    }

    #[test]
    fn name_has_dot_and_namespace_present() {
        let json: serde_json::Value = serde_json::from_str(
            r##"{"name":"my.longlist","namespace":"com.some","type":"record"}"##,
        )
        .unwrap();
        let name = Name::from_json(json.as_object().unwrap(), None).unwrap();
        assert_eq!(name.name, "longlist");
        assert_eq!(name.namespace, Some("my".to_string()));
        assert_eq!(name.fullname(), "my.longlist");
    }

    #[test]
    fn name_no_dot_and_namespace_present() {
        let json: serde_json::Value = serde_json::from_str(
            r##"{"name":"longlist","namespace":"com.some","type":"record"}"##,
        )
        .unwrap();
        let name = Name::from_json(json.as_object().unwrap(), None).unwrap();
        assert_eq!(name.fullname(), "com.some.longlist");
    }
}
