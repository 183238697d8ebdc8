use crate::error::{AnsonErr, AnsonResult};
use crate::fingerprint;
use crate::schema::common::Name;
use serde_json::{json, Map as JsonMap, Value as JsonValue};

const PRIMITIVES: [&str; 8] = [
    "null", "boolean", "int", "long", "float", "double", "bytes", "string",
];

/// The parsing canonical form of an avro schema: fullnames substituted,
/// attributes reduced to the set that affects the wire format, in a fixed
/// order, with no whitespace. Two schemas with the same canonical form
/// encode identically, and fingerprints are computed over this form.
#[derive(Debug, PartialEq)]
pub struct CanonicalSchema(pub(crate) JsonValue);

impl std::fmt::Display for CanonicalSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl CanonicalSchema {
    /// The CRC-64-AVRO (rabin) fingerprint of this canonical form.
    pub fn rabin64(&self) -> u64 {
        fingerprint::rabin64(self.0.to_string().as_bytes())
    }

    /// The MD5 fingerprint of this canonical form.
    pub fn md5(&self) -> [u8; 16] {
        fingerprint::md5(self.0.to_string().as_bytes())
    }

    /// The SHA-256 fingerprint of this canonical form.
    #[cfg(feature = "sha2")]
    pub fn sha256(&self) -> Vec<u8> {
        fingerprint::sha256(self.0.to_string().as_bytes())
    }
}

// [FULLNAMES] - replaces a name or named reference with its fullname
fn qualify(name: &str, enclosing_namespace: Option<&str>) -> String {
    if name.contains('.') {
        return name.to_string();
    }
    match enclosing_namespace {
        Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

// Reduces a schema to its parsing canonical form. [INTEGERS], [WHITESPACE]
// and attribute stripping fall out of rebuilding through serde_json; [ORDER]
// holds because keys are inserted in the canonical order and serde_json is
// configured to preserve it.
pub(crate) fn normalize_schema(
    json_schema: &JsonValue,
    enclosing_namespace: Option<&str>,
) -> AnsonResult<JsonValue> {
    match json_schema {
        JsonValue::String(s) => {
            // [PRIMITIVES]
            if PRIMITIVES.contains(&s.as_str()) {
                Ok(json!(s))
            } else {
                Ok(json!(qualify(s, enclosing_namespace)))
            }
        }
        JsonValue::Array(members) => {
            let mut normalized = Vec::with_capacity(members.len());
            for m in members {
                normalized.push(normalize_schema(m, enclosing_namespace)?);
            }
            Ok(JsonValue::Array(normalized))
        }
        JsonValue::Object(scm) => match scm.get("type") {
            Some(JsonValue::String(ty)) if ty == "record" => {
                let name = Name::from_json(scm, enclosing_namespace)?;
                let inner_namespace = name.namespace().map(str::to_owned);
                let fields = match scm.get("fields") {
                    Some(JsonValue::Array(fields)) => fields,
                    _ => return Err(AnsonErr::ParsingCanonicalForm),
                };
                let mut normalized_fields = Vec::with_capacity(fields.len());
                for f in fields {
                    let f = f.as_object().ok_or(AnsonErr::ParsingCanonicalForm)?;
                    let f_name = f
                        .get("name")
                        .and_then(|n| n.as_str())
                        .ok_or(AnsonErr::ParsingCanonicalForm)?;
                    let f_ty = f.get("type").ok_or(AnsonErr::ParsingCanonicalForm)?;
                    let mut field = JsonMap::new();
                    field.insert("name".to_string(), json!(f_name));
                    field.insert(
                        "type".to_string(),
                        normalize_schema(f_ty, inner_namespace.as_deref())?,
                    );
                    normalized_fields.push(JsonValue::Object(field));
                }
                let mut rec = JsonMap::new();
                rec.insert("name".to_string(), json!(name.fullname()));
                rec.insert("type".to_string(), json!("record"));
                rec.insert("fields".to_string(), JsonValue::Array(normalized_fields));
                Ok(JsonValue::Object(rec))
            }
            Some(JsonValue::String(ty)) if ty == "enum" => {
                let name = Name::from_json(scm, enclosing_namespace)?;
                let symbols = scm
                    .get("symbols")
                    .ok_or(AnsonErr::ParsingCanonicalForm)?;
                let mut en = JsonMap::new();
                en.insert("name".to_string(), json!(name.fullname()));
                en.insert("type".to_string(), json!("enum"));
                en.insert("symbols".to_string(), symbols.clone());
                Ok(JsonValue::Object(en))
            }
            Some(JsonValue::String(ty)) if ty == "fixed" => {
                let name = Name::from_json(scm, enclosing_namespace)?;
                let size = scm
                    .get("size")
                    .and_then(|s| s.as_u64())
                    .ok_or(AnsonErr::ParsingCanonicalForm)?;
                let mut fx = JsonMap::new();
                fx.insert("name".to_string(), json!(name.fullname()));
                fx.insert("type".to_string(), json!("fixed"));
                fx.insert("size".to_string(), json!(size));
                Ok(JsonValue::Object(fx))
            }
            Some(JsonValue::String(ty)) if ty == "array" => {
                let items = scm.get("items").ok_or(AnsonErr::ParsingCanonicalForm)?;
                let mut arr = JsonMap::new();
                arr.insert("type".to_string(), json!("array"));
                arr.insert(
                    "items".to_string(),
                    normalize_schema(items, enclosing_namespace)?,
                );
                Ok(JsonValue::Object(arr))
            }
            Some(JsonValue::String(ty)) if ty == "map" => {
                let values = scm.get("values").ok_or(AnsonErr::ParsingCanonicalForm)?;
                let mut map = JsonMap::new();
                map.insert("type".to_string(), json!("map"));
                map.insert(
                    "values".to_string(),
                    normalize_schema(values, enclosing_namespace)?,
                );
                Ok(JsonValue::Object(map))
            }
            // [PRIMITIVES]: the {"type": "int"} object form, possibly
            // carrying a logicalType, reduces to the bare primitive
            Some(JsonValue::String(ty)) if PRIMITIVES.contains(&ty.as_str()) => Ok(json!(ty)),
            // a named reference in object form
            Some(JsonValue::String(ty)) => Ok(json!(qualify(ty, enclosing_namespace))),
            // {"type": <nested schema>}
            Some(nested @ JsonValue::Object(_)) | Some(nested @ JsonValue::Array(_)) => {
                normalize_schema(nested, enclosing_namespace)
            }
            _ => Err(AnsonErr::UnknownSchema),
        },
        _ => Err(AnsonErr::UnknownSchema),
    }
}
