use super::common::{Field, Name, Order};
use super::{LogicalType, Variant};
use crate::error::io_err;
use crate::error::AnsonErr;
use crate::error::AnsonResult;
use crate::schema::common::validate_name;
use crate::value::FieldValue;
use crate::value::Value;
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

// A { fullname -> schema } lookup table. Recursive and repeated references
// to named schemas become Variant::Named edges resolved through this table,
// so schema graphs with cycles stay acyclic in ownership.
#[derive(Debug, Clone)]
pub(crate) struct NameTable {
    names: HashMap<String, Variant>,
}

impl NameTable {
    pub(crate) fn new() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    pub(crate) fn get<'a>(&'a self, name: &str) -> Option<&'a Variant> {
        self.names.get(name)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub(crate) fn parse_schema(
        &mut self,
        value: &JsonValue,
        enclosing_namespace: Option<&str>,
    ) -> Result<Variant, AnsonErr> {
        match value {
            // a complex schema
            JsonValue::Object(ref schema) => self.parse_object(schema, enclosing_namespace),
            // a primitive schema or a named schema reference
            JsonValue::String(ref schema) => self.parse_primitive(schema, enclosing_namespace),
            // a union schema
            JsonValue::Array(ref schema) => self.parse_union(schema, enclosing_namespace),
            _ => Err(AnsonErr::UnknownSchema),
        }
    }

    fn parse_union(
        &mut self,
        schema: &[JsonValue],
        enclosing_namespace: Option<&str>,
    ) -> Result<Variant, AnsonErr> {
        let mut members = vec![];
        let mut seen_kinds: Vec<String> = vec![];
        for s in schema {
            let parsed = self.parse_schema(s, enclosing_namespace)?;
            // two members of the same kind are not allowed, except named
            // types which are distinguished by fullname
            let key = match union_kind_key(&parsed) {
                Some(key) => key,
                None => return Err(AnsonErr::DuplicateSchemaInUnion),
            };
            if seen_kinds.iter().any(|k| *k == key) {
                return Err(AnsonErr::DuplicateSchemaInUnion);
            }
            seen_kinds.push(key);
            members.push(parsed);
        }
        Ok(Variant::Union { variants: members })
    }

    fn resolve_reference(&self, name: &str, enclosing_namespace: Option<&str>) -> Option<String> {
        if name.contains('.') {
            return self.names.contains_key(name).then(|| name.to_string());
        }
        if let Some(namespace) = enclosing_namespace {
            let qualified = format!("{}.{}", namespace, name);
            if self.names.contains_key(&qualified) {
                return Some(qualified);
            }
        }
        self.names.contains_key(name).then(|| name.to_string())
    }

    /// Parse a JSON string representing a primitive Avro type or a reference
    /// to an already defined named schema.
    fn parse_primitive(
        &mut self,
        schema: &str,
        enclosing_namespace: Option<&str>,
    ) -> Result<Variant, AnsonErr> {
        match schema {
            "null" => Ok(Variant::Null),
            "boolean" => Ok(Variant::Boolean),
            "int" => Ok(Variant::Int),
            "long" => Ok(Variant::Long),
            "double" => Ok(Variant::Double),
            "float" => Ok(Variant::Float),
            "bytes" => Ok(Variant::Bytes),
            "string" => Ok(Variant::Str),
            other if !other.is_empty() => {
                match self.resolve_reference(other, enclosing_namespace) {
                    Some(fullname) => Ok(Variant::Named(fullname)),
                    None => Err(AnsonErr::SchemaParseErr(io_err(&format!(
                        "named schema `{}` must be defined before use",
                        other
                    )))),
                }
            }
            _ => Err(AnsonErr::InvalidPrimitiveSchema),
        }
    }

    fn parse_record_fields(
        &mut self,
        fields: &[JsonValue],
        enclosing_namespace: Option<&str>,
    ) -> Result<IndexMap<String, Field>, AnsonErr> {
        let mut fields_parsed = IndexMap::with_capacity(fields.len());
        for field_obj in fields {
            match field_obj {
                JsonValue::Object(o) => {
                    let name = o
                        .get("name")
                        .and_then(|a| a.as_str())
                        .ok_or(AnsonErr::RecordNameNotFound)?;

                    let ty: &JsonValue = o.get("type").ok_or(AnsonErr::RecordTypeNotFound)?;
                    let ty = self.parse_schema(ty, enclosing_namespace)?;

                    let default = match o.get("default") {
                        Some(v) => Some(parse_default(v, &ty)?),
                        None => None,
                    };

                    let order = match o.get("order") {
                        Some(order) => parse_field_order(order)?,
                        None => Order::Ascending,
                    };

                    let aliases = parse_aliases(o.get("aliases"));

                    if fields_parsed.contains_key(name) {
                        return Err(AnsonErr::DuplicateField);
                    }
                    fields_parsed.insert(
                        name.to_string(),
                        Field::new(name, ty, default, order, aliases)?,
                    );
                }
                _ => return Err(AnsonErr::InvalidRecordFieldType),
            }
        }

        Ok(fields_parsed)
    }

    fn parse_object(
        &mut self,
        value: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> Result<Variant, AnsonErr> {
        match value.get("type") {
            Some(&JsonValue::String(ref s)) if s == "record" => {
                let rec_name = Name::from_json(value, enclosing_namespace)?;
                let fullname = rec_name.fullname();

                if self.names.contains_key(&fullname) {
                    return Err(AnsonErr::DuplicateSchema);
                }
                // a placeholder reference makes recursive definitions parse
                self.names
                    .insert(fullname.clone(), Variant::Named(fullname.clone()));

                let fields = match value.get("fields") {
                    Some(JsonValue::Array(ref fields_vec)) => fields_vec,
                    _ => return Err(AnsonErr::ExpectedFieldsJsonArray),
                };

                let fields = self.parse_record_fields(fields, {
                    if rec_name.namespace().is_some() {
                        // most tightly enclosing namespace
                        rec_name.namespace()
                    } else {
                        enclosing_namespace
                    }
                })?;

                let aliases = parse_aliases(value.get("aliases"));

                let rec = Variant::Record {
                    name: rec_name,
                    aliases,
                    fields,
                };

                self.names.insert(fullname, rec.clone());

                Ok(rec)
            }
            Some(&JsonValue::String(ref s)) if s == "enum" => {
                let name = Name::from_json(value, enclosing_namespace)?;
                let aliases = parse_aliases(value.get("aliases"));
                let mut symbols: Vec<String> = vec![];

                match value.get("symbols") {
                    Some(JsonValue::Array(sym)) => {
                        for v in sym {
                            let symbol = v.as_str().ok_or(AnsonErr::EnumSymbolParseErr)?;
                            validate_name(symbol)?;
                            if symbols.iter().any(|s| s == symbol) {
                                return Err(AnsonErr::DuplicateSymbol);
                            }
                            symbols.push(symbol.to_string());
                        }
                    }
                    Some(_) => return Err(AnsonErr::EnumSymbolParseErr),
                    None => return Err(AnsonErr::EnumSymbolsMissing),
                }

                let default = match value.get("default") {
                    Some(JsonValue::String(d)) => {
                        if !symbols.iter().any(|s| s == d) {
                            return Err(AnsonErr::EnumSymbolNotPresent);
                        }
                        Some(d.clone())
                    }
                    Some(_) => return Err(AnsonErr::EnumSymbolParseErr),
                    None => None,
                };

                let fullname = name.fullname();
                if self.names.contains_key(&fullname) {
                    return Err(AnsonErr::DuplicateSchema);
                }

                let enum_schema = Variant::Enum {
                    name,
                    aliases,
                    symbols,
                    default,
                };

                self.names.insert(fullname, enum_schema.clone());

                Ok(enum_schema)
            }
            Some(&JsonValue::String(ref s)) if s == "array" => {
                let item_missing_err = AnsonErr::SchemaParseErr(io_err(
                    "Array schema must have `items` field defined",
                ));
                let items_schema = value.get("items").ok_or(item_missing_err)?;
                let parsed_items = self.parse_schema(items_schema, enclosing_namespace)?;
                Ok(Variant::Array {
                    items: Box::new(parsed_items),
                })
            }
            Some(&JsonValue::String(ref s)) if s == "map" => {
                let values_missing_err =
                    AnsonErr::SchemaParseErr(io_err("Map schema must have `values` field defined"));
                let values_schema = value.get("values").ok_or(values_missing_err)?;
                let parsed_values = self.parse_schema(values_schema, enclosing_namespace)?;
                Ok(Variant::Map {
                    values: Box::new(parsed_values),
                })
            }
            Some(&JsonValue::String(ref s)) if s == "fixed" => {
                let name = Name::from_json(value, enclosing_namespace)?;
                let size = value.get("size").ok_or(AnsonErr::FixedSizeNotFound)?;
                let size = size.as_u64().ok_or(AnsonErr::FixedSizeNotNumber)? as usize;
                let aliases = parse_aliases(value.get("aliases"));

                let fullname = name.fullname();
                if self.names.contains_key(&fullname) {
                    return Err(AnsonErr::DuplicateSchema);
                }

                let fixed_schema = Variant::Fixed {
                    name,
                    aliases,
                    size,
                };

                // references through the table see the base fixed schema
                self.names.insert(fullname, fixed_schema.clone());

                Ok(with_logical(value, fixed_schema))
            }
            Some(JsonValue::String(ref s)) if s == "null" => Ok(Variant::Null),
            Some(JsonValue::String(ref s)) if s == "boolean" => Ok(Variant::Boolean),
            Some(JsonValue::String(ref s)) if s == "int" => Ok(with_logical(value, Variant::Int)),
            Some(JsonValue::String(ref s)) if s == "long" => Ok(with_logical(value, Variant::Long)),
            Some(JsonValue::String(ref s)) if s == "float" => Ok(Variant::Float),
            Some(JsonValue::String(ref s)) if s == "double" => Ok(Variant::Double),
            Some(JsonValue::String(ref s)) if s == "bytes" => {
                Ok(with_logical(value, Variant::Bytes))
            }
            Some(JsonValue::String(ref s)) if s == "string" => {
                Ok(with_logical(value, Variant::Str))
            }
            // {"type": <nested schema>} wrappers
            Some(nested @ JsonValue::Object(_)) | Some(nested @ JsonValue::Array(_)) => {
                self.parse_schema(nested, enclosing_namespace)
            }
            _other => Err(AnsonErr::SchemaParseFailed),
        }
    }
}

// The kind identity used for union member uniqueness. Named types are keyed
// by fullname, logical types by their base. Immediate unions have no key.
fn union_kind_key(variant: &Variant) -> Option<String> {
    let key = match variant {
        Variant::Null => "null",
        Variant::Boolean => "boolean",
        Variant::Int => "int",
        Variant::Long => "long",
        Variant::Float => "float",
        Variant::Double => "double",
        Variant::Bytes => "bytes",
        Variant::Str => "string",
        Variant::Array { .. } => "array",
        Variant::Map { .. } => "map",
        Variant::Union { .. } => return None,
        Variant::Logical { inner, .. } => return union_kind_key(inner),
        Variant::Record { name, .. }
        | Variant::Enum { name, .. }
        | Variant::Fixed { name, .. } => return Some(name.fullname()),
        Variant::Named(name) => return Some(name.clone()),
    };
    Some(key.to_string())
}

// Attaches a recognized `logicalType` attribute to its base schema. Unknown
// logical types and invalid attribute combinations fall back to the bare
// base schema and never fail.
fn with_logical(map: &Map<String, JsonValue>, base: Variant) -> Variant {
    let kind = match map.get("logicalType").and_then(|v| v.as_str()) {
        Some(kind) => kind,
        None => return base,
    };
    let kind = match (kind, &base) {
        ("uuid", Variant::Str) => LogicalType::Uuid,
        ("decimal", Variant::Bytes) | ("decimal", Variant::Fixed { .. }) => {
            let precision = match map.get("precision").and_then(|v| v.as_u64()) {
                Some(p) if p >= 1 => p as usize,
                _ => return base,
            };
            let scale = map.get("scale").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
            if scale > precision {
                return base;
            }
            if let Variant::Fixed { size, .. } = &base {
                if *size == 0 || precision > max_decimal_precision(*size) {
                    return base;
                }
            }
            LogicalType::Decimal { precision, scale }
        }
        ("date", Variant::Int) => LogicalType::Date,
        ("time-millis", Variant::Int) => LogicalType::TimeMillis,
        ("time-micros", Variant::Long) => LogicalType::TimeMicros,
        ("timestamp-millis", Variant::Long) => LogicalType::TimestampMillis,
        ("timestamp-micros", Variant::Long) => LogicalType::TimestampMicros,
        ("local-timestamp-millis", Variant::Long) => LogicalType::LocalTimestampMillis,
        ("local-timestamp-micros", Variant::Long) => LogicalType::LocalTimestampMicros,
        ("duration", Variant::Fixed { size: 12, .. }) => LogicalType::Duration,
        _ => return base,
    };
    Variant::Logical {
        kind,
        inner: Box::new(base),
    }
}

// Largest decimal precision that fits an N byte two's-complement value.
fn max_decimal_precision(size: usize) -> usize {
    ((8 * size - 1) as f64 * std::f64::consts::LOG10_2).floor() as usize
}

// Parses the `order` of a field, defaults to `ascending` order
pub(crate) fn parse_field_order(order: &JsonValue) -> AnsonResult<Order> {
    match *order {
        JsonValue::String(ref s) => s.parse(),
        _ => Err(AnsonErr::InvalidFieldOrdering),
    }
}

// Parses aliases of a named schema or a field
fn parse_aliases(aliases: Option<&JsonValue>) -> Option<Vec<String>> {
    match aliases {
        Some(JsonValue::Array(ref aliases)) => {
            let mut alias_parsed = Vec::with_capacity(aliases.len());
            for a in aliases {
                let a = a.as_str().map(ToOwned::to_owned)?;
                alias_parsed.push(a);
            }
            Some(alias_parsed)
        }
        _ => None,
    }
}

pub(crate) fn parse_default(
    default_value: &JsonValue,
    schema_variant: &Variant,
) -> Result<Value, AnsonErr> {
    match (default_value, schema_variant) {
        // a union's default must match its first member; the parsed value
        // carries the member tag
        (d, Variant::Union { variants }) => {
            let first_variant = variants.first().ok_or(AnsonErr::FailedDefaultUnion)?;
            let parsed = parse_default(d, first_variant).map_err(|_| AnsonErr::FailedDefaultUnion)?;
            Ok(Value::Union(0, Box::new(parsed)))
        }
        (d, Variant::Logical { inner, .. }) => parse_default(d, inner),
        (JsonValue::Null, Variant::Null) => Ok(Value::Null),
        (JsonValue::Bool(v), Variant::Boolean) => Ok(Value::Boolean(*v)),
        (JsonValue::Number(n), Variant::Int) => n
            .as_i64()
            .map(|n| Value::Int(n as i32))
            .ok_or(AnsonErr::DefaultValueParse),
        (JsonValue::Number(n), Variant::Long) => {
            n.as_i64().map(Value::Long).ok_or(AnsonErr::DefaultValueParse)
        }
        (JsonValue::Number(n), Variant::Float) => n
            .as_f64()
            .map(|n| Value::Float(n as f32))
            .ok_or(AnsonErr::DefaultValueParse),
        (JsonValue::Number(n), Variant::Double) => {
            n.as_f64().map(Value::Double).ok_or(AnsonErr::DefaultValueParse)
        }
        (JsonValue::String(n), Variant::Bytes) => Ok(Value::Bytes(n.as_bytes().to_vec())),
        (JsonValue::String(n), Variant::Str) => Ok(Value::Str(n.clone())),
        (JsonValue::Object(v), Variant::Record { name, fields, .. }) => {
            let mut values = IndexMap::with_capacity(v.len());

            for (k, v) in v {
                let field = fields.get(k).ok_or(AnsonErr::DefaultValueParse)?;
                let parsed_value = parse_default(v, &field.ty)?;
                values.insert(k.to_string(), FieldValue::new(parsed_value));
            }

            Ok(Value::Record(crate::value::Record {
                fields: values,
                name: name.fullname(),
            }))
        }
        (JsonValue::String(n), Variant::Enum { symbols, .. }) => {
            if symbols.iter().any(|s| s == n) {
                Ok(Value::Enum(n.clone()))
            } else {
                Err(AnsonErr::EnumSymbolNotPresent)
            }
        }
        (JsonValue::Array(arr), Variant::Array { items }) => {
            let mut default_arr_items: Vec<Value> = Vec::with_capacity(arr.len());
            for v in arr {
                default_arr_items.push(parse_default(v, items)?);
            }
            Ok(Value::Array(default_arr_items))
        }
        (JsonValue::Object(map), Variant::Map { values: values_schema }) => {
            let mut values = std::collections::HashMap::with_capacity(map.len());
            for (k, v) in map {
                values.insert(k.to_string(), parse_default(v, values_schema)?);
            }
            Ok(Value::Map(values))
        }
        (JsonValue::String(n), Variant::Fixed { .. }) => Ok(Value::Fixed(n.as_bytes().to_vec())),
        (_d, _s) => Err(AnsonErr::DefaultValueParse),
    }
}
