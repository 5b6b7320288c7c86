//! Tolerant structural binding between JSON payloads and typed models.
//!
//! Every model declares a rename table (in-memory name → wire name → shape)
//! through the [`model!`](crate::model!) macro. Binding walks the incoming
//! JSON against that table: undeclared fields are dropped, absent or `null`
//! fields keep their default, and a declared field carrying the wrong JSON
//! type fails with a [`ModelBindingError`] naming the field path and both
//! types. Only the pruned, type-checked value is handed to serde.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

/// The JSON shape a declared field is allowed to take.
#[derive(Clone, Copy)]
pub enum Kind {
    Integer {
        ty: &'static str,
        min: i128,
        max: i128,
    },
    Number,
    Text,
    Boolean,
    /// Any JSON value, kept verbatim.
    Json,
    Optional(fn() -> Kind),
    List(fn() -> Kind),
    Object {
        name: &'static str,
        fields: fn() -> &'static [Field],
    },
}

impl Kind {
    pub fn describe(&self) -> String {
        match self {
            Kind::Integer { ty, .. } => (*ty).to_string(),
            Kind::Number => "number".into(),
            Kind::Text => "string".into(),
            Kind::Boolean => "boolean".into(),
            Kind::Json => "any JSON value".into(),
            Kind::Optional(inner) => format!("optional {}", inner().describe()),
            Kind::List(inner) => format!("list of {}", inner().describe()),
            Kind::Object { name, .. } => format!("object {name}"),
        }
    }
}

impl std::fmt::Debug for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// One row of a model's rename table.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub wire: &'static str,
    pub kind: fn() -> Kind,
}

/// Types that can appear as a model field.
pub trait Shape {
    fn kind() -> Kind;
}

/// A typed request or response body. Implemented by [`model!`](crate::model!).
pub trait Model: Shape + Serialize + DeserializeOwned + Default {
    const NAME: &'static str;

    fn fields() -> &'static [Field];
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot bind `{model}` at `{field}`: expected {expected}, found {found}")]
pub struct ModelBindingError {
    pub model: &'static str,
    pub field: String,
    pub expected: String,
    pub found: String,
}

const ROOT: &str = "<root>";

/// Binds a parsed JSON value to `M`.
pub fn bind<M: Model>(value: &Value) -> Result<M, ModelBindingError> {
    let pruned = prune(value, M::kind(), M::NAME, ROOT)?;

    serde_json::from_value(pruned).map_err(|e| ModelBindingError {
        model: M::NAME,
        field: ROOT.into(),
        expected: format!("object {}", M::NAME),
        found: e.to_string(),
    })
}

/// Parses `body` as JSON and binds it to `M`.
pub fn bind_str<M: Model>(body: &str) -> Result<M, ModelBindingError> {
    let value: Value = serde_json::from_str(body).map_err(|e| ModelBindingError {
        model: M::NAME,
        field: ROOT.into(),
        expected: format!("object {}", M::NAME),
        found: format!("malformed JSON ({e})"),
    })?;

    bind(&value)
}

/// Serializes a model using its declared wire names.
pub fn to_wire<M: Model>(model: &M) -> Result<Value, ModelBindingError> {
    serde_json::to_value(model).map_err(|e| ModelBindingError {
        model: M::NAME,
        field: ROOT.into(),
        expected: "serializable value".into(),
        found: e.to_string(),
    })
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn child_path(parent: &str, field: &str) -> String {
    if parent == ROOT {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

fn prune(
    value: &Value,
    kind: Kind,
    model: &'static str,
    path: &str,
) -> Result<Value, ModelBindingError> {
    let mismatch = |found: String| ModelBindingError {
        model,
        field: path.to_string(),
        expected: kind.describe(),
        found,
    };

    match kind {
        Kind::Json => Ok(value.clone()),

        Kind::Optional(inner) => {
            if value.is_null() {
                Ok(Value::Null)
            } else {
                prune(value, inner(), model, path)
            }
        }

        Kind::Integer { min, max, .. } => {
            let n = value
                .as_i64()
                .map(i128::from)
                .or_else(|| value.as_u64().map(i128::from));

            match n {
                Some(n) if (min..=max).contains(&n) => Ok(value.clone()),
                Some(n) => Err(mismatch(format!("out of range integer {n}"))),
                None => Err(mismatch(json_type_name(value).into())),
            }
        }

        Kind::Number if value.is_number() => Ok(value.clone()),
        Kind::Text if value.is_string() => Ok(value.clone()),
        Kind::Boolean if value.is_boolean() => Ok(value.clone()),
        Kind::Number | Kind::Text | Kind::Boolean => Err(mismatch(json_type_name(value).into())),

        Kind::List(inner) => {
            let Value::Array(items) = value else {
                return Err(mismatch(json_type_name(value).into()));
            };

            let element = inner();
            items
                .iter()
                .enumerate()
                .map(|(i, item)| prune(item, element, model, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }

        Kind::Object { fields, .. } => {
            let Value::Object(object) = value else {
                return Err(mismatch(json_type_name(value).into()));
            };

            let mut kept = Map::new();
            for field in fields() {
                let Some(v) = object.get(field.wire) else {
                    continue;
                };

                let field_kind = (field.kind)();
                // null on a non-optional field means "not sent"
                if v.is_null() && !matches!(field_kind, Kind::Optional(_) | Kind::Json) {
                    continue;
                }

                let pruned = prune(v, field_kind, model, &child_path(path, field.wire))?;
                kept.insert(field.wire.to_string(), pruned);
            }

            Ok(Value::Object(kept))
        }
    }
}

macro_rules! integer_shape {
    ($($ty:ty),*) => {
        $(
            impl Shape for $ty {
                fn kind() -> Kind {
                    Kind::Integer {
                        ty: stringify!($ty),
                        min: <$ty>::MIN as i128,
                        max: <$ty>::MAX as i128,
                    }
                }
            }
        )*
    };
}

integer_shape!(i8, i16, i32, i64, u8, u16, u32, u64);

impl Shape for f32 {
    fn kind() -> Kind {
        Kind::Number
    }
}

impl Shape for f64 {
    fn kind() -> Kind {
        Kind::Number
    }
}

impl Shape for String {
    fn kind() -> Kind {
        Kind::Text
    }
}

impl Shape for bool {
    fn kind() -> Kind {
        Kind::Boolean
    }
}

impl Shape for Value {
    fn kind() -> Kind {
        Kind::Json
    }
}

impl<T: Shape> Shape for Option<T> {
    fn kind() -> Kind {
        Kind::Optional(T::kind)
    }
}

impl<T: Shape> Shape for Vec<T> {
    fn kind() -> Kind {
        Kind::List(T::kind)
    }
}

/// Declares a model: the struct, its serde wiring and its rename table.
///
/// ```
/// contract_quest::model! {
///     pub struct Created {
///         pub name: String,
///         pub created_at as "createdAt": String,
///     }
/// }
/// ```
#[macro_export]
macro_rules! model {
    (@wire $field:ident) => {
        stringify!($field)
    };
    (@wire $field:ident $wire:literal) => {
        $wire
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident $(as $wire:literal)? : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $(#[serde(rename = $wire)])?
                $fvis $field: $ty,
            )*
        }

        impl $crate::model::Model for $name {
            const NAME: &'static str = stringify!($name);

            fn fields() -> &'static [$crate::model::Field] {
                const FIELDS: &[$crate::model::Field] = &[
                    $(
                        $crate::model::Field {
                            name: stringify!($field),
                            wire: $crate::model!(@wire $field $($wire)?),
                            kind: <$ty as $crate::model::Shape>::kind,
                        },
                    )*
                ];
                FIELDS
            }
        }

        impl $crate::model::Shape for $name {
            fn kind() -> $crate::model::Kind {
                $crate::model::Kind::Object {
                    name: stringify!($name),
                    fields: <$name as $crate::model::Model>::fields,
                }
            }
        }
    };
}
