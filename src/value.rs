use crate::host::ObjectId;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a call parameter. Overload resolution compares these
/// exactly, so `Int` never stands in for `Float`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    Str,
    Vec2,
    Vec3,
    Object,
    List(Box<ParamKind>),
}

impl ParamKind {
    /// A usable starting value for a freshly declared parameter slot.
    /// Lists start with a single default element so the configuration
    /// surface has something to edit.
    pub fn default_value(&self) -> ParamValue {
        match self {
            ParamKind::Bool => ParamValue::Bool(false),
            ParamKind::Int => ParamValue::Int(0),
            ParamKind::Float => ParamValue::Float(0.0),
            ParamKind::Str => ParamValue::Str(String::new()),
            ParamKind::Vec2 => ParamValue::Vec2 { x: 0.0, y: 0.0 },
            ParamKind::Vec3 => ParamValue::Vec3 { x: 0.0, y: 0.0, z: 0.0 },
            ParamKind::Object => ParamValue::Object(None),
            ParamKind::List(element) => ParamValue::List(vec![element.default_value()]),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Bool => write!(f, "bool"),
            ParamKind::Int => write!(f, "int"),
            ParamKind::Float => write!(f, "float"),
            ParamKind::Str => write!(f, "string"),
            ParamKind::Vec2 => write!(f, "vec2"),
            ParamKind::Vec3 => write!(f, "vec3"),
            ParamKind::Object => write!(f, "object"),
            ParamKind::List(element) => write!(f, "list<{element}>"),
        }
    }
}

/// A parameter value carried alongside its declared kind: either frozen into
/// a call's configuration or passed live by the firing event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Str(String),
    Vec2 { x: f32, y: f32 },
    Vec3 { x: f32, y: f32, z: f32 },
    /// Object reference; `None` is a null reference of the declared kind.
    Object(Option<ObjectId>),
    List(Vec<ParamValue>),
}

impl ParamValue {
    pub fn from_vec2(v: Vec2) -> Self {
        ParamValue::Vec2 { x: v.x, y: v.y }
    }

    pub fn from_vec3(v: Vec3) -> Self {
        ParamValue::Vec3 { x: v.x, y: v.y, z: v.z }
    }

    /// Exact kind match, no coercion. A list matches when every element
    /// matches the declared element kind; the empty list matches any list.
    pub fn matches(&self, kind: &ParamKind) -> bool {
        match (self, kind) {
            (ParamValue::Bool(_), ParamKind::Bool) => true,
            (ParamValue::Int(_), ParamKind::Int) => true,
            (ParamValue::Float(_), ParamKind::Float) => true,
            (ParamValue::Str(_), ParamKind::Str) => true,
            (ParamValue::Vec2 { .. }, ParamKind::Vec2) => true,
            (ParamValue::Vec3 { .. }, ParamKind::Vec3) => true,
            (ParamValue::Object(_), ParamKind::Object) => true,
            (ParamValue::List(items), ParamKind::List(element)) => {
                items.iter().all(|item| item.matches(element))
            }
            _ => false,
        }
    }

    /// Converts this value to the declared kind. Scalar conversions follow
    /// the usual widening/parsing table; lists convert element-wise, since
    /// the scalar table does not recurse into containers. Returns `None`
    /// when no conversion exists.
    pub fn convert_to(&self, kind: &ParamKind) -> Option<ParamValue> {
        if self.matches(kind) {
            return Some(self.clone());
        }
        match (self, kind) {
            (ParamValue::Int(v), ParamKind::Float) => Some(ParamValue::Float(*v as f32)),
            (ParamValue::Float(v), ParamKind::Int) => Some(ParamValue::Int(v.round() as i64)),
            (ParamValue::Bool(v), ParamKind::Int) => Some(ParamValue::Int(i64::from(*v))),
            (ParamValue::Bool(v), ParamKind::Float) => {
                Some(ParamValue::Float(if *v { 1.0 } else { 0.0 }))
            }
            (ParamValue::Int(v), ParamKind::Bool) => Some(ParamValue::Bool(*v != 0)),
            (ParamValue::Int(v), ParamKind::Str) => Some(ParamValue::Str(v.to_string())),
            (ParamValue::Float(v), ParamKind::Str) => Some(ParamValue::Str(v.to_string())),
            (ParamValue::Bool(v), ParamKind::Str) => Some(ParamValue::Str(v.to_string())),
            (ParamValue::Str(s), ParamKind::Int) => s.trim().parse().ok().map(ParamValue::Int),
            (ParamValue::Str(s), ParamKind::Float) => s.trim().parse().ok().map(ParamValue::Float),
            (ParamValue::Str(s), ParamKind::Bool) => s.trim().parse().ok().map(ParamValue::Bool),
            (ParamValue::List(items), ParamKind::List(element)) => {
                let converted =
                    items.iter().map(|item| item.convert_to(element)).collect::<Option<Vec<_>>>()?;
                Some(ParamValue::List(converted))
            }
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            ParamValue::Vec2 { x, y } => Some(Vec2::new(*x, *y)),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            ParamValue::Vec3 { x, y, z } => Some(Vec3::new(*x, *y, *z)),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            ParamValue::Object(id) => *id,
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v:?}"),
            ParamValue::Vec2 { x, y } => write!(f, "({x}, {y})"),
            ParamValue::Vec3 { x, y, z } => write!(f, "({x}, {y}, {z})"),
            ParamValue::Object(Some(id)) => write!(f, "{id}"),
            ParamValue::Object(None) => write!(f, "null"),
            ParamValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<Vec2> for ParamValue {
    fn from(v: Vec2) -> Self {
        ParamValue::from_vec2(v)
    }
}

impl From<Vec3> for ParamValue {
    fn from(v: Vec3) -> Self {
        ParamValue::from_vec3(v)
    }
}

impl From<ObjectId> for ParamValue {
    fn from(id: ObjectId) -> Self {
        ParamValue::Object(Some(id))
    }
}
