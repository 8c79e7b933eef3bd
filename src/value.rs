//! Runtime values for decoded telemetry (raw and engineering representation).

use std::fmt;
use std::sync::Arc;

/// A single decoded value: the raw or engineering form of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Uint32(u32),
    Sint32(i32),
    Uint64(u64),
    Sint64(i64),
    Float(f32),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    Boolean(bool),
    /// Milliseconds since the unix epoch.
    Timestamp(i64),
    Aggregate(AggregateValue),
    Array(ArrayValue),
}

/// Ordered name→value map for aggregate parameters.
///
/// The member names are owned by the aggregate type definition in the MDB and
/// shared (`Arc`) by every instance of that type, so member order is stable
/// across instances and name storage is interned per MDB load.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateValue {
    names: Arc<[String]>,
    values: Vec<Value>,
}

/// Multi-dimensional array value stored flat, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    dims: Vec<usize>,
    elements: Vec<Value>,
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint32(x) => Some(*x as u64),
            Value::Uint64(x) => Some(*x),
            Value::Sint32(x) if *x >= 0 => Some(*x as u64),
            Value::Sint64(x) if *x >= 0 => Some(*x as u64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Uint32(x) => Some(*x as i64),
            Value::Sint32(x) => Some(*x as i64),
            Value::Uint64(x) => i64::try_from(*x).ok(),
            Value::Sint64(x) => Some(*x),
            Value::Boolean(b) => Some(*b as i64),
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x as f64),
            Value::Double(x) => Some(*x),
            Value::Uint32(x) => Some(*x as f64),
            Value::Sint32(x) => Some(*x as f64),
            Value::Uint64(x) => Some(*x as f64),
            Value::Sint64(x) => Some(*x as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_aggregate(&self) -> Option<&AggregateValue> {
        match self {
            Value::Aggregate(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uint32(x) => write!(f, "{x}"),
            Value::Sint32(x) => write!(f, "{x}"),
            Value::Uint64(x) => write!(f, "{x}"),
            Value::Sint64(x) => write!(f, "{x}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Double(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::Binary(b) => {
                for byte in b {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Timestamp(t) => write!(f, "{t}"),
            Value::Aggregate(a) => {
                f.write_str("{")?;
                for (i, (name, v)) in a.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Array(a) => {
                f.write_str("[")?;
                for (i, v) in a.elements().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl AggregateValue {
    /// Creates an aggregate with placeholder members; members are filled in
    /// type-definition order via [`AggregateValue::set_member`].
    pub fn new(names: Arc<[String]>) -> Self {
        let values = vec![Value::Uint32(0); names.len()];
        AggregateValue { names, values }
    }

    pub fn set_member(&mut self, name: &str, v: Value) {
        if let Some(i) = self.names.iter().position(|n| n == name) {
            self.values[i] = v;
        }
    }

    pub fn member(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i])
    }

    pub fn member_names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names
            .iter()
            .map(|n| n.as_str())
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ArrayValue {
    /// Invariant: the product of `dims` equals `elements.len()`.
    pub fn new(dims: Vec<usize>, elements: Vec<Value>) -> Self {
        debug_assert_eq!(dims.iter().product::<usize>(), elements.len());
        ArrayValue { dims, elements }
    }

    /// Total number of elements for the given dimensions.
    pub fn flat_size(dims: &[usize]) -> usize {
        dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn element(&self, i: usize) -> Option<&Value> {
        self.elements.get(i)
    }

    pub fn flat_length(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
