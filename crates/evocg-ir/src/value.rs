//! Value nodes: data flowing between operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-level datatype of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Datatype {
    Char,
    Short,
    Int,
    Long,
    UShort,
    UInt,
    ULong,
    Address,
    Bit,
    Float,
    Double,
}

/// Where a value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    Memory,
    Register,
    Constant,
}

/// Literal carried by a constant value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bit(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::UInt(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Bit(v) => write!(f, "{}", u8::from(*v)),
        }
    }
}

/// Storage-specific payload of a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueKind {
    /// Register-resident value, optionally named for readable output
    Register { name: Option<String> },
    /// Memory-resident value, identified by its label
    Memory { label: Option<String> },
    /// Immediate constant; patterns leave the literal open
    Constant { literal: Option<Literal> },
}

/// A value node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub datatype: Datatype,
    pub kind: ValueKind,
    /// Live-out even though other operations still consume it
    pub output: bool,
}

impl Value {
    pub fn new(datatype: Datatype, kind: ValueKind) -> Self {
        Self {
            datatype,
            kind,
            output: false,
        }
    }

    pub fn register(datatype: Datatype) -> Self {
        Self::new(datatype, ValueKind::Register { name: None })
    }

    pub fn named_register(name: impl Into<String>, datatype: Datatype) -> Self {
        Self::new(
            datatype,
            ValueKind::Register {
                name: Some(name.into()),
            },
        )
    }

    pub fn memory(datatype: Datatype) -> Self {
        Self::new(datatype, ValueKind::Memory { label: None })
    }

    pub fn named_memory(label: impl Into<String>, datatype: Datatype) -> Self {
        Self::new(
            datatype,
            ValueKind::Memory {
                label: Some(label.into()),
            },
        )
    }

    pub fn constant(datatype: Datatype, literal: Literal) -> Self {
        Self::new(
            datatype,
            ValueKind::Constant {
                literal: Some(literal),
            },
        )
    }

    /// Constant operand slot in an instruction pattern
    pub fn constant_slot(datatype: Datatype) -> Self {
        Self::new(datatype, ValueKind::Constant { literal: None })
    }

    pub fn storage_class(&self) -> StorageClass {
        match self.kind {
            ValueKind::Register { .. } => StorageClass::Register,
            ValueKind::Memory { .. } => StorageClass::Memory,
            ValueKind::Constant { .. } => StorageClass::Constant,
        }
    }

    pub fn is_register(&self) -> bool {
        self.storage_class() == StorageClass::Register
    }

    /// A pattern value covers this value when datatype and storage class agree.
    pub fn is_covered_by(&self, pattern: &Value) -> bool {
        self.datatype == pattern.datatype && self.storage_class() == pattern.storage_class()
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Register { name } => name.as_deref(),
            ValueKind::Memory { label } => label.as_deref(),
            ValueKind::Constant { .. } => None,
        }
    }

    /// Same datatype and storage class, without name, literal or output flag.
    pub fn fresh_like(&self) -> Self {
        let kind = match self.kind {
            ValueKind::Register { .. } => ValueKind::Register { name: None },
            ValueKind::Memory { .. } => ValueKind::Memory { label: None },
            ValueKind::Constant { .. } => ValueKind::Constant { literal: None },
        };
        Self::new(self.datatype, kind)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Register { name: Some(name) } => write!(f, "{name}"),
            ValueKind::Register { name: None } => write!(f, "{:?} register", self.datatype),
            ValueKind::Memory { label: Some(label) } => write!(f, "{label}"),
            ValueKind::Memory { label: None } => write!(f, "{:?} memory", self.datatype),
            ValueKind::Constant { literal: Some(lit) } => write!(f, "{lit}"),
            ValueKind::Constant { literal: None } => write!(f, "{:?} constant", self.datatype),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_classes() {
        assert_eq!(Value::register(Datatype::Int).storage_class(), StorageClass::Register);
        assert_eq!(Value::memory(Datatype::Float).storage_class(), StorageClass::Memory);
        assert_eq!(
            Value::constant(Datatype::Int, Literal::Int(4)).storage_class(),
            StorageClass::Constant
        );
    }

    #[test]
    fn test_covering_keys_on_tags_only() {
        let concrete = Value::constant(Datatype::Int, Literal::Int(4));
        assert!(concrete.is_covered_by(&Value::constant_slot(Datatype::Int)));
        assert!(!concrete.is_covered_by(&Value::constant_slot(Datatype::Long)));
        assert!(!concrete.is_covered_by(&Value::register(Datatype::Int)));

        let named = Value::named_register("k0", Datatype::Float);
        assert!(named.is_covered_by(&Value::register(Datatype::Float)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::named_register("a[0]", Datatype::Address).to_string(), "a[0]");
        assert_eq!(Value::constant(Datatype::Int, Literal::Int(-3)).to_string(), "-3");
        assert_eq!(Value::constant(Datatype::Bit, Literal::Bit(true)).to_string(), "1");
    }
}
