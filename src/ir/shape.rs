use std::sync::Arc;

use crate::scope::DeclId;

/// The structural shape of an instruction's value.
///
/// Every shape flattens to a fixed number of scalar slots; a record's slot
/// count is the sum of its fields' slot counts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Shape {
    Num,
    Bool,
    Record(Arc<RecordShape>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordShape {
    /// The struct declaration that constructed the record, if any.
    pub decl: Option<DeclId>,
    pub name: String,
    pub fields: Vec<(String, Shape)>,
}

impl Shape {
    pub fn record(decl: Option<DeclId>, name: impl Into<String>, fields: Vec<(String, Shape)>) -> Self {
        Shape::Record(Arc::new(RecordShape {
            decl,
            name: name.into(),
            fields,
        }))
    }

    /// Number of scalar slots occupied by a value of this shape.
    pub fn size(&self) -> usize {
        match self {
            Shape::Num | Shape::Bool => 1,
            Shape::Record(r) => r.fields.iter().map(|(_, s)| s.size()).sum(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Shape::Record(_))
    }

    pub fn as_record(&self) -> Option<&RecordShape> {
        match self {
            Shape::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl RecordShape {
    /// Looks up a field by name, returning its slot offset within the record
    /// and its shape.
    pub fn field(&self, name: &str) -> Option<(usize, &Shape)> {
        let mut offset = 0;
        for (field_name, shape) in &self.fields {
            if field_name == name {
                return Some((offset, shape));
            }
            offset += shape.size();
        }
        None
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::Num => f.write_str("Num"),
            Shape::Bool => f.write_str("Bool"),
            Shape::Record(r) => {
                write!(f, "{}(", r.name)?;
                for (i, (name, shape)) in r.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, shape)?;
                }
                write!(f, ")")
            }
        }
    }
}
