//! Runtime value representation
//!
//! Values carry their own shape: arrays know their bounds, records know
//! their type name and field order. Assignment compatibility is decided
//! by fitting an incoming value against the value already stored at the
//! destination, so every storage slot always holds a value of its
//! declared shape.

use std::fmt;
use std::rc::Rc;

use crate::error::{RuntimeError, RuntimeResult};

/// Runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Str(String),
    Char(char),
    Boolean(bool),
    Date(DateValue),
    Array(ArrayValue),
    Record(RecordValue),
}

impl Value {
    pub fn type_name(&self) -> &str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Str(_) => "STRING",
            Value::Char(_) => "CHAR",
            Value::Boolean(_) => "BOOLEAN",
            Value::Date(_) => "DATE",
            Value::Array(_) => "ARRAY",
            Value::Record(record) => &record.type_name,
        }
    }

    /// Whether the value can appear in OUTPUT or WRITEFILE
    pub fn is_plain(&self) -> bool {
        !matches!(self, Value::Array(_) | Value::Record(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Real(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Char(c) => write!(f, "{}", c),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Date(d) => write!(f, "{}", d),
            Value::Array(array) => {
                write!(f, "[")?;
                for (i, element) in array.elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Record(record) => {
                write!(f, "{}{{", record.type_name)?;
                for (i, (name, value)) in record.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// A calendar date. Field order makes the derived ordering
/// chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateValue {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DateValue {
    pub fn new(day: u32, month: u32, year: i32) -> Option<Self> {
        if month < 1 || month > 12 {
            return None;
        }
        if day < 1 || day > days_in_month(month, year) {
            return None;
        }
        Some(Self { year, month, day })
    }

    /// Parses the dd/mm/yyyy form used by INPUT, file reads and
    /// assignment from text.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('/');
        let day = parts.next()?.trim().parse().ok()?;
        let month = parts.next()?.trim().parse().ok()?;
        let year = parts.next()?.trim().parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Self::new(day, month, year)
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{:04}", self.day, self.month, self.year)
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(month: u32, year: i32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// An array with inclusive per-dimension bounds, stored row-major.
/// Bounds must satisfy lower <= upper.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub dims: Vec<(i64, i64)>,
    pub elements: Vec<Value>,
}

impl ArrayValue {
    pub fn new(dims: Vec<(i64, i64)>, fill: Value) -> Self {
        let len = dims
            .iter()
            .map(|(lower, upper)| (upper - lower + 1) as usize)
            .product();
        Self {
            dims,
            elements: vec![fill; len],
        }
    }

    /// Flat offset of an index tuple. Err carries the offending index
    /// value and the inclusive bounds it escaped.
    pub fn offset(&self, indices: &[i64]) -> Result<usize, (i64, i64, i64)> {
        let mut offset = 0usize;
        for (&index, &(lower, upper)) in indices.iter().zip(&self.dims) {
            if index < lower || index > upper {
                return Err((index, lower, upper));
            }
            let span = (upper - lower + 1) as usize;
            offset = offset * span + (index - lower) as usize;
        }
        Ok(offset)
    }
}

/// A record instance. Fields keep declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordValue {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

impl RecordValue {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

/// A resolved type: array bounds already evaluated, record names tied
/// to their definitions.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDesc {
    Integer,
    Real,
    Str,
    Char,
    Boolean,
    Date,
    Array {
        dims: Vec<(i64, i64)>,
        elem: Box<TypeDesc>,
    },
    Record(Rc<RecordTypeData>),
}

impl TypeDesc {
    pub fn name(&self) -> &str {
        match self {
            TypeDesc::Integer => "INTEGER",
            TypeDesc::Real => "REAL",
            TypeDesc::Str => "STRING",
            TypeDesc::Char => "CHAR",
            TypeDesc::Boolean => "BOOLEAN",
            TypeDesc::Date => "DATE",
            TypeDesc::Array { .. } => "ARRAY",
            TypeDesc::Record(data) => &data.name,
        }
    }
}

/// A TYPE ... ENDTYPE definition
#[derive(Debug, PartialEq)]
pub struct RecordTypeData {
    pub name: String,
    pub fields: Vec<(String, TypeDesc)>,
}

/// The value a freshly declared variable of the given type holds
pub fn default_value(desc: &TypeDesc) -> Value {
    match desc {
        TypeDesc::Integer => Value::Integer(0),
        TypeDesc::Real => Value::Real(0.0),
        TypeDesc::Str => Value::Str(String::new()),
        TypeDesc::Char => Value::Char(' '),
        TypeDesc::Boolean => Value::Boolean(false),
        TypeDesc::Date => Value::Date(DateValue {
            year: 1900,
            month: 1,
            day: 1,
        }),
        TypeDesc::Array { dims, elem } => {
            Value::Array(ArrayValue::new(dims.clone(), default_value(elem)))
        }
        TypeDesc::Record(data) => Value::Record(RecordValue {
            type_name: data.name.clone(),
            fields: data
                .fields
                .iter()
                .map(|(name, field_desc)| (name.clone(), default_value(field_desc)))
                .collect(),
        }),
    }
}

/// Fits an incoming value to the shape of the value already stored at
/// the destination. INTEGER slots accept integral REALs, CHAR and
/// STRING convert when the length allows it, DATE slots parse
/// dd/mm/yyyy text. Any other difference in shape is an error.
pub fn coerce(value: Value, template: &Value, line: usize) -> RuntimeResult<Value> {
    match (value, template) {
        (Value::Integer(n), Value::Integer(_)) => Ok(Value::Integer(n)),
        (Value::Real(x), Value::Integer(_)) => {
            if x.fract() != 0.0 {
                return Err(RuntimeError::TypeMismatch {
                    expected: "INTEGER".into(),
                    got: "REAL".into(),
                    line,
                });
            }
            if x < i64::MIN as f64 || x >= i64::MAX as f64 {
                return Err(RuntimeError::IntegerOverflow { line });
            }
            Ok(Value::Integer(x as i64))
        }
        (Value::Integer(n), Value::Real(_)) => Ok(Value::Real(n as f64)),
        (Value::Real(x), Value::Real(_)) => Ok(Value::Real(x)),
        (Value::Str(s), Value::Str(_)) => Ok(Value::Str(s)),
        (Value::Char(c), Value::Str(_)) => Ok(Value::Str(c.to_string())),
        (Value::Char(c), Value::Char(_)) => Ok(Value::Char(c)),
        (Value::Str(s), Value::Char(_)) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(RuntimeError::TypeMismatch {
                    expected: "CHAR".into(),
                    got: "STRING".into(),
                    line,
                }),
            }
        }
        (Value::Boolean(b), Value::Boolean(_)) => Ok(Value::Boolean(b)),
        (Value::Date(d), Value::Date(_)) => Ok(Value::Date(d)),
        (Value::Str(s), Value::Date(_)) => match DateValue::parse(&s) {
            Some(d) => Ok(Value::Date(d)),
            None => Err(RuntimeError::TypeMismatch {
                expected: "DATE".into(),
                got: "STRING".into(),
                line,
            }),
        },
        (Value::Array(array), Value::Array(target)) => {
            if array.dims == target.dims
                && elements_match(array.elements.first(), target.elements.first())
            {
                Ok(Value::Array(array))
            } else {
                Err(RuntimeError::TypeMismatch {
                    expected: "an ARRAY with the same bounds and element type".into(),
                    got: "ARRAY".into(),
                    line,
                })
            }
        }
        (Value::Record(record), Value::Record(target)) => {
            if record.type_name == target.type_name {
                Ok(Value::Record(record))
            } else {
                Err(RuntimeError::TypeMismatch {
                    expected: target.type_name.clone(),
                    got: record.type_name.clone(),
                    line,
                })
            }
        }
        (value, template) => Err(RuntimeError::TypeMismatch {
            expected: template.type_name().to_string(),
            got: value.type_name().to_string(),
            line,
        }),
    }
}

fn elements_match(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => shapes_match(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn shapes_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(_), Value::Integer(_))
        | (Value::Real(_), Value::Real(_))
        | (Value::Str(_), Value::Str(_))
        | (Value::Char(_), Value::Char(_))
        | (Value::Boolean(_), Value::Boolean(_))
        | (Value::Date(_), Value::Date(_)) => true,
        (Value::Array(a), Value::Array(b)) => {
            a.dims == b.dims && elements_match(a.elements.first(), b.elements.first())
        }
        (Value::Record(a), Value::Record(b)) => a.type_name == b.type_name,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_date_parse_and_display() {
        let date = DateValue::parse("05/03/2024").unwrap();
        assert_eq!(date.to_string(), "05/03/2024");
        assert_eq!(DateValue::parse("31/02/2024"), None);
        assert_eq!(
            DateValue::parse("29/02/2024"),
            Some(DateValue {
                year: 2024,
                month: 2,
                day: 29
            })
        );
        assert_eq!(DateValue::parse("29/02/2023"), None);
        assert_eq!(DateValue::parse("2024-02-29"), None);
    }

    #[test]
    fn test_date_ordering_is_chronological() {
        let early = DateValue::parse("31/01/2024").unwrap();
        let late = DateValue::parse("01/02/2024").unwrap();
        assert!(early < late);
        assert!(DateValue::parse("01/01/1999").unwrap() < DateValue::parse("01/01/2000").unwrap());
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::Real(2.5).to_string(), "2.5");
        assert_eq!(Value::Boolean(true).to_string(), "TRUE");
        assert_eq!(Value::Boolean(false).to_string(), "FALSE");
        assert_eq!(Value::Str("abc".into()).to_string(), "abc");
        assert_eq!(Value::Char('x').to_string(), "x");
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_value(&TypeDesc::Integer), Value::Integer(0));
        assert_eq!(default_value(&TypeDesc::Char), Value::Char(' '));
        assert_eq!(
            default_value(&TypeDesc::Date).to_string(),
            "01/01/1900".to_string()
        );
        let desc = TypeDesc::Array {
            dims: vec![(1, 3)],
            elem: Box::new(TypeDesc::Boolean),
        };
        assert_eq!(
            default_value(&desc),
            Value::Array(ArrayValue {
                dims: vec![(1, 3)],
                elements: vec![Value::Boolean(false); 3],
            })
        );
    }

    #[test]
    fn test_record_default_keeps_field_order() {
        let data = Rc::new(RecordTypeData {
            name: "Student".into(),
            fields: vec![
                ("Name".into(), TypeDesc::Str),
                ("Mark".into(), TypeDesc::Integer),
            ],
        });
        match default_value(&TypeDesc::Record(data)) {
            Value::Record(record) => {
                assert_eq!(record.fields[0], ("Name".into(), Value::Str(String::new())));
                assert_eq!(record.fields[1], ("Mark".into(), Value::Integer(0)));
            }
            other => panic!("expected a record, got {:?}", other),
        }
    }

    #[test]
    fn test_two_dimensional_offsets_are_row_major() {
        let array = ArrayValue::new(vec![(1, 2), (0, 2)], Value::Integer(0));
        assert_eq!(array.elements.len(), 6);
        assert_eq!(array.offset(&[1, 0]), Ok(0));
        assert_eq!(array.offset(&[1, 2]), Ok(2));
        assert_eq!(array.offset(&[2, 0]), Ok(3));
        assert_eq!(array.offset(&[2, 2]), Ok(5));
        assert_eq!(array.offset(&[3, 0]), Err((3, 1, 2)));
        assert_eq!(array.offset(&[1, -1]), Err((-1, 0, 2)));
    }

    #[test]
    fn test_integer_slot_accepts_integral_real() {
        assert_eq!(
            coerce(Value::Real(3.0), &Value::Integer(0), 1),
            Ok(Value::Integer(3))
        );
        assert!(coerce(Value::Real(3.5), &Value::Integer(0), 1).is_err());
    }

    #[test]
    fn test_char_and_string_convert_when_length_allows() {
        assert_eq!(
            coerce(Value::Str("x".into()), &Value::Char(' '), 1),
            Ok(Value::Char('x'))
        );
        assert!(coerce(Value::Str("xy".into()), &Value::Char(' '), 1).is_err());
        assert_eq!(
            coerce(Value::Char('x'), &Value::Str(String::new()), 1),
            Ok(Value::Str("x".into()))
        );
    }

    #[test]
    fn test_date_slot_parses_text() {
        let template = default_value(&TypeDesc::Date);
        assert_eq!(
            coerce(Value::Str("25/12/2023".into()), &template, 1),
            Ok(Value::Date(DateValue {
                year: 2023,
                month: 12,
                day: 25
            }))
        );
        assert!(coerce(Value::Str("banana".into()), &template, 1).is_err());
    }

    #[test]
    fn test_mismatched_shapes_are_rejected() {
        let err = coerce(Value::Boolean(true), &Value::Integer(0), 7).unwrap_err();
        assert_eq!(err.line(), 7);
        assert!(coerce(
            Value::Array(ArrayValue::new(vec![(1, 2)], Value::Integer(0))),
            &Value::Array(ArrayValue::new(vec![(1, 3)], Value::Integer(0))),
            1
        )
        .is_err());
    }
}
