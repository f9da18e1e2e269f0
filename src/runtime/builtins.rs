//! Built-in functions
//!
//! The fixed set of routines every program can call without declaring
//! them: LENGTH, LEFT, RIGHT, MID, LCASE, UCASE, INT and RAND. String
//! positions are 1-based and counts past the end yield what is there.

use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::value::Value;

pub const NAMES: [&str; 8] = [
    "LENGTH", "LEFT", "RIGHT", "MID", "LCASE", "UCASE", "INT", "RAND",
];

pub fn is_builtin(name: &str) -> bool {
    NAMES.contains(&name)
}

/// xorshift64* generator, seedable so runs can be replayed
#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x853C49E6748FEA9B } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Uniform in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Dispatches a call if the name is a built-in. None means the name is
/// not in the set and should be looked up as a user function.
pub fn call(
    name: &str,
    args: &[Value],
    prng: &mut Prng,
    line: usize,
) -> Option<RuntimeResult<Value>> {
    let result = match name {
        "LENGTH" => length(args, line),
        "LEFT" => left(args, line),
        "RIGHT" => right(args, line),
        "MID" => mid(args, line),
        "LCASE" => lcase(args, line),
        "UCASE" => ucase(args, line),
        "INT" => int(args, line),
        "RAND" => rand(args, prng, line),
        _ => return None,
    };
    Some(result)
}

fn length(args: &[Value], line: usize) -> RuntimeResult<Value> {
    arity("LENGTH", 1, args, line)?;
    let text = text_arg(&args[0], line)?;
    Ok(Value::Integer(text.chars().count() as i64))
}

fn left(args: &[Value], line: usize) -> RuntimeResult<Value> {
    arity("LEFT", 2, args, line)?;
    let text = text_arg(&args[0], line)?;
    let count = count_arg("LEFT", &args[1], line)?;
    Ok(Value::Str(text.chars().take(count).collect()))
}

fn right(args: &[Value], line: usize) -> RuntimeResult<Value> {
    arity("RIGHT", 2, args, line)?;
    let text = text_arg(&args[0], line)?;
    let count = count_arg("RIGHT", &args[1], line)?;
    let chars: Vec<char> = text.chars().collect();
    let skip = chars.len().saturating_sub(count);
    Ok(Value::Str(chars[skip..].iter().collect()))
}

fn mid(args: &[Value], line: usize) -> RuntimeResult<Value> {
    arity("MID", 3, args, line)?;
    let text = text_arg(&args[0], line)?;
    let start = integer_arg(&args[1], line)?;
    if start < 1 {
        return Err(RuntimeError::Unsupported {
            message: "MID positions start at 1".to_string(),
            line,
        });
    }
    let count = count_arg("MID", &args[2], line)?;
    Ok(Value::Str(
        text.chars().skip(start as usize - 1).take(count).collect(),
    ))
}

fn lcase(args: &[Value], line: usize) -> RuntimeResult<Value> {
    arity("LCASE", 1, args, line)?;
    match &args[0] {
        Value::Char(c) => Ok(Value::Char(c.to_lowercase().next().unwrap_or(*c))),
        Value::Str(s) => Ok(Value::Str(s.to_lowercase())),
        other => Err(text_mismatch(other, line)),
    }
}

fn ucase(args: &[Value], line: usize) -> RuntimeResult<Value> {
    arity("UCASE", 1, args, line)?;
    match &args[0] {
        Value::Char(c) => Ok(Value::Char(c.to_uppercase().next().unwrap_or(*c))),
        Value::Str(s) => Ok(Value::Str(s.to_uppercase())),
        other => Err(text_mismatch(other, line)),
    }
}

fn int(args: &[Value], line: usize) -> RuntimeResult<Value> {
    arity("INT", 1, args, line)?;
    match &args[0] {
        Value::Integer(n) => Ok(Value::Integer(*n)),
        Value::Real(x) => {
            let floored = x.floor();
            if !floored.is_finite() || floored < i64::MIN as f64 || floored >= i64::MAX as f64 {
                return Err(RuntimeError::IntegerOverflow { line });
            }
            Ok(Value::Integer(floored as i64))
        }
        other => Err(RuntimeError::TypeMismatch {
            expected: "a number".to_string(),
            got: other.type_name().to_string(),
            line,
        }),
    }
}

fn rand(args: &[Value], prng: &mut Prng, line: usize) -> RuntimeResult<Value> {
    arity("RAND", 1, args, line)?;
    let upper = integer_arg(&args[0], line)?;
    if upper <= 0 {
        return Err(RuntimeError::Unsupported {
            message: "RAND expects a positive upper bound".to_string(),
            line,
        });
    }
    Ok(Value::Real(prng.next_f64() * upper as f64))
}

fn arity(name: &str, expected: usize, args: &[Value], line: usize) -> RuntimeResult<()> {
    if args.len() != expected {
        return Err(RuntimeError::ArityMismatch {
            name: name.to_string(),
            expected,
            got: args.len(),
            line,
        });
    }
    Ok(())
}

fn text_arg(value: &Value, line: usize) -> RuntimeResult<String> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        Value::Char(c) => Ok(c.to_string()),
        other => Err(text_mismatch(other, line)),
    }
}

fn text_mismatch(value: &Value, line: usize) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected: "STRING".to_string(),
        got: value.type_name().to_string(),
        line,
    }
}

fn integer_arg(value: &Value, line: usize) -> RuntimeResult<i64> {
    match value {
        Value::Integer(n) => Ok(*n),
        other => Err(RuntimeError::TypeMismatch {
            expected: "INTEGER".to_string(),
            got: other.type_name().to_string(),
            line,
        }),
    }
}

fn count_arg(name: &str, value: &Value, line: usize) -> RuntimeResult<usize> {
    let count = integer_arg(value, line)?;
    if count < 0 {
        return Err(RuntimeError::Unsupported {
            message: format!("{} expects a non-negative count", name),
            line,
        });
    }
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(name: &str, args: &[Value]) -> RuntimeResult<Value> {
        let mut prng = Prng::new(1);
        call(name, args, &mut prng, 1).expect("should be a builtin")
    }

    #[test]
    fn test_length_counts_characters() {
        assert_eq!(
            run("LENGTH", &[Value::Str("héllo".into())]),
            Ok(Value::Integer(5))
        );
        assert_eq!(run("LENGTH", &[Value::Char('x')]), Ok(Value::Integer(1)));
    }

    #[test]
    fn test_left_right_and_mid() {
        let text = Value::Str("pseudocode".into());
        assert_eq!(
            run("LEFT", &[text.clone(), Value::Integer(6)]),
            Ok(Value::Str("pseudo".into()))
        );
        assert_eq!(
            run("RIGHT", &[text.clone(), Value::Integer(4)]),
            Ok(Value::Str("code".into()))
        );
        assert_eq!(
            run("MID", &[text.clone(), Value::Integer(7), Value::Integer(4)]),
            Ok(Value::Str("code".into()))
        );
        assert_eq!(
            run("LEFT", &[Value::Str("ab".into()), Value::Integer(5)]),
            Ok(Value::Str("ab".into()))
        );
        assert_eq!(
            run("MID", &[text, Value::Integer(99), Value::Integer(3)]),
            Ok(Value::Str(String::new()))
        );
    }

    #[test]
    fn test_mid_positions_start_at_one() {
        let err = run(
            "MID",
            &[
                Value::Str("abc".into()),
                Value::Integer(0),
                Value::Integer(1),
            ],
        )
        .unwrap_err();
        assert_eq!(err.message(), "MID positions start at 1".to_string());
    }

    #[test]
    fn test_negative_counts_are_rejected() {
        assert!(run("LEFT", &[Value::Str("abc".into()), Value::Integer(-1)]).is_err());
        assert!(run("RIGHT", &[Value::Str("abc".into()), Value::Integer(-1)]).is_err());
    }

    #[test]
    fn test_case_conversions_keep_the_argument_kind() {
        assert_eq!(run("LCASE", &[Value::Char('A')]), Ok(Value::Char('a')));
        assert_eq!(run("UCASE", &[Value::Char('a')]), Ok(Value::Char('A')));
        assert_eq!(
            run("UCASE", &[Value::Str("mixed Case".into())]),
            Ok(Value::Str("MIXED CASE".into()))
        );
    }

    #[test]
    fn test_int_floors() {
        assert_eq!(run("INT", &[Value::Real(3.9)]), Ok(Value::Integer(3)));
        assert_eq!(run("INT", &[Value::Real(-3.1)]), Ok(Value::Integer(-4)));
        assert_eq!(run("INT", &[Value::Integer(7)]), Ok(Value::Integer(7)));
    }

    #[test]
    fn test_rand_is_seedable_and_in_range() {
        let mut first = Prng::new(42);
        let mut second = Prng::new(42);
        for _ in 0..10 {
            let a = call("RAND", &[Value::Integer(6)], &mut first, 1)
                .unwrap()
                .unwrap();
            let b = call("RAND", &[Value::Integer(6)], &mut second, 1)
                .unwrap()
                .unwrap();
            assert_eq!(a, b);
            match a {
                Value::Real(x) => assert!((0.0..6.0).contains(&x)),
                other => panic!("RAND returned {:?}", other),
            }
        }
    }

    #[test]
    fn test_rand_needs_a_positive_bound() {
        assert!(run("RAND", &[Value::Integer(0)]).is_err());
    }

    #[test]
    fn test_wrong_arity_is_reported() {
        assert_eq!(
            run("LENGTH", &[]),
            Err(RuntimeError::ArityMismatch {
                name: "LENGTH".into(),
                expected: 1,
                got: 0,
                line: 1
            })
        );
    }

    #[test]
    fn test_wrong_argument_types_are_reported() {
        assert!(run("LENGTH", &[Value::Integer(5)]).is_err());
        assert!(run("LEFT", &[Value::Str("ab".into()), Value::Real(1.0)]).is_err());
    }

    #[test]
    fn test_unknown_names_are_not_builtins() {
        let mut prng = Prng::new(1);
        assert!(call("Totals", &[], &mut prng, 1).is_none());
        assert!(is_builtin("LENGTH"));
        assert!(!is_builtin("Length"));
    }
}
