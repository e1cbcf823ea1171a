//! `calculator` — evaluates arithmetic expressions.
//!
//! Supports `+ - * / % ^`, parentheses and unary minus. Exponentiation is
//! right-associative and binds tighter than unary minus, so `-2^2` is `-4`.

use async_trait::async_trait;
use reagent_core::error::SkillError;
use reagent_core::skill::Skill;

pub struct CalculatorSkill;

#[async_trait]
impl Skill for CalculatorSkill {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression. Supports + - * / % ^ and parentheses."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Expression to evaluate, e.g. \"(3 + 4) * 2^3\""
                }
            },
            "required": ["expression"]
        })
    }

    async fn run(&self, input: serde_json::Value) -> Result<String, SkillError> {
        let expression = input["expression"]
            .as_str()
            .ok_or_else(|| SkillError::InvalidInput("'expression' must be a string".into()))?;

        let value = evaluate(expression).map_err(|reason| SkillError::ExecutionFailed {
            skill_name: self.name().into(),
            reason,
        })?;

        Ok(format_number(value))
    }
}

/// Evaluate an expression to a finite number.
pub fn evaluate(expression: &str) -> Result<f64, String> {
    let tokens = lex(expression)?;
    if tokens.is_empty() {
        return Err("empty expression".into());
    }

    let mut cursor = Cursor { tokens, pos: 0 };
    let value = cursor.binary(0)?;
    if let Some(tok) = cursor.peek() {
        return Err(format!("unexpected {tok:?} at token {}", cursor.pos));
    }
    if !value.is_finite() {
        return Err("result is not a finite number".into());
    }
    Ok(value)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tok {
    Num(f64),
    Op(char),
    LParen,
    RParen,
}

fn lex(src: &str) -> Result<Vec<Tok>, String> {
    let mut out = Vec::new();
    let mut rest = src;

    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let len = rest
                .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
                .unwrap_or(rest.len());
            let literal = &rest[..len];
            let n = literal
                .parse::<f64>()
                .map_err(|_| format!("bad number '{literal}'"))?;
            out.push(Tok::Num(n));
            rest = &rest[len..];
            continue;
        }

        let tok = match c {
            '+' | '-' | '*' | '/' | '%' | '^' => Tok::Op(c),
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            other => return Err(format!("unexpected character '{other}'")),
        };
        out.push(tok);
        rest = &rest[c.len_utf8()..];
    }

    Ok(out)
}

/// Binding power of a binary operator, with right-associativity flag.
fn binding(op: char) -> Option<(u8, bool)> {
    match op {
        '+' | '-' => Some((1, false)),
        '*' | '/' | '%' => Some((2, false)),
        '^' => Some((4, true)),
        _ => None,
    }
}

const UNARY_POWER: u8 = 3;

struct Cursor {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Cursor {
    fn peek(&self) -> Option<Tok> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.peek();
        self.pos += 1;
        tok
    }

    /// Precedence climbing: parse operators binding at least `min_power`.
    fn binary(&mut self, min_power: u8) -> Result<f64, String> {
        let mut lhs = self.prefix()?;

        while let Some(Tok::Op(op)) = self.peek() {
            let Some((power, right_assoc)) = binding(op) else {
                break;
            };
            if power < min_power {
                break;
            }
            self.bump();

            let next_min = if right_assoc { power } else { power + 1 };
            let rhs = self.binary(next_min)?;
            lhs = apply(op, lhs, rhs)?;
        }

        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<f64, String> {
        match self.bump() {
            Some(Tok::Num(n)) => Ok(n),
            Some(Tok::Op('-')) => Ok(-self.binary(UNARY_POWER)?),
            Some(Tok::Op('+')) => self.binary(UNARY_POWER),
            Some(Tok::LParen) => {
                let inner = self.binary(0)?;
                match self.bump() {
                    Some(Tok::RParen) => Ok(inner),
                    _ => Err("missing closing ')'".into()),
                }
            }
            Some(tok) => Err(format!("unexpected {tok:?}")),
            None => Err("unexpected end of expression".into()),
        }
    }
}

fn apply(op: char, lhs: f64, rhs: f64) -> Result<f64, String> {
    match op {
        '+' => Ok(lhs + rhs),
        '-' => Ok(lhs - rhs),
        '*' => Ok(lhs * rhs),
        '/' if rhs == 0.0 => Err("division by zero".into()),
        '/' => Ok(lhs / rhs),
        '%' if rhs == 0.0 => Err("modulo by zero".into()),
        '%' => Ok(lhs % rhs),
        '^' => Ok(lhs.powf(rhs)),
        other => Err(format!("unknown operator '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("17 % 5").unwrap(), 2.0);
    }

    #[test]
    fn exponent_is_right_associative() {
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(evaluate("(-2) ^ 2").unwrap(), 4.0);
    }

    #[test]
    fn decimals_and_unary() {
        assert_eq!(evaluate("-1.5 * -2").unwrap(), 3.0);
        assert_eq!(evaluate("+4 / 8").unwrap(), 0.5);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(evaluate("").is_err());
        assert!(evaluate("1 / 0").unwrap_err().contains("division by zero"));
        assert!(evaluate("(1 + 2").unwrap_err().contains("')'"));
        assert!(evaluate("2 $ 3").unwrap_err().contains('$'));
        assert!(evaluate("1 2").is_err());
        assert!(evaluate("1..2").is_err());
    }

    #[test]
    fn integers_print_without_fraction() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(0.25), "0.25");
    }

    #[tokio::test]
    async fn skill_returns_text_result() {
        let out = CalculatorSkill
            .run(json!({"expression": "(3 + 4) * 2"}))
            .await
            .unwrap();
        assert_eq!(out, "14");
    }

    #[tokio::test]
    async fn skill_reports_evaluation_failure() {
        let err = CalculatorSkill
            .run(json!({"expression": "5 / 0"}))
            .await
            .unwrap_err();
        assert!(matches!(err, SkillError::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn skill_requires_expression() {
        let err = CalculatorSkill.run(json!({"expr": "1"})).await.unwrap_err();
        assert!(matches!(err, SkillError::InvalidInput(_)));
    }
}
