//! Arithmetic on declaration values.
//!
//! `+`, `-` and `*` apply between numbers when the operator stands alone
//! (`@w * 2`, `10px + @gap`). Inside parentheses every operator applies,
//! `/` included: `(@w / 2)`. A slash outside parentheses is left alone so
//! `font: 12px/1.5` and `grid-area: 1 / 2` survive. Function calls
//! (`calc(...)`, `rgba(...)`, `url(...)`) are never evaluated.
//!
//! The result unit is the first operand's unit, or the second's when the
//! first has none.

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num { value: f64, unit: String, text: String },
    Op(char),
    Open,
    Close,
    Space,
    Comma,
    Text(String),
}

impl Token {
    fn number(value: f64, unit: &str) -> Self {
        Self::Num {
            value,
            unit: unit.to_string(),
            text: format!("{}{unit}", format_number(value)),
        }
    }

    /// Tokens after which a sign starts a number instead of an operator.
    fn is_boundary(prev: Option<&Self>) -> bool {
        matches!(
            prev,
            None | Some(Self::Space | Self::Open | Self::Comma | Self::Op(_))
        )
    }
}

/// Evaluate the arithmetic in `value`. Fails only on division by zero.
pub fn evaluate(value: &str) -> Result<String, String> {
    let tokens = tokenize(value);
    let tokens = reduce_groups(tokens)?;
    let tokens = reduce_spaced(tokens, &['*'])?;
    let tokens = reduce_spaced(tokens, &['+', '-'])?;
    Ok(render(&tokens))
}

fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let after = chars.get(i + 2).copied();

        if c.is_whitespace() {
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(Token::Space);
            continue;
        }

        let starts_number = c.is_ascii_digit()
            || (c == '.' && next.is_some_and(|n| n.is_ascii_digit()))
            || ((c == '-' || c == '+')
                && Token::is_boundary(tokens.last())
                && (next.is_some_and(|n| n.is_ascii_digit())
                    || (next == Some('.') && after.is_some_and(|n| n.is_ascii_digit()))));

        if starts_number {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let number: String = chars[start..i].iter().collect();
            let unit_start = i;
            while i < chars.len() && (chars[i].is_ascii_alphabetic() || chars[i] == '%') {
                i += 1;
            }
            let unit: String = chars[unit_start..i].iter().collect();
            match number.parse::<f64>() {
                Ok(value) => tokens.push(Token::Num {
                    value,
                    unit: unit.clone(),
                    text: format!("{number}{unit}"),
                }),
                Err(_) => tokens.push(Token::Text(format!("{number}{unit}"))),
            }
            continue;
        }

        match c {
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '"' | '\'' => {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i] != c {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i = (i + 1).min(chars.len());
                tokens.push(Token::Text(chars[start..i].iter().collect()));
            }
            '+' | '*' | '/' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '-' if !next.is_some_and(|n| n.is_alphanumeric() || n == '-' || n == '_') => {
                tokens.push(Token::Op('-'));
                i += 1;
            }
            _ => {
                let start = i;
                while i < chars.len() && !is_word_break(chars[i]) {
                    i += 1;
                }
                // A word directly followed by `(` is a function call, kept raw.
                if chars.get(i) == Some(&'(') {
                    i = skip_balanced(&chars, i);
                }
                tokens.push(Token::Text(chars[start..i].iter().collect()));
            }
        }
    }
    tokens
}

fn is_word_break(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '(' | ')' | '"' | '\'' | '+' | '*' | '/')
}

/// Index just past the `)` matching the `(` at `open`.
fn skip_balanced(chars: &[char], open: usize) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = open;
    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return i + 1;
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    chars.len()
}

/// Replace fully numeric parenthesized groups by their value.
fn reduce_groups(tokens: Vec<Token>) -> Result<Vec<Token>, String> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut stack: Vec<usize> = Vec::new();

    for token in tokens {
        match token {
            Token::Open => {
                stack.push(out.len());
                out.push(Token::Open);
            }
            Token::Close => {
                let Some(start) = stack.pop() else {
                    out.push(Token::Close);
                    continue;
                };
                match compute(&out[start + 1..])? {
                    Some(result) => {
                        out.truncate(start);
                        out.push(result);
                    }
                    None => out.push(Token::Close),
                }
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// A whole group `num (op num)*`, any spacing, with `*`/`/` binding tighter.
fn compute(group: &[Token]) -> Result<Option<Token>, String> {
    let items: Vec<&Token> = group.iter().filter(|t| **t != Token::Space).collect();
    if items.is_empty() || items.len() % 2 == 0 {
        return Ok(None);
    }

    let mut operands = Vec::new();
    let mut operators = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        match (idx % 2, item) {
            (0, Token::Num { value, unit, .. }) => operands.push((*value, unit.clone())),
            (1, Token::Op(op)) => operators.push(*op),
            _ => return Ok(None),
        }
    }
    if operators.is_empty() {
        let (value, unit) = &operands[0];
        return Ok(Some(Token::number(*value, unit)));
    }

    // First pass folds `*` and `/`, second pass `+` and `-`.
    let mut terms = vec![operands[0].clone()];
    let mut pending = Vec::new();
    for (op, rhs) in operators.into_iter().zip(operands.into_iter().skip(1)) {
        if op == '*' || op == '/' {
            let lhs = terms.pop().unwrap_or((0.0, String::new()));
            terms.push(apply(lhs, op, rhs)?);
        } else {
            pending.push(op);
            terms.push(rhs);
        }
    }
    let mut terms = terms.into_iter();
    let mut acc = terms.next().unwrap_or((0.0, String::new()));
    for (op, rhs) in pending.into_iter().zip(terms) {
        acc = apply(acc, op, rhs)?;
    }
    Ok(Some(Token::number(acc.0, &acc.1)))
}

/// Fold `num SPACE op SPACE num` for the given operators, left to right.
fn reduce_spaced(tokens: Vec<Token>, ops: &[char]) -> Result<Vec<Token>, String> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        out.push(token);
        let n = out.len();
        if n < 5 {
            continue;
        }
        let window = &out[n - 5..];
        let (
            Token::Num { value: a, unit: ua, .. },
            Token::Space,
            Token::Op(op),
            Token::Space,
            Token::Num { value: b, unit: ub, .. },
        ) = (&window[0], &window[1], &window[2], &window[3], &window[4])
        else {
            continue;
        };
        if !ops.contains(op) {
            continue;
        }
        let (value, unit) = apply((*a, ua.clone()), *op, (*b, ub.clone()))?;
        out.truncate(n - 5);
        out.push(Token::number(value, &unit));
    }
    Ok(out)
}

fn apply(lhs: (f64, String), op: char, rhs: (f64, String)) -> Result<(f64, String), String> {
    let unit = if lhs.1.is_empty() { rhs.1 } else { lhs.1 };
    let value = match op {
        '+' => lhs.0 + rhs.0,
        '-' => lhs.0 - rhs.0,
        '*' => lhs.0 * rhs.0,
        '/' => {
            if rhs.0 == 0.0 {
                return Err("division by zero".to_string());
            }
            lhs.0 / rhs.0
        }
        _ => return Err(format!("unknown operator `{op}`")),
    };
    Ok((value, unit))
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let text = format!("{value:.8}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Num { text, .. } => out.push_str(text),
            Token::Op(c) => out.push(*c),
            Token::Open => out.push('('),
            Token::Close => out.push(')'),
            Token::Space => out.push(' '),
            Token::Comma => out.push(','),
            Token::Text(text) => out.push_str(text),
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> String {
        evaluate(s).unwrap()
    }

    #[test]
    fn test_spaced_operators() {
        assert_eq!(eval("10px + 5"), "15px");
        assert_eq!(eval("2 * 8px"), "16px");
        assert_eq!(eval("20px - 4px * 2"), "12px");
        assert_eq!(eval("1px + 2px + 3px"), "6px");
    }

    #[test]
    fn test_parenthesized_division() {
        assert_eq!(eval("(960px / 12)"), "80px");
        assert_eq!(eval("(10px + 5px) * 2"), "30px");
        assert_eq!(eval("(1 / 3)"), "0.33333333");
    }

    #[test]
    fn test_plain_css_untouched() {
        assert_eq!(eval("12px/1.5 sans-serif"), "12px/1.5 sans-serif");
        assert_eq!(eval("1 / 2 / 3"), "1 / 2 / 3");
        assert_eq!(eval("0 -1px"), "0 -1px");
        assert_eq!(eval("calc(100% - 10px)"), "calc(100% - 10px)");
        assert_eq!(eval("translate(-50%, -50%)"), "translate(-50%, -50%)");
        assert_eq!(eval("-webkit-box"), "-webkit-box");
        assert_eq!(eval("\"a + b\""), "\"a + b\"");
        assert_eq!(eval("#fff  solid\n 1px"), "#fff solid 1px");
        assert_eq!(eval("U+0025-00FF"), "U+0025-00FF");
        assert_eq!(eval(".5em"), ".5em");
    }

    #[test]
    fn test_division_by_zero() {
        assert!(evaluate("(1px / 0)").is_err());
    }
}
