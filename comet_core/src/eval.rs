//! Restricted expression evaluation for `<!--@echo(expr)-->`.
//!
//! The directive is a small expression language rather than an arbitrary
//! code hook: literals, variable lookup with dotted access into nested
//! bindings, arithmetic (`+` doubling as string concatenation), comparison,
//! boolean logic, and a conditional operator.
//!
//! Failures are recoverable at the render level: the engine substitutes an
//! empty string and records the reason.

use logos::Logos;
use snailquote::unescape;
use thiserror::Error;

use crate::filters::Bindings;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum EvalError {
	#[error("unrecognized input at byte {0}")]
	Lex(usize),
	#[error("unexpected end of expression")]
	UnexpectedEnd,
	#[error("unexpected token `{0}`")]
	UnexpectedToken(String),
	#[error("invalid string literal")]
	InvalidString,
	#[error("`{0}` is not a number")]
	NotANumber(String),
	#[error("division by zero")]
	DivisionByZero,
	#[error("cannot order {0} and {1}")]
	Unorderable(&'static str, &'static str),
}

/// Raw tokens produced by logos for the expression mini-language.
#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
	#[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
	Number,
	#[regex(r#""([^"\\]|\\.)*""#)]
	DoubleQuotedString,
	#[regex(r"'([^'\\]|\\.)*'")]
	SingleQuotedString,
	#[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
	Ident,
	#[token("(")]
	OpenParen,
	#[token(")")]
	CloseParen,
	#[token("+")]
	Plus,
	#[token("-")]
	Minus,
	#[token("*")]
	Star,
	#[token("/")]
	Slash,
	#[token("%")]
	Percent,
	#[token("==")]
	EqEq,
	#[token("!=")]
	NotEq,
	#[token("<=")]
	LessEq,
	#[token(">=")]
	GreaterEq,
	#[token("<")]
	Less,
	#[token(">")]
	Greater,
	#[token("&&")]
	AndAnd,
	#[token("||")]
	OrOr,
	#[token("!")]
	Bang,
	#[token("?")]
	Question,
	#[token(":")]
	Colon,
	#[token(".")]
	Dot,
}

/// Cooked tokens the parser consumes.
#[derive(Debug, Clone, PartialEq)]
enum Token {
	Number(f64),
	String(String),
	Ident(String),
	OpenParen,
	CloseParen,
	Plus,
	Minus,
	Star,
	Slash,
	Percent,
	EqEq,
	NotEq,
	LessEq,
	GreaterEq,
	Less,
	Greater,
	AndAnd,
	OrOr,
	Bang,
	Question,
	Colon,
	Dot,
}

impl Token {
	fn describe(&self) -> String {
		match self {
			Self::Number(n) => n.to_string(),
			Self::String(s) => format!("\"{s}\""),
			Self::Ident(name) => name.clone(),
			Self::OpenParen => "(".to_string(),
			Self::CloseParen => ")".to_string(),
			Self::Plus => "+".to_string(),
			Self::Minus => "-".to_string(),
			Self::Star => "*".to_string(),
			Self::Slash => "/".to_string(),
			Self::Percent => "%".to_string(),
			Self::EqEq => "==".to_string(),
			Self::NotEq => "!=".to_string(),
			Self::LessEq => "<=".to_string(),
			Self::GreaterEq => ">=".to_string(),
			Self::Less => "<".to_string(),
			Self::Greater => ">".to_string(),
			Self::AndAnd => "&&".to_string(),
			Self::OrOr => "||".to_string(),
			Self::Bang => "!".to_string(),
			Self::Question => "?".to_string(),
			Self::Colon => ":".to_string(),
			Self::Dot => ".".to_string(),
		}
	}
}

fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
	let mut tokens = Vec::new();

	for (result, span) in RawToken::lexer(source).spanned() {
		let raw = result.map_err(|()| EvalError::Lex(span.start))?;
		let slice = &source[span.clone()];

		let token = match raw {
			RawToken::Number => {
				let value = slice
					.parse::<f64>()
					.map_err(|_| EvalError::NotANumber(slice.to_string()))?;
				Token::Number(value)
			}
			RawToken::DoubleQuotedString | RawToken::SingleQuotedString => {
				let inner = &slice[1..slice.len() - 1];
				let value = if inner.contains('\\') {
					unescape(slice).map_err(|_| EvalError::InvalidString)?
				} else {
					inner.to_string()
				};
				Token::String(value)
			}
			RawToken::Ident => Token::Ident(slice.to_string()),
			RawToken::OpenParen => Token::OpenParen,
			RawToken::CloseParen => Token::CloseParen,
			RawToken::Plus => Token::Plus,
			RawToken::Minus => Token::Minus,
			RawToken::Star => Token::Star,
			RawToken::Slash => Token::Slash,
			RawToken::Percent => Token::Percent,
			RawToken::EqEq => Token::EqEq,
			RawToken::NotEq => Token::NotEq,
			RawToken::LessEq => Token::LessEq,
			RawToken::GreaterEq => Token::GreaterEq,
			RawToken::Less => Token::Less,
			RawToken::Greater => Token::Greater,
			RawToken::AndAnd => Token::AndAnd,
			RawToken::OrOr => Token::OrOr,
			RawToken::Bang => Token::Bang,
			RawToken::Question => Token::Question,
			RawToken::Colon => Token::Colon,
			RawToken::Dot => Token::Dot,
		};

		tokens.push(token);
	}

	Ok(tokens)
}

/// A value produced while evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
	Null,
	Bool(bool),
	Number(f64),
	String(String),
}

impl EvalValue {
	fn type_name(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Bool(_) => "boolean",
			Self::Number(_) => "number",
			Self::String(_) => "string",
		}
	}

	/// Empty strings, zero, `false`, and `null` are falsy.
	pub fn is_truthy(&self) -> bool {
		match self {
			Self::Null => false,
			Self::Bool(flag) => *flag,
			Self::Number(number) => *number != 0.0,
			Self::String(text) => !text.is_empty(),
		}
	}

	fn as_number(&self) -> Result<f64, EvalError> {
		match self {
			Self::Null => Ok(0.0),
			Self::Bool(flag) => Ok(f64::from(u8::from(*flag))),
			Self::Number(number) => Ok(*number),
			Self::String(text) => {
				text.trim()
					.parse::<f64>()
					.map_err(|_| EvalError::NotANumber(text.clone()))
			}
		}
	}

	/// Render the value as directive output text. Whole numbers print
	/// without a fractional part.
	pub fn render(&self) -> String {
		match self {
			Self::Null => String::new(),
			Self::Bool(flag) => flag.to_string(),
			Self::Number(number) => format_number(*number),
			Self::String(text) => text.clone(),
		}
	}
}

fn format_number(number: f64) -> String {
	if number.fract() == 0.0 && number.abs() < 1e15 {
		format!("{}", number as i64)
	} else {
		number.to_string()
	}
}

fn from_binding(value: &serde_json::Value) -> EvalValue {
	match value {
		serde_json::Value::Null => EvalValue::Null,
		serde_json::Value::Bool(flag) => EvalValue::Bool(*flag),
		serde_json::Value::Number(number) => {
			EvalValue::Number(number.as_f64().unwrap_or_default())
		}
		serde_json::Value::String(text) => EvalValue::String(text.clone()),
		other => EvalValue::String(serde_json::to_string(other).unwrap_or_default()),
	}
}

/// Recursive-descent parser and evaluator over the cooked token stream.
struct Evaluator<'a> {
	tokens: Vec<Token>,
	cursor: usize,
	bindings: &'a Bindings,
}

impl<'a> Evaluator<'a> {
	fn new(tokens: Vec<Token>, bindings: &'a Bindings) -> Self {
		Self {
			tokens,
			cursor: 0,
			bindings,
		}
	}

	fn peek(&self) -> Option<&Token> {
		self.tokens.get(self.cursor)
	}

	fn advance(&mut self) -> Result<Token, EvalError> {
		let token = self
			.tokens
			.get(self.cursor)
			.cloned()
			.ok_or(EvalError::UnexpectedEnd)?;
		self.cursor += 1;
		Ok(token)
	}

	fn expect(&mut self, expected: &Token) -> Result<(), EvalError> {
		let token = self.advance()?;
		if &token == expected {
			Ok(())
		} else {
			Err(EvalError::UnexpectedToken(token.describe()))
		}
	}

	fn eat(&mut self, candidate: &Token) -> bool {
		if self.peek() == Some(candidate) {
			self.cursor += 1;
			true
		} else {
			false
		}
	}

	fn expression(&mut self) -> Result<EvalValue, EvalError> {
		self.ternary()
	}

	fn ternary(&mut self) -> Result<EvalValue, EvalError> {
		let condition = self.logical_or()?;

		if self.eat(&Token::Question) {
			// Both branches parse; only the selected one's value is used.
			let when_true = self.ternary()?;
			self.expect(&Token::Colon)?;
			let when_false = self.ternary()?;
			return Ok(if condition.is_truthy() {
				when_true
			} else {
				when_false
			});
		}

		Ok(condition)
	}

	fn logical_or(&mut self) -> Result<EvalValue, EvalError> {
		let mut value = self.logical_and()?;

		while self.eat(&Token::OrOr) {
			let rhs = self.logical_and()?;
			value = EvalValue::Bool(value.is_truthy() || rhs.is_truthy());
		}

		Ok(value)
	}

	fn logical_and(&mut self) -> Result<EvalValue, EvalError> {
		let mut value = self.equality()?;

		while self.eat(&Token::AndAnd) {
			let rhs = self.equality()?;
			value = EvalValue::Bool(value.is_truthy() && rhs.is_truthy());
		}

		Ok(value)
	}

	fn equality(&mut self) -> Result<EvalValue, EvalError> {
		let mut value = self.comparison()?;

		loop {
			if self.eat(&Token::EqEq) {
				let rhs = self.comparison()?;
				value = EvalValue::Bool(values_equal(&value, &rhs));
			} else if self.eat(&Token::NotEq) {
				let rhs = self.comparison()?;
				value = EvalValue::Bool(!values_equal(&value, &rhs));
			} else {
				break;
			}
		}

		Ok(value)
	}

	fn comparison(&mut self) -> Result<EvalValue, EvalError> {
		let mut value = self.additive()?;

		loop {
			let ordering = match self.peek() {
				Some(Token::Less) => Comparison::Less,
				Some(Token::LessEq) => Comparison::LessEq,
				Some(Token::Greater) => Comparison::Greater,
				Some(Token::GreaterEq) => Comparison::GreaterEq,
				_ => break,
			};
			self.cursor += 1;
			let rhs = self.additive()?;
			value = EvalValue::Bool(ordering.holds(&value, &rhs)?);
		}

		Ok(value)
	}

	fn additive(&mut self) -> Result<EvalValue, EvalError> {
		let mut value = self.multiplicative()?;

		loop {
			if self.eat(&Token::Plus) {
				let rhs = self.multiplicative()?;
				value = add_or_concat(&value, &rhs)?;
			} else if self.eat(&Token::Minus) {
				let rhs = self.multiplicative()?;
				value = EvalValue::Number(value.as_number()? - rhs.as_number()?);
			} else {
				break;
			}
		}

		Ok(value)
	}

	fn multiplicative(&mut self) -> Result<EvalValue, EvalError> {
		let mut value = self.unary()?;

		loop {
			if self.eat(&Token::Star) {
				let rhs = self.unary()?;
				value = EvalValue::Number(value.as_number()? * rhs.as_number()?);
			} else if self.eat(&Token::Slash) {
				let rhs = self.unary()?.as_number()?;
				if rhs == 0.0 {
					return Err(EvalError::DivisionByZero);
				}
				value = EvalValue::Number(value.as_number()? / rhs);
			} else if self.eat(&Token::Percent) {
				let rhs = self.unary()?.as_number()?;
				if rhs == 0.0 {
					return Err(EvalError::DivisionByZero);
				}
				value = EvalValue::Number(value.as_number()? % rhs);
			} else {
				break;
			}
		}

		Ok(value)
	}

	fn unary(&mut self) -> Result<EvalValue, EvalError> {
		if self.eat(&Token::Minus) {
			let value = self.unary()?;
			return Ok(EvalValue::Number(-value.as_number()?));
		}
		if self.eat(&Token::Bang) {
			let value = self.unary()?;
			return Ok(EvalValue::Bool(!value.is_truthy()));
		}

		self.primary()
	}

	fn primary(&mut self) -> Result<EvalValue, EvalError> {
		let token = self.advance()?;

		match token {
			Token::Number(number) => Ok(EvalValue::Number(number)),
			Token::String(text) => Ok(EvalValue::String(text)),
			Token::OpenParen => {
				let value = self.expression()?;
				self.expect(&Token::CloseParen)?;
				Ok(value)
			}
			Token::Ident(name) => {
				match name.as_str() {
					"true" => Ok(EvalValue::Bool(true)),
					"false" => Ok(EvalValue::Bool(false)),
					"null" => Ok(EvalValue::Null),
					_ => self.variable(name),
				}
			}
			other => Err(EvalError::UnexpectedToken(other.describe())),
		}
	}

	/// Resolve `name(.segment)*` against the binding map. Unbound names and
	/// dead-end path segments resolve to `null`.
	fn variable(&mut self, name: String) -> Result<EvalValue, EvalError> {
		let mut current = self.bindings.get(&name).cloned();

		while self.eat(&Token::Dot) {
			let segment = match self.advance()? {
				Token::Ident(segment) => segment,
				other => return Err(EvalError::UnexpectedToken(other.describe())),
			};
			current = current.and_then(|value| value.get(&segment).cloned());
		}

		Ok(current
			.as_ref()
			.map_or(EvalValue::Null, from_binding))
	}
}

#[derive(Clone, Copy)]
enum Comparison {
	Less,
	LessEq,
	Greater,
	GreaterEq,
}

impl Comparison {
	fn holds(self, lhs: &EvalValue, rhs: &EvalValue) -> Result<bool, EvalError> {
		let ordering = match (lhs, rhs) {
			(EvalValue::String(a), EvalValue::String(b)) => a.cmp(b),
			_ => {
				let (a, b) = (lhs.as_number(), rhs.as_number());
				match (a, b) {
					(Ok(a), Ok(b)) => {
						a.partial_cmp(&b)
							.ok_or(EvalError::Unorderable(lhs.type_name(), rhs.type_name()))?
					}
					_ => return Err(EvalError::Unorderable(lhs.type_name(), rhs.type_name())),
				}
			}
		};

		Ok(match self {
			Self::Less => ordering.is_lt(),
			Self::LessEq => ordering.is_le(),
			Self::Greater => ordering.is_gt(),
			Self::GreaterEq => ordering.is_ge(),
		})
	}
}

/// `+` adds numbers, but concatenates when either operand is a string.
fn add_or_concat(lhs: &EvalValue, rhs: &EvalValue) -> Result<EvalValue, EvalError> {
	if matches!(lhs, EvalValue::String(_)) || matches!(rhs, EvalValue::String(_)) {
		Ok(EvalValue::String(format!("{}{}", lhs.render(), rhs.render())))
	} else {
		Ok(EvalValue::Number(lhs.as_number()? + rhs.as_number()?))
	}
}

fn values_equal(lhs: &EvalValue, rhs: &EvalValue) -> bool {
	match (lhs, rhs) {
		(EvalValue::Null, EvalValue::Null) => true,
		(EvalValue::Bool(a), EvalValue::Bool(b)) => a == b,
		(EvalValue::Number(a), EvalValue::Number(b)) => a == b,
		(EvalValue::String(a), EvalValue::String(b)) => a == b,
		_ => false,
	}
}

/// Evaluate an `@echo` payload against the render bindings, producing the
/// substitution text.
pub fn eval_expression(source: &str, bindings: &Bindings) -> Result<String, EvalError> {
	let tokens = tokenize(source)?;
	let mut evaluator = Evaluator::new(tokens, bindings);
	let value = evaluator.expression()?;

	if let Some(trailing) = evaluator.peek() {
		return Err(EvalError::UnexpectedToken(trailing.describe()));
	}

	Ok(value.render())
}
