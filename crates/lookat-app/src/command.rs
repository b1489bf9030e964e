// ABOUTME: Parser for shell input lines such as `draw('x', same_pad=True)`.
// ABOUTME: Produces a call with positional and keyword arguments, or nothing for blank lines.

use std::fmt;

use lookat_core::Handle;

/// Argument value as written on the command line
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    Handle(Handle),
    List(Vec<Value>),
    /// Nested call, e.g. `sel('x', 1, 2)` used as an argument
    Call(Call),
}

impl Value {
    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Float(_) => "number",
            Value::Bool(_) => "boolean",
            Value::None => "None",
            Value::Handle(_) => "handle",
            Value::List(_) => "list",
            Value::Call(_) => "call",
        }
    }
}

impl fmt::Display for Value {
    /// Writes the value back in input syntax
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => {
                f.write_str("'")?;
                for c in s.chars() {
                    match c {
                        '\'' => f.write_str("\\'")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("'")
            }
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::None => f.write_str("None"),
            Value::Handle(h) => write!(f, "{h}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Call(call) => write!(f, "{call}"),
        }
    }
}

/// One command: `name`, `name[index]` or `name(args, key=value)`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Call {
    pub name: String,
    pub index: Option<usize>,
    pub args: Vec<Value>,
    pub kwargs: Vec<(String, Value)>,
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(index) = self.index {
            return write!(f, "[{index}]");
        }
        f.write_str("(")?;
        let mut first = true;
        for arg in &self.args {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{arg}")?;
        }
        for (key, value) in &self.kwargs {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{key}={value}")?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Syntax error at column {column}: {message}")]
pub struct ParseError {
    pub column: usize,
    pub message: String,
}

/// Parse one input line. Blank lines and `#` comments give `None`.
pub fn parse_line(line: &str) -> Result<Option<Call>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let mut parser = Parser::new(trimmed);
    let call = parser.call()?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        return Err(parser.error(format!("unexpected '{c}' after the command")));
    }
    Ok(Some(call))
}

pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            column: self.pos + 1,
            message: message.into(),
        }
    }

    fn expect(&mut self, wanted: char) -> Result<(), ParseError> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == wanted => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{wanted}', found '{c}'"))),
            None => Err(self.error(format!("expected '{wanted}' before the end of the line"))),
        }
    }

    fn identifier(&mut self) -> Option<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.pos += 1,
            _ => return None,
        }
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        Some(self.chars[start..self.pos].iter().collect())
    }

    fn call(&mut self) -> Result<Call, ParseError> {
        self.skip_ws();
        let name = self
            .identifier()
            .ok_or_else(|| self.error("expected a command name"))?;
        let mut call = Call {
            name,
            ..Call::default()
        };

        self.skip_ws();
        match self.peek() {
            Some('[') => {
                self.pos += 1;
                self.skip_ws();
                call.index = Some(self.index()?);
                self.expect(']')?;
            }
            Some('(') => {
                self.pos += 1;
                self.arguments(&mut call)?;
            }
            _ => {}
        }
        Ok(call)
    }

    fn index(&mut self) -> Result<usize, ParseError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits
            .parse()
            .map_err(|_| self.error("expected a non-negative index"))
    }

    /// Arguments after the opening parenthesis, up to and including `)`
    fn arguments(&mut self, call: &mut Call) -> Result<(), ParseError> {
        self.skip_ws();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(());
        }
        loop {
            self.skip_ws();
            match self.keyword()? {
                Some(key) => {
                    if call.kwargs.iter().any(|(k, _)| *k == key) {
                        return Err(self.error(format!("'{key}' given twice")));
                    }
                    let value = self.value()?;
                    call.kwargs.push((key, value));
                }
                None => {
                    if !call.kwargs.is_empty() {
                        return Err(self.error("positional argument after keyword argument"));
                    }
                    let value = self.value()?;
                    call.args.push(value);
                }
            }
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(')') => return Ok(()),
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(format!("expected ',' or ')', found '{c}'")));
                }
                None => return Err(self.error("missing ')'")),
            }
        }
    }

    /// `name =` at the current position, consumed if present
    fn keyword(&mut self) -> Result<Option<String>, ParseError> {
        let start = self.pos;
        if let Some(name) = self.identifier() {
            self.skip_ws();
            if self.peek() == Some('=') && self.peek_at(1) != Some('=') {
                self.pos += 1;
                return Ok(Some(name));
            }
        }
        self.pos = start;
        Ok(None)
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        self.skip_ws();
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                self.string(quote).map(Value::Str)
            }
            Some('#') => {
                self.pos += 1;
                let n = self.index()?;
                Ok(Value::Handle(Handle(n as u64)))
            }
            Some('[') => {
                self.pos += 1;
                self.list().map(Value::List)
            }
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let start = self.pos;
                let word = self.identifier().unwrap_or_default();
                match word.as_str() {
                    "True" | "true" => Ok(Value::Bool(true)),
                    "False" | "false" => Ok(Value::Bool(false)),
                    "None" => Ok(Value::None),
                    _ => {
                        self.skip_ws();
                        if self.peek() == Some('(') {
                            self.pos = start;
                            self.call().map(Value::Call)
                        } else {
                            self.pos = start;
                            Err(self.error(format!("unquoted name '{word}', put it in quotes")))
                        }
                    }
                }
            }
            Some(c) => Err(self.error(format!("unexpected '{c}'"))),
            None => Err(self.error("expected a value")),
        }
    }

    fn string(&mut self, quote: char) -> Result<String, ParseError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(c) => text.push(c),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) if c == quote => return Ok(text),
                Some(c) => text.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn list(&mut self) -> Result<Vec<Value>, ParseError> {
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(self.value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(items),
                _ => return Err(self.error("expected ',' or ']' in list")),
            }
        }
    }

    fn number(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '-' | '+')
                && matches!(self.chars.get(self.pos.wrapping_sub(1)), Some('e' | 'E'));
            if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E') || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Int(i));
        }
        text.parse::<f64>().map(Value::Float).map_err(|_| ParseError {
            column: start + 1,
            message: format!("'{text}' is not a number"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Call {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn blank_and_comment_lines() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# draw later").unwrap(), None);
    }

    #[test]
    fn bare_and_empty_calls() {
        assert_eq!(parse("histograms").name, "histograms");
        let call = parse("draw_ratio()");
        assert_eq!(call.name, "draw_ratio");
        assert!(call.args.is_empty() && call.kwargs.is_empty());
    }

    #[test]
    fn indexed_listing() {
        let call = parse("histograms[2]");
        assert_eq!(call.index, Some(2));
        assert!(parse_line("histograms[-1]").is_err());
    }

    #[test]
    fn positional_and_keyword_arguments() {
        let call = parse(r#"draw('double_leaf*5', same_pad=True, binning="(10,0,10)")"#);
        assert_eq!(call.args, vec![Value::Str("double_leaf*5".to_string())]);
        assert_eq!(
            call.kwargs,
            vec![
                ("same_pad".to_string(), Value::Bool(true)),
                ("binning".to_string(), Value::Str("(10,0,10)".to_string())),
            ]
        );
    }

    #[test]
    fn numbers_handles_and_lists() {
        let call = parse("f(3, -1.5, 2e3, #7, ['a.json', 'b.json'], None)");
        assert_eq!(
            call.args,
            vec![
                Value::Int(3),
                Value::Float(-1.5),
                Value::Float(2000.0),
                Value::Handle(Handle(7)),
                Value::List(vec![
                    Value::Str("a.json".to_string()),
                    Value::Str("b.json".to_string()),
                ]),
                Value::None,
            ]
        );
    }

    #[test]
    fn comparison_inside_string_is_not_a_keyword() {
        let call = parse("draw('x', selection='x == 2')");
        assert_eq!(call.kwargs[0].1, Value::Str("x == 2".to_string()));
    }

    #[test]
    fn nested_call_argument() {
        let call = parse("draw('x', selection=sel('x', 1, 2.5))");
        match &call.kwargs[0].1 {
            Value::Call(inner) => {
                assert_eq!(inner.name, "sel");
                assert_eq!(inner.args.len(), 3);
            }
            other => panic!("expected a call, got {other:?}"),
        }
    }

    #[test]
    fn escapes_in_strings() {
        let call = parse(r"put_texts('it\'s', 'a\\b')");
        assert_eq!(call.args[0], Value::Str("it's".to_string()));
        assert_eq!(call.args[1], Value::Str("a\\b".to_string()));
    }

    #[test]
    fn errors_name_the_column() {
        let err = parse_line("draw('x'").unwrap_err();
        assert!(err.message.contains("')'"), "{err}");

        let err = parse_line("load(simple_tree)").unwrap_err();
        assert_eq!(err.column, 6);
        assert!(err.message.contains("quotes"));

        assert!(parse_line("draw(same_pad=True, 'x')").is_err());
        assert!(parse_line("draw('x', name='a', name='b')").is_err());
        assert!(parse_line("ls() extra").is_err());
    }

    #[test]
    fn display_round_trips_syntax() {
        let line = "draw('it\\'s', 2, same_pad=True)";
        assert_eq!(parse(line).to_string(), line);
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("myHist_0"));
        assert!(is_identifier("_x"));
        assert!(!is_identifier("0x"));
        assert!(!is_identifier("draw('x'"));
    }
}
