// ABOUTME: Compiles and evaluates arithmetic, comparison and boolean expressions over branches.
// ABOUTME: Used for both the drawn quantity and the selection weight.

//! Expressions over tree branches, e.g. `double_leaf*5` or
//! `0.50 < x && x < 2.00`.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or      := and ( "||" and )*
//! and     := compare ( "&&" compare )*
//! compare := sum ( ("==" | "!=" | "<" | "<=" | ">" | ">=") sum )?
//! sum     := product ( ("+" | "-") product )*
//! product := unary ( ("*" | "/" | "%") unary )*
//! unary   := ("-" | "+" | "!") unary | atom
//! atom    := number | branch | func "(" or ( "," or )* ")" | "(" or ")"
//! ```
//!
//! Booleans are 1.0 / 0.0; anything non-zero counts as true.

use crate::error::DataError;
use crate::tree::Tree;

#[derive(Debug, Clone)]
enum Node {
    Const(f64),
    Branch(usize),
    Neg(Box<Node>),
    Not(Box<Node>),
    Binary(Op, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Abs,
    Sqrt,
    Log,
    Log10,
    Exp,
    Sin,
    Cos,
    Pow,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "abs" | "fabs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "log" => Func::Log,
            "log10" => Func::Log10,
            "exp" => Func::Exp,
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "pow" => Func::Pow,
            "min" => Func::Min,
            "max" => Func::Max,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Func::Pow | Func::Min | Func::Max => 2,
            _ => 1,
        }
    }
}

/// A parsed expression with its branch references resolved to slots
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    text: String,
    root: Node,
    branches: Vec<String>,
}

impl CompiledExpr {
    pub fn compile(text: &str) -> Result<Self, DataError> {
        let fail = |message: String| DataError::Expression {
            expression: text.to_string(),
            message,
        };

        let tokens = tokenize(text).map_err(fail)?;
        if tokens.is_empty() {
            return Err(fail("empty expression".to_string()));
        }
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            branches: Vec::new(),
        };
        let root = parser.or().map_err(fail)?;
        if let Some(tok) = parser.peek() {
            return Err(fail(format!("unexpected {tok:?}")));
        }

        Ok(Self {
            text: text.to_string(),
            root,
            branches: parser.branches,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Branches the expression reads, in order of first use
    pub fn branches(&self) -> &[String] {
        &self.branches
    }

    /// Value for one row; `row[i]` holds branch `branches()[i]`
    pub fn eval_row(&self, row: &[f64]) -> f64 {
        eval(&self.root, row)
    }

    /// Values for every entry of `tree`
    pub fn eval_tree(&self, tree: &Tree) -> Result<Vec<f64>, DataError> {
        let columns = self
            .branches
            .iter()
            .map(|b| tree.require(b))
            .collect::<Result<Vec<_>, _>>()?;

        let mut row = vec![0.0; columns.len()];
        let values = (0..tree.entries())
            .map(|entry| {
                for (slot, column) in row.iter_mut().zip(&columns) {
                    *slot = column[entry];
                }
                eval(&self.root, &row)
            })
            .collect();
        Ok(values)
    }
}

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn eval(node: &Node, row: &[f64]) -> f64 {
    match node {
        Node::Const(v) => *v,
        Node::Branch(slot) => row[*slot],
        Node::Neg(inner) => -eval(inner, row),
        Node::Not(inner) => truth(eval(inner, row) == 0.0),
        Node::Binary(op, a, b) => {
            let (x, y) = (eval(a, row), eval(b, row));
            match op {
                Op::Add => x + y,
                Op::Sub => x - y,
                Op::Mul => x * y,
                Op::Div => x / y,
                Op::Rem => x % y,
                Op::Eq => truth(x == y),
                Op::Ne => truth(x != y),
                Op::Lt => truth(x < y),
                Op::Le => truth(x <= y),
                Op::Gt => truth(x > y),
                Op::Ge => truth(x >= y),
                Op::And => truth(x != 0.0 && y != 0.0),
                Op::Or => truth(x != 0.0 || y != 0.0),
            }
        }
        Node::Call(func, args) => {
            let x = eval(&args[0], row);
            match func {
                Func::Abs => x.abs(),
                Func::Sqrt => x.sqrt(),
                Func::Log => x.ln(),
                Func::Log10 => x.log10(),
                Func::Exp => x.exp(),
                Func::Sin => x.sin(),
                Func::Cos => x.cos(),
                Func::Pow => x.powf(eval(&args[1], row)),
                Func::Min => x.min(eval(&args[1], row)),
                Func::Max => x.max(eval(&args[1], row)),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(Op),
    Bang,
    LParen,
    RParen,
    Comma,
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let two = |op| (Token::Op(op), 2usize);

        let (token, width) = match c {
            ' ' | '\t' | '\n' => {
                i += 1;
                continue;
            }
            '0'..='9' | '.' => {
                let start = i;
                let mut end = i;
                while end < chars.len() {
                    let ch = chars[end];
                    let exponent_sign = (ch == '+' || ch == '-')
                        && end > start
                        && matches!(chars[end - 1], 'e' | 'E');
                    if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || exponent_sign {
                        end += 1;
                    } else {
                        break;
                    }
                }
                let literal: String = chars[start..end].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("bad number '{literal}'"))?;
                (Token::Number(value), end - start)
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                let mut end = i;
                while end < chars.len()
                    && (chars[end].is_alphanumeric() || chars[end] == '_' || chars[end] == '.')
                {
                    end += 1;
                }
                (Token::Ident(chars[start..end].iter().collect()), end - start)
            }
            '+' => (Token::Op(Op::Add), 1),
            '-' => (Token::Op(Op::Sub), 1),
            '*' => (Token::Op(Op::Mul), 1),
            '/' => (Token::Op(Op::Div), 1),
            '%' => (Token::Op(Op::Rem), 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            ',' => (Token::Comma, 1),
            '=' if next == Some('=') => two(Op::Eq),
            '!' if next == Some('=') => two(Op::Ne),
            '!' => (Token::Bang, 1),
            '<' if next == Some('=') => two(Op::Le),
            '<' => (Token::Op(Op::Lt), 1),
            '>' if next == Some('=') => two(Op::Ge),
            '>' => (Token::Op(Op::Gt), 1),
            '&' if next == Some('&') => two(Op::And),
            '|' if next == Some('|') => two(Op::Or),
            ':' => return Err("only one-dimensional expressions are supported".to_string()),
            other => return Err(format!("unexpected character '{other}'")),
        };
        tokens.push(token);
        i += width;
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    branches: Vec<String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat_op(&mut self, ops: &[Op]) -> Option<Op> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn binary_chain(
        &mut self,
        ops: &[Op],
        operand: fn(&mut Self) -> Result<Node, String>,
    ) -> Result<Node, String> {
        let mut lhs = operand(self)?;
        while let Some(op) = self.eat_op(ops) {
            let rhs = operand(self)?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn or(&mut self) -> Result<Node, String> {
        self.binary_chain(&[Op::Or], Self::and)
    }

    fn and(&mut self) -> Result<Node, String> {
        self.binary_chain(&[Op::And], Self::compare)
    }

    fn compare(&mut self) -> Result<Node, String> {
        let lhs = self.sum()?;
        match self.eat_op(&[Op::Eq, Op::Ne, Op::Lt, Op::Le, Op::Gt, Op::Ge]) {
            Some(op) => Ok(Node::Binary(op, Box::new(lhs), Box::new(self.sum()?))),
            None => Ok(lhs),
        }
    }

    fn sum(&mut self) -> Result<Node, String> {
        self.binary_chain(&[Op::Add, Op::Sub], Self::product)
    }

    fn product(&mut self) -> Result<Node, String> {
        self.binary_chain(&[Op::Mul, Op::Div, Op::Rem], Self::unary)
    }

    fn unary(&mut self) -> Result<Node, String> {
        match self.peek() {
            Some(Token::Op(Op::Sub)) => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op(Op::Add)) => {
                self.pos += 1;
                self.unary()
            }
            Some(Token::Bang) => {
                self.pos += 1;
                Ok(Node::Not(Box::new(self.unary()?)))
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Node, String> {
        match self.bump() {
            Some(Token::Number(v)) => Ok(Node::Const(v)),
            Some(Token::LParen) => {
                let inner = self.or()?;
                self.expect_close()?;
                Ok(inner)
            }
            Some(Token::Ident(name)) if self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                let func = Func::lookup(&name).ok_or_else(|| format!("unknown function '{name}'"))?;
                let mut args = vec![self.or()?];
                while self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                    args.push(self.or()?);
                }
                self.expect_close()?;
                if args.len() != func.arity() {
                    return Err(format!(
                        "{name}() takes {} argument(s), got {}",
                        func.arity(),
                        args.len()
                    ));
                }
                Ok(Node::Call(func, args))
            }
            Some(Token::Ident(name)) => Ok(Node::Branch(self.slot(name))),
            Some(tok) => Err(format!("unexpected {tok:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn expect_close(&mut self) -> Result<(), String> {
        match self.bump() {
            Some(Token::RParen) => Ok(()),
            _ => Err("missing ')'".to_string()),
        }
    }

    fn slot(&mut self, name: String) -> usize {
        match self.branches.iter().position(|b| *b == name) {
            Some(slot) => slot,
            None => {
                self.branches.push(name);
                self.branches.len() - 1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(text: &str, row: &[f64]) -> f64 {
        CompiledExpr::compile(text).unwrap().eval_row(row)
    }

    #[test]
    fn precedence() {
        assert_eq!(value("1 + 2 * 3", &[]), 7.0);
        assert_eq!(value("(1 + 2) * 3", &[]), 9.0);
        assert_eq!(value("-2 * -3", &[]), 6.0);
        assert_eq!(value("7 % 4 + 1", &[]), 4.0);
        assert_eq!(value("2e1 + 5E-1", &[]), 20.5);
    }

    #[test]
    fn branches_in_first_use_order() {
        let expr = CompiledExpr::compile("y * x + y").unwrap();
        assert_eq!(expr.branches(), ["y", "x"]);
        assert_eq!(expr.eval_row(&[2.0, 3.0]), 8.0);
    }

    #[test]
    fn selections() {
        let expr = CompiledExpr::compile("0.50 < x && x < 2.00").unwrap();
        assert_eq!(expr.eval_row(&[1.0]), 1.0);
        assert_eq!(expr.eval_row(&[2.0]), 0.0);
        assert_eq!(value("!(1 == 2) || 0", &[]), 1.0);
        assert_eq!(value("3 >= 3 && 2 != 2", &[]), 0.0);
    }

    #[test]
    fn functions() {
        assert_eq!(value("abs(-3)", &[]), 3.0);
        assert_eq!(value("pow(2, 10)", &[]), 1024.0);
        assert_eq!(value("max(min(4, 9), 1)", &[]), 4.0);
        assert_eq!(value("sqrt(16) + log(exp(0))", &[]), 4.0);
    }

    #[test]
    fn dotted_branch_names() {
        let expr = CompiledExpr::compile("jet.pt * 2").unwrap();
        assert_eq!(expr.branches(), ["jet.pt"]);
    }

    #[test]
    fn rejects_bad_input() {
        for bad in ["", "1 +", "(1", "foo(1)", "pow(1)", "x:y", "1 $ 2", "1 2"] {
            let err = CompiledExpr::compile(bad).unwrap_err();
            assert!(matches!(err, DataError::Expression { .. }), "{bad}");
        }
    }

    #[test]
    fn evaluates_against_tree() {
        use crate::file::{BranchData, TreeData};
        let tree = Tree::from_data(TreeData {
            name: "t".to_string(),
            title: String::new(),
            branches: vec![BranchData {
                name: "x".to_string(),
                values: vec![1.0, 2.0, 3.0],
            }],
        });
        let expr = CompiledExpr::compile("x * 5").unwrap();
        assert_eq!(expr.eval_tree(&tree).unwrap(), vec![5.0, 10.0, 15.0]);

        let missing = CompiledExpr::compile("nope + 1").unwrap();
        assert!(matches!(
            missing.eval_tree(&tree),
            Err(DataError::UnknownBranch(name)) if name == "nope"
        ));
    }
}
