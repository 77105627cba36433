//! Recursive-descent parser producing the query AST

use super::lexer::{tokenize, Spanned, Token};
use super::QuerySyntaxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfAxis,
    Parent,
    Attribute,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "self" => Self::SelfAxis,
            "parent" => Self::Parent,
            "attribute" => Self::Attribute,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeTest {
    /// `*`
    Any,
    /// `name` or `prefix:name`
    Name { prefix: Option<String>, local: String },
    /// `prefix:*`
    PrefixAny(String),
    /// `node()`
    Node,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    LocalName,
    NamespaceUri,
    Name,
    Contains,
    StartsWith,
    Not,
    String,
    Count,
    NormalizeSpace,
    True,
    False,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "local-name" => Self::LocalName,
            "namespace-uri" => Self::NamespaceUri,
            "name" => Self::Name,
            "contains" => Self::Contains,
            "starts-with" => Self::StartsWith,
            "not" => Self::Not,
            "string" => Self::String,
            "count" => Self::Count,
            "normalize-space" => Self::NormalizeSpace,
            "true" => Self::True,
            "false" => Self::False,
            _ => return None,
        })
    }

    /// Accepted argument counts (inclusive)
    fn arity(self) -> (usize, usize) {
        match self {
            Self::LocalName | Self::NamespaceUri | Self::Name | Self::String | Self::NormalizeSpace => {
                (0, 1)
            }
            Self::Contains | Self::StartsWith => (2, 2),
            Self::Not | Self::Count => (1, 1),
            Self::True | Self::False => (0, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub(crate) axis: Axis,
    pub(crate) test: NodeTest,
    pub(crate) predicates: Vec<Expr>,
}

impl Step {
    fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PathExpr {
    pub(crate) absolute: bool,
    pub(crate) steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Path(PathExpr),
    Literal(String),
    Number(f64),
    Call(Function, Vec<Expr>),
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
}

/// Compile a query that must select nodes
pub(crate) fn parse_selection(source: &str) -> Result<PathExpr, QuerySyntaxError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let expr = parser.expr()?;
    if let Some((token, at)) = parser.tokens.get(parser.pos) {
        return Err(parser.error_at(*at, format!("unexpected token {token:?}")));
    }
    match expr {
        Expr::Path(path) => Ok(path),
        _ => Err(QuerySyntaxError::new(source, 0, "query must select nodes")),
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source.len(), |(_, at)| *at)
    }

    fn error_at(&self, at: usize, message: impl Into<String>) -> QuerySyntaxError {
        QuerySyntaxError::new(self.source, at, message)
    }

    fn error(&self, message: impl Into<String>) -> QuerySyntaxError {
        self.error_at(self.offset(), message)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), QuerySyntaxError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {expected:?}")))
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Name(n)) if n == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<Expr, QuerySyntaxError> {
        let mut left = self.and_expr()?;
        while self.eat_keyword("or") {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, QuerySyntaxError> {
        let mut left = self.equality()?;
        while self.eat_keyword("and") {
            let right = self.equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, QuerySyntaxError> {
        let left = self.primary()?;
        if self.eat(&Token::Eq) {
            let right = self.primary()?;
            return Ok(Expr::Eq(Box::new(left), Box::new(right)));
        }
        if self.eat(&Token::Ne) {
            let right = self.primary()?;
            return Ok(Expr::Ne(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expr, QuerySyntaxError> {
        match self.peek() {
            Some(Token::Literal(_)) => match self.advance() {
                Some(Token::Literal(s)) => Ok(Expr::Literal(s)),
                _ => Err(self.error("expected literal")),
            },
            Some(Token::Number(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(Expr::Number(n))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name))
                if self.peek_at(1) == Some(&Token::LParen)
                    && !matches!(name.as_str(), "node" | "text" | "comment") =>
            {
                self.call()
            }
            None => Err(self.error("unexpected end of query")),
            _ => Ok(Expr::Path(self.path()?)),
        }
    }

    fn call(&mut self) -> Result<Expr, QuerySyntaxError> {
        let at = self.offset();
        let Some(Token::Name(name)) = self.advance() else {
            return Err(self.error_at(at, "expected function name"));
        };
        let function = Function::from_name(&name)
            .ok_or_else(|| self.error_at(at, format!("unknown function '{name}()'")))?;
        self.expect(&Token::LParen)?;

        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.expr()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }

        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            return Err(self.error_at(
                at,
                format!("{name}() takes {min}..={max} arguments, got {}", args.len()),
            ));
        }
        if function == Function::Count && !matches!(args[0], Expr::Path(_)) {
            return Err(self.error_at(at, "count() requires a node-set argument"));
        }
        Ok(Expr::Call(function, args))
    }

    fn path(&mut self) -> Result<PathExpr, QuerySyntaxError> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if !self.starts_step() {
                    return Ok(PathExpr {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::descendant_or_self());
                true
            }
            _ => false,
        };

        steps.push(self.step()?);
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(Step::descendant_or_self());
                steps.push(self.step()?);
            } else {
                break;
            }
        }
        Ok(PathExpr { absolute, steps })
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Star | Token::At | Token::Dot | Token::DotDot)
        )
    }

    fn step(&mut self) -> Result<Step, QuerySyntaxError> {
        if self.eat(&Token::Dot) {
            return self.with_predicates(Axis::SelfAxis, NodeTest::Node);
        }
        if self.eat(&Token::DotDot) {
            return self.with_predicates(Axis::Parent, NodeTest::Node);
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let (Some(Token::Name(name)), Some(Token::ColonColon)) = (self.peek(), self.peek_at(1)) {
            let axis = Axis::from_name(name)
                .ok_or_else(|| self.error(format!("unsupported axis '{name}'")))?;
            self.pos += 2;
            axis
        } else {
            Axis::Child
        };

        let test = self.node_test()?;
        self.with_predicates(axis, test)
    }

    fn node_test(&mut self) -> Result<NodeTest, QuerySyntaxError> {
        let at = self.offset();
        match self.advance() {
            Some(Token::Star) => Ok(NodeTest::Any),
            Some(Token::Name(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    self.expect(&Token::RParen)?;
                    return match name.as_str() {
                        "node" => Ok(NodeTest::Node),
                        "text" => Ok(NodeTest::Text),
                        "comment" => Ok(NodeTest::Comment),
                        _ => Err(self.error_at(at, format!("unknown node type '{name}()'"))),
                    };
                }
                if self.eat(&Token::Colon) {
                    return match self.advance() {
                        Some(Token::Star) => Ok(NodeTest::PrefixAny(name)),
                        Some(Token::Name(local)) => Ok(NodeTest::Name {
                            prefix: Some(name),
                            local,
                        }),
                        _ => Err(self.error_at(at, "expected local name after prefix")),
                    };
                }
                Ok(NodeTest::Name {
                    prefix: None,
                    local: name,
                })
            }
            _ => Err(self.error_at(at, "expected node test")),
        }
    }

    fn with_predicates(&mut self, axis: Axis, test: NodeTest) -> Result<Step, QuerySyntaxError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.expr()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }
}
