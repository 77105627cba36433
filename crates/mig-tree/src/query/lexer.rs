//! Tokenizer for path queries

use super::QuerySyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Eq,
    Ne,
    Star,
    Dot,
    DotDot,
    Colon,
    ColonColon,
    Name(String),
    Literal(String),
    Number(f64),
}

/// Token plus byte offset into the query source
pub(crate) type Spanned = (Token, usize);

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, QuerySyntaxError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '/' if next == Some('/') => {
                i += 2;
                Token::DoubleSlash
            }
            '/' => {
                i += 1;
                Token::Slash
            }
            '[' => {
                i += 1;
                Token::LBracket
            }
            ']' => {
                i += 1;
                Token::RBracket
            }
            '(' => {
                i += 1;
                Token::LParen
            }
            ')' => {
                i += 1;
                Token::RParen
            }
            '@' => {
                i += 1;
                Token::At
            }
            ',' => {
                i += 1;
                Token::Comma
            }
            '=' => {
                i += 1;
                Token::Eq
            }
            '!' if next == Some('=') => {
                i += 2;
                Token::Ne
            }
            '*' => {
                i += 1;
                Token::Star
            }
            ':' if next == Some(':') => {
                i += 2;
                Token::ColonColon
            }
            ':' => {
                i += 1;
                Token::Colon
            }
            '.' if next == Some('.') => {
                i += 2;
                Token::DotDot
            }
            '.' if !next.is_some_and(|n| n.is_ascii_digit()) => {
                i += 1;
                Token::Dot
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end].1 != quote {
                    end += 1;
                }
                if end >= chars.len() {
                    return Err(QuerySyntaxError::new(source, pos, "unterminated string literal"));
                }
                let literal: String = chars[start..end].iter().map(|(_, c)| *c).collect();
                i = end + 1;
                Token::Literal(literal)
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|(_, c)| *c).collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| QuerySyntaxError::new(source, pos, format!("invalid number '{text}'")))?;
                Token::Number(value)
            }
            c if is_name_start(c) => {
                let start = i;
                while i < chars.len() && is_name_char(chars[i].1) {
                    i += 1;
                }
                Token::Name(chars[start..i].iter().map(|(_, c)| *c).collect())
            }
            other => {
                return Err(QuerySyntaxError::new(
                    source,
                    pos,
                    format!("unexpected character '{other}'"),
                ));
            }
        };
        tokens.push((token, pos));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn tokenizes_descendant_predicate() {
        assert_eq!(
            kinds("//*[local-name()='flow']"),
            vec![
                Token::DoubleSlash,
                Token::Star,
                Token::LBracket,
                Token::Name("local-name".into()),
                Token::LParen,
                Token::RParen,
                Token::Eq,
                Token::Literal("flow".into()),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn tokenizes_axes_and_prefixes() {
        assert_eq!(
            kinds("/descendant::munit:test/@x"),
            vec![
                Token::Slash,
                Token::Name("descendant".into()),
                Token::ColonColon,
                Token::Name("munit".into()),
                Token::Colon,
                Token::Name("test".into()),
                Token::Slash,
                Token::At,
                Token::Name("x".into()),
            ]
        );
    }

    #[test]
    fn tokenizes_dots_and_numbers() {
        assert_eq!(
            kinds("../. [2] != 1.5"),
            vec![
                Token::DotDot,
                Token::Slash,
                Token::Dot,
                Token::LBracket,
                Token::Number(2.0),
                Token::RBracket,
                Token::Ne,
                Token::Number(1.5),
            ]
        );
    }

    #[test]
    fn unterminated_literal_reports_position() {
        let err = tokenize("//*[@a='x]").unwrap_err();
        assert_eq!(err.position, 7);
    }

    #[test]
    fn rejects_unknown_characters() {
        assert!(tokenize("//a | //b").is_err());
    }
}
