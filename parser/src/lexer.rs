use el_core::ELError;
use logos::Logos;

/// Token classification for the dotted surface syntax. Multi-character
/// operators sit above their prefixes so maximal munch resolves `!=` vs
/// `!`, `<-` vs `<`, `..` vs `.`.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip(r"#[^\n]*", allow_greedy = true))]
pub enum Token {
    #[token("\n")]
    Newline,

    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,
    #[token("!=")]
    NotEqual,
    #[token("!@")]
    NotContains,
    #[token("!")]
    Bang,
    #[token("~=")]
    NearEqual,
    #[token("~")]
    Tilde,
    #[token("?")]
    Question,
    #[token(",")]
    Comma,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("|")]
    Pipe,
    #[token("$")]
    Dollar,
    #[token("@")]
    At,

    #[token("<-")]
    BindArrow,
    #[token("->")]
    Arrow,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("==")]
    EqualEqual,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("%")]
    Percent,

    #[regex("[A-Za-z][A-Za-z0-9]*")]
    Ident,
    #[regex(r#""[^"]*""#)]
    Str,
    // underscores permitted for readability: 5_000_000
    #[regex(r"-?[0-9][0-9_]*", priority = 3)]
    Int,
    #[regex(r"-?[0-9][0-9_]*d[0-9][0-9_]*", priority = 4)]
    Decimal,
    #[regex(r"-?[0-9][0-9_]*/[0-9][0-9_]*", priority = 4)]
    Fraction,
}

/// A classified token with its source slice and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexed<'a> {
    pub tok: Token,
    pub text: &'a str,
    pub line: usize,
    pub col: usize,
}

fn position(input: &str, offset: usize) -> (usize, usize) {
    let before = &input[..offset];
    let line = before.bytes().filter(|b| *b == b'\n').count() + 1;
    let col = offset - before.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
    (line, col)
}

/// Lex the whole input up front. Unknown characters are parse errors with
/// their line and column.
pub fn tokenize(input: &str) -> Result<Vec<Lexed<'_>>, ELError> {
    let mut lexer = Token::lexer(input);
    let mut out = Vec::new();
    while let Some(item) = lexer.next() {
        let span = lexer.span();
        let (line, col) = position(input, span.start);
        match item {
            Ok(tok) => out.push(Lexed {
                tok,
                text: lexer.slice(),
                line,
                col,
            }),
            Err(_) => {
                return Err(ELError::Parse {
                    line,
                    col,
                    found: lexer.slice().to_string(),
                    msg: "unrecognised token".to_string(),
                });
            }
        }
    }
    Ok(out)
}
