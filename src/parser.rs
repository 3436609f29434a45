use crate::ast::{
    ClauseDecl, GeneratorDecl, ProbabilityDecl, QueryDecl, Statement, UniformDecl, UseDecl,
};
use crate::diagnostics::{make_span, Diagnostic, Span};
use crate::terms::{Clause, Literal, Predicate, Term};
use crate::worlds::{Label, Sentence};

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Name(String),
    Str(String),
    Num(String),
    LParen,
    RParen,
    Comma,
    Period,
    Tilde,
    Query,
    Where,
    Equals,
    NEquals,
    LBracket,
    RBracket,
    At,
    LBrace,
    RBrace,
    Pipe,
    Semicolon,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

/// Parses a full source text into statements. Parse errors are collected per
/// statement; the parser resynchronizes on the next statement terminator so a
/// bad statement does not hide the rest of the file.
pub fn parse_statements(src: &str) -> Result<Vec<Statement>, Vec<Diagnostic>> {
    let tokens = lex(src)?;
    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
        wildcards: 0,
    };

    let mut statements = Vec::new();
    let mut errors = Vec::new();
    while !parser.at_end() {
        match parser.parse_statement() {
            Ok(statement) => statements.push(statement),
            Err(error) => {
                errors.push(error);
                parser.synchronize();
            }
        }
    }

    if errors.is_empty() {
        Ok(statements)
    } else {
        Err(errors)
    }
}

/// Parses a single `partition = value` label, as used by the interactive
/// `.select` command.
pub fn parse_selection(src: &str) -> Result<Label, Diagnostic> {
    let tokens = lex(src).map_err(|mut errors| errors.remove(0))?;
    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
        wildcards: 0,
    };
    let label = parser.parse_label()?;
    if !parser.at_end() {
        return Err(parser.error("expected nothing after the label"));
    }
    Ok(label)
}

fn lex(src: &str) -> Result<Vec<Token>, Vec<Diagnostic>> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let ch = bytes[i] as char;
        if ch.is_whitespace() {
            i += 1;
            continue;
        }
        if ch == '%' {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = i;
            while i < bytes.len()
                && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
            {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Name(src[start..i].to_string()),
                start,
                end: i,
            });
            continue;
        }
        if ch.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                i += 1;
            }
            // A period joins the number only when a digit follows, so that
            // `0.5.` lexes as the number 0.5 and a terminator.
            if i + 1 < bytes.len() && bytes[i] == b'.' && (bytes[i + 1] as char).is_ascii_digit() {
                i += 1;
                while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                    i += 1;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Num(src[start..i].to_string()),
                start,
                end: i,
            });
            continue;
        }
        if ch == '"' {
            let start = i;
            i += 1;
            let mut value = String::new();
            let mut closed = false;
            while i < bytes.len() {
                let c = bytes[i] as char;
                if c == '"' {
                    i += 1;
                    closed = true;
                    break;
                }
                if c == '\\' && i + 1 < bytes.len() {
                    value.push(unescape(bytes[i + 1] as char));
                    i += 2;
                    continue;
                }
                value.push(c);
                i += 1;
            }
            if !closed {
                return Err(vec![Diagnostic::new(
                    "E-PARSE",
                    "unterminated string literal",
                    Some(make_span(src, start, i)),
                )]);
            }
            tokens.push(Token {
                kind: TokenKind::Str(value),
                start,
                end: i,
            });
            continue;
        }

        let start = i;
        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Period,
            '~' => TokenKind::Tilde,
            '?' => TokenKind::Query,
            '=' => TokenKind::Equals,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '@' => TokenKind::At,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '|' => TokenKind::Pipe,
            ';' => TokenKind::Semicolon,
            ':' if i + 1 < bytes.len() && bytes[i + 1] == b'-' => {
                i += 1;
                TokenKind::Where
            }
            '!' if i + 1 < bytes.len() && bytes[i + 1] == b'=' => {
                i += 1;
                TokenKind::NEquals
            }
            other => {
                return Err(vec![Diagnostic::new(
                    "E-PARSE",
                    format!("unexpected character '{other}'"),
                    Some(make_span(src, start, start + 1)),
                )]);
            }
        };
        i += 1;
        tokens.push(Token {
            kind,
            start,
            end: i,
        });
    }

    Ok(tokens)
}

fn unescape(ch: char) -> char {
    match ch {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        other => other,
    }
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    wildcards: u64,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, Diagnostic> {
        match self.peek() {
            Some(found) if *found == kind => Ok(self.advance().expect("peeked token")),
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    fn error(&self, message: impl Into<String>) -> Diagnostic {
        let span = self
            .tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| make_span(self.src, t.start, t.end));
        Diagnostic::new("E-PARSE", message, span)
    }

    fn span_from(&self, start: usize) -> Span {
        let end = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.end)
            .unwrap_or(start);
        make_span(self.src, start, end)
    }

    /// Skips forward past the next statement terminator after a parse error.
    fn synchronize(&mut self) {
        while let Some(kind) = self.peek() {
            let terminator = matches!(
                kind,
                TokenKind::Period | TokenKind::Tilde | TokenKind::Query | TokenKind::RBrace
            );
            self.pos += 1;
            if terminator {
                break;
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, Diagnostic> {
        let start = self.tokens[self.pos].start;
        if self.consume(&TokenKind::At) {
            return self.parse_annotation(start);
        }
        if self.consume(&TokenKind::LBrace) {
            return self.parse_generator(start);
        }
        self.parse_clause_statement(start)
    }

    fn parse_clause_statement(&mut self, start: usize) -> Result<Statement, Diagnostic> {
        let head = self.parse_literal()?;
        let mut body = Vec::new();
        let mut sentence = Sentence::True;

        if self.consume(&TokenKind::Where) {
            body.push(self.parse_literal()?);
            while self.consume(&TokenKind::Comma) {
                body.push(self.parse_literal()?);
            }
        }
        if self.consume(&TokenKind::LBracket) {
            sentence = self.parse_sentence()?;
            self.expect(TokenKind::RBracket, "']' to close the sentence")?;
        }

        let terminator = self
            .advance()
            .ok_or_else(|| self.error("expected '.', '~' or '?' to end the statement"))?;
        let span = self.span_from(start);
        match terminator.kind {
            TokenKind::Period => {
                if !head.positive {
                    return Err(self.error("the head of a clause must be positive"));
                }
                Ok(Statement::Assert(ClauseDecl {
                    clause: Clause::new(head, body, sentence),
                    span,
                }))
            }
            TokenKind::Tilde => {
                if !head.positive {
                    return Err(self.error("the head of a clause must be positive"));
                }
                Ok(Statement::Retract(ClauseDecl {
                    clause: Clause::new(head, body, sentence),
                    span,
                }))
            }
            TokenKind::Query => {
                if !body.is_empty() {
                    return Err(self.error("only a single literal can be queried"));
                }
                if sentence != Sentence::True {
                    return Err(self.error("a query cannot carry a descriptive sentence"));
                }
                if !head.positive {
                    return Err(self.error("only positive literals can be queried"));
                }
                Ok(Statement::Query(QueryDecl {
                    literal: head,
                    span,
                }))
            }
            _ => Err(self.error("expected '.', '~' or '?' to end the statement")),
        }
    }

    fn parse_annotation(&mut self, start: usize) -> Result<Statement, Diagnostic> {
        let name = match self.advance() {
            Some(Token {
                kind: TokenKind::Name(name),
                ..
            }) => name,
            _ => return Err(self.error("expected an annotation after '@'")),
        };
        match name.as_str() {
            "P" | "p" => {
                self.expect(TokenKind::LParen, "'(' after P")?;
                let label = self.parse_label()?;
                self.expect(TokenKind::RParen, "')' to close the label")?;
                self.expect(TokenKind::Equals, "'=' in a probability assignment")?;
                let probability = self.parse_number()?;
                self.expect(TokenKind::Period, "'.' to close the annotation")?;
                Ok(Statement::Probability(ProbabilityDecl {
                    label,
                    probability,
                    span: self.span_from(start),
                }))
            }
            "uniform" => {
                let partition = self.parse_label_atom()?;
                self.expect(TokenKind::Period, "'.' to close the annotation")?;
                Ok(Statement::Uniform(UniformDecl {
                    partition,
                    span: self.span_from(start),
                }))
            }
            "use" => {
                let module = match self.advance() {
                    Some(Token {
                        kind: TokenKind::Str(name),
                        ..
                    }) => name,
                    _ => return Err(self.error("expected a quoted extension name after 'use'")),
                };
                self.expect(TokenKind::Period, "'.' to close the annotation")?;
                Ok(Statement::Use(UseDecl {
                    name: module,
                    span: self.span_from(start),
                }))
            }
            other => Err(self.error(format!("unknown annotation '@{other}'"))),
        }
    }

    fn parse_generator(&mut self, start: usize) -> Result<Statement, Diagnostic> {
        let mut statements = Vec::new();
        loop {
            while self.consume(&TokenKind::Semicolon) {}
            if self.peek() == Some(&TokenKind::Pipe) {
                break;
            }
            if self.at_end() {
                return Err(self.error("expected '|' before the generator guard"));
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::Pipe, "'|' before the generator guard")?;
        let guard = self.parse_literal()?;
        if !guard.positive {
            return Err(self.error("a generator guard must be a positive literal"));
        }
        self.expect(TokenKind::RBrace, "'}' to close the generator")?;
        self.consume(&TokenKind::Period);
        Ok(Statement::Generator(GeneratorDecl {
            statements,
            guard,
            span: self.span_from(start),
        }))
    }

    fn parse_literal(&mut self) -> Result<Literal, Diagnostic> {
        let mut positive = !self.consume(&TokenKind::Tilde);
        // `not lit` is an alternative spelling of `~lit`; `not` only reads as
        // the keyword when a literal follows it.
        if positive && self.keyword_negates() {
            self.pos += 1;
            positive = false;
        }
        let first = self
            .advance()
            .ok_or_else(|| self.error("expected a literal"))?;

        if self.consume(&TokenKind::LParen) {
            let name = match first.kind {
                TokenKind::Name(name) => name,
                _ => return Err(self.error("expected a name as predicate")),
            };
            let mut terms = vec![self.parse_term()?];
            while self.consume(&TokenKind::Comma) {
                terms.push(self.parse_term()?);
            }
            self.expect(TokenKind::RParen, "')' to close the literal")?;
            let pred = Predicate::new(name, terms.len());
            return Ok(Literal {
                pred,
                terms,
                positive,
            });
        }

        if self.peek() == Some(&TokenKind::Equals) || self.peek() == Some(&TokenKind::NEquals) {
            let op = self.advance().expect("peeked token");
            if op.kind == TokenKind::NEquals {
                positive = false;
            }
            let left = self.token_term(first)?;
            let right = self.parse_term()?;
            return Ok(Literal {
                pred: Predicate::new("=", 2),
                terms: vec![left, right],
                positive,
            });
        }

        let name = match first.kind {
            TokenKind::Name(name) => name,
            _ => return Err(self.error("expected a name as predicate")),
        };
        Ok(Literal {
            pred: Predicate::new(name, 0),
            terms: Vec::new(),
            positive,
        })
    }

    fn parse_term(&mut self) -> Result<Term, Diagnostic> {
        let token = self.advance().ok_or_else(|| self.error("expected a term"))?;
        self.token_term(token)
    }

    fn token_term(&mut self, token: Token) -> Result<Term, Diagnostic> {
        match token.kind {
            TokenKind::Name(name) => Ok(self.name_term(name)),
            TokenKind::Str(value) => Ok(Term::Str(value)),
            TokenKind::Num(text) => text.parse::<i64>().map(Term::Int).map_err(|_| {
                Diagnostic::new(
                    "E-PARSE",
                    "fractional numbers are only allowed as probabilities",
                    Some(make_span(self.src, token.start, token.end)),
                )
            }),
            _ => Err(self.error("expected an identifier, number or string as term")),
        }
    }

    fn name_term(&mut self, name: String) -> Term {
        if name == "_" {
            self.wildcards += 1;
            return Term::Var(format!("_{}", self.wildcards));
        }
        if name.chars().next().is_some_and(|c| c.is_uppercase()) {
            Term::Var(name)
        } else {
            Term::Symbol(name)
        }
    }

    fn parse_number(&mut self) -> Result<f64, Diagnostic> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Num(text),
                start,
                end,
            }) => text.parse::<f64>().map_err(|_| {
                Diagnostic::new(
                    "E-PARSE",
                    "malformed number",
                    Some(make_span(self.src, start, end)),
                )
            }),
            _ => Err(self.error("expected a number")),
        }
    }

    /// A label atom is a bare identifier or a label function over terms, as in
    /// `c(C)`.
    fn parse_label_atom(&mut self) -> Result<Term, Diagnostic> {
        let token = self
            .advance()
            .ok_or_else(|| self.error("expected a partition or value"))?;
        let base = self.token_term(token)?;
        if self.consume(&TokenKind::LParen) {
            let name = match base {
                Term::Symbol(name) => name,
                _ => return Err(self.error("expected a name as label function")),
            };
            let mut args = Vec::new();
            if !self.consume(&TokenKind::RParen) {
                args.push(self.parse_term()?);
                while self.consume(&TokenKind::Comma) {
                    args.push(self.parse_term()?);
                }
                self.expect(TokenKind::RParen, "')' to close the label function")?;
            }
            return Ok(Term::Ctor { name, args });
        }
        Ok(base)
    }

    fn parse_label(&mut self) -> Result<Label, Diagnostic> {
        let partition = self.parse_label_atom()?;
        self.expect(TokenKind::Equals, "'=' in a label")?;
        let value = self.parse_label_atom()?;
        Ok(Label::new(partition, value))
    }

    fn parse_sentence(&mut self) -> Result<Sentence, Diagnostic> {
        self.parse_sentence_or()
    }

    fn parse_sentence_or(&mut self) -> Result<Sentence, Diagnostic> {
        let left = self.parse_sentence_and()?;
        if self.consume_keyword("or") {
            let right = self.parse_sentence_or()?;
            return Ok(Sentence::Or(vec![left, right]));
        }
        Ok(left)
    }

    fn parse_sentence_and(&mut self) -> Result<Sentence, Diagnostic> {
        let left = self.parse_sentence_not()?;
        if self.consume_keyword("and") {
            let right = self.parse_sentence_and()?;
            return Ok(Sentence::And(vec![left, right]));
        }
        Ok(left)
    }

    fn parse_sentence_not(&mut self) -> Result<Sentence, Diagnostic> {
        if self.consume_keyword("not") {
            let sub = self.parse_sentence_not()?;
            return Ok(Sentence::Not(Box::new(sub)));
        }
        self.parse_sentence_leaf()
    }

    fn parse_sentence_leaf(&mut self) -> Result<Sentence, Diagnostic> {
        if self.consume(&TokenKind::LParen) {
            let inner = self.parse_sentence()?;
            self.expect(TokenKind::RParen, "')' to close the sentence")?;
            return Ok(inner);
        }
        if self.consume_keyword("true") {
            return Ok(Sentence::True);
        }
        if self.consume_keyword("false") {
            return Ok(Sentence::False);
        }
        let label = self.parse_label()?;
        Ok(Sentence::Lit(label))
    }

    fn keyword_negates(&self) -> bool {
        let Some(TokenKind::Name(name)) = self.peek() else {
            return false;
        };
        if name != "not" {
            return false;
        }
        matches!(
            self.tokens.get(self.pos + 1).map(|t| &t.kind),
            Some(TokenKind::Name(_) | TokenKind::Str(_) | TokenKind::Num(_) | TokenKind::Tilde)
        )
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(TokenKind::Name(name)) if name == keyword => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }
}
