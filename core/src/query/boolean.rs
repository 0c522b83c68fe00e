//! Boolean retrieval: a small expression grammar over AND / OR / NOT /
//! parentheses, evaluated bottom-up against posting sets. NOT complements
//! against the universe of all known doc ids, never a single posting list.

use std::collections::BTreeSet;

use crate::error::{IndexError, Result};
use crate::index::{DocId, Vocabulary};
use crate::postings::PostingStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Term(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Term(String),
}

fn lex(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    for raw in input.replace('(', " ( ").replace(')', " ) ").split_whitespace() {
        let token = match raw {
            "(" => Token::LParen,
            ")" => Token::RParen,
            _ if raw.eq_ignore_ascii_case("and") => Token::And,
            _ if raw.eq_ignore_ascii_case("or") => Token::Or,
            _ if raw.eq_ignore_ascii_case("not") => Token::Not,
            _ => Token::Term(raw.to_string()),
        };
        tokens.push(token);
    }
    if tokens.is_empty() {
        return Err(IndexError::MalformedExpression("empty expression".into()));
    }
    Ok(tokens)
}

/// Recursive-descent parser; precedence NOT > AND > OR.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.bump();
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.bump();
            let rhs = self.unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.bump() {
            Some(Token::Not) => Ok(Expr::Not(Box::new(self.unary()?))),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(IndexError::MalformedExpression(
                        "missing closing parenthesis".into(),
                    )),
                }
            }
            Some(Token::Term(t)) => Ok(Expr::Term(t)),
            other => Err(IndexError::MalformedExpression(format!(
                "expected term, NOT or '(' but found {other:?}"
            ))),
        }
    }
}

pub fn parse(input: &str) -> Result<Expr> {
    let mut parser = Parser {
        tokens: lex(input)?,
        pos: 0,
    };
    let expr = parser.or_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(IndexError::MalformedExpression(format!(
            "unexpected trailing input at token {}",
            parser.pos
        )));
    }
    Ok(expr)
}

/// Evaluate an expression to the set of matching doc ids. Terms absent from
/// the vocabulary evaluate to the empty set.
pub fn evaluate(
    expr: &Expr,
    universe: &BTreeSet<DocId>,
    store: &mut PostingStore,
    vocab: &Vocabulary,
) -> Result<BTreeSet<DocId>> {
    match expr {
        Expr::Term(term) => {
            let postings = store.get(vocab, term)?.unwrap_or_default();
            Ok(postings.into_iter().map(|(doc_id, _)| doc_id).collect())
        }
        Expr::Not(inner) => {
            let set = evaluate(inner, universe, store, vocab)?;
            Ok(universe.difference(&set).copied().collect())
        }
        Expr::And(lhs, rhs) => {
            let a = evaluate(lhs, universe, store, vocab)?;
            let b = evaluate(rhs, universe, store, vocab)?;
            Ok(a.intersection(&b).copied().collect())
        }
        Expr::Or(lhs, rhs) => {
            let a = evaluate(lhs, universe, store, vocab)?;
            let b = evaluate(rhs, universe, store, vocab)?;
            Ok(a.union(&b).copied().collect())
        }
    }
}
