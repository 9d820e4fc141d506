//! Parser for STG source text
//!
//! A recursive descent over the lexer's spanned token stream. Binary
//! operator sugar is desugared here into intrinsic applications so the
//! machine only ever sees saturated intrinsic calls.
use crate::syntax::ast::{Atom, Binding, CaseAlt, Expr, LambdaForm, Program};
use crate::syntax::error::{ParserError, SyntaxError};
use crate::syntax::lexer::{Lexer, Token};
use codespan::{ByteIndex, Span};
use codespan_reporting::files::{Files, SimpleFiles};
use std::rc::Rc;

/// Parse a whole program (one or more `define` bindings)
pub fn parse_program<N, T>(files: &SimpleFiles<N, T>, id: usize) -> Result<Program, ParserError>
where
    N: AsRef<str>,
    N: Clone,
    N: std::fmt::Display,
    T: AsRef<str>,
{
    let mut parser = Parser::from_file_id(files, id)?;
    let program = parser.program()?;
    parser.expect_end()?;
    Ok(program)
}

/// Parse a single expression (the `-e` surface)
pub fn parse_expression<N, T>(files: &SimpleFiles<N, T>, id: usize) -> Result<Rc<Expr>, ParserError>
where
    N: AsRef<str>,
    N: Clone,
    N: std::fmt::Display,
    T: AsRef<str>,
{
    let mut parser = Parser::from_file_id(files, id)?;
    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(expr)
}

struct Parser<'text> {
    file_id: usize,
    tokens: Vec<(ByteIndex, Token<'text>, ByteIndex)>,
    pos: usize,
    end: ByteIndex,
}

impl<'text> Parser<'text> {
    fn from_file_id<N, T>(
        files: &'text SimpleFiles<N, T>,
        file_id: usize,
    ) -> Result<Self, SyntaxError>
    where
        N: AsRef<str>,
        N: Clone,
        N: std::fmt::Display,
        T: AsRef<str>,
    {
        let tokens = Lexer::from_file_id(files, file_id)
            .filter(|item| match item {
                Ok((_, token, _)) => !token.is_trivia(),
                Err(_) => true,
            })
            .collect::<Result<Vec<_>, _>>()?;
        let end = ByteIndex(<str as AsRef<str>>::as_ref(files.source(file_id).unwrap()).len() as u32);
        Ok(Parser {
            file_id,
            tokens,
            pos: 0,
            end,
        })
    }

    fn peek(&self) -> Option<&Token<'text>> {
        self.tokens.get(self.pos).map(|(_, t, _)| t)
    }

    fn advance(&mut self) -> Option<(ByteIndex, Token<'text>, ByteIndex)> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn eof_span(&self) -> Span {
        Span::new(self.end, self.end)
    }

    /// Error for the token at the cursor (or end of input)
    fn unexpected(&self, expected: &[&str]) -> SyntaxError {
        let expected: Vec<String> = expected.iter().map(|e| e.to_string()).collect();
        match self.tokens.get(self.pos) {
            Some((s, token, e)) => SyntaxError::UnrecognisedToken(
                self.file_id,
                token.description(),
                expected,
                Span::new(*s, *e),
            ),
            None => SyntaxError::UnexpectedEndOfInput(self.file_id, self.eof_span()),
        }
    }

    fn expect(&mut self, token: Token<'text>, description: &str) -> Result<(), SyntaxError> {
        if self.peek() == Some(&token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&[description]))
        }
    }

    fn expect_end(&mut self) -> Result<(), SyntaxError> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(self.unexpected(&["end of input"]))
        }
    }

    fn identifier(&mut self) -> Result<String, SyntaxError> {
        match self.peek() {
            Some(Token::Identifier(name)) => {
                let name = name.to_string();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(&["identifier"])),
        }
    }

    fn number(&mut self) -> Result<i64, SyntaxError> {
        match self.tokens.get(self.pos) {
            Some((s, Token::Number(text), e)) => {
                let value = text.parse::<i64>().map_err(|_| {
                    SyntaxError::UnableToMkPrimInt(
                        self.file_id,
                        text.to_string(),
                        Span::new(*s, *e),
                    )
                })?;
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected(&["number"])),
        }
    }

    /// program := (`define` binding `;`?)+
    fn program(&mut self) -> Result<Program, SyntaxError> {
        let mut bindings = vec![];
        loop {
            match self.peek() {
                Some(Token::Define) => {
                    self.advance();
                    bindings.push(self.binding()?);
                }
                Some(Token::Semicolon) => {
                    self.advance();
                }
                None if !bindings.is_empty() => break,
                _ => return Err(self.unexpected(&["'define'"])),
            }
        }
        Ok(Program::new(bindings))
    }

    /// binding := name `=` lambda
    fn binding(&mut self) -> Result<Binding, SyntaxError> {
        let name = self.identifier()?;
        self.expect(Token::Equals, "'='")?;
        let lambda = self.lambda()?;
        Ok(Binding { name, lambda })
    }

    /// lambda := `{` names `}` (`\u`|`\n`) `{` names `}` `->` expr
    fn lambda(&mut self) -> Result<LambdaForm, SyntaxError> {
        let free = self.name_list()?;
        let update = match self.peek() {
            Some(Token::Update(flag)) => {
                let flag = *flag;
                self.advance();
                flag
            }
            _ => return Err(self.unexpected(&["'\\u'", "'\\n'"])),
        };
        let bound = self.name_list()?;
        self.expect(Token::Arrow, "'->'")?;
        let body = self.expression()?;
        Ok(LambdaForm::new(free, update, bound, body))
    }

    /// `{` name (`,` name)* `}` or `{}`
    fn name_list(&mut self) -> Result<Vec<String>, SyntaxError> {
        self.expect(Token::OpenBrace, "'{'")?;
        let mut names = vec![];
        if self.peek() != Some(&Token::CloseBrace) {
            names.push(self.identifier()?);
            while self.peek() == Some(&Token::Comma) {
                self.advance();
                names.push(self.identifier()?);
            }
        }
        self.expect(Token::CloseBrace, "'}'")?;
        Ok(names)
    }

    /// expr := let | case | application | constructor | int | binop sugar
    fn expression(&mut self) -> Result<Rc<Expr>, SyntaxError> {
        match self.peek() {
            Some(Token::Let) => {
                self.advance();
                self.let_body(false)
            }
            Some(Token::Letrec) => {
                self.advance();
                self.let_body(true)
            }
            Some(Token::Case) => {
                self.advance();
                self.case_body()
            }
            Some(Token::Number(_)) => {
                let n = self.number()?;
                self.binop_tail(Atom::Lit(n))
            }
            Some(Token::Identifier(name)) => {
                let constructor = name.chars().next().map_or(false, |c| c.is_ascii_uppercase());
                let name = self.identifier()?;
                if constructor {
                    let args = self.atom_list()?;
                    Ok(Rc::new(Expr::Con { name, args }))
                } else if self.peek() == Some(&Token::OpenBrace) {
                    let args = self.atom_list()?;
                    Ok(Rc::new(Expr::App {
                        callable: name,
                        args,
                    }))
                } else {
                    self.binop_tail(Atom::Var(name))
                }
            }
            _ => Err(self.unexpected(&["expression"])),
        }
    }

    /// Desugar `atom ⊕ atom` to an intrinsic application; a bare
    /// literal stands for itself but a bare variable does not (the
    /// grammar requires an argument tuple on applications)
    fn binop_tail(&mut self, left: Atom) -> Result<Rc<Expr>, SyntaxError> {
        let intrinsic = match self.peek() {
            Some(Token::Plus) => "plus#",
            Some(Token::Minus) => "minus#",
            Some(Token::Star) => "times#",
            Some(Token::Slash) => "divide#",
            _ => {
                return match left {
                    Atom::Lit(n) => Ok(Rc::new(Expr::Lit(n))),
                    Atom::Var(_) => Err(self.unexpected(&["'{'"])),
                }
            }
        };
        self.advance();
        let right = self.atom()?;
        Ok(Rc::new(Expr::App {
            callable: intrinsic.to_string(),
            args: vec![left, right],
        }))
    }

    /// bindings after `let`/`letrec` up to `in`
    fn let_body(&mut self, rec: bool) -> Result<Rc<Expr>, SyntaxError> {
        let mut bindings = vec![self.binding()?];
        while self.peek() == Some(&Token::Semicolon) {
            self.advance();
            bindings.push(self.binding()?);
        }
        self.expect(Token::In, "'in'")?;
        let body = self.expression()?;
        Ok(Rc::new(Expr::Let {
            rec,
            bindings,
            body,
        }))
    }

    /// scrutinee and alternatives after `case`
    fn case_body(&mut self) -> Result<Rc<Expr>, SyntaxError> {
        let scrutinee = self.expression()?;
        self.expect(Token::Of, "'of'")?;
        self.expect(Token::OpenBrace, "'{'")?;
        let mut alts = vec![self.alternative()?];
        while self.peek() == Some(&Token::Semicolon) {
            self.advance();
            alts.push(self.alternative()?);
        }
        self.expect(Token::CloseBrace, "'}'")?;
        Ok(Rc::new(Expr::Case { scrutinee, alts }))
    }

    /// alt := Con `{` names `}` `->` expr | int `->` expr | name `->` expr
    fn alternative(&mut self) -> Result<CaseAlt, SyntaxError> {
        match self.peek() {
            Some(Token::Number(_)) => {
                let value = self.number()?;
                self.expect(Token::Arrow, "'->'")?;
                let body = self.expression()?;
                Ok(CaseAlt::Lit { value, body })
            }
            Some(Token::Identifier(name)) => {
                let constructor = name.chars().next().map_or(false, |c| c.is_ascii_uppercase());
                let name = self.identifier()?;
                if constructor {
                    let binders = self.name_list()?;
                    self.expect(Token::Arrow, "'->'")?;
                    let body = self.expression()?;
                    Ok(CaseAlt::Con {
                        name,
                        binders,
                        body,
                    })
                } else {
                    self.expect(Token::Arrow, "'->'")?;
                    let body = self.expression()?;
                    Ok(CaseAlt::Var { binder: name, body })
                }
            }
            _ => Err(self.unexpected(&["alternative"])),
        }
    }

    /// `{` atom (`,` atom)* `}` or `{}`
    fn atom_list(&mut self) -> Result<Vec<Atom>, SyntaxError> {
        self.expect(Token::OpenBrace, "'{'")?;
        let mut atoms = vec![];
        if self.peek() != Some(&Token::CloseBrace) {
            atoms.push(self.atom()?);
            while self.peek() == Some(&Token::Comma) {
                self.advance();
                atoms.push(self.atom()?);
            }
        }
        self.expect(Token::CloseBrace, "'}'")?;
        Ok(atoms)
    }

    fn atom(&mut self) -> Result<Atom, SyntaxError> {
        match self.peek() {
            Some(Token::Number(_)) => Ok(Atom::Lit(self.number()?)),
            Some(Token::Identifier(_)) => Ok(Atom::Var(self.identifier()?)),
            _ => Err(self.unexpected(&["atom"])),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::syntax::ast::dsl::*;
    use crate::syntax::ast::ex;

    pub struct ParseTester {
        files: SimpleFiles<String, String>,
    }

    impl ParseTester {
        pub fn new() -> Self {
            ParseTester {
                files: SimpleFiles::new(),
            }
        }

        pub fn program(&mut self, text: &str) -> Result<Program, ParserError> {
            let id = self.files.add("test".to_string(), text.to_string());
            parse_program(&self.files, id)
        }

        pub fn expression(&mut self, text: &str) -> Result<Rc<Expr>, ParserError> {
            let id = self.files.add("test".to_string(), text.to_string());
            parse_expression(&self.files, id)
        }
    }

    #[test]
    fn test_parse_identity_program() {
        let mut t = ParseTester::new();
        let parsed = t
            .program("define main = {} \\u {} -> id {1}; define id = {} \\n {x} -> x {}")
            .unwrap();
        assert_eq!(parsed, ex::identity_applied());
    }

    #[test]
    fn test_parse_without_binding_separators() {
        let mut t = ParseTester::new();
        let parsed = t
            .program("define main = {} \\u {} -> id {1}\ndefine id = {} \\n {x} -> x {}")
            .unwrap();
        assert_eq!(parsed, ex::identity_applied());
    }

    #[test]
    fn test_parse_intrinsic_application() {
        let mut t = ParseTester::new();
        let parsed = t.program("define main = {} \\u {} -> plus# {2, 3}").unwrap();
        assert_eq!(parsed, ex::primitive_add());
    }

    #[test]
    fn test_parse_case_on_constructor() {
        let mut t = ParseTester::new();
        let parsed = t
            .program("define main = {} \\u {} -> case True {} of { True {} -> 1; False {} -> 0 }")
            .unwrap();
        assert_eq!(parsed, ex::case_on_constructor());
    }

    #[test]
    fn test_parse_let_and_letrec() {
        let mut t = ParseTester::new();
        let parsed = t
            .expression("letrec ones = {ones} \\n {} -> Cons {1, ones} in ones {}")
            .unwrap();
        assert_eq!(
            parsed,
            letrec_(
                vec![binding(
                    "ones",
                    lambda(&["ones"], &[], con("Cons", vec![lit(1), var("ones")])),
                )],
                app("ones", vec![]),
            )
        );

        let parsed = t
            .expression("let x = {y} \\u {} -> y {} in x {}")
            .unwrap();
        assert_eq!(
            parsed,
            let_(
                vec![binding("x", thunk(&["y"], app("y", vec![])))],
                app("x", vec![]),
            )
        );
    }

    #[test]
    fn test_parse_binop_sugar() {
        let mut t = ParseTester::new();
        assert_eq!(
            t.expression("1 + 2").unwrap(),
            app("plus#", vec![lit(1), lit(2)])
        );
        assert_eq!(
            t.expression("x - 1").unwrap(),
            app("minus#", vec![var("x"), lit(1)])
        );
        assert_eq!(
            t.expression("x * y").unwrap(),
            app("times#", vec![var("x"), var("y")])
        );
        assert_eq!(
            t.expression("6 / 3").unwrap(),
            app("divide#", vec![lit(6), lit(3)])
        );
    }

    #[test]
    fn test_parse_case_with_default() {
        let mut t = ParseTester::new();
        let parsed = t
            .expression("case x {} of { 0 -> 1; n -> n {} }")
            .unwrap();
        assert_eq!(
            parsed,
            case_(
                app("x", vec![]),
                vec![alt_lit(0, num(1)), alt_var("n", app("n", vec![]))],
            )
        );
    }

    #[test]
    fn test_parse_constructor_pattern_binders() {
        let mut t = ParseTester::new();
        let parsed = t
            .expression("case p {} of { Tup {a, b} -> a {} }")
            .unwrap();
        assert_eq!(
            parsed,
            case_(
                app("p", vec![]),
                vec![alt_con("Tup", vec!["a", "b"], app("a", vec![]))],
            )
        );
    }

    #[test]
    fn test_parse_errors() {
        let mut t = ParseTester::new();

        // bare variable without argument tuple
        assert!(matches!(
            t.expression("x"),
            Err(ParserError::Syntax(SyntaxError::UnexpectedEndOfInput(_, _)))
        ));

        // missing arrow in lambda
        assert!(matches!(
            t.program("define main = {} \\u {} 1"),
            Err(ParserError::Syntax(SyntaxError::UnrecognisedToken(..)))
        ));

        // oversized literal
        assert!(matches!(
            t.expression("99999999999999999999999999"),
            Err(ParserError::Syntax(SyntaxError::UnableToMkPrimInt(..)))
        ));

        // no bindings at all
        assert!(matches!(
            t.program(""),
            Err(ParserError::Syntax(SyntaxError::UnexpectedEndOfInput(_, _)))
        ));
    }
}
