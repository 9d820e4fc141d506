//! Pretty printed rendering of parsed programs
//!
//! Renders the source syntax itself, so a dumped program can be fed
//! back to the parser.

use pretty::{DocAllocator, DocBuilder};

use super::ast::{Atom, Binding, CaseAlt, Expr, LambdaForm, Program};
use crate::common::prettify::ToPretty;

fn name_tuple<'b, D, A>(allocator: &'b D, names: &'b [String]) -> DocBuilder<'b, D, A>
where
    D: DocAllocator<'b, A>,
    D::Doc: Clone,
    A: Clone,
{
    allocator
        .intersperse(
            names.iter().map(|n| allocator.text(n.as_str())),
            allocator.text(", "),
        )
        .braces()
}

fn atom_tuple<'b, D, A>(allocator: &'b D, atoms: &'b [Atom]) -> DocBuilder<'b, D, A>
where
    D: DocAllocator<'b, A>,
    D::Doc: Clone,
    A: Clone,
{
    allocator
        .intersperse(atoms.iter().map(|a| a.pretty(allocator)), allocator.text(", "))
        .braces()
}

impl ToPretty for Atom {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone,
    {
        match self {
            Atom::Var(name) => allocator.text(name.as_str()),
            Atom::Lit(n) => allocator.text(format!("{}", n)),
        }
    }
}

impl ToPretty for Expr {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone,
    {
        match self {
            Expr::App { callable, args } => allocator
                .text(callable.as_str())
                .append(allocator.space())
                .append(atom_tuple(allocator, args)),
            Expr::Let {
                rec,
                bindings,
                body,
            } => {
                let keyword = if *rec { "letrec" } else { "let" };
                let binding_docs = bindings.iter().map(|b| b.pretty(allocator));
                allocator
                    .text(keyword)
                    .append(allocator.space())
                    .append(
                        allocator
                            .intersperse(binding_docs, allocator.text(";").append(allocator.line()))
                            .align(),
                    )
                    .append(allocator.line())
                    .append(allocator.text("in "))
                    .append(body.pretty(allocator))
            }
            Expr::Case { scrutinee, alts } => {
                let alt_docs = alts.iter().map(|a| a.pretty(allocator));
                allocator
                    .text("case ")
                    .append(scrutinee.pretty(allocator))
                    .append(allocator.text(" of {"))
                    .append(
                        allocator
                            .line()
                            .append(
                                allocator
                                    .intersperse(
                                        alt_docs,
                                        allocator.text(";").append(allocator.line()),
                                    )
                                    .align(),
                            )
                            .nest(2),
                    )
                    .append(allocator.line())
                    .append(allocator.text("}"))
            }
            Expr::Con { name, args } => allocator
                .text(name.as_str())
                .append(allocator.space())
                .append(atom_tuple(allocator, args)),
            Expr::Lit(n) => allocator.text(format!("{}", n)),
        }
    }
}

impl ToPretty for CaseAlt {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone,
    {
        match self {
            CaseAlt::Con {
                name,
                binders,
                body,
            } => allocator
                .text(name.as_str())
                .append(allocator.space())
                .append(name_tuple(allocator, binders))
                .append(allocator.text(" -> "))
                .append(body.pretty(allocator)),
            CaseAlt::Lit { value, body } => allocator
                .text(format!("{}", value))
                .append(allocator.text(" -> "))
                .append(body.pretty(allocator)),
            CaseAlt::Var { binder, body } => allocator
                .text(binder.as_str())
                .append(allocator.text(" -> "))
                .append(body.pretty(allocator)),
        }
    }
}

impl ToPretty for LambdaForm {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone,
    {
        name_tuple(allocator, self.free())
            .append(allocator.text(if self.update() { " \\u " } else { " \\n " }))
            .append(name_tuple(allocator, self.bound()))
            .append(allocator.text(" ->"))
            .append(allocator.line().append(self.body().pretty(allocator)).nest(2))
            .group()
    }
}

impl ToPretty for Binding {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone,
    {
        allocator
            .text(self.name.as_str())
            .append(allocator.text(" = "))
            .append(self.lambda.pretty(allocator))
    }
}

impl ToPretty for Program {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone,
    {
        allocator.intersperse(
            self.bindings.iter().map(|b| {
                allocator
                    .text("define ")
                    .append(b.pretty(allocator))
                    .append(allocator.text(";"))
            }),
            allocator.line(),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::common::prettify::prettify;
    use crate::syntax::ast::dsl::*;

    #[test]
    fn test_pretty_binding_renders_source_syntax() {
        let b = binding("id", lambda(&[], &["x"], app("x", vec![])));
        assert_eq!(prettify(&b).trim_end(), "id = {} \\n {x} -> x {}");
    }

    #[test]
    fn test_pretty_program_is_reparseable() {
        use crate::syntax::parser::tests::ParseTester;

        let p = program(vec![
            binding("main", thunk(&[], app("plus#", vec![lit(2), lit(3)]))),
            binding("id", lambda(&[], &["x"], app("x", vec![]))),
        ]);
        let text = prettify(&p);
        let mut t = ParseTester::new();
        assert_eq!(t.program(&text).unwrap(), p);
    }
}
