//! Sectioned rendering of machine states for traces
use pretty::{DocAllocator, DocBuilder};

use crate::common::prettify::ToPretty;
use crate::eval::machine::vm::Machine;

impl ToPretty for Machine {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone,
    {
        let mut sections = vec![
            allocator.text(format!("Steps:  {}", self.steps())),
            allocator.text(format!("Code:   {}", self.code())),
            allocator.text(format!("Args:   {}", self.args())),
            allocator.text(format!("Return: {}", self.returns())),
            allocator.text(format!("Update: {}", self.updates())),
        ];

        if self.heap().is_empty() {
            sections.push(allocator.text("Heap:   []"));
        } else {
            let cells = self
                .heap()
                .iter()
                .map(|(address, closure)| allocator.text(format!("  {} ↦ {}", address, closure)));
            sections.push(
                allocator
                    .text("Heap:")
                    .append(allocator.hardline())
                    .append(allocator.intersperse(cells, allocator.hardline())),
            );
        }

        let mut globals = self.globals().iter().peekable();
        if globals.peek().is_none() {
            sections.push(allocator.text("Env:    {}"));
        } else {
            let entries =
                globals.map(|(name, address)| allocator.text(format!("  {} = {}", name, address)));
            sections.push(
                allocator
                    .text("Env:")
                    .append(allocator.hardline())
                    .append(allocator.intersperse(entries, allocator.hardline())),
            );
        }

        allocator.intersperse(sections, allocator.hardline())
    }
}

#[cfg(test)]
pub mod tests {
    use crate::common::prettify::prettify;
    use crate::eval::machine::compiler::compile;
    use crate::syntax::ast::ex;

    #[test]
    fn test_state_sections() {
        let machine = compile(&ex::identity_applied()).unwrap();
        let rendered = prettify(&machine);
        assert!(rendered.contains("Steps:  0"));
        assert!(rendered.contains("Code:   ENTER(#0)"));
        assert!(rendered.contains("Args:   []"));
        assert!(rendered.contains("Return: []"));
        assert!(rendered.contains("Update: []"));
        assert!(rendered.contains("#1 ↦"));
        assert!(rendered.contains("main = #0"));
        assert!(rendered.contains("id = #1"));
    }
}
