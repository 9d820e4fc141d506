//! Pretty printing support

use pretty::{DocAllocator, DocBuilder, RcAllocator};

/// Width at which program and machine-state dumps are laid out
pub const RENDER_WIDTH: usize = 80;

/// Render as a layout document against an allocator
pub trait ToPretty {
    fn pretty<'b, D, A>(&'b self, allocator: &'b D) -> DocBuilder<'b, D, A>
    where
        D: DocAllocator<'b, A>,
        D::Doc: Clone,
        A: Clone;
}

/// Lay an item out at the given width, with a trailing newline
pub fn prettify_width<I>(item: &I, width: usize) -> String
where
    I: ToPretty,
{
    let allocator = RcAllocator;
    let doc = item.pretty::<_, ()>(&allocator);
    format!("{}\n", doc.1.pretty(width))
}

/// Lay an item out at the default width
pub fn prettify<I>(item: &I) -> String
where
    I: ToPretty,
{
    prettify_width(item, RENDER_WIDTH)
}
