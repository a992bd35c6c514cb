//! Scene description foundations.

use strum::{Display, EnumCount, FromRepr};

pub mod parser;
mod path;

pub use parser::{parse_path, ParseError, Parser};
pub use path::{path, Anchor, Element, Path};

/// An enum that specifies the kind of a path element.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumCount, Display)]
pub enum ElementKind {
    Prim = 0,
    VariantSelection = 1,
    Property = 2,
    Target = 3,
    RelationalAttribute = 4,
    Mapper = 5,
    MapperArg = 6,
    Expression = 7,
}
