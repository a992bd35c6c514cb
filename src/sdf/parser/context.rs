//! State accumulated while the grammar matches.

use crate::sdf::{Anchor, Element, Path};
use crate::tf::{Interner, Token};

/// Deepest accepted nesting of bracketed target and mapper paths.
///
/// Every level recurses through the whole grammar, so the limit keeps deeply
/// nested input from exhausting the stack.
pub(crate) const MAX_NESTING: usize = 32;

/// What a bracketed nested path is attached as once it is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TargetType {
    Target,
    Mapper,
}

/// A path under construction.
#[derive(Debug)]
struct Frame {
    anchor: Anchor,
    elements: Vec<Element>,
    target_type: TargetType,
}

impl Frame {
    fn new(target_type: TargetType) -> Self {
        Self {
            anchor: Anchor::ReflexiveRelative,
            elements: Vec::new(),
            target_type,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ContextMark {
    depth: usize,
    len: usize,
    anchor: Anchor,
}

/// Single-parse accumulator.
///
/// Frame 0 is the path being parsed; every `[` pushes a frame for the nested
/// target or mapper path and the matching `]` pops it.
pub(crate) struct Context<'i> {
    interner: &'i Interner,
    frames: Vec<Frame>,
    variant_set: Option<Token>,
    variant: Option<Token>,
}

impl<'i> Context<'i> {
    pub fn new(interner: &'i Interner) -> Self {
        Self {
            interner,
            frames: vec![Frame::new(TargetType::Target)],
            variant_set: None,
            variant: None,
        }
    }

    pub fn mark(&self) -> ContextMark {
        let (len, anchor) = self
            .frames
            .last()
            .map_or((0, Anchor::ReflexiveRelative), |frame| (frame.elements.len(), frame.anchor));

        ContextMark {
            depth: self.frames.len(),
            len,
            anchor,
        }
    }

    pub fn restore(&mut self, mark: ContextMark) {
        self.frames.truncate(mark.depth);

        if let Some(frame) = self.frames.last_mut() {
            frame.elements.truncate(mark.len);
            frame.anchor = mark.anchor;
        }
    }

    /// Interns a matched span. Spans are slices of the input, so no copy is
    /// made unless the token is new.
    fn intern(&self, span: &[u8]) -> Option<Token> {
        std::str::from_utf8(span).ok().map(|text| self.interner.intern(text))
    }

    pub fn set_anchor(&mut self, anchor: Anchor) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };

        frame.anchor = anchor;
        true
    }

    /// Records one more `..` step.
    pub fn add_parent(&mut self) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };

        frame.anchor = match frame.anchor {
            Anchor::Parent(count) => Anchor::Parent(count + 1),
            _ => Anchor::Parent(1),
        };

        true
    }

    fn push(&mut self, element: Element) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };

        frame.elements.push(element);
        true
    }

    /// Interns `span` and appends the element built from it.
    pub fn push_named(&mut self, span: &[u8], make: fn(Token) -> Element) -> bool {
        match self.intern(span) {
            Some(token) => self.push(make(token)),
            None => false,
        }
    }

    pub fn push_expression(&mut self) -> bool {
        self.push(Element::Expression)
    }

    pub fn set_variant_set(&mut self, span: &[u8]) -> bool {
        self.variant_set = self.intern(span);
        self.variant = self.intern(b"");

        self.variant_set.is_some()
    }

    pub fn set_variant(&mut self, span: &[u8]) -> bool {
        self.variant = self.intern(span);
        self.variant.is_some()
    }

    /// Appends the variant selection collected by the last
    /// [`Context::set_variant_set`] and [`Context::set_variant`] calls.
    pub fn finish_variant_selection(&mut self) -> bool {
        let (Some(set), Some(selection)) = (self.variant_set.take(), self.variant.take()) else {
            return false;
        };

        self.push(Element::VariantSelection { set, selection })
    }

    /// Starts a nested path after `[`. Refused past [`MAX_NESTING`] levels.
    pub fn begin_nested(&mut self, target_type: TargetType) -> bool {
        if self.frames.len() > MAX_NESTING {
            return false;
        }

        self.frames.push(Frame::new(target_type));
        true
    }

    /// Completes a nested path at `]` and attaches it to the enclosing path.
    pub fn end_nested(&mut self) -> bool {
        if self.frames.len() < 2 {
            return false;
        }

        let Some(frame) = self.frames.pop() else {
            return false;
        };

        let path = Path::from_parts(frame.anchor, frame.elements);

        let element = match frame.target_type {
            TargetType::Target => Element::Target(path),
            TargetType::Mapper => Element::Mapper(path),
        };

        self.push(element)
    }

    /// Returns the parsed path once all nested paths are closed.
    pub fn finish(mut self) -> Option<Path> {
        if self.frames.len() != 1 {
            return None;
        }

        let frame = self.frames.pop()?;
        Some(Path::from_parts(frame.anchor, frame.elements))
    }
}
