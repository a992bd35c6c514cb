//! Path productions.
//!
//! ```text
//! Path        := '/' PrimElts PropElts?
//!              | DotDots ('/' PathElts?)?
//!              | PathElts
//!              | '.'
//! PathElts    := PrimElts PropElts? | PropElts
//! PrimElts    := LookaheadList<PrimName, '/' | VariantSelections> VariantSelections?
//! PropElts    := '.' PropertyName (TargetPathSeq | MapperPathSeq | ExpressionSeq)?
//! ```

use super::{
    context::{Context, TargetType},
    input::{
        action, ascii_identifier, guard, identifier, identifier_continue, identifier_start, keyword,
        list, lookahead_list, must, one, opt, pad_blank, plus, seq, sor, star, two, Input, Match,
        Rule,
    },
};
use crate::sdf::{Anchor, Element, Path};

fn slash() -> impl Rule {
    one(b'/')
}

fn dot() -> impl Rule {
    one(b'.')
}

fn absolute_root() -> impl Rule {
    action(slash(), |ctx, _| ctx.set_anchor(Anchor::AbsoluteRoot))
}

fn dot_dot() -> impl Rule {
    action(two(b'.'), |ctx, _| ctx.add_parent())
}

fn dot_dots() -> impl Rule {
    list(dot_dot, slash)
}

fn prim_name() -> impl Rule {
    action(identifier(), |ctx, span| ctx.push_named(span, Element::Prim))
}

// Hyphens are accepted here for compatibility with older layers.
fn variant_set_name() -> impl Rule {
    action(
        seq!(identifier_start(), star(sor!(identifier_continue(), one(b'-')))),
        |ctx, span| ctx.set_variant_set(span),
    )
}

fn variant_name() -> impl Rule {
    action(
        seq!(opt(dot()), star(sor!(identifier_continue(), one(b'|'), one(b'-')))),
        |ctx, span| ctx.set_variant(span),
    )
}

fn variant_selection() -> impl Rule {
    action(
        seq!(
            pad_blank(one(b'{')),
            must(variant_set_name(), "variant set name"),
            must(pad_blank(one(b'=')), "'='"),
            opt(variant_name()),
            must(pad_blank(one(b'}')), "'}'"),
        ),
        |ctx, _| ctx.finish_variant_selection(),
    )
}

fn variant_selections() -> impl Rule {
    plus(variant_selection())
}

fn prim_elts() -> impl Rule {
    seq!(
        lookahead_list(prim_name, || sor!(slash(), variant_selections())),
        opt(variant_selections()),
    )
}

fn property_name() -> impl Rule {
    action(list(identifier, || one(b':')), |ctx, span| {
        ctx.push_named(span, Element::Property)
    })
}

fn relational_attribute_name() -> impl Rule {
    action(list(identifier, || one(b':')), |ctx, span| {
        ctx.push_named(span, Element::RelationalAttribute)
    })
}

/// `[` nested path `]`, attached as `target_type` once closed.
fn bracket_path(target_type: TargetType) -> impl Rule {
    seq!(
        one(b'['),
        must(guard(move |ctx| ctx.begin_nested(target_type)), "shallower nesting"),
        must(path, "path"),
        must(action(one(b']'), |ctx, _| ctx.end_nested()), "']'"),
    )
}

fn mapper_arg() -> impl Rule {
    action(ascii_identifier(), |ctx, span| ctx.push_named(span, Element::MapperArg))
}

fn mapper_path_seq() -> impl Rule {
    seq!(
        dot(),
        keyword(Path::MAPPER_KEYWORD),
        must(bracket_path(TargetType::Mapper), "'['"),
        opt(seq!(dot(), mapper_arg())),
    )
}

fn expression_seq() -> impl Rule {
    seq!(
        dot(),
        must(
            action(keyword(Path::EXPRESSION_KEYWORD), |ctx, _| ctx.push_expression()),
            Path::EXPRESSION_KEYWORD
        ),
    )
}

fn rel_attr_seq() -> impl Rule {
    seq!(
        dot(),
        must(relational_attribute_name(), "relational attribute name"),
        opt(sor!(bracket_path(TargetType::Target), mapper_path_seq(), expression_seq())),
    )
}

fn target_path_seq() -> impl Rule {
    seq!(bracket_path(TargetType::Target), opt(rel_attr_seq()))
}

fn prop_elts() -> impl Rule {
    seq!(
        dot(),
        property_name(),
        opt(sor!(target_path_seq(), mapper_path_seq(), expression_seq())),
    )
}

fn path_elts() -> impl Rule {
    sor!(seq!(prim_elts(), opt(prop_elts())), prop_elts())
}

/// Top level production. Also used for nested target and mapper paths, which
/// is why it is a plain function rather than a rule builder.
pub(super) fn path(input: &mut Input<'_>, ctx: &mut Context<'_>) -> Match {
    sor!(
        seq!(absolute_root(), opt(seq!(prim_elts(), opt(prop_elts())))),
        seq!(dot_dots(), opt(seq!(slash(), opt(path_elts())))),
        path_elts(),
        dot(),
    )
    .apply(input, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tf::Interner;

    /// `Ok(true)` only when the whole text matches.
    fn full_match(text: &str) -> Match {
        let interner = Interner::new();
        let mut ctx = Context::new(&interner);
        let mut input = Input::new(text.as_bytes());

        path(&mut input, &mut ctx).map(|matched| matched && input.empty())
    }

    #[test]
    #[rustfmt::skip]
    fn full_matches() {
        let cases = [
            ("/", true),
            (".", true),
            ("..", true),
            ("../", true),
            ("../../A/B", true),
            ("../.attr", true),
            ("A/B", true),
            (".attr", true),
            ("/A/B.attr", true),
            ("/A{v=s}B", true),
            ("/A{v=s}{w=t}", true),
            ("/A { v = s }", true),
            ("/A{set-name=.sel|x-1}", true),
            ("/A.ns:attr", true),
            ("/A.rel[/B]", true),
            ("/A.rel[/B].attr", true),
            ("/A.rel[/B].attr[/C]", true),
            ("/A.rel[/B].attr.mapper[/M].arg", true),
            ("/A.rel[/B].attr.expression", true),
            ("/A.attr.mapper[/M]", true),
            ("/A.attr.MAPPER[/M].arg", true),
            ("/A.attr.expression", true),
            ("/A.rel[/B.rel[/C]]", true),

            ("/A/", false),
            ("/.attr", false),
            ("/A.ns:", false),
            ("/A{v=s}/B", false),
            ("...", false),
            ("./A", false),
        ];

        for (text, expected) in cases {
            assert_eq!(full_match(text), Ok(expected), "{text}");
        }
    }

    #[test]
    #[rustfmt::skip]
    fn hard_failures() {
        let cases = [
            ("/A.rel[", 7, "path"),
            ("/A.rel[/B", 9, "']'"),
            ("/A{", 3, "variant set name"),
            ("/A{v", 4, "'='"),
            ("/A{v=s", 6, "'}'"),
            ("/A.attr.foo", 8, "expression"),
            ("/A.rel[/B].", 11, "relational attribute name"),
            ("/A.attr.mapper", 14, "'['"),
        ];

        for (text, offset, expected) in cases {
            let failure = full_match(text).unwrap_err();
            assert_eq!((failure.offset, failure.expected), (offset, expected), "{text}");
        }
    }
}
