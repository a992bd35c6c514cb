//! `openusd-foundation` holds the native Rust building blocks of USD scene
//! description: interned tokens, text path parsing and the path model, and
//! animation spline evaluation.

pub mod sdf;
pub mod tf;
pub mod ts;

pub use half::f16;
