//! # Expression references
//!
//! Expressions attached to properties may read other layers, effects and
//! compositions. This module finds those reads:
//!
//! ```text
//! expression text ─▶ lexer::tokenize ─▶ ReferenceGrammar ─▶ [ExpressionReference]
//! ```
//!
//! The grammar is a trait so the mapper can be handed a stricter or looser
//! one; [`AeExpressionGrammar`] is the default.

pub mod lexer;
pub mod grammar;

pub use grammar::{
    AeExpressionGrammar, ExpressionReference, LayerSelector, ReferenceGrammar, ReferenceTarget,
    Selector,
};
