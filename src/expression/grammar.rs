//! Reference grammars: which parts of an expression point at other items.

use serde::Serialize;

use super::lexer::{Token, TokenKind, tokenize};
use crate::Result;

/// How an expression names a layer, effect or composition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    Name(String),
    /// 1-based index, as the host application counts.
    Index(i64),
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Name(n) => write!(f, "\"{n}\""),
            Selector::Index(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSelector {
    /// The layer the expression lives on.
    This,
    By(Selector),
}

/// What a reference points at. `comp: None` means the enclosing composition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceTarget {
    Composition { name: String },
    Layer { comp: Option<String>, layer: LayerSelector },
    Effect { comp: Option<String>, layer: LayerSelector, effect: Selector },
}

/// One reference found in expression text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExpressionReference {
    pub target: ReferenceTarget,
    /// Source text the reference was parsed from.
    pub token: String,
}

impl ExpressionReference {
    pub fn kind(&self) -> &'static str {
        match self.target {
            ReferenceTarget::Composition { .. } => "composition",
            ReferenceTarget::Layer { .. } => "layer",
            ReferenceTarget::Effect { .. } => "effect",
        }
    }
}

/// Extracts references from expression text.
pub trait ReferenceGrammar: Send + Sync {
    /// References in source order, without duplicates.
    fn references(&self, text: &str) -> Result<Vec<ExpressionReference>>;
}

// ============================================================================
// Default grammar
// ============================================================================

/// Grammar for the host application's expression language.
///
/// Recognised forms:
///
/// | Form | Target |
/// |------|--------|
/// | `thisComp.layer("Name")`, `thisComp.layer(3)` | layer in the enclosing comp |
/// | `comp("Name")` | composition |
/// | `comp("Name").layer(..)` | layer in a named comp |
/// | `thisLayer` | the expression's own layer |
/// | `<layer>.effect("Name")`, `effect(2)` | effect on a layer (bare: own layer) |
///
/// Arguments that are not literals (`layer(idx)`) cannot be resolved
/// statically and are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct AeExpressionGrammar;

impl ReferenceGrammar for AeExpressionGrammar {
    fn references(&self, text: &str) -> Result<Vec<ExpressionReference>> {
        let tokens = tokenize(text)?;
        let mut out: Vec<ExpressionReference> = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let start = tokens[i].span.start;
            let parsed = match ident_at(&tokens, i) {
                Some("thisComp") if !is_member(&tokens, i) => {
                    this_comp_chain(&tokens, i + 1)
                }
                Some("comp") if !is_member(&tokens, i) => comp_chain(&tokens, i + 1),
                Some("thisLayer") if !is_member(&tokens, i) => {
                    let (layer, next) = (LayerSelector::This, i + 1);
                    Some(effect_chain(&tokens, next, None, layer))
                }
                Some("effect") if !is_member(&tokens, i) => literal_call(&tokens, i + 1)
                    .map(|(effect, next)| {
                        (ReferenceTarget::Effect { comp: None, layer: LayerSelector::This, effect }, next)
                    }),
                _ => None,
            };

            match parsed {
                Some((target, next)) => {
                    let end = tokens[next - 1].span.end;
                    let reference = ExpressionReference {
                        target,
                        token: text[start..end].to_string(),
                    };
                    if !out.contains(&reference) {
                        out.push(reference);
                    }
                    i = next;
                }
                None => i += 1,
            }
        }

        Ok(out)
    }
}

fn ident_at(tokens: &[Token], i: usize) -> Option<&str> {
    tokens
        .get(i)
        .filter(|t| t.kind == TokenKind::Identifier)
        .map(|t| t.text.as_str())
}

/// `x.<ident>`: a member access, not a free name.
fn is_member(tokens: &[Token], i: usize) -> bool {
    i > 0 && tokens[i - 1].kind == TokenKind::Dot
}

/// `( "name" | int )` starting at `i`. Returns the selector and the index after `)`.
fn literal_call(tokens: &[Token], i: usize) -> Option<(Selector, usize)> {
    let [open, arg, close] = tokens.get(i..i + 3)? else { return None };
    if open.kind != TokenKind::LParen || close.kind != TokenKind::RParen {
        return None;
    }
    let selector = match arg.kind {
        TokenKind::StringLiteral => Selector::Name(arg.text.clone()),
        TokenKind::Number => Selector::Index(arg.text.parse().ok()?),
        _ => return None,
    };
    Some((selector, i + 3))
}

/// `.method(literal)` starting at `i`.
fn method_call(tokens: &[Token], i: usize, method: &str) -> Option<(Selector, usize)> {
    if tokens.get(i)?.kind != TokenKind::Dot || ident_at(tokens, i + 1)? != method {
        return None;
    }
    literal_call(tokens, i + 2)
}

/// After a layer reference: an optional `.effect(..)` turns it into an effect reference.
fn effect_chain(
    tokens: &[Token],
    i: usize,
    comp: Option<String>,
    layer: LayerSelector,
) -> (ReferenceTarget, usize) {
    match method_call(tokens, i, "effect") {
        Some((effect, next)) => (ReferenceTarget::Effect { comp, layer, effect }, next),
        None => (ReferenceTarget::Layer { comp, layer }, i),
    }
}

fn this_comp_chain(tokens: &[Token], i: usize) -> Option<(ReferenceTarget, usize)> {
    let (layer, next) = method_call(tokens, i, "layer")?;
    Some(effect_chain(tokens, next, None, LayerSelector::By(layer)))
}

fn comp_chain(tokens: &[Token], i: usize) -> Option<(ReferenceTarget, usize)> {
    let (Selector::Name(name), next) = literal_call(tokens, i)? else {
        return None;
    };
    match method_call(tokens, next, "layer") {
        Some((layer, after)) => Some(effect_chain(tokens, after, Some(name), LayerSelector::By(layer))),
        None => Some((ReferenceTarget::Composition { name }, next)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn refs(text: &str) -> Vec<ExpressionReference> {
        AeExpressionGrammar.references(text).unwrap()
    }

    #[test]
    fn test_this_comp_layer_by_name_and_index() {
        let r = refs("thisComp.layer(\"Control\").transform.position + thisComp.layer(2).position");
        assert_eq!(r.len(), 2);
        assert_eq!(
            r[0].target,
            ReferenceTarget::Layer { comp: None, layer: LayerSelector::By(Selector::Name("Control".into())) }
        );
        assert_eq!(r[0].token, "thisComp.layer(\"Control\")");
        assert_eq!(
            r[1].target,
            ReferenceTarget::Layer { comp: None, layer: LayerSelector::By(Selector::Index(2)) }
        );
    }

    #[test]
    fn test_effect_chains() {
        let r = refs("thisComp.layer(\"Ctrl\").effect(\"Amount\")(\"Slider\") * effect(\"Blur\")(1)");
        assert_eq!(r.len(), 2);
        assert_eq!(r[0].kind(), "effect");
        assert_eq!(
            r[0].target,
            ReferenceTarget::Effect {
                comp: None,
                layer: LayerSelector::By(Selector::Name("Ctrl".into())),
                effect: Selector::Name("Amount".into()),
            }
        );
        assert_eq!(
            r[1].target,
            ReferenceTarget::Effect {
                comp: None,
                layer: LayerSelector::This,
                effect: Selector::Name("Blur".into()),
            }
        );
    }

    #[test]
    fn test_named_comp() {
        let r = refs("comp(\"Render\").layer(\"BG\").opacity; comp(\"Other\").duration");
        assert_eq!(
            r[0].target,
            ReferenceTarget::Layer {
                comp: Some("Render".into()),
                layer: LayerSelector::By(Selector::Name("BG".into())),
            }
        );
        assert_eq!(r[1].target, ReferenceTarget::Composition { name: "Other".into() });
    }

    #[test]
    fn test_this_layer_and_duplicates() {
        let r = refs("thisLayer.width + thisLayer.height");
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].target, ReferenceTarget::Layer { comp: None, layer: LayerSelector::This });
    }

    #[test]
    fn test_dynamic_arguments_ignored() {
        assert!(refs("thisComp.layer(index - 1).position").is_empty());
        assert!(refs("wiggle(2, 30)").is_empty());
        assert!(refs("x.comp(\"A\")").is_empty());
    }

    #[test]
    fn test_lexer_error_propagates() {
        assert!(AeExpressionGrammar.references("thisComp.layer(\"open").is_err());
    }
}
