//! Type registry — maps exporter kinds onto the closed graph vocabulary.
//!
//! Every node type carries a field table. Fields marked `required` are
//! enforced by the store as `Exists` constraints, so the mapper must fill
//! them from the table's default whenever the exporter omitted them.
//! A required field without a default is a mapping failure for that item.

use tracing::warn;

use crate::model::{PropertyMap, Value};
use super::{EdgeType, NodeType};

// ============================================================================
// Field tables
// ============================================================================

/// Default applied when the exporter omits a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    /// No default: absence is an error if the field is required.
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'static str),
    /// Copy the item's display name.
    Name,
    /// 1-based position among the item's siblings.
    Position,
}

/// One attribute of a node type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub default: FieldDefault,
}

const fn req(name: &'static str, default: FieldDefault) -> FieldSpec {
    FieldSpec { name, required: true, default }
}

const fn opt(name: &'static str) -> FieldSpec {
    FieldSpec { name, required: false, default: FieldDefault::Absent }
}

use FieldDefault::{Absent, Bool, Float, Int, Name, Position, Str};

const NAME: FieldSpec = req("name", Str(""));

const PROJECT_FIELDS: &[FieldSpec] = &[
    NAME,
    req("bits_per_channel", Int(8)),
    req("frame_rate", Float(30.0)),
    opt("file"),
];

const COMPOSITION_FIELDS: &[FieldSpec] = &[
    NAME,
    req("duration", Float(0.0)),
    req("frame_rate", Float(30.0)),
    req("width", Int(1920)),
    req("height", Int(1080)),
    opt("pixel_aspect"),
    opt("background_color"),
];

const FOOTAGE_FIELDS: &[FieldSpec] = &[
    NAME,
    req("file", Str("")),
    req("duration", Float(0.0)),
    req("width", Int(0)),
    req("height", Int(0)),
    opt("frame_rate"),
];

const FOLDER_FIELDS: &[FieldSpec] = &[NAME];

const LAYER_FIELDS: &[FieldSpec] = &[
    NAME,
    req("index", Position),
    req("in_point", Float(0.0)),
    req("out_point", Float(0.0)),
    req("enabled", Bool(true)),
    opt("start_time"),
    opt("source_id"),
    opt("parent_id"),
    opt("blending_mode"),
];

const TEXT_LAYER_FIELDS: &[FieldSpec] = &[
    NAME,
    req("index", Position),
    req("in_point", Float(0.0)),
    req("out_point", Float(0.0)),
    req("enabled", Bool(true)),
    req("text", Str("")),
    req("font_size", Float(12.0)),
    req("font_family", Str("Arial")),
    opt("start_time"),
    opt("parent_id"),
];

const PROPERTY_FIELDS: &[FieldSpec] = &[
    NAME,
    req("match_name", Name),
    opt("value"),
    opt("property_type"),
];

const PROPERTY_GROUP_FIELDS: &[FieldSpec] = &[NAME, req("match_name", Name)];

const EFFECT_FIELDS: &[FieldSpec] = &[
    NAME,
    req("match_name", Name),
    req("enabled", Bool(true)),
    req("index", Position),
    opt("category"),
];

const KEYFRAME_FIELDS: &[FieldSpec] = &[
    NAME,
    req("time", Absent),
    opt("value"),
    req("interpolation", Str("linear")),
];

const EXPRESSION_FIELDS: &[FieldSpec] = &[
    NAME,
    req("expression_text", Absent),
    req("language", Str("javascript")),
    req("enabled", Bool(true)),
];

const RENDER_ITEM_FIELDS: &[FieldSpec] = &[
    NAME,
    req("status", Str("queued")),
    opt("comp_id"),
    opt("output_path"),
];

const UNKNOWN_FIELDS: &[FieldSpec] = &[NAME, opt("source_kind")];

// ============================================================================
// TypeSchema
// ============================================================================

/// Field table of one node type.
#[derive(Debug, Clone, Copy)]
pub struct TypeSchema {
    pub node_type: NodeType,
    pub fields: &'static [FieldSpec],
}

impl TypeSchema {
    pub fn for_type(node_type: NodeType) -> TypeSchema {
        let fields = match node_type {
            NodeType::Project => PROJECT_FIELDS,
            NodeType::Composition => COMPOSITION_FIELDS,
            NodeType::FootageItem => FOOTAGE_FIELDS,
            NodeType::ProjectFolder => FOLDER_FIELDS,
            NodeType::TextLayer => TEXT_LAYER_FIELDS,
            NodeType::AVLayer
            | NodeType::ShapeLayer
            | NodeType::CameraLayer
            | NodeType::LightLayer => LAYER_FIELDS,
            NodeType::Property => PROPERTY_FIELDS,
            NodeType::PropertyGroup => PROPERTY_GROUP_FIELDS,
            NodeType::Effect => EFFECT_FIELDS,
            NodeType::Keyframe => KEYFRAME_FIELDS,
            NodeType::Expression => EXPRESSION_FIELDS,
            NodeType::RenderQueueItem => RENDER_ITEM_FIELDS,
            NodeType::Unknown => UNKNOWN_FIELDS,
        };
        TypeSchema { node_type, fields }
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Complete a source property map: fill defaults for omitted fields.
    ///
    /// `name` is the item's display name and `position` its 1-based index
    /// among siblings. Properties outside the table pass through untouched.
    /// Fails with the name of the first required field that has no default.
    pub fn apply(
        &self,
        name: &str,
        position: usize,
        source: &PropertyMap,
    ) -> std::result::Result<PropertyMap, String> {
        let mut props = source.clone();
        props.insert("name".into(), Value::from(name));

        for field in self.fields {
            if props.get(field.name).is_some_and(|v| !v.is_null()) {
                continue;
            }
            let value = match field.default {
                FieldDefault::Absent if field.required => {
                    return Err(format!(
                        "{} requires field '{}' and the exporter did not provide it",
                        self.node_type, field.name
                    ));
                }
                FieldDefault::Absent => continue,
                FieldDefault::Bool(b) => Value::Bool(b),
                FieldDefault::Int(i) => Value::Int(i),
                FieldDefault::Float(f) => Value::Float(f),
                FieldDefault::Str(s) => Value::from(s),
                FieldDefault::Name => Value::from(name),
                FieldDefault::Position => Value::from(position),
            };
            props.insert(field.name.to_string(), value);
        }

        Ok(props)
    }
}

// ============================================================================
// TypeRegistry
// ============================================================================

/// Outcome of resolving an exporter kind.
#[derive(Debug, Clone, Copy)]
pub struct Resolution {
    pub node_type: NodeType,
    pub schema: TypeSchema,
    /// False when the kind fell through to `Unknown`.
    pub known: bool,
}

/// Outcome of resolving an exporter edge kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeResolution {
    Known(EdgeType),
    Unknown,
}

/// Static mapping from exporter vocabulary to graph vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeRegistry;

impl TypeRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a source kind (`"Composition"`, `"text layer"`, `"ae_footage"`, ...).
    ///
    /// Unknown kinds map to [`NodeType::Unknown`] and are logged, never fatal.
    pub fn resolve(&self, source_kind: &str) -> Resolution {
        match lookup_node_kind(source_kind) {
            Some(node_type) => Resolution {
                node_type,
                schema: TypeSchema::for_type(node_type),
                known: true,
            },
            None => {
                warn!(kind = source_kind, "unknown source kind, mapping to Unknown");
                Resolution {
                    node_type: NodeType::Unknown,
                    schema: TypeSchema::for_type(NodeType::Unknown),
                    known: false,
                }
            }
        }
    }

    pub fn resolve_edge(&self, source_kind: &str) -> EdgeResolution {
        lookup_edge_kind(source_kind).map_or(EdgeResolution::Unknown, EdgeResolution::Known)
    }

    pub fn schema(&self, node_type: NodeType) -> TypeSchema {
        TypeSchema::for_type(node_type)
    }
}

/// Lowercase, alphanumerics only: `"Text Layer"`, `"text_layer"` → `"textlayer"`.
fn normalize(kind: &str) -> String {
    kind.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn lookup_node_kind(kind: &str) -> Option<NodeType> {
    let key = normalize(kind);
    node_alias(&key).or_else(|| key.strip_prefix("ae").and_then(node_alias))
}

fn node_alias(key: &str) -> Option<NodeType> {
    let t = match key {
        "project" => NodeType::Project,
        "composition" | "compitem" | "comp" => NodeType::Composition,
        "footageitem" | "footage" => NodeType::FootageItem,
        "projectfolder" | "folderitem" | "folder" => NodeType::ProjectFolder,
        "avlayer" | "layer" => NodeType::AVLayer,
        "textlayer" => NodeType::TextLayer,
        "shapelayer" => NodeType::ShapeLayer,
        "cameralayer" | "camera" => NodeType::CameraLayer,
        "lightlayer" | "light" => NodeType::LightLayer,
        "property" => NodeType::Property,
        "propertygroup" | "group" => NodeType::PropertyGroup,
        "effect" => NodeType::Effect,
        "keyframe" => NodeType::Keyframe,
        "expression" => NodeType::Expression,
        "renderqueueitem" | "renderitem" => NodeType::RenderQueueItem,
        _ => return None,
    };
    Some(t)
}

fn lookup_edge_kind(kind: &str) -> Option<EdgeType> {
    let t = match normalize(kind).as_str() {
        "contains" => EdgeType::Contains,
        "parentsto" | "parent" => EdgeType::ParentsTo,
        "usessource" | "uses" => EdgeType::UsesSource,
        "driveswithexpression" => EdgeType::DrivesWithExpression,
        "haskeyframe" => EdgeType::HasKeyframe,
        "renders" => EdgeType::Renders,
        "referencesinexpression" => EdgeType::ReferencesInExpression,
        "similarname" => EdgeType::SimilarName,
        "similarfunction" => EdgeType::SimilarFunction,
        _ => return None,
    };
    Some(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::props;

    #[test]
    fn test_resolve_aliases() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.resolve("Composition").node_type, NodeType::Composition);
        assert_eq!(reg.resolve("CompItem").node_type, NodeType::Composition);
        assert_eq!(reg.resolve("text layer").node_type, NodeType::TextLayer);
        assert_eq!(reg.resolve("ae_text_layer").node_type, NodeType::TextLayer);
        assert_eq!(reg.resolve("ae_render_item").node_type, NodeType::RenderQueueItem);
        assert_eq!(reg.resolve("Property-Group").node_type, NodeType::PropertyGroup);
    }

    #[test]
    fn test_unknown_kind_is_not_fatal() {
        let res = TypeRegistry::new().resolve("SolidSource");
        assert_eq!(res.node_type, NodeType::Unknown);
        assert!(!res.known);
    }

    #[test]
    fn test_resolve_edges() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.resolve_edge("USES_SOURCE"), EdgeResolution::Known(EdgeType::UsesSource));
        assert_eq!(reg.resolve_edge("uses"), EdgeResolution::Known(EdgeType::UsesSource));
        assert_eq!(reg.resolve_edge("depends_on"), EdgeResolution::Unknown);
    }

    #[test]
    fn test_apply_fills_defaults() {
        let schema = TypeSchema::for_type(NodeType::Composition);
        let out = schema.apply("Main", 1, &props([("duration", 10.0)])).unwrap();
        assert_eq!(out["name"], Value::from("Main"));
        assert_eq!(out["duration"], Value::Float(10.0));
        assert_eq!(out["frame_rate"], Value::Float(30.0));
        assert_eq!(out["width"], Value::Int(1920));
        assert_eq!(out["height"], Value::Int(1080));
        assert!(!out.contains_key("pixel_aspect"));
    }

    #[test]
    fn test_apply_position_and_name_defaults() {
        let schema = TypeSchema::for_type(NodeType::Effect);
        let out = schema.apply("Gaussian Blur", 3, &PropertyMap::new()).unwrap();
        assert_eq!(out["index"], Value::Int(3));
        assert_eq!(out["match_name"], Value::from("Gaussian Blur"));
        assert_eq!(out["enabled"], Value::Bool(true));
    }

    #[test]
    fn test_apply_missing_required_without_default() {
        let schema = TypeSchema::for_type(NodeType::Keyframe);
        let err = schema.apply("", 1, &PropertyMap::new()).unwrap_err();
        assert!(err.contains("time"));

        let ok = schema.apply("", 1, &props([("time", 1.5)])).unwrap();
        assert_eq!(ok["interpolation"], Value::from("linear"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let schema = TypeSchema::for_type(NodeType::Composition);
        let out = schema.apply("C", 1, &props([("frame_rate", Value::Null)])).unwrap();
        assert_eq!(out["frame_rate"], Value::Float(30.0));
    }

    #[test]
    fn test_required_fields() {
        let schema = TypeSchema::for_type(NodeType::Expression);
        let required: Vec<_> = schema.required_fields().collect();
        assert_eq!(required, vec!["name", "expression_text", "language", "enabled"]);
    }
}
