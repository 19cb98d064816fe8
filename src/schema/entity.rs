//! Typed per-node-type attributes.
//!
//! The store keeps attributes as a dynamic [`PropertyMap`]; this module is
//! the strongly-typed view of the same data. Decoding checks that every
//! typed field has the right shape, encoding produces the canonical
//! representation (integers where integers are expected, floats for times).

use crate::model::{PropertyMap, Value};
use super::NodeType;

/// Common operations over typed node attributes.
pub trait GraphEntity {
    fn node_type(&self) -> NodeType;
    fn name(&self) -> &str;
    /// Canonical typed fields. Extra exporter attributes are not included.
    fn to_properties(&self) -> PropertyMap;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectAttrs {
    pub name: String,
    pub bits_per_channel: i64,
    pub frame_rate: f64,
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionAttrs {
    pub name: String,
    pub duration: f64,
    pub frame_rate: f64,
    pub width: i64,
    pub height: i64,
    pub pixel_aspect: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FootageAttrs {
    pub name: String,
    pub file: String,
    pub duration: f64,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FolderAttrs {
    pub name: String,
}

/// Shared by all five layer types; `text` is only set on text layers.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerAttrs {
    pub layer_type: NodeType,
    pub name: String,
    pub index: i64,
    pub in_point: f64,
    pub out_point: f64,
    pub enabled: bool,
    pub start_time: Option<f64>,
    pub source_id: Option<String>,
    pub parent_id: Option<String>,
    pub text: Option<String>,
}

impl LayerAttrs {
    /// Inclusive on both ends.
    pub fn is_active_at(&self, t: f64) -> bool {
        self.in_point <= t && t <= self.out_point
    }
}

/// Property or PropertyGroup (`is_group`).
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyAttrs {
    pub is_group: bool,
    pub name: String,
    pub match_name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectAttrs {
    pub name: String,
    pub match_name: String,
    pub enabled: bool,
    pub index: i64,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeAttrs {
    pub name: String,
    pub time: f64,
    pub value: Value,
    pub interpolation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionAttrs {
    pub name: String,
    pub expression_text: String,
    pub language: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderItemAttrs {
    pub name: String,
    pub status: String,
    pub comp_id: Option<String>,
    pub output_path: Option<String>,
}

/// Tagged attribute set, one variant per node family.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Project(ProjectAttrs),
    Composition(CompositionAttrs),
    Footage(FootageAttrs),
    Folder(FolderAttrs),
    Layer(LayerAttrs),
    Property(PropertyAttrs),
    Effect(EffectAttrs),
    Keyframe(KeyframeAttrs),
    Expression(ExpressionAttrs),
    RenderItem(RenderItemAttrs),
    Unknown { name: String },
}

// ============================================================================
// Decoding
// ============================================================================

type DecodeResult<T> = std::result::Result<T, String>;

struct Fields<'a> {
    node_type: NodeType,
    props: &'a PropertyMap,
}

impl Fields<'_> {
    fn wrong(&self, key: &str, expected: &str) -> String {
        format!("{}.{key}: expected {expected}", self.node_type)
    }

    fn string(&self, key: &str) -> DecodeResult<String> {
        match self.props.get(key) {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(self.wrong(key, "string")),
        }
    }

    fn opt_string(&self, key: &str) -> DecodeResult<Option<String>> {
        match self.props.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            // Exporters sometimes emit numeric ids.
            Some(Value::Int(i)) => Ok(Some(i.to_string())),
            Some(_) => Err(self.wrong(key, "string")),
        }
    }

    fn float(&self, key: &str) -> DecodeResult<f64> {
        self.opt_float(key)?.ok_or_else(|| self.wrong(key, "number"))
    }

    fn opt_float(&self, key: &str) -> DecodeResult<Option<f64>> {
        match self.props.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => match v.as_float() {
                Some(f) if f.is_finite() => Ok(Some(f)),
                _ => Err(self.wrong(key, "finite number")),
            },
        }
    }

    fn int(&self, key: &str) -> DecodeResult<i64> {
        match self.props.get(key) {
            Some(v) => v.as_int().ok_or_else(|| self.wrong(key, "integer")),
            None => Err(self.wrong(key, "integer")),
        }
    }

    fn boolean(&self, key: &str, default: bool) -> DecodeResult<bool> {
        match self.props.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Int(i)) => Ok(*i != 0),
            Some(_) => Err(self.wrong(key, "boolean")),
        }
    }

    fn value(&self, key: &str) -> Value {
        self.props.get(key).cloned().unwrap_or(Value::Null)
    }
}

impl Entity {
    /// Typed view of a node's attributes.
    ///
    /// Expects the map to carry the fields the type's schema requires
    /// (defaults already applied). Fails on a field of the wrong shape.
    pub fn decode(node_type: NodeType, props: &PropertyMap) -> std::result::Result<Entity, String> {
        let f = Fields { node_type, props };
        let name = f.string("name")?;

        let entity = match node_type {
            NodeType::Project => Entity::Project(ProjectAttrs {
                name,
                bits_per_channel: f.int("bits_per_channel")?,
                frame_rate: f.float("frame_rate")?,
                file: f.opt_string("file")?,
            }),
            NodeType::Composition => Entity::Composition(CompositionAttrs {
                name,
                duration: f.float("duration")?,
                frame_rate: f.float("frame_rate")?,
                width: f.int("width")?,
                height: f.int("height")?,
                pixel_aspect: f.opt_float("pixel_aspect")?,
            }),
            NodeType::FootageItem => Entity::Footage(FootageAttrs {
                name,
                file: f.string("file")?,
                duration: f.float("duration")?,
                width: f.int("width")?,
                height: f.int("height")?,
            }),
            NodeType::ProjectFolder => Entity::Folder(FolderAttrs { name }),
            t if t.is_layer() => Entity::Layer(LayerAttrs {
                layer_type: t,
                name,
                index: f.int("index")?,
                in_point: f.float("in_point")?,
                out_point: f.float("out_point")?,
                enabled: f.boolean("enabled", true)?,
                start_time: f.opt_float("start_time")?,
                source_id: f.opt_string("source_id")?,
                parent_id: f.opt_string("parent_id")?,
                text: if t == NodeType::TextLayer { Some(f.string("text")?) } else { None },
            }),
            NodeType::Property | NodeType::PropertyGroup => Entity::Property(PropertyAttrs {
                is_group: node_type == NodeType::PropertyGroup,
                match_name: match f.string("match_name")? {
                    m if m.is_empty() => name.clone(),
                    m => m,
                },
                name,
                value: f.value("value"),
            }),
            NodeType::Effect => Entity::Effect(EffectAttrs {
                match_name: match f.string("match_name")? {
                    m if m.is_empty() => name.clone(),
                    m => m,
                },
                name,
                enabled: f.boolean("enabled", true)?,
                index: f.int("index")?,
                category: f.opt_string("category")?,
            }),
            NodeType::Keyframe => Entity::Keyframe(KeyframeAttrs {
                name,
                time: f.float("time")?,
                value: f.value("value"),
                interpolation: match f.string("interpolation")? {
                    i if i.is_empty() => "linear".to_string(),
                    i => i,
                },
            }),
            NodeType::Expression => Entity::Expression(ExpressionAttrs {
                name,
                expression_text: f.string("expression_text")?,
                language: f.string("language")?,
                enabled: f.boolean("enabled", true)?,
            }),
            NodeType::RenderQueueItem => Entity::RenderItem(RenderItemAttrs {
                name,
                status: f.string("status")?,
                comp_id: f.opt_string("comp_id")?,
                output_path: f.opt_string("output_path")?,
            }),
            _ => Entity::Unknown { name },
        };
        Ok(entity)
    }

    pub fn as_layer(&self) -> Option<&LayerAttrs> {
        match self {
            Entity::Layer(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_keyframe(&self) -> Option<&KeyframeAttrs> {
        match self {
            Entity::Keyframe(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_effect(&self) -> Option<&EffectAttrs> {
        match self {
            Entity::Effect(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn put(map: &mut PropertyMap, key: &str, value: impl Into<Value>) {
    map.insert(key.to_string(), value.into());
}

fn put_opt<T: Into<Value>>(map: &mut PropertyMap, key: &str, value: Option<T>) {
    if let Some(v) = value {
        map.insert(key.to_string(), v.into());
    }
}

impl GraphEntity for Entity {
    fn node_type(&self) -> NodeType {
        match self {
            Entity::Project(_) => NodeType::Project,
            Entity::Composition(_) => NodeType::Composition,
            Entity::Footage(_) => NodeType::FootageItem,
            Entity::Folder(_) => NodeType::ProjectFolder,
            Entity::Layer(l) => l.layer_type,
            Entity::Property(p) if p.is_group => NodeType::PropertyGroup,
            Entity::Property(_) => NodeType::Property,
            Entity::Effect(_) => NodeType::Effect,
            Entity::Keyframe(_) => NodeType::Keyframe,
            Entity::Expression(_) => NodeType::Expression,
            Entity::RenderItem(_) => NodeType::RenderQueueItem,
            Entity::Unknown { .. } => NodeType::Unknown,
        }
    }

    fn name(&self) -> &str {
        match self {
            Entity::Project(a) => &a.name,
            Entity::Composition(a) => &a.name,
            Entity::Footage(a) => &a.name,
            Entity::Folder(a) => &a.name,
            Entity::Layer(a) => &a.name,
            Entity::Property(a) => &a.name,
            Entity::Effect(a) => &a.name,
            Entity::Keyframe(a) => &a.name,
            Entity::Expression(a) => &a.name,
            Entity::RenderItem(a) => &a.name,
            Entity::Unknown { name } => name,
        }
    }

    fn to_properties(&self) -> PropertyMap {
        let mut m = PropertyMap::new();
        put(&mut m, "name", self.name());
        match self {
            Entity::Project(a) => {
                put(&mut m, "bits_per_channel", a.bits_per_channel);
                put(&mut m, "frame_rate", a.frame_rate);
                put_opt(&mut m, "file", a.file.clone());
            }
            Entity::Composition(a) => {
                put(&mut m, "duration", a.duration);
                put(&mut m, "frame_rate", a.frame_rate);
                put(&mut m, "width", a.width);
                put(&mut m, "height", a.height);
                put_opt(&mut m, "pixel_aspect", a.pixel_aspect);
            }
            Entity::Footage(a) => {
                put(&mut m, "file", a.file.as_str());
                put(&mut m, "duration", a.duration);
                put(&mut m, "width", a.width);
                put(&mut m, "height", a.height);
            }
            Entity::Folder(_) | Entity::Unknown { .. } => {}
            Entity::Layer(a) => {
                put(&mut m, "index", a.index);
                put(&mut m, "in_point", a.in_point);
                put(&mut m, "out_point", a.out_point);
                put(&mut m, "enabled", a.enabled);
                put_opt(&mut m, "start_time", a.start_time);
                put_opt(&mut m, "source_id", a.source_id.clone());
                put_opt(&mut m, "parent_id", a.parent_id.clone());
                put_opt(&mut m, "text", a.text.clone());
            }
            Entity::Property(a) => {
                put(&mut m, "match_name", a.match_name.as_str());
                if !a.value.is_null() {
                    put(&mut m, "value", a.value.clone());
                }
            }
            Entity::Effect(a) => {
                put(&mut m, "match_name", a.match_name.as_str());
                put(&mut m, "enabled", a.enabled);
                put(&mut m, "index", a.index);
                put_opt(&mut m, "category", a.category.clone());
            }
            Entity::Keyframe(a) => {
                put(&mut m, "time", a.time);
                put(&mut m, "value", a.value.clone());
                put(&mut m, "interpolation", a.interpolation.as_str());
            }
            Entity::Expression(a) => {
                put(&mut m, "expression_text", a.expression_text.as_str());
                put(&mut m, "language", a.language.as_str());
                put(&mut m, "enabled", a.enabled);
            }
            Entity::RenderItem(a) => {
                put(&mut m, "status", a.status.as_str());
                put_opt(&mut m, "comp_id", a.comp_id.clone());
                put_opt(&mut m, "output_path", a.output_path.clone());
            }
        }
        m
    }
}
