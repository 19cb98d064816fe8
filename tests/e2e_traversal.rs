//! End-to-end traversal tests.
//!
//! One project is ingested into a MemoryBackend and every walk is run
//! against it through `ProjectGraph::walker()`.
//!
//! ```text
//! Project
//! ├── Main (comp_main) ◀── RENDERS ── rq_main
//! │   ├── 1 Title          TextLayer 0..5   Transform{Position*, Opacity=expr}  Glow
//! │   ├── 2 Background     AVLayer   0..10  Glow{Radius}  Blur(off)  Transform{Scale*}  ─▶ bg.mov
//! │   ├── 3 Title Copy     TextLayer 5..10  Transform  Glow  ─▶ PARENTS_TO Title
//! │   └── 4 Intro Precomp  AVLayer   0..3   ─▶ USES_SOURCE Intro
//! ├── Intro (comp_intro)
//! │   └── 1 Shape          ShapeLayer 0..3  Transform{Rotation*}
//! ├── Scratch (comp_unused)
//! │   └── 1 Scratch Solid  AVLayer 0..1
//! ├── bg.mov, unused.mov
//! └── rq_main
//! ```
//! `*` marks keyframed properties: Position is linear, Scale bounces,
//! Rotation eases.

use std::sync::Arc;

use aegraph::ingest::SourceItem;
use aegraph::storage::MemoryBackend;
use aegraph::traversal::{AnimationPattern, RenderMarker};
use aegraph::{
    Direction, EdgeType, HashingEmbedder, NodeType, ProjectDocument, ProjectGraph, QueryError, Value,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Fixture
// ============================================================================

const OPACITY_EXPRESSION: &str = "thisComp.layer(\"Background\").effect(\"Glow\")(\"Radius\") \
     + comp(\"Intro\").layer(1).rotation + thisComp.layer(\"Ghost\").opacity";

fn item(id: &str, kind: &str, name: &str) -> SourceItem {
    SourceItem::new(id, kind).named(name)
}

fn layer(id: &str, kind: &str, name: &str, index: i64, span: (f64, f64)) -> SourceItem {
    item(id, kind, name)
        .with_property("index", index)
        .with_property("in_point", span.0)
        .with_property("out_point", span.1)
}

fn effect(id: &str, name: &str, match_name: &str, index: i64) -> SourceItem {
    item(id, "Effect", name).with_property("match_name", match_name).with_property("index", index)
}

/// A property keyed once per second, keyframe ids `{id}_k{i}`.
fn keyed(id: &str, name: &str, values: Vec<serde_json::Value>) -> SourceItem {
    values.into_iter().enumerate().fold(item(id, "Property", name), |prop, (i, value)| {
        prop.with_child(
            SourceItem::new(format!("{id}_k{i}"), "Keyframe")
                .with_property("time", i as f64)
                .with_property("value", value),
        )
    })
}

fn scalars(values: &[f64]) -> Vec<serde_json::Value> {
    values.iter().map(|v| serde_json::Value::from(*v)).collect()
}

fn fixture() -> ProjectDocument {
    let title = layer("layer_title", "TextLayer", "Title", 1, (0.0, 5.0))
        .with_child(
            item("pg_title_transform", "PropertyGroup", "Transform")
                .with_child(keyed(
                    "prop_title_pos",
                    "Position",
                    vec![
                        serde_json::json!([960.0, 540.0]),
                        serde_json::json!([1200.0, 540.0]),
                        serde_json::json!([1440.0, 540.0]),
                    ],
                ))
                .with_child(
                    item("prop_title_opacity", "Property", "Opacity")
                        .with_property("value", 100.0)
                        .with_child(
                            SourceItem::new("expr_opacity", "Expression")
                                .with_property("expression_text", OPACITY_EXPRESSION),
                        ),
                ),
        )
        .with_child(effect("fx_title_glow", "Glow", "ADBE Glo2", 1));

    let background = layer("layer_bg", "AVLayer", "Background", 2, (0.0, 10.0))
        .with_property("source_id", "footage_bg")
        .with_child(
            effect("fx_bg_glow", "Glow", "ADBE Glo2", 1).with_child(
                item("prop_glow_radius", "Property", "Radius").with_property("value", 10.0),
            ),
        )
        .with_child(
            effect("fx_bg_blur", "Blur", "ADBE Gaussian Blur 2", 2).with_property("enabled", false),
        )
        .with_child(
            item("pg_bg_transform", "PropertyGroup", "Transform")
                .with_child(keyed("prop_bg_scale", "Scale", scalars(&[0.0, 100.0, 60.0, 90.0, 80.0]))),
        );

    let subtitle = layer("layer_subtitle", "TextLayer", "Title Copy", 3, (5.0, 10.0))
        .with_property("parent_id", "layer_title")
        .with_child(item("pg_sub_transform", "PropertyGroup", "Transform"))
        .with_child(effect("fx_sub_glow", "Glow", "ADBE Glo2", 1));

    let precomp = layer("layer_precomp", "AVLayer", "Intro Precomp", 4, (0.0, 3.0))
        .with_property("source_id", "comp_intro");

    let main = item("comp_main", "Composition", "Main")
        .with_property("duration", 10.0)
        .with_child(title)
        .with_child(background)
        .with_child(subtitle)
        .with_child(precomp);

    let intro = item("comp_intro", "Composition", "Intro")
        .with_property("duration", 3.0)
        .with_child(
            layer("layer_shape", "ShapeLayer", "Shape", 1, (0.0, 3.0)).with_child(
                item("pg_shape_transform", "PropertyGroup", "Transform").with_child(keyed(
                    "prop_shape_rot",
                    "Rotation",
                    scalars(&[0.0, 50.0, 80.0, 95.0, 100.0]),
                )),
            ),
        );

    let scratch = item("comp_unused", "Composition", "Scratch")
        .with_child(layer("layer_scratch", "AVLayer", "Scratch Solid", 1, (0.0, 1.0)));

    ProjectDocument::new(
        item("project", "Project", "Promo")
            .with_child(main)
            .with_child(intro)
            .with_child(scratch)
            .with_child(item("footage_bg", "FootageItem", "bg.mov"))
            .with_child(item("footage_orphan", "FootageItem", "unused.mov"))
            .with_child(
                item("rq_main", "RenderQueueItem", "Main Render").with_property("comp_id", "comp_main"),
            ),
    )
}

async fn setup() -> ProjectGraph<MemoryBackend> {
    let graph = ProjectGraph::open_memory().await.unwrap();
    let report = graph.ingest(&fixture()).await.unwrap();
    assert_eq!(report.errors, 0, "fixture must ingest cleanly: {:?}", report.issues);
    graph
}

fn ids<'a>(iter: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut v: Vec<&str> = iter.into_iter().collect();
    v.sort_unstable();
    v
}

// ============================================================================
// 1. Composition hierarchy
// ============================================================================

#[tokio::test]
async fn test_hierarchy_layers_in_index_order() {
    let graph = setup().await;
    let h = graph.walker().walk_composition_hierarchy("comp_main", 1).await.unwrap();

    assert_eq!(h.composition.name, "Main");
    let names: Vec<&str> = h.layers.iter().map(|l| l.node.name.as_str()).collect();
    assert_eq!(names, vec!["Title", "Background", "Title Copy", "Intro Precomp"]);
    assert_eq!(h.layers[2].in_point, 5.0);
    assert!(h.layers.iter().all(|l| l.properties.is_empty()));
}

#[tokio::test]
async fn test_hierarchy_with_properties_and_keyframes() {
    let graph = setup().await;
    let walker = graph.walker();

    let h2 = walker.walk_composition_hierarchy("comp_main", 2).await.unwrap();
    let title = &h2.layers[0];
    assert_eq!(title.properties.len(), 1);
    let transform = &title.properties[0];
    assert_eq!(transform.node.name, "Transform");
    assert_eq!(ids(transform.children.iter().map(|c| c.node.id.as_str())), vec![
        "prop_title_opacity",
        "prop_title_pos"
    ]);
    assert!(transform.children.iter().all(|c| c.keyframes.is_empty()));

    let h3 = walker.walk_composition_hierarchy("comp_main", 3).await.unwrap();
    let position = h3.layers[0].properties[0]
        .children
        .iter()
        .find(|c| c.node.id == "prop_title_pos")
        .unwrap();
    let times: Vec<f64> = position.keyframes.iter().map(|k| k.time).collect();
    assert_eq!(times, vec![0.0, 1.0, 2.0]);

    // Effects are not part of the property tree.
    let visited = h3.visited_ids();
    assert!(!visited.contains(&"fx_title_glow"));
    assert!(visited.contains(&"prop_bg_scale_k4"));
}

#[tokio::test]
async fn test_hierarchy_rejects_bad_input() {
    let graph = setup().await;
    let walker = graph.walker();

    assert!(matches!(
        walker.walk_composition_hierarchy("comp_main", 0).await,
        Err(QueryError::InvalidArgument(_))
    ));
    assert!(matches!(
        walker.walk_composition_hierarchy("comp_main", 99).await,
        Err(QueryError::InvalidArgument(_))
    ));
    assert!(matches!(
        walker.walk_composition_hierarchy("layer_title", 1).await,
        Err(QueryError::InvalidArgument(_))
    ));
    assert!(matches!(
        walker.walk_composition_hierarchy("nope", 1).await,
        Err(QueryError::NotFound(_))
    ));
}

// ============================================================================
// 2. Render path
// ============================================================================

#[tokio::test]
async fn test_render_path_direct() {
    let graph = setup().await;
    let path = graph.walker().trace_render_path("layer_title").await.unwrap();

    assert_eq!(path.hops(), 2);
    assert_eq!(path.render_queue_item.as_ref().map(|r| r.id.as_str()), Some("rq_main"));
    assert_eq!(path.marker, None);
    let via: Vec<Option<EdgeType>> = path.render_path.iter().map(|s| s.via).collect();
    assert_eq!(via, vec![None, Some(EdgeType::Contains), Some(EdgeType::Renders)]);
}

#[tokio::test]
async fn test_render_path_through_precomp() {
    let graph = setup().await;
    let path = graph.walker().trace_render_path("layer_shape").await.unwrap();

    let steps: Vec<&str> = path.render_path.iter().map(|s| s.node.id.as_str()).collect();
    assert_eq!(steps, vec!["layer_shape", "comp_intro", "layer_precomp", "comp_main", "rq_main"]);
    assert_eq!(path.hops(), 4);
    assert_eq!(path.render_path[2].via, Some(EdgeType::UsesSource));
}

#[tokio::test]
async fn test_render_path_without_queue_entry() {
    let graph = setup().await;
    let path = graph.walker().trace_render_path("layer_scratch").await.unwrap();

    assert_eq!(path.hops(), 1);
    assert_eq!(path.render_path[1].node.id, "comp_unused");
    assert_eq!(path.render_queue_item, None);
    assert_eq!(path.marker, Some(RenderMarker::NoRenderQueueEntry));
}

// ============================================================================
// 3. Dependencies, effects, expressions
// ============================================================================

#[tokio::test]
async fn test_dependencies_both_directions() {
    let graph = setup().await;
    let walker = graph.walker();

    let bg = walker.walk_dependencies("layer_bg", "outgoing", 3).await.unwrap();
    assert_eq!(bg.direction, Direction::Outgoing);
    assert!(bg.incoming.is_empty());
    assert_eq!(bg.outgoing.len(), 1);
    assert_eq!(bg.outgoing[0].node.id, "footage_bg");
    assert_eq!(bg.outgoing[0].relationship, EdgeType::UsesSource);
    assert_eq!(bg.outgoing[0].depth, 1);

    let title = walker.walk_dependencies("layer_title", "incoming", 3).await.unwrap();
    assert_eq!(title.incoming.len(), 1);
    assert_eq!(title.incoming[0].node.id, "layer_subtitle");
    assert_eq!(title.incoming[0].relationship, EdgeType::ParentsTo);

    let intro = walker.walk_dependencies("comp_intro", "both", 3).await.unwrap();
    assert_eq!(ids(intro.incoming.iter().map(|d| d.node.id.as_str())), vec!["layer_precomp"]);

    let expr = walker.walk_dependencies("expr_opacity", "out", 1).await.unwrap();
    assert_eq!(expr.outgoing[0].node.id, "prop_title_opacity");
    assert_eq!(expr.outgoing[0].relationship, EdgeType::DrivesWithExpression);
}

#[tokio::test]
async fn test_dependencies_rejects_bad_direction() {
    let graph = setup().await;
    let result = graph.walker().walk_dependencies("layer_bg", "sideways", 2).await;
    assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_effects_chain() {
    let graph = setup().await;
    let walker = graph.walker();

    let chain = walker.walk_effects_chain("layer_bg", true).await.unwrap();
    let names: Vec<(&str, i64, bool)> = chain
        .effects
        .iter()
        .map(|e| (e.match_name.as_str(), e.index, e.enabled))
        .collect();
    assert_eq!(names, vec![("ADBE Glo2", 1, true), ("ADBE Gaussian Blur 2", 2, false)]);

    let radius = &chain.effects[0].properties.as_ref().unwrap()[0];
    assert_eq!(radius.node.id, "prop_glow_radius");
    assert_eq!(radius.value, Value::Float(10.0));
    assert_eq!(radius.keyframes, 0);
    assert_eq!(chain.effects[1].properties.as_ref().map(Vec::len), Some(0));

    let bare = walker.walk_effects_chain("layer_bg", false).await.unwrap();
    assert!(bare.effects.iter().all(|e| e.properties.is_none()));

    let none = walker.walk_effects_chain("layer_precomp", true).await.unwrap();
    assert!(none.effects.is_empty());
}

#[tokio::test]
async fn test_expression_dependencies() {
    let graph = setup().await;
    let walker = graph.walker();

    let deps = walker.walk_expression_dependencies("prop_title_opacity").await.unwrap();
    let expr = deps.expression.unwrap();
    assert_eq!(expr.id, "expr_opacity");
    assert_eq!(expr.language, "javascript");
    assert_eq!(expr.unresolved_references, vec!["thisComp.layer(\"Ghost\")".to_string()]);

    let mut refs: Vec<(&str, &str)> = deps
        .references
        .iter()
        .map(|r| (r.target.id.as_str(), r.reference_kind.as_str()))
        .collect();
    refs.sort_unstable();
    assert_eq!(refs, vec![("fx_bg_glow", "effect"), ("layer_shape", "layer")]);

    let plain = walker.walk_expression_dependencies("prop_title_pos").await.unwrap();
    assert!(plain.expression.is_none());
    assert!(plain.references.is_empty());

    assert!(matches!(
        walker.walk_expression_dependencies("layer_title").await,
        Err(QueryError::InvalidArgument(_))
    ));
}

// ============================================================================
// 4. Time
// ============================================================================

#[tokio::test]
async fn test_time_slice_in_composition() {
    let graph = setup().await;
    let slice = graph.walker().walk_time_relationships(5.0, Some("comp_main")).await.unwrap();

    // Out point and in point are both inclusive.
    assert_eq!(
        ids(slice.active_layers.iter().map(|l| l.node.id.as_str())),
        vec!["layer_bg", "layer_subtitle", "layer_title"]
    );
    assert!(slice.active_keyframes.is_empty());

    let mut nearest: Vec<(&str, Option<&str>, bool)> = slice
        .nearest_keyframes
        .iter()
        .map(|n| (n.property.id.as_str(), n.before.as_ref().map(|k| k.id.as_str()), n.after.is_none()))
        .collect();
    nearest.sort_unstable();
    assert_eq!(
        nearest,
        vec![
            ("prop_bg_scale", Some("prop_bg_scale_k4"), true),
            ("prop_title_pos", Some("prop_title_pos_k2"), true),
        ]
    );

    assert_eq!(slice.active_expressions.len(), 1);
    assert_eq!(slice.active_expressions[0].expression.id, "expr_opacity");
    assert_eq!(slice.active_expressions[0].layer.id, "layer_title");
}

#[tokio::test]
async fn test_time_slice_across_project() {
    let graph = setup().await;
    let slice = graph.walker().walk_time_relationships(1.0, None).await.unwrap();

    assert_eq!(
        ids(slice.active_layers.iter().map(|l| l.node.id.as_str())),
        vec!["layer_bg", "layer_precomp", "layer_scratch", "layer_shape", "layer_title"]
    );
    let shape = slice.active_layers.iter().find(|l| l.node.id == "layer_shape").unwrap();
    assert_eq!(shape.composition.as_ref().map(|c| c.id.as_str()), Some("comp_intro"));

    assert_eq!(
        ids(slice.active_keyframes.iter().map(|k| k.keyframe.id.as_str())),
        vec!["prop_bg_scale_k1", "prop_shape_rot_k1", "prop_title_pos_k1"]
    );
}

#[tokio::test]
async fn test_time_slice_rejects_bad_input() {
    let graph = setup().await;
    let walker = graph.walker();
    assert!(matches!(
        walker.walk_time_relationships(f64::NAN, None).await,
        Err(QueryError::InvalidArgument(_))
    ));
    assert!(matches!(
        walker.walk_time_relationships(1.0, Some("layer_title")).await,
        Err(QueryError::InvalidArgument(_))
    ));
}

// ============================================================================
// 5. Similarity walks
// ============================================================================

#[tokio::test]
async fn test_similar_setups_by_structure() {
    let graph = setup().await;
    let walker = graph.walker();

    let similar = walker.find_similar_setups("layer_title", 0.6).await.unwrap();
    let scored: Vec<(&str, f64)> = similar
        .similar_setups
        .iter()
        .map(|s| (s.layer.id.as_str(), (s.similarity * 1000.0).round() / 1000.0))
        .collect();
    assert_eq!(scored, vec![("layer_subtitle", 1.0), ("layer_bg", 0.667)]);
    assert_eq!(similar.similar_setups[0].matching_aspects, vec!["effects", "properties"]);
    assert!(similar.similar_setups.iter().all(|s| s.embedding_score.is_none()));

    // Shape shares only the Transform group.
    let loose = walker.find_similar_setups("layer_title", 0.4).await.unwrap();
    assert_eq!(loose.similar_setups.len(), 3);
    assert_eq!(loose.similar_setups[2].layer.id, "layer_shape");
    assert_eq!(loose.similar_setups[2].matching_aspects, vec!["properties"]);

    assert!(matches!(
        walker.find_similar_setups("layer_title", 1.5).await,
        Err(QueryError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_related_by_name_needs_embedder() {
    let graph = setup().await;
    assert!(matches!(
        graph.walker().walk_related_by_name("Title", None, 5).await,
        Err(QueryError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_related_by_name() {
    let graph = ProjectGraph::open_memory()
        .await
        .unwrap()
        .with_embedder(Arc::new(HashingEmbedder::new(256)));
    let report = graph.ingest(&fixture()).await.unwrap();
    assert!(report.embeddings_generated > 0);

    let walker = graph.walker();
    let related = walker
        .walk_related_by_name("Title", Some(&[NodeType::TextLayer]), 5)
        .await
        .unwrap();
    assert_eq!(related.results.len(), 2);
    assert_eq!(related.results[0].node.id, "layer_title");
    assert!((related.results[0].similarity - 1.0).abs() < 1e-4);
    assert!(related.results[1].similarity < related.results[0].similarity);

    let capped = walker.walk_related_by_name("glow", None, 1).await.unwrap();
    assert_eq!(capped.results.len(), 1);

    assert!(matches!(
        walker.walk_related_by_name("  ", None, 5).await,
        Err(QueryError::InvalidArgument(_))
    ));
    assert!(matches!(
        walker.walk_related_by_name("Title", None, 0).await,
        Err(QueryError::InvalidArgument(_))
    ));
}

// ============================================================================
// 6. Discovery
// ============================================================================

#[tokio::test]
async fn test_unused_elements() {
    let graph = setup().await;
    let unused = graph.walker().discover_unused_elements().await.unwrap();

    let footage: Vec<&str> = unused.unused_footage.iter().map(|e| e.node.id.as_str()).collect();
    assert_eq!(footage, vec!["footage_orphan"]);

    let comps: Vec<&str> = unused.unused_compositions.iter().map(|e| e.node.id.as_str()).collect();
    assert_eq!(comps, vec!["comp_unused"]);
    assert_eq!(unused.unused_compositions[0].reason, "not_in_render_queue");

    assert_eq!(unused.unused_effects.len(), 1);
    assert_eq!(unused.unused_effects[0].node.id, "fx_bg_blur");
    assert_eq!(unused.unused_effects[0].layer.as_ref().map(|l| l.id.as_str()), Some("layer_bg"));

    let orphans: Vec<&str> = unused.orphaned_properties.iter().map(|e| e.node.id.as_str()).collect();
    assert_eq!(orphans, vec!["prop_glow_radius"]);
}

#[tokio::test]
async fn test_graph_summary() {
    let graph = setup().await;
    let summary = graph.walker().graph_summary().await.unwrap();

    assert_eq!(summary.node_counts["Composition"], 3);
    assert_eq!(summary.node_counts["TextLayer"], 2);
    assert_eq!(summary.node_counts["Keyframe"], 13);
    assert_eq!(summary.edge_counts["HAS_KEYFRAME"], 13);
    assert_eq!(summary.edge_counts["RENDERS"], 1);
    assert_eq!(summary.edge_counts["REFERENCES_IN_EXPRESSION"], 2);
    assert!(!summary.node_counts.contains_key("CameraLayer"));
    assert_eq!(summary.total_nodes as usize, summary.node_counts.values().sum::<usize>());
    assert_eq!(summary.total_relationships as usize, summary.edge_counts.values().sum::<usize>());

    let top: Vec<(&str, usize)> = summary
        .top_level_compositions
        .iter()
        .map(|c| (c.node.id.as_str(), c.layers))
        .collect();
    assert_eq!(top, vec![("comp_main", 4), ("comp_unused", 1)]);
}

#[tokio::test]
async fn test_schema_description() {
    let graph = setup().await;
    let schema = graph.walker().schema_description();

    assert!(schema.node_types.contains(&"Composition"));
    assert!(schema.edge_types.contains(&"SIMILAR_NAME"));
    assert_eq!(schema.available_walks.len(), 12);
    assert!(schema.available_walks.contains(&"trace_render_path"));
}

// ============================================================================
// 7. Animation patterns
// ============================================================================

#[tokio::test]
async fn test_animation_patterns_by_type() {
    let graph = setup().await;
    let walker = graph.walker();

    for (query, property, pattern) in [
        ("bounce", "prop_bg_scale", AnimationPattern::Bounce),
        ("ease", "prop_shape_rot", AnimationPattern::Ease),
        ("linear", "prop_title_pos", AnimationPattern::Linear),
    ] {
        let found = walker.find_animation_patterns(query, None).await.unwrap();
        assert_eq!(found.matching_patterns.len(), 1, "{query}");
        assert_eq!(found.matching_patterns[0].property.id, property);
        assert_eq!(found.matching_patterns[0].pattern, pattern);
        assert!((found.matching_patterns[0].confidence - 1.0).abs() < 1e-9);
    }

    let any = walker.find_animation_patterns("any", None).await.unwrap();
    assert_eq!(any.matching_patterns.len(), 3);
}

#[tokio::test]
async fn test_animation_patterns_in_range() {
    let graph = setup().await;
    let walker = graph.walker();

    // Two keys inside [0, 1] on every track: all read as linear.
    let early = walker.find_animation_patterns("linear", Some((0.0, 1.0))).await.unwrap();
    assert_eq!(
        ids(early.matching_patterns.iter().map(|m| m.property.id.as_str())),
        vec!["prop_bg_scale", "prop_shape_rot", "prop_title_pos"]
    );
    assert!(early.matching_patterns.iter().all(|m| m.keyframes == 2));

    assert!(matches!(
        walker.find_animation_patterns("wobble", None).await,
        Err(QueryError::InvalidArgument(_))
    ));
    assert!(matches!(
        walker.find_animation_patterns("any", Some((3.0, 1.0))).await,
        Err(QueryError::InvalidArgument(_))
    ));
}

// ============================================================================
// 8. Cycles
// ============================================================================

/// Two precomps nesting each other: `comp_a` holds `layer_a` sourcing
/// `comp_b`, which holds `layer_b` sourcing `comp_a`. The layers also parent
/// each other.
fn precomp_loop(rendered: bool) -> ProjectDocument {
    let comp_a = item("comp_a", "Composition", "A").with_child(
        layer("layer_a", "AVLayer", "Uses B", 1, (0.0, 2.0))
            .with_property("source_id", "comp_b")
            .with_property("parent_id", "layer_b")
            .with_child(item("pg_a_transform", "PropertyGroup", "Transform")),
    );
    let comp_b = item("comp_b", "Composition", "B").with_child(
        layer("layer_b", "AVLayer", "Uses A", 1, (0.0, 2.0))
            .with_property("source_id", "comp_a")
            .with_property("parent_id", "layer_a"),
    );
    let mut project = item("project", "Project", "Loop").with_child(comp_a).with_child(comp_b);
    if rendered {
        project = project
            .with_child(item("rq_a", "RenderQueueItem", "A Render").with_property("comp_id", "comp_a"));
    }
    ProjectDocument::new(project)
}

async fn loop_graph(rendered: bool) -> ProjectGraph<MemoryBackend> {
    let graph = ProjectGraph::open_memory().await.unwrap();
    let report = graph.ingest(&precomp_loop(rendered)).await.unwrap();
    assert_eq!(report.errors, 0, "{:?}", report.issues);
    graph
}

fn assert_distinct(ids: &[&str]) {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), ids.len(), "revisited a node: {ids:?}");
}

#[tokio::test]
async fn test_walks_terminate_on_precomp_loop() {
    let graph = loop_graph(true).await;
    let walker = graph.walker();

    let h = walker.walk_composition_hierarchy("comp_a", 3).await.unwrap();
    assert_eq!(h.visited_ids(), vec!["layer_a", "pg_a_transform"]);

    let deps = walker.walk_dependencies("layer_a", "both", 8).await.unwrap();
    let outgoing: Vec<&str> = deps.outgoing.iter().map(|d| d.node.id.as_str()).collect();
    let incoming: Vec<&str> = deps.incoming.iter().map(|d| d.node.id.as_str()).collect();
    assert_distinct(&outgoing);
    assert_distinct(&incoming);
    assert_eq!(outgoing, vec!["comp_b"]);
    assert_eq!(incoming, vec!["layer_b"]);

    let path = walker.trace_render_path("layer_b").await.unwrap();
    let steps: Vec<&str> = path.render_path.iter().map(|s| s.node.id.as_str()).collect();
    assert_eq!(steps, vec!["layer_b", "comp_b", "layer_a", "comp_a", "rq_a"]);

    let unused = walker.discover_unused_elements().await.unwrap();
    assert!(unused.unused_compositions.is_empty());
}

#[tokio::test]
async fn test_render_search_ends_on_unrendered_loop() {
    let graph = loop_graph(false).await;
    let walker = graph.walker();

    let path = walker.trace_render_path("layer_a").await.unwrap();
    let steps: Vec<&str> = path.render_path.iter().map(|s| s.node.id.as_str()).collect();
    assert_eq!(steps, vec!["layer_a", "comp_a"]);
    assert_eq!(path.marker, Some(RenderMarker::NoRenderQueueEntry));

    let unused = walker.discover_unused_elements().await.unwrap();
    let comps: Vec<&str> = unused.unused_compositions.iter().map(|e| e.node.id.as_str()).collect();
    assert_eq!(ids(comps), vec!["comp_a", "comp_b"]);
}
