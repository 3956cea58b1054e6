use std::f64::consts::{PI, TAU};

use approx::assert_relative_eq;
use cad_authority::archive::read_archive;
use cad_authority::stl::inspect_binary_stl;
use cad_authority::*;
use profile_synth::{InternalCurve, PlanarCurve};
use replay_types::JointKind;

fn open(name: &str) -> MockAuthority {
    let mut mock = MockAuthority::new();
    mock.new_document(name).unwrap();
    mock
}

/// Sketch on `plane` in `component` holding millimetre curves.
fn sketch(
    mock: &mut MockAuthority,
    component: ComponentId,
    plane: PlaneRef,
    curves: &[PlanarCurve],
) -> SketchId {
    let id = mock.add_sketch(component, plane).unwrap();
    for c in curves {
        mock.add_curve(id, &InternalCurve::from_mm(c), false).unwrap();
    }
    id
}

fn rect(cx: f64, cy: f64, w: f64, h: f64) -> Vec<PlanarCurve> {
    let (x0, x1, y0, y1) = (cx - w / 2.0, cx + w / 2.0, cy - h / 2.0, cy + h / 2.0);
    vec![
        PlanarCurve::line([x0, y0], [x1, y0]),
        PlanarCurve::line([x1, y0], [x1, y1]),
        PlanarCurve::line([x1, y1], [x0, y1]),
        PlanarCurve::line([x0, y1], [x0, y0]),
    ]
}

const XY: PlaneRef = PlaneRef::Principal(PrincipalPlane::XY);

fn block(mock: &mut MockAuthority, component: ComponentId, w: f64, h: f64, depth: f64) -> FeatureId {
    let s = sketch(mock, component, XY, &rect(0.0, 0.0, w, h));
    let profiles = mock.sketch_profiles(s);
    mock.extrude(component, &profiles, depth, FeatureOperation::NewBody)
        .unwrap()
}

// ── Profiles & extrude ──────────────────────────────────────────────────────

#[test]
fn washer_sketch_has_ring_and_disk() {
    let mut mock = open("washer");
    let s = sketch(
        &mut mock,
        ComponentId::ROOT,
        XY,
        &[
            PlanarCurve::circle([0.0, 0.0], 20.0),
            PlanarCurve::circle([0.0, 0.0], 10.0),
        ],
    );
    let profiles = mock.sketch_profiles(s);
    assert_eq!(profiles.len(), 2);
    let ring = mock.profile_area(profiles[0]).unwrap();
    let disk = mock.profile_area(profiles[1]).unwrap();
    assert!(ring > disk);
    assert_relative_eq!(ring + disk, PI * 4.0, epsilon = 0.05);

    // Extruding only the ring yields a body with less than the full disk.
    mock.extrude(ComponentId::ROOT, &profiles[..1], 0.5, FeatureOperation::NewBody)
        .unwrap();
    let body = mock.bodies(ComponentId::ROOT)[0];
    assert_relative_eq!(
        mock.physical_properties(body).unwrap().volume,
        ring * 0.5,
        epsilon = 1e-9
    );
}

#[test]
fn disjoint_profiles_extrude_to_separate_bodies() {
    let mut mock = open("pair");
    let mut curves = rect(-20.0, 0.0, 10.0, 10.0);
    curves.extend(rect(20.0, 0.0, 10.0, 10.0));
    let s = sketch(&mut mock, ComponentId::ROOT, XY, &curves);
    let profiles = mock.sketch_profiles(s);
    mock.extrude(ComponentId::ROOT, &profiles, 1.0, FeatureOperation::NewBody)
        .unwrap();
    assert_eq!(mock.bodies(ComponentId::ROOT).len(), 2);
}

#[test]
fn join_merges_into_touching_body() {
    let mut mock = open("join");
    block(&mut mock, ComponentId::ROOT, 20.0, 20.0, 1.0);
    let plane = mock
        .add_offset_plane(ComponentId::ROOT, PrincipalPlane::XY, 1.0)
        .unwrap();
    let boss = sketch(
        &mut mock,
        ComponentId::ROOT,
        PlaneRef::Construction(plane),
        &[PlanarCurve::circle([0.0, 0.0], 5.0)],
    );
    let profiles = mock.sketch_profiles(boss);
    mock.extrude(ComponentId::ROOT, &profiles, 1.0, FeatureOperation::Join)
        .unwrap();
    let bodies = mock.bodies(ComponentId::ROOT);
    assert_eq!(bodies.len(), 1);
    assert_relative_eq!(mock.bounding_box(bodies[0]).unwrap().max[2], 2.0, epsilon = 1e-9);
}

#[test]
fn cut_with_nothing_to_cut_fails() {
    let mut mock = open("empty-cut");
    let s = sketch(&mut mock, ComponentId::ROOT, XY, &rect(0.0, 0.0, 10.0, 10.0));
    let profiles = mock.sketch_profiles(s);
    let err = mock
        .extrude(ComponentId::ROOT, &profiles, 1.0, FeatureOperation::Cut)
        .unwrap_err();
    assert!(err.to_string().contains("no body intersects the cut"));
}

#[test]
fn missing_profile_is_not_found() {
    let mut mock = open("missing");
    let s = sketch(&mut mock, ComponentId::ROOT, XY, &rect(0.0, 0.0, 10.0, 10.0));
    let err = mock
        .extrude(
            ComponentId::ROOT,
            &[Profile { sketch: s, index: 3 }],
            1.0,
            FeatureOperation::NewBody,
        )
        .unwrap_err();
    assert!(matches!(err, AuthorityError::NotFound { kind: "profile", .. }));
}

// ── Revolve, loft, sweep ────────────────────────────────────────────────────

#[test]
fn bottle_outline_revolves_about_y() {
    let mut mock = open("bottle");
    let outline = profile_synth::synthesize(
        "bottle_profile",
        &serde_json::json!({}),
        &profile_synth::SynthOptions::default(),
    )
    .unwrap();
    let s = sketch(&mut mock, ComponentId::ROOT, XY, &outline);
    let profile = mock.sketch_profiles(s)[0];
    mock.revolve(ComponentId::ROOT, profile, Axis::Y, TAU, FeatureOperation::NewBody)
        .unwrap();
    let body = mock.bodies(ComponentId::ROOT)[0];
    let bb = mock.bounding_box(body).unwrap();
    assert_relative_eq!(bb.extents()[1], 10.0, epsilon = 1e-9);
    assert_relative_eq!(bb.max[0], 2.5, epsilon = 1e-6);
}

#[test]
fn revolve_about_normal_axis_fails() {
    let mut mock = open("bad-revolve");
    let s = sketch(&mut mock, ComponentId::ROOT, XY, &rect(10.0, 10.0, 5.0, 5.0));
    let profile = mock.sketch_profiles(s)[0];
    let err = mock
        .revolve(ComponentId::ROOT, profile, Axis::Z, TAU, FeatureOperation::NewBody)
        .unwrap_err();
    assert!(err.to_string().contains("revolve"));
}

#[test]
fn loft_between_stacked_sketches() {
    let mut mock = open("loft");
    let bottom = sketch(&mut mock, ComponentId::ROOT, XY, &rect(0.0, 0.0, 20.0, 20.0));
    let plane = mock
        .add_offset_plane(ComponentId::ROOT, PrincipalPlane::XY, 3.0)
        .unwrap();
    let top = sketch(
        &mut mock,
        ComponentId::ROOT,
        PlaneRef::Construction(plane),
        &[PlanarCurve::circle([0.0, 0.0], 5.0)],
    );
    let sections = [mock.sketch_profiles(bottom)[0], mock.sketch_profiles(top)[0]];
    mock.loft(ComponentId::ROOT, &sections, true, FeatureOperation::NewBody)
        .unwrap();
    let body = mock.bodies(ComponentId::ROOT)[0];
    let bb = mock.bounding_box(body).unwrap();
    assert_relative_eq!(bb.extents()[2], 3.0, epsilon = 1e-9);
    assert!(mock.physical_properties(body).unwrap().volume > 0.0);

    let err = mock.loft(ComponentId::ROOT, &sections[..1], true, FeatureOperation::NewBody);
    assert!(err.is_err());
}

#[test]
fn sweep_along_a_line_is_a_prism() {
    let mut mock = open("sweep");
    let profile_sketch = sketch(
        &mut mock,
        ComponentId::ROOT,
        PlaneRef::Principal(PrincipalPlane::YZ),
        &[PlanarCurve::circle([0.0, 0.0], 2.0)],
    );
    let path_sketch = sketch(
        &mut mock,
        ComponentId::ROOT,
        XY,
        &[PlanarCurve::line([0.0, 0.0], [50.0, 0.0])],
    );
    let profile = mock.sketch_profiles(profile_sketch)[0];
    let area = mock.profile_area(profile).unwrap();
    let path = mock.sketch_curves(path_sketch);
    mock.sweep(ComponentId::ROOT, profile, &path, FeatureOperation::NewBody)
        .unwrap();
    let body = mock.bodies(ComponentId::ROOT)[0];
    assert_relative_eq!(
        mock.physical_properties(body).unwrap().volume,
        area * 5.0,
        epsilon = 1e-9
    );
}

// ── Patterns & modifiers ────────────────────────────────────────────────────

#[test]
fn circular_pattern_of_pins() {
    let mut mock = open("pins");
    let s = sketch(
        &mut mock,
        ComponentId::ROOT,
        XY,
        &[PlanarCurve::circle([30.0, 0.0], 2.0)],
    );
    let profiles = mock.sketch_profiles(s);
    let pin = mock
        .extrude(ComponentId::ROOT, &profiles, 1.0, FeatureOperation::NewBody)
        .unwrap();
    mock.circular_pattern(ComponentId::ROOT, pin, Axis::Z, 4, TAU)
        .unwrap();
    let bodies = mock.bodies(ComponentId::ROOT);
    assert_eq!(bodies.len(), 4);
    // Second instance sits a quarter turn round, on +Y.
    let bb = mock.bounding_box(bodies[1]).unwrap();
    assert_relative_eq!(bb.center()[0], 0.0, epsilon = 1e-9);
    assert_relative_eq!(bb.center()[1], 3.0, epsilon = 1e-9);
}

#[test]
fn rectangular_pattern_repeats_a_cut() {
    let mut mock = open("slots");
    block(&mut mock, ComponentId::ROOT, 100.0, 20.0, 1.0);
    let body = mock.bodies(ComponentId::ROOT)[0];
    let solid = mock.physical_properties(body).unwrap().volume;

    let s = sketch(
        &mut mock,
        ComponentId::ROOT,
        XY,
        &[PlanarCurve::circle([-30.0, 0.0], 2.0)],
    );
    let profiles = mock.sketch_profiles(s);
    let hole = mock
        .extrude(ComponentId::ROOT, &profiles, 1.0, FeatureOperation::Cut)
        .unwrap();
    let one_hole = mock.physical_properties(body).unwrap().volume;
    mock.rectangular_pattern(ComponentId::ROOT, hole, Axis::X, 3, 2.0)
        .unwrap();
    let three_holes = mock.physical_properties(body).unwrap().volume;

    assert_eq!(mock.bodies(ComponentId::ROOT).len(), 1);
    assert_relative_eq!(solid - three_holes, 3.0 * (solid - one_hole), epsilon = 1e-9);
}

#[test]
fn pattern_count_zero_is_rejected() {
    let mut mock = open("zero");
    let f = block(&mut mock, ComponentId::ROOT, 10.0, 10.0, 1.0);
    assert!(mock.rectangular_pattern(ComponentId::ROOT, f, Axis::X, 0, 1.0).is_err());
}

#[test]
fn pattern_count_above_the_limit_is_rejected() {
    let mut mock = open("many");
    let f = block(&mut mock, ComponentId::ROOT, 1.0, 1.0, 1.0);
    let err = mock
        .circular_pattern(ComponentId::ROOT, f, Axis::Z, u32::MAX, TAU)
        .unwrap_err();
    assert!(matches!(err, AuthorityError::InvalidInput { .. }), "{err:?}");
    assert_eq!(mock.bodies(ComponentId::ROOT).len(), 1);
}

#[test]
fn shell_removes_top_face() {
    let mut mock = open("cup");
    block(&mut mock, ComponentId::ROOT, 40.0, 40.0, 4.0);
    let body = mock.bodies(ComponentId::ROOT)[0];
    let faces = mock.body_faces(body);
    let top = faces
        .iter()
        .max_by(|a, b| a.bbox.center()[2].total_cmp(&b.bbox.center()[2]))
        .unwrap()
        .id;
    let before = mock.physical_properties(body).unwrap().volume;
    mock.shell(ComponentId::ROOT, body, &[top], 0.2).unwrap();
    let after = mock.physical_properties(body).unwrap().volume;
    assert!(after < before);
    assert!(!mock.body_faces(body).iter().any(|f| f.id == top));
}

#[test]
fn fillet_all_edges_of_a_block() {
    let mut mock = open("round");
    block(&mut mock, ComponentId::ROOT, 20.0, 20.0, 1.0);
    let body = mock.bodies(ComponentId::ROOT)[0];
    let edges: Vec<EdgeId> = mock.body_edges(body).iter().map(|e| e.id).collect();
    assert_eq!(edges.len(), 12);
    mock.fillet(ComponentId::ROOT, &edges, 0.1).unwrap();
    assert_eq!(mock.body_edges(body).len(), 24);
    assert!(mock.fillet(ComponentId::ROOT, &[], 0.1).is_err());
}

#[test]
fn combine_join_removes_tools() {
    let mut mock = open("combine");
    block(&mut mock, ComponentId::ROOT, 10.0, 10.0, 1.0);
    let s = sketch(&mut mock, ComponentId::ROOT, XY, &rect(5.0, 0.0, 10.0, 10.0));
    let profiles = mock.sketch_profiles(s);
    mock.extrude(ComponentId::ROOT, &profiles, 1.0, FeatureOperation::NewBody)
        .unwrap();
    let bodies = mock.bodies(ComponentId::ROOT);
    assert_eq!(bodies.len(), 2);
    mock.combine(ComponentId::ROOT, bodies[0], &bodies[1..], CombineOperation::Join, false)
        .unwrap();
    let remaining = mock.bodies(ComponentId::ROOT);
    assert_eq!(remaining, vec![bodies[0]]);
    assert_relative_eq!(mock.bounding_box(bodies[0]).unwrap().extents()[0], 1.5, epsilon = 1e-9);
    assert!(mock
        .combine(ComponentId::ROOT, bodies[0], &[bodies[0]], CombineOperation::Cut, false)
        .is_err());
}

// ── Assemblies ──────────────────────────────────────────────────────────────

#[test]
fn components_transforms_and_joints() {
    let mut mock = open("assembly");
    let base = mock.add_component("Base").unwrap();
    let lid = mock.add_component("Lid").unwrap();
    block(&mut mock, base, 20.0, 20.0, 1.0);
    block(&mut mock, lid, 20.0, 20.0, 1.0);
    mock.set_transform(lid, [0.0, 0.0, 5.0]).unwrap();

    let bodies: Vec<BodyId> = [base, lid]
        .iter()
        .flat_map(|c| mock.bodies(*c))
        .collect();
    assert_eq!(mock.analyze_interference(&bodies).unwrap(), 0);
    assert_relative_eq!(mock.bounding_box(bodies[1]).unwrap().min[2], 5.0);

    mock.add_joint(base, lid, JointKind::Rigid).unwrap();
    assert_eq!(mock.component_transform(lid), [0.0; 3]);
    assert_eq!(mock.analyze_interference(&bodies).unwrap(), 1);
    assert_eq!(mock.joints(), vec![(base, lid, JointKind::Rigid)]);

    assert!(mock.set_transform(ComponentId::ROOT, [1.0, 0.0, 0.0]).is_err());
    assert!(mock.add_joint(base, base, JointKind::Revolute).is_err());
    assert_eq!(mock.component_name(lid).as_deref(), Some("Lid"));
    assert_eq!(mock.components(), vec![ComponentId::ROOT, base, lid]);
}

// ── Export ──────────────────────────────────────────────────────────────────

#[test]
fn stl_export_is_in_millimetres() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("part.stl");
    let mut mock = open("part");
    block(&mut mock, ComponentId::ROOT, 30.0, 20.0, 1.0);
    mock.export(ExportFormat::Stl, &path, MeshRefinement::Medium)
        .unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let (triangles, bbox) = inspect_binary_stl(&bytes).unwrap();
    assert_eq!(triangles, 12 * 4);
    assert_relative_eq!(bbox.extents()[0], 30.0, epsilon = 1e-4);
    assert_relative_eq!(bbox.extents()[2], 10.0, epsilon = 1e-4);
}

#[test]
fn stl_export_without_bodies_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut mock = open("empty");
    let err = mock
        .export(ExportFormat::Stl, &dir.path().join("empty.stl"), MeshRefinement::Medium)
        .unwrap_err();
    assert!(matches!(err, AuthorityError::ExportFailed { .. }));
}

#[test]
fn archive_export_lists_components() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("design.f3d");
    let mut mock = open("design");
    let part = mock.add_component("Part").unwrap();
    block(&mut mock, part, 10.0, 10.0, 1.0);
    mock.export(ExportFormat::Archive, &path, MeshRefinement::Medium)
        .unwrap();

    let archive = read_archive(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(archive.name, "design");
    assert_eq!(archive.components.len(), 2);
    assert_eq!(archive.components[1].name, "Part");
    assert_eq!(archive.components[1].bodies.len(), 1);
}

#[test]
fn close_discards_the_document() {
    let mut mock = open("gone");
    block(&mut mock, ComponentId::ROOT, 10.0, 10.0, 1.0);
    mock.close_document().unwrap();
    assert!(!mock.has_document());
    assert!(mock.bodies(ComponentId::ROOT).is_empty());
    assert!(matches!(mock.close_document(), Err(AuthorityError::NoDocument)));
}
