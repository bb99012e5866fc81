//! Transform, MeshAsset hierarchy and Pose tests
//!
//! Tests for:
//! - Transform TRS construction and matrix round-trips
//! - MeshAssetBuilder validation (attachment, cycles, skins)
//! - Pose world matrix propagation (chains, rotation and scale, depth)
//! - Node traversal order

use std::f32::consts::FRAC_PI_2;

use glam::{Affine3A, Mat4, Quat, Vec3};
use myth_avatar::errors::Error;
use myth_avatar::scene::transform::Transform;
use myth_avatar::scene::visit::walk;
use myth_avatar::scene::{MeshAsset, Pose, SceneNode};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

/// A chain of `length` nodes, each translated by (1, 0, 0) from its parent.
fn create_chain(length: usize) -> MeshAsset {
    let mut builder = MeshAsset::builder("chain");
    let mut parent = None;
    for i in 0..length {
        let node = builder.add_node(format!("n{i}"), Transform::from_translation(Vec3::X));
        if let Some(p) = parent {
            builder.attach(node, p).unwrap();
        }
        parent = Some(node);
    }
    builder.build().unwrap()
}

// ============================================================================
// Transform Unit Tests
// ============================================================================

#[test]
fn transform_default_is_identity() {
    let t = Transform::default();
    assert_eq!(t, Transform::IDENTITY);
    assert_eq!(t.position, Vec3::ZERO);
    assert_eq!(t.rotation, Quat::IDENTITY);
    assert_eq!(t.scale, Vec3::ONE);
    assert_eq!(t.matrix(), Affine3A::IDENTITY);
}

#[test]
fn transform_matrix_reflects_trs() {
    let t = Transform::from_trs(
        Vec3::new(10.0, 20.0, 30.0),
        Quat::IDENTITY,
        Vec3::splat(2.0),
    );

    let mat = t.matrix_as_mat4();
    assert!(vec3_approx(mat.w_axis.truncate(), Vec3::new(10.0, 20.0, 30.0)));
    assert!(vec3_approx(mat.x_axis.truncate(), Vec3::new(2.0, 0.0, 0.0)));
}

#[test]
fn transform_from_matrix_roundtrip() {
    let original = Transform::from_trs(
        Vec3::new(1.0, -2.0, 3.0),
        Quat::from_rotation_y(0.7),
        Vec3::new(1.0, 2.0, 3.0),
    );
    let back = Transform::from_matrix(original.matrix());

    assert!(vec3_approx(back.position, original.position));
    assert!(vec3_approx(back.scale, original.scale));
    assert!(back.rotation.angle_between(original.rotation) < 1e-4);
}

#[test]
fn transform_euler_sets_rotation() {
    let mut t = Transform::new();
    t.set_rotation_euler(0.0, FRAC_PI_2, 0.0);

    let rotated = t.rotation * Vec3::X;
    assert!(vec3_approx(rotated, Vec3::new(0.0, 0.0, -1.0)));
}

#[test]
fn transform_serde_defaults_missing_fields() {
    let t: Transform = serde_json::from_str(r#"{ "position": [1.0, 2.0, 3.0] }"#).unwrap();
    assert_eq!(t.position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(t.rotation, Quat::IDENTITY);
    assert_eq!(t.scale, Vec3::ONE);
}

// ============================================================================
// MeshAssetBuilder
// ============================================================================

#[test]
fn builder_rejects_second_parent() {
    let mut builder = MeshAsset::builder("bad");
    let a = builder.add_node("a", Transform::IDENTITY);
    let b = builder.add_node("b", Transform::IDENTITY);
    let c = builder.add_node("c", Transform::IDENTITY);
    builder.attach(c, a).unwrap();

    assert!(matches!(builder.attach(c, b), Err(Error::AssetDecode { .. })));
    assert!(matches!(builder.attach(a, a), Err(Error::AssetDecode { .. })));
    assert!(matches!(builder.attach(a, 99), Err(Error::AssetDecode { .. })));
}

#[test]
fn builder_rejects_cycles() {
    let mut builder = MeshAsset::builder("cycle");
    let a = builder.add_node("a", Transform::IDENTITY);
    let b = builder.add_node("b", Transform::IDENTITY);
    builder.attach(b, a).unwrap();
    builder.attach(a, b).unwrap();

    assert!(matches!(builder.build(), Err(Error::AssetDecode { .. })));
}

#[test]
fn builder_rejects_unknown_skin_joint() {
    let mut builder = MeshAsset::builder("skin");
    builder.add_node("a", Transform::IDENTITY);
    builder.add_skin("Skeleton", vec![0, 5], None);

    assert!(matches!(builder.build(), Err(Error::AssetDecode { .. })));
}

#[test]
fn joint_parents_skip_non_joint_nodes() {
    let mut builder = MeshAsset::builder("rig");
    let hips = builder.add_node("Hips", Transform::IDENTITY);
    let helper = builder.add_node("Helper", Transform::IDENTITY);
    let spine = builder.add_node("Spine", Transform::IDENTITY);
    builder.attach(helper, hips).unwrap();
    builder.attach(spine, helper).unwrap();
    builder.add_skin("Skeleton", vec![hips, spine], None);
    let asset = builder.build().unwrap();

    let spine_joint = asset.skeleton.find_exact("Spine").unwrap();
    assert_eq!(asset.skeleton.joint(spine_joint).unwrap().parent, Some(0));
    assert_eq!(asset.skeleton.root(), Some(0));
    assert_eq!(asset.skeleton.skins()[0].root_index, 0);
}

// ============================================================================
// Pose: World Matrix Propagation
// ============================================================================

#[test]
fn chain_world_positions() {
    let asset = create_chain(5);
    let pose = Pose::bind(&asset);
    let world = pose.world_matrices(&asset, Affine3A::IDENTITY);

    for (i, m) in world.iter().enumerate() {
        let expected = (i + 1) as f32;
        assert!(
            approx_eq(m.translation.x, expected),
            "node {i}: expected x = {expected}, got {}",
            m.translation.x
        );
    }
}

#[test]
fn root_matrix_applies_to_every_node() {
    let asset = create_chain(3);
    let pose = Pose::bind(&asset);
    let root = Affine3A::from_translation(Vec3::new(0.0, 10.0, 0.0));
    let world = pose.world_matrices(&asset, root);

    assert!(vec3_approx(world[2].translation.into(), Vec3::new(3.0, 10.0, 0.0)));
}

#[test]
fn hierarchy_with_rotation_and_scale() {
    let mut builder = MeshAsset::builder("rs");
    // Parent: translate (5,0,0), rotate 90° around Y, scale 2x
    let parent = builder.add_node(
        "parent",
        Transform::from_trs(
            Vec3::new(5.0, 0.0, 0.0),
            Quat::from_rotation_y(FRAC_PI_2),
            Vec3::splat(2.0),
        ),
    );
    let child = builder.add_node("child", Transform::from_translation(Vec3::X));
    builder.attach(child, parent).unwrap();
    let asset = builder.build().unwrap();

    let world = Pose::bind(&asset).world_matrices(&asset, Affine3A::IDENTITY);

    // (1,0,0) -> rotate 90° Y -> (0,0,-1) -> scale 2 -> (0,0,-2) -> +(5,0,0)
    let child_world = world[child].translation;
    assert!(approx_eq(child_world.x, 5.0), "child world x: got {}", child_world.x);
    assert!(approx_eq(child_world.z, -2.0), "child world z: got {}", child_world.z);
}

#[test]
fn pose_edits_do_not_touch_asset() {
    let asset = create_chain(2);
    let mut pose = Pose::bind(&asset);

    pose.local_mut(0).unwrap().position = Vec3::new(0.0, 5.0, 0.0);
    let world = pose.world_matrices(&asset, Affine3A::IDENTITY);
    assert!(vec3_approx(world[1].translation.into(), Vec3::new(1.0, 5.0, 0.0)));
    assert_eq!(asset.nodes[0].transform.position, Vec3::X);

    pose.reset(&asset);
    assert_eq!(pose, Pose::bind(&asset));
}

#[test]
fn identity_hierarchy_produces_identity_world() {
    let mut builder = MeshAsset::builder("identity");
    let root = builder.add_node("root", Transform::IDENTITY);
    let child = builder.add_node("child", Transform::IDENTITY);
    builder.attach(child, root).unwrap();
    let asset = builder.build().unwrap();

    let world = Pose::bind(&asset).world_matrices(&asset, Affine3A::IDENTITY);
    assert_eq!(Mat4::from(world[child]), Mat4::IDENTITY);
}

#[test]
fn deeply_nested_hierarchy_no_stack_overflow() {
    let depth = 500;
    let asset = create_chain(depth);

    let world = Pose::bind(&asset).world_matrices(&asset, Affine3A::IDENTITY);

    let expected = depth as f32;
    let last = world[depth - 1].translation.x;
    assert!(approx_eq(last, expected), "expected {expected}, got {last}");
}

// ============================================================================
// Traversal
// ============================================================================

#[test]
fn walk_visits_parents_before_children() {
    let mut builder = MeshAsset::builder("tree");
    let root = builder.add_node("root", Transform::IDENTITY);
    let left = builder.add_node("left", Transform::IDENTITY);
    let right = builder.add_node("right", Transform::IDENTITY);
    let leaf = builder.add_node("leaf", Transform::IDENTITY);
    builder.attach(left, root).unwrap();
    builder.attach(right, root).unwrap();
    builder.attach(leaf, left).unwrap();
    let asset = builder.build().unwrap();

    let mut order = Vec::new();
    walk(&asset, &mut |_: usize, node: &SceneNode| order.push(node.name.clone()));
    assert_eq!(order, vec!["root", "left", "leaf", "right"]);
}
