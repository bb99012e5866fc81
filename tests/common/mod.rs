//! Shared fixtures: in-code skeletons and clips, glTF / binary-FBX writers
//! and an in-memory asset reader whose reads can be held back.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use base64::Engine as _;
use glam::{Quat, Vec3};
use parking_lot::Mutex;
use tokio::sync::Notify;

use myth_avatar::animation::{
    InterpolationMode, KeyframeTrack, MotionClip, TargetPath, Track, TrackData, TrackMeta,
};
use myth_avatar::assets::AssetReader;
use myth_avatar::errors::{Error, Result};
use myth_avatar::scene::{MaterialDesc, MeshAsset, MeshPart, MeshPrimitive, Transform};

pub const EPSILON: f32 = 1e-5;

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

pub fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

// ============================================================================
// In-code assets
// ============================================================================

/// A skinned mesh: `Armature` root, the joints as a chain below it (each
/// offset by +1 on Y), and a `Body` mesh node skinned to every joint.
pub fn skinned_mesh(name: &str, joints: &[&str]) -> MeshAsset {
    let mut builder = MeshAsset::builder(name);
    let armature = builder.add_node("Armature", Transform::IDENTITY);

    let mut parent = armature;
    let mut joint_nodes = Vec::with_capacity(joints.len());
    for joint in joints {
        let node = builder.add_node(*joint, Transform::from_translation(Vec3::Y));
        builder.attach(node, parent).unwrap();
        joint_nodes.push(node);
        parent = node;
    }

    let body = builder.add_node("Body", Transform::IDENTITY);
    builder.attach(body, armature).unwrap();
    builder
        .set_mesh(
            body,
            MeshPart {
                mesh_name: Some("BodyMesh".to_string()),
                primitives: vec![MeshPrimitive {
                    material: MaterialDesc {
                        name: Some("Skin".to_string()),
                        ..MaterialDesc::default()
                    },
                    vertex_count: 24,
                    index_count: Some(36),
                }],
                skin: Some(0),
            },
        )
        .unwrap();
    builder.add_skin("Skeleton", joint_nodes, None);
    builder.build().unwrap()
}

/// One linear translation track per joint, from the origin at t = 0 to
/// `(i + 1, 0, 0)` at `duration`.
pub fn translation_clip(name: &str, joints: &[&str], duration: f32) -> MotionClip {
    let tracks = joints
        .iter()
        .enumerate()
        .map(|(i, joint)| Track {
            meta: TrackMeta {
                joint_name: (*joint).to_string(),
                target: TargetPath::Translation,
            },
            data: TrackData::Vector3(KeyframeTrack::new(
                vec![0.0, duration],
                vec![Vec3::ZERO, Vec3::X * (i as f32 + 1.0)],
                InterpolationMode::Linear,
            )),
        })
        .collect();
    MotionClip::new(name, tracks)
}

/// A rotation track about Y from 0 to `radians` over `duration`.
pub fn rotation_track(joint: &str, duration: f32, radians: f32) -> Track {
    Track {
        meta: TrackMeta {
            joint_name: joint.to_string(),
            target: TargetPath::Rotation,
        },
        data: TrackData::Quaternion(KeyframeTrack::new(
            vec![0.0, duration],
            vec![Quat::IDENTITY, Quat::from_rotation_y(radians)],
            InterpolationMode::Linear,
        )),
    }
}

// ============================================================================
// glTF writers
// ============================================================================

/// Node list shared by the glTF fixtures: `Armature` at index 0, joints at
/// 1..=n chained below it, `Body` last.
fn gltf_nodes(joints: &[&str], with_mesh: bool) -> Vec<serde_json::Value> {
    let n = joints.len();
    let mut nodes = Vec::with_capacity(n + 2);
    let mut root_children = vec![serde_json::json!(1)];
    if with_mesh {
        root_children.push(serde_json::json!(n + 1));
    }
    nodes.push(serde_json::json!({ "name": "Armature", "children": root_children }));
    for (i, joint) in joints.iter().enumerate() {
        let mut node = serde_json::json!({ "name": joint, "translation": [0.0, 1.0, 0.0] });
        if i + 1 < n {
            node["children"] = serde_json::json!([i + 2]);
        }
        nodes.push(node);
    }
    if with_mesh {
        nodes.push(serde_json::json!({ "name": "Body", "mesh": 0, "skin": 0 }));
    }
    nodes
}

/// A skinned glTF (JSON) with no buffers: accessors only declare counts and
/// the skin has no inverse bind matrices.
pub fn gltf_mesh_json(joints: &[&str]) -> String {
    let joint_indices: Vec<usize> = (1..=joints.len()).collect();
    serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": gltf_nodes(joints, true),
        "meshes": [{
            "name": "BodyMesh",
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
        }],
        "materials": [{
            "name": "Skin",
            "pbrMetallicRoughness": { "baseColorFactor": [0.8, 0.6, 0.5, 1.0] }
        }],
        "accessors": [
            { "componentType": 5126, "count": 24, "type": "VEC3" },
            { "componentType": 5123, "count": 36, "type": "SCALAR" }
        ],
        "skins": [{ "name": "Skeleton", "joints": joint_indices }]
    })
    .to_string()
}

/// Binary payload and glTF JSON (minus buffers) of a clip translating every
/// joint along X: keys at 0, 0.5 and 1.0 s, joint `i` reaching `i + 1`.
fn gltf_clip_parts(joints: &[&str]) -> (serde_json::Value, Vec<u8>) {
    let times = [0.0f32, 0.5, 1.0];
    let mut bin = Vec::new();
    for t in times {
        bin.extend_from_slice(&t.to_le_bytes());
    }

    let mut views = vec![serde_json::json!({ "buffer": 0, "byteOffset": 0, "byteLength": 12 })];
    let mut accessors = vec![serde_json::json!({
        "bufferView": 0, "componentType": 5126, "count": 3, "type": "SCALAR",
        "min": [0.0], "max": [1.0]
    })];
    let mut channels = Vec::new();
    let mut samplers = Vec::new();

    for (i, _) in joints.iter().enumerate() {
        let offset = bin.len();
        let end = i as f32 + 1.0;
        for x in [0.0f32, end * 0.5, end] {
            for v in [x, 0.0, 0.0] {
                bin.extend_from_slice(&v.to_le_bytes());
            }
        }
        views.push(serde_json::json!({ "buffer": 0, "byteOffset": offset, "byteLength": 36 }));
        accessors.push(serde_json::json!({
            "bufferView": i + 1, "componentType": 5126, "count": 3, "type": "VEC3"
        }));
        samplers.push(serde_json::json!({ "input": 0, "output": i + 1, "interpolation": "LINEAR" }));
        channels.push(serde_json::json!({ "sampler": i, "target": { "node": i + 1, "path": "translation" } }));
    }

    let doc = serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": gltf_nodes(joints, false),
        "bufferViews": views,
        "accessors": accessors,
        "animations": [{ "name": "Walk", "channels": channels, "samplers": samplers }]
    });
    (doc, bin)
}

/// glTF JSON clip with its buffer embedded as a base64 `data:` URI.
pub fn gltf_clip_json(joints: &[&str]) -> String {
    let (mut doc, bin) = gltf_clip_parts(joints);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bin);
    doc["buffers"] = serde_json::json!([{
        "byteLength": bin.len(),
        "uri": format!("data:application/octet-stream;base64,{encoded}")
    }]);
    doc.to_string()
}

/// The same clip packed as GLB.
pub fn glb_clip(joints: &[&str]) -> Vec<u8> {
    let (mut doc, bin) = gltf_clip_parts(joints);
    doc["buffers"] = serde_json::json!([{ "byteLength": bin.len() }]);
    glb(&doc.to_string(), &bin)
}

/// Packs JSON and a binary chunk into a GLB container.
pub fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin);
    out
}

// ============================================================================
// Binary FBX writer
// ============================================================================

pub const FBX_TICKS_PER_SECOND: f64 = 46_186_158_000.0;

#[derive(Debug, Clone)]
pub enum FbxProp {
    Int(i32),
    Long(i64),
    Double(f64),
    Str(String),
    Longs(Vec<i64>),
    Floats(Vec<f32>),
}

#[derive(Debug, Clone)]
pub struct FbxRecord {
    pub name: String,
    pub props: Vec<FbxProp>,
    pub children: Vec<FbxRecord>,
}

impl FbxRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            props: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(mut self, prop: FbxProp) -> Self {
        self.props.push(prop);
        self
    }

    pub fn child(mut self, child: FbxRecord) -> Self {
        self.children.push(child);
        self
    }
}

/// A `Properties70` `P` entry.
pub fn p70(name: &str, kind: &str, values: &[f64]) -> FbxRecord {
    let mut p = FbxRecord::new("P")
        .prop(FbxProp::Str(name.to_string()))
        .prop(FbxProp::Str(kind.to_string()))
        .prop(FbxProp::Str(String::new()))
        .prop(FbxProp::Str("A".to_string()));
    for v in values {
        p = p.prop(FbxProp::Double(*v));
    }
    p
}

fn p70_int(name: &str, value: i32) -> FbxRecord {
    FbxRecord::new("P")
        .prop(FbxProp::Str(name.to_string()))
        .prop(FbxProp::Str("enum".to_string()))
        .prop(FbxProp::Str(String::new()))
        .prop(FbxProp::Str(String::new()))
        .prop(FbxProp::Int(value))
}

fn write_array<T: Copy>(
    out: &mut Vec<u8>,
    code: u8,
    values: &[T],
    to_bytes: fn(T) -> Vec<u8>,
    compress: bool,
) {
    let raw: Vec<u8> = values.iter().flat_map(|v| to_bytes(*v)).collect();
    out.push(code);
    out.extend_from_slice(&(values.len() as u32).to_le_bytes());
    if compress {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&raw).unwrap();
        let packed = encoder.finish().unwrap();
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&(packed.len() as u32).to_le_bytes());
        out.extend_from_slice(&packed);
    } else {
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(raw.len() as u32).to_le_bytes());
        out.extend_from_slice(&raw);
    }
}

fn write_prop(out: &mut Vec<u8>, prop: &FbxProp, compress: bool) {
    match prop {
        FbxProp::Int(v) => {
            out.push(b'I');
            out.extend_from_slice(&v.to_le_bytes());
        }
        FbxProp::Long(v) => {
            out.push(b'L');
            out.extend_from_slice(&v.to_le_bytes());
        }
        FbxProp::Double(v) => {
            out.push(b'D');
            out.extend_from_slice(&v.to_le_bytes());
        }
        FbxProp::Str(s) => {
            out.push(b'S');
            out.extend_from_slice(&(s.len() as u32).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        FbxProp::Longs(v) => write_array(out, b'l', v, |x| x.to_le_bytes().to_vec(), compress),
        FbxProp::Floats(v) => write_array(out, b'f', v, |x| x.to_le_bytes().to_vec(), compress),
    }
}

fn write_offset(out: &mut [u8], at: usize, value: usize, wide: bool) {
    if wide {
        out[at..at + 8].copy_from_slice(&(value as u64).to_le_bytes());
    } else {
        out[at..at + 4].copy_from_slice(&(value as u32).to_le_bytes());
    }
}

fn write_record(out: &mut Vec<u8>, record: &FbxRecord, wide: bool, compress: bool) {
    let word = if wide { 8 } else { 4 };
    let start = out.len();
    out.resize(start + 3 * word, 0);
    out.push(record.name.len() as u8);
    out.extend_from_slice(record.name.as_bytes());

    let props_start = out.len();
    for prop in &record.props {
        write_prop(out, prop, compress);
    }
    let props_len = out.len() - props_start;

    if !record.children.is_empty() {
        for child in &record.children {
            write_record(out, child, wide, compress);
        }
        out.resize(out.len() + 3 * word + 1, 0);
    }

    let end = out.len();
    write_offset(out, start, end, wide);
    write_offset(out, start + word, record.props.len(), wide);
    write_offset(out, start + 2 * word, props_len, wide);
}

/// Serialises `roots` as a binary FBX file of `version`.
pub fn fbx_bytes(version: u32, roots: &[FbxRecord], compress_arrays: bool) -> Vec<u8> {
    let wide = version >= 7500;
    let mut out = b"Kaydara FBX Binary  \0".to_vec();
    out.extend_from_slice(&[0x1a, 0x00]);
    out.extend_from_slice(&version.to_le_bytes());
    for root in roots {
        write_record(&mut out, root, wide, compress_arrays);
    }
    let word = if wide { 8 } else { 4 };
    out.resize(out.len() + 3 * word + 1, 0);
    out
}

/// Axis keys of one animation curve: times in seconds and values.
pub type AxisKeys<'a> = (&'a [f64], &'a [f32]);

/// Builds the `Objects` / `Connections` layout of an FBX animation. Curve
/// nodes hang off the layer of the most recently started take.
pub struct FbxAnimation {
    version: u32,
    compress: bool,
    next_id: i64,
    layer: i64,
    objects: Vec<FbxRecord>,
    connections: Vec<FbxRecord>,
}

impl FbxAnimation {
    pub fn new(version: u32) -> Self {
        let mut anim = Self {
            version,
            compress: false,
            next_id: 1000,
            layer: 0,
            objects: Vec::new(),
            connections: Vec::new(),
        };
        anim.take("Take 001");
        anim
    }

    /// Starts another `AnimationStack` with one `AnimationLayer`; later
    /// channels belong to it.
    pub fn take(&mut self, name: &str) {
        let stack = self.id();
        self.objects.push(
            FbxRecord::new("AnimationStack")
                .prop(FbxProp::Long(stack))
                .prop(FbxProp::Str(format!("{name}\u{0}\u{1}AnimStack")))
                .prop(FbxProp::Str(String::new())),
        );
        let layer = self.id();
        self.objects.push(
            FbxRecord::new("AnimationLayer")
                .prop(FbxProp::Long(layer))
                .prop(FbxProp::Str("BaseLayer\u{0}\u{1}AnimLayer".to_string()))
                .prop(FbxProp::Str(String::new())),
        );
        self.link(layer, stack);
        self.layer = layer;
    }

    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }

    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn connect(&mut self, child: i64, parent: i64, property: &str) {
        self.connections.push(
            FbxRecord::new("C")
                .prop(FbxProp::Str("OP".to_string()))
                .prop(FbxProp::Long(child))
                .prop(FbxProp::Long(parent))
                .prop(FbxProp::Str(property.to_string())),
        );
    }

    fn link(&mut self, child: i64, parent: i64) {
        self.connections.push(
            FbxRecord::new("C")
                .prop(FbxProp::Str("OO".to_string()))
                .prop(FbxProp::Long(child))
                .prop(FbxProp::Long(parent)),
        );
    }

    /// A `LimbNode` model with optional static properties.
    pub fn model(&mut self, name: &str, props: Vec<FbxRecord>) -> i64 {
        let id = self.id();
        let mut p70s = FbxRecord::new("Properties70");
        p70s.children = props;
        self.objects.push(
            FbxRecord::new("Model")
                .prop(FbxProp::Long(id))
                .prop(FbxProp::Str(format!("{name}\u{0}\u{1}Model")))
                .prop(FbxProp::Str("LimbNode".to_string()))
                .child(p70s),
        );
        id
    }

    pub fn model_with_order(&mut self, name: &str, rotation_order: i32) -> i64 {
        self.model(name, vec![p70_int("RotationOrder", rotation_order)])
    }

    /// Animates `property` ("Lcl Translation", "Lcl Rotation" or
    /// "Lcl Scaling") of `model`.
    pub fn channel(
        &mut self,
        model: i64,
        property: &str,
        defaults: Option<[f64; 3]>,
        axes: [Option<AxisKeys<'_>>; 3],
    ) {
        let node = self.id();
        let short = match property {
            "Lcl Translation" => "T",
            "Lcl Rotation" => "R",
            _ => "S",
        };
        let mut record = FbxRecord::new("AnimationCurveNode")
            .prop(FbxProp::Long(node))
            .prop(FbxProp::Str(format!("{short}\u{0}\u{1}AnimCurveNode")))
            .prop(FbxProp::Str(String::new()));
        if let Some([x, y, z]) = defaults {
            record = record.child(
                FbxRecord::new("Properties70")
                    .child(p70("d|X", "Number", &[x]))
                    .child(p70("d|Y", "Number", &[y]))
                    .child(p70("d|Z", "Number", &[z])),
            );
        }
        self.objects.push(record);
        let layer = self.layer;
        self.link(node, layer);
        self.connect(node, model, property);

        for (axis, keys) in axes.iter().enumerate() {
            let Some((times, values)) = keys else {
                continue;
            };
            let curve = self.id();
            let ticks = times
                .iter()
                .map(|t| (t * FBX_TICKS_PER_SECOND).round() as i64)
                .collect();
            self.objects.push(
                FbxRecord::new("AnimationCurve")
                    .prop(FbxProp::Long(curve))
                    .prop(FbxProp::Str("\u{0}\u{1}AnimCurve".to_string()))
                    .prop(FbxProp::Str(String::new()))
                    .child(FbxRecord::new("Default").prop(FbxProp::Double(0.0)))
                    .child(FbxRecord::new("KeyTime").prop(FbxProp::Longs(ticks)))
                    .child(FbxRecord::new("KeyValueFloat").prop(FbxProp::Floats(values.to_vec()))),
            );
            let axis_name = ["d|X", "d|Y", "d|Z"][axis];
            self.connect(curve, node, axis_name);
        }
    }

    pub fn finish(self) -> Vec<u8> {
        let header = FbxRecord::new("FBXHeaderExtension")
            .child(FbxRecord::new("FBXVersion").prop(FbxProp::Int(self.version as i32)));
        let mut objects = FbxRecord::new("Objects");
        objects.children = self.objects;
        let mut connections = FbxRecord::new("Connections");
        connections.children = self.connections;
        fbx_bytes(self.version, &[header, objects, connections], self.compress)
    }
}

/// Mixamo-style motion: each joint translates along X with keys at 0, 0.5
/// and 1.0 s (joint `i` reaching `i + 1`); Y and Z come from the curve node
/// defaults.
pub fn fbx_motion(joints: &[&str], version: u32) -> Vec<u8> {
    let mut anim = FbxAnimation::new(version);
    let times = [0.0, 0.5, 1.0];
    for (i, joint) in joints.iter().enumerate() {
        let model = anim.model(joint, Vec::new());
        let end = i as f32 + 1.0;
        let values = [0.0, end * 0.5, end];
        anim.channel(
            model,
            "Lcl Translation",
            Some([0.0, 1.0, 0.0]),
            [Some((&times[..], &values[..])), None, None],
        );
    }
    anim.finish()
}

// ============================================================================
// In-memory reader
// ============================================================================

/// Serves byte blobs by exact uri, counts reads, and can hold reads of a
/// uri until its gate is notified.
#[derive(Default)]
pub struct MemoryReader {
    files: Mutex<HashMap<String, Vec<u8>>>,
    reads: Mutex<HashMap<String, usize>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, uri: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(uri, bytes);
        self
    }

    pub fn insert(&self, uri: &str, bytes: impl Into<Vec<u8>>) {
        self.files.lock().insert(uri.to_string(), bytes.into());
    }

    pub fn reads(&self, uri: &str) -> usize {
        self.reads.lock().get(uri).copied().unwrap_or(0)
    }

    /// From now on, each read of `uri` waits for one `notify_one` on the
    /// returned gate.
    pub fn gate(&self, uri: &str) -> Arc<Notify> {
        self.gates
            .lock()
            .entry(uri.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }
}

impl AssetReader for MemoryReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        *self.reads.lock().entry(uri.to_string()).or_insert(0) += 1;

        let gate = self.gates.lock().get(uri).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.files
            .lock()
            .get(uri)
            .cloned()
            .ok_or_else(|| Error::AssetNotFound(uri.to_string()))
    }
}

/// Waits (cooperatively) until `uri` has been read `count` times.
pub async fn wait_for_reads(reader: &MemoryReader, uri: &str, count: usize) {
    while reader.reads(uri) < count {
        tokio::task::yield_now().await;
    }
}
