//! Binary FBX decoding.
//!
//! Two stages: [`FbxDocument::parse`] reads the generic node-record tree,
//! then [`load_clip`] walks `Objects` and `Connections` to rebuild the
//! animation curves of every model as keyframe tracks. Only curve nodes
//! reachable from the first animation stack are kept; other takes are
//! ignored and layers are not blended.
//!
//! Record layout (little endian):
//!
//! ```text
//! header:  "Kaydara FBX Binary  \0" 0x1A 0x00 <u32 version>
//! record:  <end offset> <property count> <property bytes> <u8 name len> <name>
//!          <properties...> <child records...> [null record]
//! ```
//!
//! Offsets and counts are `u32` before version 7500 and `u64` from it on.

use std::borrow::Cow;
use std::io::Read;

use flate2::read::ZlibDecoder;
use glam::{EulerRot, Quat, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::animation::{InterpolationMode, KeyframeTrack, MotionClip, TargetPath, Track, TrackData, TrackMeta};
use crate::errors::{Error, Result};

pub const BINARY_MAGIC: &[u8] = b"Kaydara FBX Binary  \0";

/// FBX time units per second.
pub const KTIME_PER_SECOND: f64 = 46_186_158_000.0;

const HEADER_LEN: usize = 27;
const MAX_DEPTH: usize = 64;
/// Upper bound of the deflate expansion ratio.
const MAX_INFLATE_RATIO: usize = 1032;

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Raw(Vec<u8>),
    BoolArray(Vec<bool>),
    I32Array(Vec<i32>),
    I64Array(Vec<i64>),
    F32Array(Vec<f32>),
    F64Array(Vec<f64>),
}

impl Property {
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I16(v) => Some(i64::from(v)),
            Self::I32(v) => Some(i64::from(v)),
            Self::I64(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F32(v) => Some(f64::from(v)),
            Self::F64(v) => Some(v),
            Self::I16(v) => Some(f64::from(v)),
            Self::I32(v) => Some(f64::from(v)),
            Self::I64(v) => Some(v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_f32_vec(&self) -> Option<Vec<f32>> {
        match self {
            Self::F32Array(v) => Some(v.clone()),
            Self::F64Array(v) => Some(v.iter().map(|&x| x as f32).collect()),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        match self {
            Self::I64Array(v) => Some(v.clone()),
            Self::I32Array(v) => Some(v.iter().map(|&x| i64::from(x)).collect()),
            _ => None,
        }
    }
}

/// One record of the document tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FbxNode {
    pub name: String,
    pub properties: Vec<Property>,
    pub children: Vec<FbxNode>,
}

impl FbxNode {
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&FbxNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s FbxNode> + 's {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn property(&self, index: usize) -> Option<&Property> {
        self.properties.get(index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FbxDocument {
    pub version: u32,
    pub roots: Vec<FbxNode>,
}

impl FbxDocument {
    /// Parses a binary FBX file. ASCII FBX is rejected.
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, String> {
        if bytes.starts_with(b"; FBX") {
            return Err("ASCII FBX is not supported, export as binary".to_string());
        }
        if bytes.len() < HEADER_LEN || !bytes.starts_with(BINARY_MAGIC) {
            return Err("not a binary FBX file".to_string());
        }

        let mut reader = ByteReader {
            data: bytes,
            pos: BINARY_MAGIC.len() + 2,
        };
        let version = reader.u32()?;
        let wide = version >= 7500;

        let mut roots = Vec::new();
        while reader.remaining() >= record_header_len(wide) {
            match read_record(&mut reader, wide, 0)? {
                Some(node) => roots.push(node),
                None => break,
            }
        }

        Ok(Self { version, roots })
    }

    #[must_use]
    pub fn root(&self, name: &str) -> Option<&FbxNode> {
        self.roots.iter().find(|n| n.name == name)
    }
}

const fn record_header_len(wide: bool) -> usize {
    if wide { 25 } else { 13 }
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize) -> std::result::Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| format!("unexpected end of file at offset {}", self.pos))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> std::result::Result<[u8; N], String> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> std::result::Result<u8, String> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> std::result::Result<u32, String> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> std::result::Result<u64, String> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn offset(&mut self, wide: bool) -> std::result::Result<u64, String> {
        if wide { self.u64() } else { self.u32().map(u64::from) }
    }

    fn len_u32(&mut self) -> std::result::Result<usize, String> {
        usize::try_from(self.u32()?).map_err(|e| e.to_string())
    }
}

fn read_record(
    r: &mut ByteReader<'_>,
    wide: bool,
    depth: usize,
) -> std::result::Result<Option<FbxNode>, String> {
    if depth > MAX_DEPTH {
        return Err("record nesting too deep".to_string());
    }

    let end = r.offset(wide)?;
    let property_count = r.offset(wide)?;
    let _property_bytes = r.offset(wide)?;
    let name_len = r.u8()?;

    if end == 0 {
        return Ok(None);
    }

    let end = usize::try_from(end).map_err(|e| e.to_string())?;
    if end > r.data.len() || end < r.pos {
        return Err(format!("record end offset {end} out of range"));
    }

    let name = String::from_utf8_lossy(r.take(usize::from(name_len))?).into_owned();

    let mut properties = Vec::new();
    for _ in 0..property_count {
        properties.push(read_property(r)?);
    }

    let mut children = Vec::new();
    while r.pos < end {
        match read_record(r, wide, depth + 1)? {
            Some(child) => children.push(child),
            None => break,
        }
    }
    if r.pos > end {
        return Err(format!("record '{name}' overruns its end offset"));
    }
    r.pos = end;

    Ok(Some(FbxNode {
        name,
        properties,
        children,
    }))
}

fn read_property(r: &mut ByteReader<'_>) -> std::result::Result<Property, String> {
    let code = r.u8()?;
    Ok(match code {
        b'Y' => Property::I16(i16::from_le_bytes(r.array()?)),
        b'C' => Property::Bool(r.u8()? != 0),
        b'I' => Property::I32(i32::from_le_bytes(r.array()?)),
        b'F' => Property::F32(f32::from_le_bytes(r.array()?)),
        b'D' => Property::F64(f64::from_le_bytes(r.array()?)),
        b'L' => Property::I64(i64::from_le_bytes(r.array()?)),
        b'f' => Property::F32Array(read_array(r, 4, |c| {
            f32::from_le_bytes([c[0], c[1], c[2], c[3]])
        })?),
        b'd' => Property::F64Array(read_array(r, 8, |c| {
            f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
        })?),
        b'l' => Property::I64Array(read_array(r, 8, |c| {
            i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
        })?),
        b'i' => Property::I32Array(read_array(r, 4, |c| {
            i32::from_le_bytes([c[0], c[1], c[2], c[3]])
        })?),
        b'b' => Property::BoolArray(read_array(r, 1, |c| c[0] != 0)?),
        b'S' => {
            let len = r.len_u32()?;
            Property::String(String::from_utf8_lossy(r.take(len)?).into_owned())
        }
        b'R' => {
            let len = r.len_u32()?;
            Property::Raw(r.take(len)?.to_vec())
        }
        other => return Err(format!("unknown property type 0x{other:02x}")),
    })
}

fn read_array<T>(
    r: &mut ByteReader<'_>,
    elem_size: usize,
    convert: fn(&[u8]) -> T,
) -> std::result::Result<Vec<T>, String> {
    let count = r.len_u32()?;
    let encoding = r.u32()?;
    let stored_len = r.len_u32()?;
    let raw = r.take(stored_len)?;

    let expected = count
        .checked_mul(elem_size)
        .ok_or_else(|| "array length overflow".to_string())?;

    let data: Cow<'_, [u8]> = match encoding {
        0 => Cow::Borrowed(raw),
        1 => {
            if expected > raw.len().saturating_mul(MAX_INFLATE_RATIO) {
                return Err(format!(
                    "compressed array declares {expected} bytes from {} stored",
                    raw.len()
                ));
            }
            let mut out = Vec::with_capacity(expected.min(1 << 24));
            ZlibDecoder::new(raw)
                .take(expected as u64)
                .read_to_end(&mut out)
                .map_err(|e| format!("corrupt compressed array: {e}"))?;
            Cow::Owned(out)
        }
        other => return Err(format!("unknown array encoding {other}")),
    };

    if data.len() < expected {
        return Err(format!(
            "array holds {} bytes, {expected} declared",
            data.len()
        ));
    }

    Ok(data[..expected].chunks_exact(elem_size).map(convert).collect())
}

// ============================================================================
// Animation extraction
// ============================================================================

/// `"mixamorig:Hips\0\x01Model"` / `"Model::mixamorig:Hips"` -> `"mixamorig:Hips"`.
fn object_name(raw: &str) -> String {
    let name = raw.split("\u{0}\u{1}").next().unwrap_or(raw);
    let name = name.split_once("::").map_or(name, |(_, rest)| rest);
    name.to_string()
}

/// Reads `Properties70` entries: `P: name, type, label, flags, values...`.
fn properties70(node: &FbxNode) -> FxHashMap<&str, &[Property]> {
    let mut map = FxHashMap::default();
    let Some(props) = node.child("Properties70") else {
        return map;
    };
    for p in props.children_named("P") {
        if let Some(name) = p.property(0).and_then(Property::as_str) {
            map.insert(name, p.properties.get(4..).unwrap_or_default());
        }
    }
    map
}

fn vec3_of(values: &[Property]) -> Option<Vec3> {
    match values {
        [x, y, z, ..] => Some(Vec3::new(
            x.as_f64()? as f32,
            y.as_f64()? as f32,
            z.as_f64()? as f32,
        )),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct ModelTransform {
    translation: Vec3,
    rotation: Vec3,
    scaling: Vec3,
    pre_rotation: Vec3,
    post_rotation: Vec3,
    rotation_order: i64,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scaling: Vec3::ONE,
            pre_rotation: Vec3::ZERO,
            post_rotation: Vec3::ZERO,
            rotation_order: 0,
        }
    }
}

impl ModelTransform {
    fn read(node: &FbxNode) -> Self {
        let props = properties70(node);
        let mut out = Self::default();
        let vec = |key: &str| props.get(key).and_then(|v| vec3_of(v));
        if let Some(v) = vec("Lcl Translation") {
            out.translation = v;
        }
        if let Some(v) = vec("Lcl Rotation") {
            out.rotation = v;
        }
        if let Some(v) = vec("Lcl Scaling") {
            out.scaling = v;
        }
        if let Some(v) = vec("PreRotation") {
            out.pre_rotation = v;
        }
        if let Some(v) = vec("PostRotation") {
            out.post_rotation = v;
        }
        if let Some(order) = props
            .get("RotationOrder")
            .and_then(|v| v.first())
            .and_then(Property::as_i64)
        {
            out.rotation_order = order;
        }
        out
    }

    fn channel(&self, target: TargetPath) -> Vec3 {
        match target {
            TargetPath::Translation => self.translation,
            TargetPath::Rotation => self.rotation,
            TargetPath::Scale => self.scaling,
        }
    }
}

/// Euler angles in degrees, FBX rotation order enum, to a quaternion.
///
/// FBX orders name the application sequence (`XYZ` rotates about X first),
/// which is the reverse of glam's intrinsic naming.
#[must_use]
pub fn euler_to_quat(degrees: Vec3, order: i64) -> Quat {
    let (x, y, z) = (
        degrees.x.to_radians(),
        degrees.y.to_radians(),
        degrees.z.to_radians(),
    );
    match order {
        1 => Quat::from_euler(EulerRot::YZX, y, z, x),
        2 => Quat::from_euler(EulerRot::XZY, x, z, y),
        3 => Quat::from_euler(EulerRot::ZXY, z, x, y),
        4 => Quat::from_euler(EulerRot::YXZ, y, x, z),
        5 => Quat::from_euler(EulerRot::XYZ, x, y, z),
        _ => Quat::from_euler(EulerRot::ZYX, z, y, x),
    }
}

struct Curve {
    times: Vec<i64>,
    values: Vec<f32>,
}

impl Curve {
    /// Linear evaluation, clamped outside the key range.
    fn evaluate(&self, t: i64) -> f32 {
        let n = self.times.len().min(self.values.len());
        if n == 0 {
            return 0.0;
        }
        let times = &self.times[..n];
        match times.binary_search(&t) {
            Ok(i) => self.values[i],
            Err(0) => self.values[0],
            Err(i) if i >= n => self.values[n - 1],
            Err(i) => {
                let (t0, t1) = (times[i - 1], times[i]);
                let (v0, v1) = (self.values[i - 1], self.values[i]);
                let alpha = ((t - t0) as f64 / (t1 - t0) as f64) as f32;
                v0 + (v1 - v0) * alpha
            }
        }
    }
}

#[derive(Default)]
struct CurveNode {
    defaults: [Option<f32>; 3],
    axes: [Option<i64>; 3],
    /// (model id, driven property)
    target: Option<(i64, TargetPath)>,
}

struct Model {
    name: String,
    transform: ModelTransform,
}

fn axis_index(property: &str) -> Option<usize> {
    match property {
        "d|X" => Some(0),
        "d|Y" => Some(1),
        "d|Z" => Some(2),
        _ => None,
    }
}

fn target_of(property: &str) -> Option<TargetPath> {
    match property {
        "Lcl Translation" => Some(TargetPath::Translation),
        "Lcl Rotation" => Some(TargetPath::Rotation),
        "Lcl Scaling" => Some(TargetPath::Scale),
        _ => None,
    }
}

/// Decodes the animation curves of a binary FBX file into a clip.
pub fn load_clip(bytes: &[u8], label: &str) -> Result<MotionClip> {
    let doc = FbxDocument::parse(bytes).map_err(|reason| Error::decode(label, reason))?;
    let objects = doc
        .root("Objects")
        .ok_or_else(|| Error::decode(label, "missing Objects section"))?;

    let mut models: FxHashMap<i64, Model> = FxHashMap::default();
    let mut model_order: Vec<i64> = Vec::new();
    let mut curve_nodes: FxHashMap<i64, CurveNode> = FxHashMap::default();
    let mut curve_node_order: Vec<i64> = Vec::new();
    let mut curves: FxHashMap<i64, Curve> = FxHashMap::default();
    let mut stacks: Vec<(i64, String)> = Vec::new();
    let mut layers: FxHashSet<i64> = FxHashSet::default();

    for object in &objects.children {
        let Some(id) = object.property(0).and_then(Property::as_i64) else {
            continue;
        };
        let name = object
            .property(1)
            .and_then(Property::as_str)
            .map(object_name)
            .unwrap_or_default();

        match object.name.as_str() {
            "Model" => {
                models.insert(
                    id,
                    Model {
                        name,
                        transform: ModelTransform::read(object),
                    },
                );
                model_order.push(id);
            }
            "AnimationCurveNode" => {
                let props = properties70(object);
                let mut node = CurveNode::default();
                for (axis, key) in ["d|X", "d|Y", "d|Z"].iter().enumerate() {
                    let value = props
                        .get(key)
                        .and_then(|v| v.first())
                        .and_then(Property::as_f64)
                        .map(|v| v as f32);
                    node.defaults[axis] = value;
                }
                curve_nodes.insert(id, node);
                curve_node_order.push(id);
            }
            "AnimationCurve" => {
                let times = object
                    .child("KeyTime")
                    .and_then(|n| n.property(0))
                    .and_then(Property::to_i64_vec)
                    .unwrap_or_default();
                let values = object
                    .child("KeyValueFloat")
                    .and_then(|n| n.property(0))
                    .and_then(Property::to_f32_vec)
                    .unwrap_or_default();
                if times.len() != values.len() {
                    log::debug!(
                        "'{label}': curve {id} has {} times and {} values",
                        times.len(),
                        values.len()
                    );
                }
                curves.insert(id, Curve { times, values });
            }
            "AnimationStack" => stacks.push((id, name)),
            "AnimationLayer" => {
                layers.insert(id);
            }
            _ => {}
        }
    }

    // Object-to-object links: layer -> stack and curve node -> layer.
    let mut layer_stack: FxHashMap<i64, i64> = FxHashMap::default();
    let mut node_layer: FxHashMap<i64, i64> = FxHashMap::default();

    if let Some(connections) = doc.root("Connections") {
        for c in connections.children_named("C") {
            let (Some(child), Some(parent)) = (
                c.property(1).and_then(Property::as_i64),
                c.property(2).and_then(Property::as_i64),
            ) else {
                continue;
            };
            let Some(property) = c.property(3).and_then(Property::as_str) else {
                if layers.contains(&child) && stacks.iter().any(|(id, _)| *id == parent) {
                    layer_stack.insert(child, parent);
                } else if curve_nodes.contains_key(&child) && layers.contains(&parent) {
                    node_layer.insert(child, parent);
                }
                continue;
            };

            if curves.contains_key(&child) {
                if let (Some(node), Some(axis)) = (curve_nodes.get_mut(&parent), axis_index(property)) {
                    node.axes[axis] = Some(child);
                }
            } else if let Some(node) = curve_nodes.get_mut(&child)
                && models.contains_key(&parent)
                && let Some(target) = target_of(property)
            {
                node.target = Some((parent, target));
            }
        }
    }

    // Files without stack / layer links keep every curve node.
    let first_stack = stacks.first().map(|(id, _)| *id);
    if let Some(stack) = first_stack
        && !node_layer.is_empty()
    {
        let before = curve_node_order.len();
        curve_node_order.retain(|node| {
            node_layer
                .get(node)
                .and_then(|layer| layer_stack.get(layer))
                .is_some_and(|owner| *owner == stack)
        });
        let skipped = before - curve_node_order.len();
        if skipped > 0 {
            log::debug!("'{label}': skipped {skipped} curve nodes outside the first animation stack");
        }
    }

    // Group bound curve nodes by model, keeping object order.
    let mut tracks = Vec::new();
    for model_id in &model_order {
        let Some(model) = models.get(model_id) else {
            continue;
        };
        for node_id in &curve_node_order {
            let Some(node) = curve_nodes.get(node_id) else {
                continue;
            };
            let Some((owner, target)) = node.target else {
                continue;
            };
            if owner != *model_id {
                continue;
            }
            if let Some(track) = build_track(model, node, target, &curves) {
                tracks.push(track);
            }
        }
    }

    let name = stacks
        .into_iter()
        .next()
        .map(|(_, name)| name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| label.to_string());
    let clip = MotionClip::new(name, tracks);
    if clip.tracks.is_empty() {
        return Err(Error::decode(label, "no animation curves bound to models"));
    }

    log::debug!(
        "Decoded FBX clip '{}' (v{}): {} tracks, {:.3}s",
        clip.name,
        doc.version,
        clip.tracks.len(),
        clip.duration
    );
    Ok(clip)
}

fn build_track(
    model: &Model,
    node: &CurveNode,
    target: TargetPath,
    curves: &FxHashMap<i64, Curve>,
) -> Option<Track> {
    let axes: [Option<&Curve>; 3] = node.axes.map(|id| id.and_then(|id| curves.get(&id)));

    let mut key_times: Vec<i64> = axes
        .iter()
        .flatten()
        .flat_map(|c| c.times.iter().copied())
        .collect();
    key_times.sort_unstable();
    key_times.dedup();
    if key_times.is_empty() {
        return None;
    }

    let fallback = model.transform.channel(target);
    let samples: Vec<Vec3> = key_times
        .iter()
        .map(|&t| {
            let mut v = [0.0f32; 3];
            for (axis, slot) in v.iter_mut().enumerate() {
                *slot = match axes[axis] {
                    Some(curve) if !curve.times.is_empty() => curve.evaluate(t),
                    _ => node.defaults[axis].unwrap_or(fallback[axis]),
                };
            }
            Vec3::from_array(v)
        })
        .collect();

    let times: Vec<f32> = key_times
        .iter()
        .map(|&t| (t as f64 / KTIME_PER_SECOND) as f32)
        .collect();

    let data = match target {
        TargetPath::Rotation => {
            let order = model.transform.rotation_order;
            let pre = euler_to_quat(model.transform.pre_rotation, 0);
            let post = euler_to_quat(model.transform.post_rotation, 0).inverse();
            let values = samples
                .into_iter()
                .map(|e| (pre * euler_to_quat(e, order) * post).normalize())
                .collect();
            TrackData::Quaternion(KeyframeTrack::new(times, values, InterpolationMode::Linear))
        }
        TargetPath::Translation | TargetPath::Scale => {
            TrackData::Vector3(KeyframeTrack::new(times, samples, InterpolationMode::Linear))
        }
    };

    Some(Track {
        meta: TrackMeta {
            joint_name: model.name.clone(),
            target,
        },
        data,
    })
}
