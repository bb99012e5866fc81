use base64::Engine as _;
use glam::{Affine3A, Mat4, Quat, Vec3, Vec4};

use crate::animation::{InterpolationMode, KeyframeTrack, MotionClip, TargetPath, Track, TrackData, TrackMeta};
use crate::errors::{Error, Result};
use crate::scene::{MaterialDesc, MeshAsset, MeshPart, MeshPrimitive, Shading, Transform};

/// Decodes glTF 2.0 (JSON or binary) into mesh assets and motion clips.
///
/// Buffers must be self-contained: the GLB binary chunk or base64 `data:`
/// URIs. Images, cameras and lights are ignored.
pub struct GltfLoader<'a> {
    label: &'a str,
    gltf: gltf::Gltf,
    buffers: Vec<Vec<u8>>,
}

impl<'a> GltfLoader<'a> {
    pub fn parse(bytes: &[u8], label: &'a str) -> Result<Self> {
        let gltf = gltf::Gltf::from_slice_without_validation(bytes)
            .map_err(|e| Error::decode(label, format!("invalid glTF: {e}")))?;

        let unsupported: Vec<_> = gltf.extensions_required().collect();
        if !unsupported.is_empty() {
            log::warn!("'{label}' requires unsupported glTF extensions: {unsupported:?}");
        }

        let buffers = Self::load_buffers(&gltf, label)?;
        Ok(Self {
            label,
            gltf,
            buffers,
        })
    }

    fn load_buffers(gltf: &gltf::Gltf, label: &str) -> Result<Vec<Vec<u8>>> {
        let mut buffer_data = Vec::new();
        for buffer in gltf.buffers() {
            let data = match buffer.source() {
                gltf::buffer::Source::Bin => gltf
                    .blob
                    .clone()
                    .ok_or_else(|| Error::decode(label, "missing GLB binary chunk"))?,
                gltf::buffer::Source::Uri(uri) => {
                    let Some(rest) = uri.strip_prefix("data:") else {
                        return Err(Error::decode(
                            label,
                            format!("external buffer '{uri}' is not supported, embed it or use .glb"),
                        ));
                    };
                    let payload = rest
                        .split_once(";base64,")
                        .map(|(_, payload)| payload)
                        .ok_or_else(|| Error::decode(label, "buffer data URI is not base64"))?;
                    base64::engine::general_purpose::STANDARD
                        .decode(payload)
                        .map_err(|e| Error::decode(label, format!("buffer {}: {e}", buffer.index())))?
                }
            };
            if data.len() < buffer.length() {
                return Err(Error::decode(
                    label,
                    format!(
                        "buffer {} holds {} bytes, {} declared",
                        buffer.index(),
                        data.len(),
                        buffer.length()
                    ),
                ));
            }
            buffer_data.push(data);
        }
        Ok(buffer_data)
    }

    fn node_name(node: &gltf::Node) -> String {
        node.name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Node_{}", node.index()))
    }

    fn buffer(&self, buffer: gltf::Buffer<'_>) -> Option<&[u8]> {
        self.buffers.get(buffer.index()).map(Vec::as_slice)
    }

    // --- Mesh ---

    /// Builds the node graph, skins and material descriptions.
    pub fn load_mesh(&self) -> Result<MeshAsset> {
        let mut builder = MeshAsset::builder(self.label);

        for node in self.gltf.nodes() {
            let (t, r, s) = node.transform().decomposed();
            let transform = Transform::from_trs(
                Vec3::from_array(t),
                Quat::from_array(r).normalize(),
                Vec3::from_array(s),
            );
            builder.add_node(Self::node_name(&node), transform);
        }

        for node in self.gltf.nodes() {
            for child in node.children() {
                builder.attach(child.index(), node.index())?;
            }
        }

        for skin in self.gltf.skins() {
            let reader = skin.reader(|buffer| self.buffer(buffer));
            let ibms: Option<Vec<Affine3A>> = reader.read_inverse_bind_matrices().map(|iter| {
                iter.map(|m| Affine3A::from_mat4(Mat4::from_cols_array_2d(&m)))
                    .collect()
            });
            let joints = skin.joints().map(|n| n.index()).collect();
            builder.add_skin(skin.name().unwrap_or("Skeleton"), joints, ibms);
        }

        for node in self.gltf.nodes() {
            let Some(mesh) = node.mesh() else {
                continue;
            };
            let primitives = mesh
                .primitives()
                .map(|primitive| MeshPrimitive {
                    material: Self::material_desc(&primitive.material()),
                    vertex_count: primitive
                        .get(&gltf::Semantic::Positions)
                        .map_or(0, |a| a.count()),
                    index_count: primitive.indices().map(|a| a.count()),
                })
                .collect();
            builder.set_mesh(
                node.index(),
                MeshPart {
                    mesh_name: mesh.name().map(str::to_string),
                    primitives,
                    skin: node.skin().map(|s| s.index()),
                },
            )?;
        }

        let asset = builder.build()?;
        log::debug!(
            "Decoded glTF mesh '{}': {} nodes, {} joints, {} mesh nodes",
            asset.name,
            asset.nodes.len(),
            asset.skeleton.len(),
            asset.mesh_node_count()
        );
        Ok(asset)
    }

    fn material_desc(material: &gltf::Material) -> MaterialDesc {
        let pbr = material.pbr_metallic_roughness();
        MaterialDesc {
            name: material.name().map(str::to_string),
            shading: Shading::Standard,
            base_color: Vec4::from_array(pbr.base_color_factor()),
        }
    }

    // --- Animation ---

    /// Builds a clip from the first animation of the file.
    pub fn load_clip(&self) -> Result<MotionClip> {
        let mut animations = self.gltf.animations();
        let Some(anim) = animations.next() else {
            return Err(Error::decode(self.label, "file contains no animations"));
        };
        if animations.next().is_some() {
            log::info!(
                "'{}' holds several animations, using '{}'",
                self.label,
                anim.name().unwrap_or("#0")
            );
        }

        let mut tracks = Vec::new();

        for channel in anim.channels() {
            let reader = channel.reader(|buffer| self.buffer(buffer));
            let target = channel.target();
            let joint_name = Self::node_name(&target.node());

            let Some(inputs) = reader.read_inputs() else {
                continue;
            };
            let times: Vec<f32> = inputs.collect();

            let interpolation = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Linear => InterpolationMode::Linear,
                gltf::animation::Interpolation::Step => InterpolationMode::Step,
                gltf::animation::Interpolation::CubicSpline => InterpolationMode::CubicSpline,
            };

            let Some(outputs) = reader.read_outputs() else {
                continue;
            };

            let (target, data) = match outputs {
                gltf::animation::util::ReadOutputs::Translations(iter) => (
                    TargetPath::Translation,
                    TrackData::Vector3(KeyframeTrack::new(
                        times,
                        iter.map(Vec3::from_array).collect(),
                        interpolation,
                    )),
                ),
                gltf::animation::util::ReadOutputs::Rotations(iter) => (
                    TargetPath::Rotation,
                    TrackData::Quaternion(KeyframeTrack::new(
                        times,
                        iter.into_f32().map(Quat::from_array).collect(),
                        interpolation,
                    )),
                ),
                gltf::animation::util::ReadOutputs::Scales(iter) => (
                    TargetPath::Scale,
                    TrackData::Vector3(KeyframeTrack::new(
                        times,
                        iter.map(Vec3::from_array).collect(),
                        interpolation,
                    )),
                ),
                // Morph weights have nothing to drive on a skeleton.
                gltf::animation::util::ReadOutputs::MorphTargetWeights(_) => continue,
            };

            tracks.push(Track {
                meta: TrackMeta { joint_name, target },
                data,
            });
        }

        let name = anim.name().unwrap_or(self.label).to_string();
        let clip = MotionClip::new(name, tracks);
        if clip.tracks.is_empty() {
            return Err(Error::decode(self.label, "animation has no usable channels"));
        }
        Ok(clip)
    }
}
