use glam::{Mat4, Quat};
use gltf::mesh::Mode;
use gltf::{image, Semantic};
use serde_json::Value;
use strata_core::{AnimationSet, LoadOptions};
use tracing::debug;

use crate::asset::{
    Asset, Camera, Material, Node, Projection, Sampler, Scene, Skin, Texture, TextureRef, Transform,
};
use crate::error::AssetError;
use crate::mesh::{generate_smooth_normals, MeshAsset, MeshPrimitive, MorphTarget};
use crate::parser::ParsedDocument;
use crate::resolver::{DependencyRef, ResolvedDependency};
use crate::texture::{ImageCodec, TextureAsset};

/// Link a parsed document, its resolved dependencies and its animations into
/// an [`Asset`].
///
/// A dependency the document references but `dependencies` lacks means the
/// resolver broke its contract; that is reported as [`AssetError::Assembly`].
pub fn assemble(
    parsed: ParsedDocument,
    dependencies: Vec<ResolvedDependency>,
    animations: AnimationSet,
    options: &LoadOptions,
    codec: &dyn ImageCodec,
) -> Result<Asset, AssetError> {
    let ParsedDocument { document: doc, json, .. } = parsed;

    let mut buffers: Vec<Option<Vec<u8>>> = vec![None; doc.buffers().count()];
    let mut fetched_images: Vec<Option<Vec<u8>>> = vec![None; doc.images().count()];
    for dependency in dependencies {
        let slot = match dependency.reference {
            DependencyRef::Buffer(i) => buffers.get_mut(i),
            DependencyRef::Image(i) => fetched_images.get_mut(i),
        };
        match slot {
            Some(slot) => *slot = Some(dependency.bytes),
            None => {
                return Err(AssetError::Assembly(format!(
                    "resolved {:?} does not exist in the document",
                    dependency.reference
                )))
            }
        }
    }
    let buffers = buffers
        .into_iter()
        .enumerate()
        .map(|(i, b)| b.ok_or_else(|| AssetError::Assembly(format!("buffer {} was not resolved", i))))
        .collect::<Result<Vec<_>, _>>()?;

    let slices: Vec<&[u8]> = buffers.iter().map(Vec::as_slice).collect();

    let meshes = doc
        .meshes()
        .map(|mesh| assemble_mesh(mesh, &slices, options))
        .collect::<Result<Vec<_>, _>>()?;

    let images = doc
        .images()
        .map(|image| {
            let (bytes, mime_type) = match image.source() {
                image::Source::View { view, mime_type } => {
                    let start = view.offset();
                    let bytes = slices
                        .get(view.buffer().index())
                        .and_then(|buffer| buffer.get(start..start + view.length()))
                        .ok_or_else(|| {
                            AssetError::Codec(
                                format!("image {}", image.index()),
                                "buffer view exceeds the loaded payload".into(),
                            )
                        })?;
                    (bytes, Some(mime_type))
                }
                image::Source::Uri { mime_type, .. } => {
                    let bytes = fetched_images.get(image.index()).and_then(|b| b.as_deref()).ok_or_else(|| {
                        AssetError::Assembly(format!("image {} was not resolved", image.index()))
                    })?;
                    (bytes, mime_type)
                }
            };
            codec.decode(bytes, mime_type, options.max_texture_size)
        })
        .collect::<Result<Vec<TextureAsset>, _>>()?;

    let skins = doc.skins().map(|skin| assemble_skin(skin, &slices)).collect();

    let asset = Asset {
        version: doc.as_json().asset.version.clone(),
        generator: doc.as_json().asset.generator.clone(),
        scenes: doc
            .scenes()
            .map(|s| Scene {
                name: s.name().map(str::to_owned),
                nodes: s.nodes().map(|n| n.index()).collect(),
            })
            .collect(),
        default_scene: doc.default_scene().map(|s| s.index()),
        nodes: doc.nodes().map(|node| assemble_node(node, &json)).collect(),
        meshes,
        materials: doc.materials().map(assemble_material).collect(),
        textures: doc
            .textures()
            .map(|t| {
                let sampler = t.sampler();
                Texture {
                    name: t.name().map(str::to_owned),
                    image: Some(t.source().index()),
                    sampler: Sampler {
                        mag_filter: sampler.mag_filter().map(|f| f.as_gl_enum()),
                        min_filter: sampler.min_filter().map(|f| f.as_gl_enum()),
                        wrap_s: sampler.wrap_s().as_gl_enum(),
                        wrap_t: sampler.wrap_t().as_gl_enum(),
                    },
                }
            })
            .collect(),
        images,
        cameras: doc.cameras().map(assemble_camera).collect(),
        skins,
        animations,
        buffers,
        extensions_used: doc.extensions_used().map(str::to_owned).collect(),
        extras: json.get("extras").cloned(),
    };

    debug!(
        "assembled asset: {} nodes, {} meshes, {} images, {} animation channels",
        asset.nodes.len(),
        asset.meshes.len(),
        asset.images.len(),
        asset.animations.channel_count()
    );
    Ok(asset)
}

/// Collect one vertex stream. An accessor without a buffer view reads as zeros.
fn stream<T, I>(accessor: Option<gltf::Accessor>, read: Option<I>) -> Option<Vec<T>>
where
    T: Clone + Default,
    I: Iterator<Item = T>,
{
    match (read, accessor) {
        (Some(iter), _) => Some(iter.collect()),
        (None, Some(accessor)) => Some(vec![T::default(); accessor.count()]),
        (None, None) => None,
    }
}

fn assemble_mesh(mesh: gltf::Mesh, buffers: &[&[u8]], options: &LoadOptions) -> Result<MeshAsset, AssetError> {
    let m = mesh.index();
    let mut primitives = Vec::new();

    for primitive in mesh.primitives() {
        let p = primitive.index();
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).copied());

        let positions =
            stream(primitive.get(&Semantic::Positions), reader.read_positions()).unwrap_or_default();
        let mut normals =
            stream(primitive.get(&Semantic::Normals), reader.read_normals()).unwrap_or_default();
        let tangents =
            stream(primitive.get(&Semantic::Tangents), reader.read_tangents()).unwrap_or_default();

        let mut tex_coords = Vec::new();
        loop {
            let set = tex_coords.len() as u32;
            let read = reader.read_tex_coords(set).map(|t| t.into_f32());
            match stream(primitive.get(&Semantic::TexCoords(set)), read) {
                Some(coords) => tex_coords.push(coords),
                None => break,
            }
        }

        let colors = stream(
            primitive.get(&Semantic::Colors(0)),
            reader.read_colors(0).map(|c| c.into_rgba_f32()),
        );
        let joints = stream(
            primitive.get(&Semantic::Joints(0)),
            reader
                .read_joints(0)
                .map(|j| j.into_u16().map(|joint| joint.map(u32::from))),
        );
        let weights = stream(
            primitive.get(&Semantic::Weights(0)),
            reader.read_weights(0).map(|w| w.into_f32()),
        );

        let indices = stream(primitive.indices(), reader.read_indices().map(|i| i.into_u32()));
        if let Some(&bad) = indices
            .iter()
            .flatten()
            .find(|&&v| v as usize >= positions.len())
        {
            return Err(AssetError::Codec(
                format!("mesh {} primitive {}", m, p),
                format!("index {} exceeds vertex count {}", bad, positions.len()),
            ));
        }

        let targets = primitive
            .morph_targets()
            .zip(reader.read_morph_targets())
            .map(|(target, (positions, normals, tangents))| MorphTarget {
                positions: stream(target.positions(), positions).unwrap_or_default(),
                normals: stream(target.normals(), normals).unwrap_or_default(),
                tangents: stream(target.tangents(), tangents).unwrap_or_default(),
            })
            .collect();

        if options.generate_normals_if_missing
            && normals.is_empty()
            && !positions.is_empty()
            && primitive.mode() == Mode::Triangles
        {
            debug!("generating normals for mesh {} primitive {}", m, p);
            normals = generate_smooth_normals(&positions, indices.as_deref());
        }

        primitives.push(MeshPrimitive {
            mode: primitive.mode().as_gl_enum(),
            positions,
            normals,
            tangents,
            tex_coords,
            colors,
            joints,
            weights,
            indices,
            material: primitive.material().index(),
            targets,
        });
    }

    Ok(MeshAsset {
        name: mesh.name().map(str::to_owned),
        primitives,
        weights: mesh.weights().map(<[f32]>::to_vec).unwrap_or_default(),
    })
}

fn assemble_node(node: gltf::Node, json: &Value) -> Node {
    let transform = match node.transform() {
        gltf::scene::Transform::Matrix { matrix } => Transform::from_matrix(&matrix),
        gltf::scene::Transform::Decomposed {
            translation,
            rotation,
            scale,
        } => Transform {
            translation: translation.into(),
            rotation: Quat::from_array(rotation).normalize(),
            scale: scale.into(),
        },
    };

    Node {
        name: node.name().map(str::to_owned),
        children: node.children().map(|c| c.index()).collect(),
        mesh: node.mesh().map(|m| m.index()),
        skin: node.skin().map(|s| s.index()),
        camera: node.camera().map(|c| c.index()),
        transform,
        weights: node.weights().map(<[f32]>::to_vec),
        extras: json
            .get("nodes")
            .and_then(|nodes| nodes.get(node.index()))
            .and_then(|n| n.get("extras"))
            .cloned(),
    }
}

fn texture_ref(info: gltf::texture::Info) -> TextureRef {
    TextureRef {
        texture: info.texture().index(),
        tex_coord: info.tex_coord(),
        factor: 1.0,
    }
}

fn assemble_material(material: gltf::Material) -> Material {
    let pbr = material.pbr_metallic_roughness();

    Material {
        name: material.name().map(str::to_owned),
        base_color_factor: pbr.base_color_factor(),
        base_color_texture: pbr.base_color_texture().map(texture_ref),
        metallic_factor: pbr.metallic_factor(),
        roughness_factor: pbr.roughness_factor(),
        metallic_roughness_texture: pbr.metallic_roughness_texture().map(texture_ref),
        normal_texture: material.normal_texture().map(|t| TextureRef {
            texture: t.texture().index(),
            tex_coord: t.tex_coord(),
            factor: t.scale(),
        }),
        occlusion_texture: material.occlusion_texture().map(|t| TextureRef {
            texture: t.texture().index(),
            tex_coord: t.tex_coord(),
            factor: t.strength(),
        }),
        emissive_texture: material.emissive_texture().map(texture_ref),
        emissive_factor: material.emissive_factor(),
        alpha_mode: material.alpha_mode().into(),
        alpha_cutoff: material.alpha_cutoff().unwrap_or(Material::default().alpha_cutoff),
        double_sided: material.double_sided(),
    }
}

fn assemble_camera(camera: gltf::Camera) -> Camera {
    let projection = match camera.projection() {
        gltf::camera::Projection::Perspective(p) => Projection::Perspective {
            aspect_ratio: p.aspect_ratio(),
            yfov: p.yfov(),
            znear: p.znear(),
            zfar: p.zfar(),
        },
        gltf::camera::Projection::Orthographic(o) => Projection::Orthographic {
            xmag: o.xmag(),
            ymag: o.ymag(),
            znear: o.znear(),
            zfar: o.zfar(),
        },
    };
    Camera {
        name: camera.name().map(str::to_owned),
        projection,
    }
}

fn assemble_skin(skin: gltf::Skin, buffers: &[&[u8]]) -> Skin {
    let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();
    let reader = skin.reader(|buffer| buffers.get(buffer.index()).copied());
    let inverse_bind_matrices = match stream(skin.inverse_bind_matrices(), reader.read_inverse_bind_matrices()) {
        Some(matrices) => matrices.iter().map(Mat4::from_cols_array_2d).collect(),
        None => vec![Mat4::IDENTITY; joints.len()],
    };
    Skin {
        name: skin.name().map(str::to_owned),
        joints,
        skeleton: skin.skeleton().map(|s| s.index()),
        inverse_bind_matrices,
    }
}
