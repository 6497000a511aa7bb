use std::collections::BTreeSet;

use base64::Engine as _;
use foundation::math::{Quat, Vec3};
use scene::SceneGraph;
use scene::components::{
    AlphaMode, MagFilter, Material, MinFilter, Sampler, Side, Texture, TextureImage, Transform,
    Wrap,
};
use scene::geometry::Geometry;
use scene::graph::{MaterialId, Mesh, MeshId, Node, NodeId, Primitive, TextureId};

use crate::glb::{PayloadKind, sniff};

/// Coarse classification used to pick a user-facing message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseClass {
    InvalidFormat,
    Generic,
}

#[derive(Debug)]
pub enum ModelParseError {
    Empty,
    Html,
    Decode(gltf::Error),
    NoGeometry,
    /// A node is reachable from itself, or from two parents.
    NodeCycle { node: usize },
    /// A buffer is neither the GLB binary chunk nor an inline data URI.
    ExternalBuffer { index: usize },
    /// Buffer data is shorter than its declared `byteLength`.
    TruncatedBuffer { index: usize },
}

impl ModelParseError {
    pub fn class(&self) -> ParseClass {
        match self {
            ModelParseError::Empty
            | ModelParseError::Html
            | ModelParseError::NodeCycle { .. }
            | ModelParseError::TruncatedBuffer { .. } => ParseClass::InvalidFormat,
            ModelParseError::Decode(
                gltf::Error::Binary(_) | gltf::Error::Deserialize(_) | gltf::Error::Validation(_),
            ) => ParseClass::InvalidFormat,
            ModelParseError::Decode(_)
            | ModelParseError::NoGeometry
            | ModelParseError::ExternalBuffer { .. } => ParseClass::Generic,
        }
    }
}

impl std::fmt::Display for ModelParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelParseError::Empty => write!(f, "model payload is empty"),
            ModelParseError::Html => {
                write!(f, "received an HTML document instead of a 3D model")
            }
            ModelParseError::Decode(e) => write!(f, "glTF decode failed: {e}"),
            ModelParseError::NoGeometry => write!(f, "model contains no renderable meshes"),
            ModelParseError::NodeCycle { node } => {
                write!(f, "node {node} appears more than once in the node hierarchy")
            }
            ModelParseError::ExternalBuffer { index } => {
                write!(f, "buffer {index} references an external file")
            }
            ModelParseError::TruncatedBuffer { index } => {
                write!(f, "buffer {index} is shorter than its declared length")
            }
        }
    }
}

impl std::error::Error for ModelParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelParseError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

/// Decodes a binary (or self-contained text) glTF payload into a scene graph.
///
/// The asset's scene roots are attached under the graph's synthetic root.
/// Buffers must be embedded (GLB chunk or data URI). Images that fail to
/// decode leave their texture without texels instead of failing the load.
pub fn load_scene_from_glb(bytes: &[u8]) -> Result<SceneGraph, ModelParseError> {
    match sniff(bytes) {
        PayloadKind::Empty => return Err(ModelParseError::Empty),
        PayloadKind::Html => return Err(ModelParseError::Html),
        PayloadKind::Glb | PayloadKind::Json | PayloadKind::Unknown => {}
    }

    let gltf = gltf::Gltf::from_slice(bytes).map_err(ModelParseError::Decode)?;
    let doc = &gltf.document;
    let buffers = resolve_buffers(doc, gltf.blob.as_deref())?;

    let mut scene = SceneGraph::new();
    scene.set_fingerprint(blake3::hash(bytes).to_hex().to_string());

    for texture in doc.textures() {
        scene.add_texture(Texture::new(
            texture.name().map(str::to_string),
            convert_sampler(&texture.sampler()),
            decode_image(&texture.source(), &buffers),
        ));
    }

    for material in doc.materials() {
        scene.add_material(convert_material(&material));
    }

    for mesh in doc.meshes() {
        let primitives = mesh
            .primitives()
            .filter(|p| p.mode() == gltf::mesh::Mode::Triangles)
            .map(|p| convert_primitive(&p, &buffers))
            .collect();
        scene.add_mesh(Mesh {
            name: mesh.name().map(str::to_string),
            primitives,
        });
    }

    let roots: Vec<gltf::Node> = match doc.default_scene().or_else(|| doc.scenes().next()) {
        Some(s) => s.nodes().collect(),
        None => {
            let children: BTreeSet<usize> = doc
                .nodes()
                .flat_map(|n| n.children().map(|c| c.index()).collect::<Vec<_>>())
                .collect();
            doc.nodes()
                .filter(|n| !children.contains(&n.index()))
                .collect()
        }
    };

    let root = scene.root();
    let mut visited = BTreeSet::new();
    let mut stack: Vec<(NodeId, gltf::Node)> = roots.into_iter().rev().map(|n| (root, n)).collect();
    while let Some((parent, node)) = stack.pop() {
        if !visited.insert(node.index()) {
            return Err(ModelParseError::NodeCycle { node: node.index() });
        }
        let (t, r, s) = node.transform().decomposed();
        let transform = Transform {
            translation: Vec3::from(t),
            rotation: Quat::new(r[0] as f64, r[1] as f64, r[2] as f64, r[3] as f64).normalize(),
            scale: Vec3::from(s),
        };
        let id = scene.add_node(
            parent,
            Node::new(
                node.name().map(str::to_string),
                transform,
                node.mesh().map(|m| MeshId(m.index() as u32)),
            ),
        );
        let children: Vec<gltf::Node> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push((id, child));
        }
    }

    let drawable = scene.draw_items().iter().any(|item| {
        scene
            .mesh(item.mesh)
            .is_some_and(|m| m.primitives.iter().any(|p| p.geometry.triangle_count() > 0))
    });
    if !drawable {
        return Err(ModelParseError::NoGeometry);
    }

    Ok(scene)
}

fn resolve_buffers(
    doc: &gltf::Document,
    blob: Option<&[u8]>,
) -> Result<Vec<Vec<u8>>, ModelParseError> {
    doc.buffers()
        .map(|buffer| {
            let index = buffer.index();
            let data = match buffer.source() {
                gltf::buffer::Source::Bin => blob.map(<[u8]>::to_vec),
                gltf::buffer::Source::Uri(uri) => decode_data_uri(uri),
            }
            .ok_or(ModelParseError::ExternalBuffer { index })?;
            if data.len() < buffer.length() {
                return Err(ModelParseError::TruncatedBuffer { index });
            }
            Ok(data)
        })
        .collect()
}

fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (_, payload) = rest.split_once(";base64,")?;
    base64::engine::general_purpose::STANDARD.decode(payload).ok()
}

fn decode_image(source: &gltf::Image, buffers: &[Vec<u8>]) -> Option<TextureImage> {
    let encoded: Vec<u8> = match source.source() {
        gltf::image::Source::View { view, .. } => {
            let data = buffers.get(view.buffer().index())?;
            data.get(view.offset()..view.offset() + view.length())?.to_vec()
        }
        gltf::image::Source::Uri { uri, .. } => decode_data_uri(uri)?,
    };
    let rgba = image::load_from_memory(&encoded).ok()?.to_rgba8();
    let (width, height) = rgba.dimensions();
    TextureImage::new(width, height, rgba.into_raw())
}

fn convert_sampler(s: &gltf::texture::Sampler) -> Sampler {
    use gltf::texture::{MagFilter as GMag, MinFilter as GMin, WrappingMode};

    let wrap = |w: WrappingMode| match w {
        WrappingMode::ClampToEdge => Wrap::ClampToEdge,
        WrappingMode::MirroredRepeat => Wrap::MirroredRepeat,
        WrappingMode::Repeat => Wrap::Repeat,
    };
    let defaults = Sampler::default();

    Sampler {
        mag_filter: match s.mag_filter() {
            Some(GMag::Nearest) => MagFilter::Nearest,
            Some(GMag::Linear) => MagFilter::Linear,
            None => defaults.mag_filter,
        },
        min_filter: match s.min_filter() {
            Some(GMin::Nearest) => MinFilter::Nearest,
            Some(GMin::Linear) => MinFilter::Linear,
            Some(GMin::NearestMipmapNearest) => MinFilter::NearestMipmapNearest,
            Some(GMin::LinearMipmapNearest) => MinFilter::LinearMipmapNearest,
            Some(GMin::NearestMipmapLinear) => MinFilter::NearestMipmapLinear,
            Some(GMin::LinearMipmapLinear) => MinFilter::LinearMipmapLinear,
            None => defaults.min_filter,
        },
        wrap_s: wrap(s.wrap_s()),
        wrap_t: wrap(s.wrap_t()),
    }
}

fn convert_material(m: &gltf::Material) -> Material {
    let pbr = m.pbr_metallic_roughness();
    let mut material = Material::new(m.name().map(str::to_string));
    let a = &mut material.appearance;
    a.base_color = pbr.base_color_factor();
    a.base_color_texture = pbr
        .base_color_texture()
        .map(|info| TextureId(info.texture().index() as u32));
    a.roughness = pbr.roughness_factor();
    a.metalness = pbr.metallic_factor();
    a.emissive = m.emissive_factor();
    a.opacity = a.base_color[3];
    a.alpha_mode = match m.alpha_mode() {
        gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
        gltf::material::AlphaMode::Mask => AlphaMode::Mask,
        gltf::material::AlphaMode::Blend => AlphaMode::Blend,
    };
    a.side = if m.double_sided() {
        Side::Double
    } else {
        Side::Front
    };
    material
}

fn convert_primitive(p: &gltf::Primitive, buffers: &[Vec<u8>]) -> Primitive {
    let reader = p.reader(|b| buffers.get(b.index()).map(Vec::as_slice));
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|it| it.collect())
        .unwrap_or_default();
    let normals = reader.read_normals().map(|it| it.collect());
    let uvs = reader.read_tex_coords(0).map(|t| t.into_f32().collect());
    let indices = reader.read_indices().map(|i| i.into_u32().collect());

    Primitive::new(
        p.material().index().map(|i| MaterialId(i as u32)),
        Geometry::new(positions, normals, uvs, indices),
    )
}
