use foundation::bounds::Aabb3;
use foundation::math::{Mat4, Quat, Vec3};

use crate::components::{Material, Texture, Transform};
use crate::geometry::Geometry;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: Option<String>,
    pub transform: Transform,
    pub mesh: Option<MeshId>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: Option<String>, transform: Transform, mesh: Option<MeshId>) -> Self {
        Self {
            name,
            transform,
            mesh,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub material: Option<MaterialId>,
    pub geometry: Geometry,
    /// Local-space bounds of the vertex positions.
    pub bounds: Aabb3,
}

impl Primitive {
    pub fn new(material: Option<MaterialId>, geometry: Geometry) -> Self {
        Self {
            material,
            bounds: geometry.bounds(),
            geometry,
        }
    }

    /// GPU footprint: interleaved position/normal/uv + u32 indices.
    pub fn gpu_bytes(&self) -> usize {
        self.geometry.vertex_count() * 32 + self.geometry.indices.len() * 4
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

/// One mesh instance in world space, ready for draw submission.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    pub mesh: MeshId,
    pub world: Mat4,
}

/// Parsed, traversable representation of a 3D asset.
///
/// Every scene has a synthetic root node that owns the asset's top-level
/// nodes. Customization scale and turntable rotation are applied to that
/// node only, so they compose with whatever the asset itself authored.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    textures: Vec<Texture>,
    root: NodeId,
    fingerprint: Option<String>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(
                Some("root".to_string()),
                Transform::identity(),
                None,
            )],
            meshes: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            root: NodeId(0),
            fingerprint: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn set_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.fingerprint = Some(fingerprint.into());
    }

    pub fn add_node(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        if let Some(p) = self.nodes.get_mut(parent.0 as usize) {
            p.children.push(id);
        }
        id
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let id = MeshId(self.meshes.len() as u32);
        self.meshes.push(mesh);
        id
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(material);
        id
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(texture);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0 as usize)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0 as usize)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut [Material] {
        &mut self.materials
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut [Texture] {
        &mut self.textures
    }

    pub fn root_transform(&self) -> Transform {
        self.nodes[self.root.0 as usize].transform
    }

    /// Non-negative scale on the root node; negative or non-finite axes are
    /// clamped to zero.
    pub fn set_root_scale(&mut self, scale: Vec3) {
        let sanitize = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        let root = self.root.0 as usize;
        self.nodes[root].transform.scale =
            Vec3::new(sanitize(scale.x), sanitize(scale.y), sanitize(scale.z));
    }

    pub fn set_root_rotation(&mut self, rotation: Quat) {
        let root = self.root.0 as usize;
        self.nodes[root].transform.rotation = rotation.normalize();
    }

    /// Depth-first, parent before children, children in insertion order.
    pub fn visit(&self, mut f: impl FnMut(NodeId, &Node, &Mat4)) {
        let mut stack = vec![(self.root, Mat4::IDENTITY)];
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            let world = parent_world * node.transform.matrix();
            f(id, node, &world);
            for child in node.children.iter().rev() {
                stack.push((*child, world));
            }
        }
    }

    pub fn draw_items(&self) -> Vec<DrawItem> {
        let mut out = Vec::new();
        self.visit(|id, node, world| {
            if let Some(mesh) = node.mesh {
                out.push(DrawItem {
                    node: id,
                    mesh,
                    world: *world,
                });
            }
        });
        out
    }

    /// World-space bounds of every mesh instance.
    pub fn world_bounds(&self) -> Aabb3 {
        let mut bounds = Aabb3::empty();
        for item in self.draw_items() {
            let Some(mesh) = self.mesh(item.mesh) else {
                continue;
            };
            for prim in &mesh.primitives {
                if prim.bounds.is_empty() {
                    continue;
                }
                for corner in prim.bounds.corners() {
                    bounds.include_point(item.world.transform_point(corner));
                }
            }
        }
        bounds
    }

    /// Approximate GPU memory held by this scene once uploaded.
    pub fn gpu_bytes(&self) -> usize {
        let geometry: usize = self
            .meshes
            .iter()
            .flat_map(|m| m.primitives.iter())
            .map(Primitive::gpu_bytes)
            .sum();
        let textures: usize = self.textures.iter().map(Texture::byte_size).sum();
        geometry + textures
    }
}

#[cfg(test)]
mod tests {
    use super::{Mesh, Node, Primitive, SceneGraph};
    use crate::components::Transform;
    use crate::geometry::Geometry;
    use foundation::math::Vec3;

    fn unit_cube_mesh() -> Mesh {
        Mesh {
            name: None,
            primitives: vec![Primitive::new(None, Geometry::cuboid([-0.5; 3], [0.5; 3]))],
        }
    }

    #[test]
    fn visit_is_parent_first_in_insertion_order() {
        let mut g = SceneGraph::new();
        let a = g.add_node(g.root(), Node::new(Some("a".into()), Transform::identity(), None));
        g.add_node(a, Node::new(Some("a1".into()), Transform::identity(), None));
        g.add_node(g.root(), Node::new(Some("b".into()), Transform::identity(), None));

        let mut names = Vec::new();
        g.visit(|_, node, _| names.push(node.name.clone().unwrap_or_default()));
        assert_eq!(names, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn root_scale_applies_to_world_bounds() {
        let mut g = SceneGraph::new();
        let mesh = g.add_mesh(unit_cube_mesh());
        g.add_node(
            g.root(),
            Node::new(None, Transform::translate(Vec3::new(0.0, 0.5, 0.0)), Some(mesh)),
        );

        let b = g.world_bounds();
        assert_eq!(b.min, [-0.5, 0.0, -0.5]);
        assert_eq!(b.max, [0.5, 1.0, 0.5]);

        g.set_root_scale(Vec3::new(2.0, 1.0, 1.0));
        let b = g.world_bounds();
        assert_eq!(b.min, [-1.0, 0.0, -0.5]);
        assert_eq!(b.max, [1.0, 1.0, 0.5]);
        assert_eq!(g.draw_items().len(), 1);
    }

    #[test]
    fn root_scale_is_never_negative() {
        let mut g = SceneGraph::new();
        g.set_root_scale(Vec3::new(-1.0, f64::NAN, 2.0));
        assert_eq!(g.root_transform().scale, Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn gpu_bytes_counts_geometry() {
        let mut g = SceneGraph::new();
        g.add_mesh(unit_cube_mesh());
        assert_eq!(g.gpu_bytes(), 24 * 32 + 36 * 4);
    }
}
