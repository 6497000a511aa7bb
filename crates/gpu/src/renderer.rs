use foundation::math::{Mat4, Vec3};
use scene::SceneGraph;
use scene::graph::{MaterialId, MeshId, NodeId};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y_rad: f64,
    pub near: f64,
    pub far: f64,
}

impl Camera3D {
    pub fn look_at(position: Vec3, target: Vec3, fov_y_rad: f64, near: f64, far: f64) -> Self {
        Self {
            position,
            target,
            fov_y_rad,
            near,
            far,
        }
    }

    pub fn distance(&self) -> f64 {
        (self.position - self.target).length()
    }

    /// Column-major view-projection for a viewport of the given aspect ratio.
    pub fn view_proj(&self, aspect: f64) -> [[f32; 4]; 4] {
        let view = Mat4::look_at_rh(self.position, self.target, Vec3::Y);
        let proj = Mat4::perspective_rh_gl(self.fov_y_rad, aspect.max(1e-6), self.near, self.far);
        (proj * view).to_f32()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    DrawMesh {
        node: NodeId,
        mesh: MeshId,
        /// Column-major world matrix.
        world: [[f32; 4]; 4],
        materials: Vec<Option<MaterialId>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub camera: Camera3D,
    pub commands: Vec<RenderCommand>,
}

impl RenderFrame {
    pub fn draw_count(&self) -> usize {
        self.commands.len()
    }
}

pub struct Renderer;

impl Renderer {
    pub fn collect(scene: &SceneGraph, camera: Camera3D) -> RenderFrame {
        let commands = scene
            .draw_items()
            .into_iter()
            .map(|item| {
                let materials = scene
                    .mesh(item.mesh)
                    .map(|m| m.primitives.iter().map(|p| p.material).collect())
                    .unwrap_or_default();
                RenderCommand::DrawMesh {
                    node: item.node,
                    mesh: item.mesh,
                    world: item.world.to_f32(),
                    materials,
                }
            })
            .collect();
        RenderFrame { camera, commands }
    }
}

#[cfg(test)]
mod tests {
    use super::{Camera3D, RenderCommand, Renderer};
    use foundation::math::Vec3;
    use scene::prefabs::placeholder_box;

    #[test]
    fn collect_commands_for_each_mesh_instance() {
        let scene = placeholder_box([60.0, 40.0, 80.0]);
        let camera = Camera3D::look_at(Vec3::new(0.0, 1.0, 3.0), Vec3::ZERO, 0.8, 0.1, 100.0);
        let frame = Renderer::collect(&scene, camera);
        assert_eq!(frame.draw_count(), 1);
        assert!(matches!(
            frame.commands.as_slice(),
            [RenderCommand::DrawMesh { materials, .. }] if materials.len() == 1
        ));
        assert!((frame.camera.distance() - 10f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn view_proj_is_finite_for_degenerate_aspect() {
        let camera = Camera3D::look_at(Vec3::new(0.0, 0.4, 2.0), Vec3::new(0.0, 0.4, 0.0), 0.8, 0.01, 100.0);
        let m = camera.view_proj(0.0);
        assert!(m.iter().flatten().all(|v| v.is_finite()));
    }
}
