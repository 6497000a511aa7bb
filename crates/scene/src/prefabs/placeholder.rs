use foundation::math::Vec3;

use crate::SceneGraph;
use crate::components::{Material, Transform};
use crate::geometry::Geometry;
use crate::graph::{Mesh, Node, Primitive};

/// Stand-in geometry for products without a usable 3D asset.
///
/// A single box with the product's base footprint, resting on the ground
/// plane. Dimensions are `[width, depth, height]` in centimeters; the scene
/// is built in meters with Y up.
pub fn placeholder_box(dimensions_cm: [f64; 3]) -> SceneGraph {
    let [w, d, h] = dimensions_cm.map(|v| {
        let cm = if v.is_finite() { v.max(1.0) } else { 1.0 };
        cm / 100.0
    });

    let mut scene = SceneGraph::new();
    let mut material = Material::new(Some("placeholder".to_string()));
    material.appearance.base_color = [0.8, 0.8, 0.8, 1.0];
    material.appearance.roughness = 0.8;
    material.appearance.metalness = 0.0;
    let material = scene.add_material(material);

    let mesh = scene.add_mesh(Mesh {
        name: Some("placeholder".to_string()),
        primitives: vec![Primitive::new(
            Some(material),
            Geometry::cuboid(
                [(-w * 0.5) as f32, 0.0, (-d * 0.5) as f32],
                [(w * 0.5) as f32, h as f32, (d * 0.5) as f32],
            ),
        )],
    });
    let root = scene.root();
    scene.add_node(
        root,
        Node::new(
            Some("placeholder".to_string()),
            Transform::translate(Vec3::ZERO),
            Some(mesh),
        ),
    );
    scene
}

#[cfg(test)]
mod tests {
    use super::placeholder_box;

    #[test]
    fn box_matches_footprint_in_meters() {
        let scene = placeholder_box([60.0, 40.0, 80.0]);
        let b = scene.world_bounds();
        assert!((b.size().x - 0.6).abs() < 1e-6);
        assert!((b.size().y - 0.8).abs() < 1e-6);
        assert!((b.size().z - 0.4).abs() < 1e-6);
        assert_eq!(b.min[1], 0.0);
        assert_eq!(scene.draw_items().len(), 1);
    }

    #[test]
    fn degenerate_dimensions_still_produce_geometry() {
        let scene = placeholder_box([0.0, f64::NAN, -5.0]);
        assert!(!scene.world_bounds().is_empty());
    }
}
