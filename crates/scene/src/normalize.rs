//! Material normalization.
//!
//! Uploaded assets arrive with whatever material setup their authoring tool
//! exported. Normalization rewrites every material and texture to one fixed,
//! renderer-agnostic configuration so arbitrary models look consistent
//! without per-asset tuning. Only material and texture state is touched.

use crate::SceneGraph;
use crate::components::{AlphaMode, MagFilter, MinFilter, Sampler, Side, Wrap};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NormalizeSettings {
    pub roughness: f32,
    pub metalness: f32,
    pub sampler: Sampler,
    pub generate_mipmaps: bool,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            roughness: 0.5,
            metalness: 0.0,
            sampler: Sampler {
                mag_filter: MagFilter::Linear,
                min_filter: MinFilter::LinearMipmapLinear,
                wrap_s: Wrap::Repeat,
                wrap_t: Wrap::Repeat,
            },
            generate_mipmaps: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct NormalizeReport {
    pub materials: usize,
    pub textures: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct MaterialNormalizer {
    settings: NormalizeSettings,
}

impl MaterialNormalizer {
    pub fn new(settings: NormalizeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &NormalizeSettings {
        &self.settings
    }

    /// Normalizes every material and texture in `scene`.
    ///
    /// Idempotent for all appearance properties. Each call still marks the
    /// touched resources dirty so the renderer re-uploads them.
    pub fn normalize(&self, scene: &mut SceneGraph) -> NormalizeReport {
        let s = &self.settings;

        for material in scene.materials_mut() {
            let a = &mut material.appearance;
            a.base_color = [1.0, 1.0, 1.0, 1.0];
            a.roughness = s.roughness;
            a.metalness = s.metalness;
            a.emissive = [0.0, 0.0, 0.0];
            a.emissive_intensity = 0.0;
            a.opacity = 1.0;
            a.alpha_mode = AlphaMode::Opaque;
            a.side = Side::Front;
            material.mark_dirty();
        }

        for texture in scene.textures_mut() {
            texture.sampler = s.sampler;
            texture.generate_mipmaps = s.generate_mipmaps;
            texture.mark_dirty();
        }

        NormalizeReport {
            materials: scene.materials().len(),
            textures: scene.textures().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MaterialNormalizer;
    use crate::SceneGraph;
    use crate::components::{
        AlphaMode, Appearance, MagFilter, Material, MinFilter, Sampler, Side, Texture,
        TextureImage, Wrap,
    };
    use pretty_assertions::assert_eq;

    fn authored_scene() -> SceneGraph {
        let mut g = SceneGraph::new();
        let tex = g.add_texture(Texture::new(
            Some("wood".into()),
            Sampler {
                mag_filter: MagFilter::Nearest,
                min_filter: MinFilter::Nearest,
                wrap_s: Wrap::ClampToEdge,
                wrap_t: Wrap::MirroredRepeat,
            },
            TextureImage::new(1, 1, vec![200, 150, 90, 255]),
        ));
        let mut m = Material::new(Some("varnish".into()));
        m.appearance = Appearance {
            base_color: [0.2, 0.1, 0.05, 0.4],
            base_color_texture: Some(tex),
            roughness: 0.05,
            metalness: 0.9,
            emissive: [1.0, 0.5, 0.0],
            emissive_intensity: 3.0,
            opacity: 0.4,
            alpha_mode: AlphaMode::Blend,
            side: Side::Double,
        };
        g.add_material(m);
        g.add_material(Material::new(None));
        g
    }

    fn appearances(g: &SceneGraph) -> Vec<Appearance> {
        g.materials().iter().map(|m| m.appearance.clone()).collect()
    }

    fn samplers(g: &SceneGraph) -> Vec<(Sampler, bool)> {
        g.textures()
            .iter()
            .map(|t| (t.sampler, t.generate_mipmaps))
            .collect()
    }

    #[test]
    fn forces_known_good_material_state() {
        let mut g = authored_scene();
        let report = MaterialNormalizer::default().normalize(&mut g);
        assert_eq!(report.materials, 2);
        assert_eq!(report.textures, 1);

        for m in g.materials() {
            let a = &m.appearance;
            assert_eq!(a.base_color, [1.0, 1.0, 1.0, 1.0]);
            assert_eq!(a.roughness, 0.5);
            assert_eq!(a.metalness, 0.0);
            assert_eq!(a.emissive, [0.0, 0.0, 0.0]);
            assert_eq!(a.emissive_intensity, 0.0);
            assert_eq!(a.opacity, 1.0);
            assert_eq!(a.alpha_mode, AlphaMode::Opaque);
            assert_eq!(a.side, Side::Front);
            assert_eq!(m.version, 1);
        }

        let t = &g.textures()[0];
        assert_eq!(t.sampler, Sampler::default());
        assert!(t.generate_mipmaps);
        assert_eq!(t.version, 1);
    }

    #[test]
    fn keeps_texture_bindings() {
        let mut g = authored_scene();
        let before = g.materials()[0].appearance.base_color_texture;
        MaterialNormalizer::default().normalize(&mut g);
        assert_eq!(g.materials()[0].appearance.base_color_texture, before);
    }

    #[test]
    fn normalize_is_idempotent() {
        let normalizer = MaterialNormalizer::default();
        let mut once = authored_scene();
        normalizer.normalize(&mut once);

        let mut twice = once.clone();
        normalizer.normalize(&mut twice);

        assert_eq!(appearances(&once), appearances(&twice));
        assert_eq!(samplers(&once), samplers(&twice));
        // Re-upload is still requested on every pass.
        assert_eq!(twice.materials()[0].version, 2);
    }

    #[test]
    fn leaves_geometry_and_transforms_alone() {
        let mut g = authored_scene();
        let nodes = g.node_count();
        let root = g.root_transform();
        MaterialNormalizer::default().normalize(&mut g);
        assert_eq!(g.node_count(), nodes);
        assert_eq!(g.root_transform(), root);
    }
}
