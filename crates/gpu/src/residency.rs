use std::collections::BTreeMap;

use scene::SceneGraph;
use scene::graph::{MaterialId, TextureId};

/// Resources that must be (re)sent to the GPU before the next draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPlan {
    pub geometry: bool,
    pub materials: Vec<MaterialId>,
    pub textures: Vec<TextureId>,
}

impl UploadPlan {
    pub fn is_empty(&self) -> bool {
        !self.geometry && self.materials.is_empty() && self.textures.is_empty()
    }
}

/// Tracks which scene resources are resident and at which version.
///
/// Materials and textures carry a version that `MaterialNormalizer` bumps
/// when it rewrites them; a newer version than the resident one means the
/// resource must be re-uploaded.
#[derive(Debug, Default)]
pub struct Residency {
    fingerprint: Option<String>,
    geometry_resident: bool,
    materials: BTreeMap<MaterialId, u32>,
    textures: BTreeMap<TextureId, u32>,
    resident_bytes: usize,
}

impl Residency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resident_bytes(&self) -> usize {
        self.resident_bytes
    }

    pub fn is_empty(&self) -> bool {
        !self.geometry_resident && self.materials.is_empty() && self.textures.is_empty()
    }

    /// Computes the uploads needed for `scene` and records them as resident.
    pub fn sync(&mut self, scene: &SceneGraph) -> UploadPlan {
        let fingerprint = scene.fingerprint().map(str::to_string);
        if fingerprint != self.fingerprint {
            self.clear();
            self.fingerprint = fingerprint;
        }

        let mut plan = UploadPlan {
            geometry: !self.geometry_resident,
            ..UploadPlan::default()
        };
        self.geometry_resident = true;

        for (i, m) in scene.materials().iter().enumerate() {
            let id = MaterialId(i as u32);
            if self.materials.insert(id, m.version) != Some(m.version) {
                plan.materials.push(id);
            }
        }
        for (i, t) in scene.textures().iter().enumerate() {
            let id = TextureId(i as u32);
            if self.textures.insert(id, t.version) != Some(t.version) {
                plan.textures.push(id);
            }
        }
        self.resident_bytes = scene.gpu_bytes();
        plan
    }

    /// Forgets everything; the next `sync` uploads the full scene.
    pub fn clear(&mut self) {
        self.fingerprint = None;
        self.geometry_resident = false;
        self.materials.clear();
        self.textures.clear();
        self.resident_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::Residency;
    use scene::MaterialNormalizer;
    use scene::prefabs::placeholder_box;

    #[test]
    fn first_sync_uploads_everything_then_nothing() {
        let scene = placeholder_box([50.0, 50.0, 50.0]);
        let mut r = Residency::new();
        let plan = r.sync(&scene);
        assert!(plan.geometry);
        assert_eq!(plan.materials.len(), 1);
        assert!(r.resident_bytes() > 0);
        assert!(r.sync(&scene).is_empty());
    }

    #[test]
    fn dirty_materials_are_reuploaded() {
        let mut scene = placeholder_box([50.0, 50.0, 50.0]);
        let mut r = Residency::new();
        r.sync(&scene);
        MaterialNormalizer::default().normalize(&mut scene);
        let plan = r.sync(&scene);
        assert!(!plan.geometry);
        assert_eq!(plan.materials.len(), 1);
    }

    #[test]
    fn clear_forces_full_upload() {
        let scene = placeholder_box([50.0, 50.0, 50.0]);
        let mut r = Residency::new();
        r.sync(&scene);
        r.clear();
        assert!(r.is_empty());
        assert!(r.sync(&scene).geometry);
    }
}
