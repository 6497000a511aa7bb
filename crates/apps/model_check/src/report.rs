use std::fmt;

use scene::{NormalizeReport, SceneGraph};
use serde::Serialize;
use streaming::{LoadState, LoadStatus, TIMED_OUT_MESSAGE, TIMED_OUT_REMEDIATION};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub kind: &'static str,
    pub message: &'static str,
    pub remediation: &'static str,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSummary {
    pub fingerprint: Option<String>,
    pub nodes: usize,
    pub meshes: usize,
    pub materials: usize,
    pub textures: usize,
    pub draw_items: usize,
    pub bounds_min: [f64; 3],
    pub bounds_max: [f64; 3],
    pub gpu_bytes: usize,
    pub normalized_materials: usize,
    pub normalized_textures: usize,
}

impl SceneSummary {
    pub fn new(scene: &SceneGraph, normalized: NormalizeReport) -> Self {
        let bounds = scene.world_bounds();
        Self {
            fingerprint: scene.fingerprint().map(str::to_string),
            nodes: scene.node_count(),
            meshes: scene.meshes().len(),
            materials: scene.materials().len(),
            textures: scene.textures().len(),
            draw_items: scene.draw_items().len(),
            bounds_min: bounds.min,
            bounds_max: bounds.max,
            gpu_bytes: scene.gpu_bytes(),
            normalized_materials: normalized.materials,
            normalized_textures: normalized.textures,
        }
    }
}

/// Outcome of one checked load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub url: String,
    pub state: LoadState,
    pub elapsed_s: f64,
    pub failure: Option<Failure>,
    pub scene: Option<SceneSummary>,
}

impl CheckReport {
    pub fn new(status: &LoadStatus, elapsed_s: f64, scene: Option<SceneSummary>) -> Self {
        let failure = match (&status.error, status.state) {
            (Some(err), _) => Some(Failure {
                kind: err.kind.as_str(),
                message: err.user_message(),
                remediation: err.remediation(),
                detail: err.detail.clone(),
            }),
            (None, LoadState::TimedOut) => Some(Failure {
                kind: "timed_out",
                message: TIMED_OUT_MESSAGE,
                remediation: TIMED_OUT_REMEDIATION,
                detail: String::new(),
            }),
            _ => None,
        };
        Self {
            url: status.url.clone().unwrap_or_default(),
            state: status.state,
            elapsed_s,
            failure,
            scene,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "url:        {}", self.url)?;
        writeln!(f, "state:      {} ({:.2}s)", self.state, self.elapsed_s)?;
        if let Some(fail) = &self.failure {
            writeln!(f, "error:      {} ({})", fail.message, fail.kind)?;
            if !fail.detail.is_empty() {
                writeln!(f, "detail:     {}", fail.detail)?;
            }
            writeln!(f, "hint:       {}", fail.remediation)?;
        }
        if let Some(s) = &self.scene {
            writeln!(f, "fingerprint: {}", s.fingerprint.as_deref().unwrap_or("-"))?;
            writeln!(
                f,
                "scene:      {} nodes, {} meshes, {} materials, {} textures, {} draws",
                s.nodes, s.meshes, s.materials, s.textures, s.draw_items
            )?;
            writeln!(
                f,
                "bounds:     [{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
                s.bounds_min[0],
                s.bounds_min[1],
                s.bounds_min[2],
                s.bounds_max[0],
                s.bounds_max[1],
                s.bounds_max[2]
            )?;
            writeln!(
                f,
                "normalized: {} materials, {} textures ({} bytes resident)",
                s.normalized_materials, s.normalized_textures, s.gpu_bytes
            )?;
        }
        Ok(())
    }
}
