use foundation::math::Vec3;
use runtime::device::DeviceClass;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

impl CameraPose {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self { position, target }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CameraPreset {
    Left,
    Right,
    Front,
    Back,
    Top,
    TopLeft,
    TopRight,
}

impl CameraPreset {
    pub const ALL: [CameraPreset; 7] = [
        CameraPreset::Left,
        CameraPreset::Right,
        CameraPreset::Front,
        CameraPreset::Back,
        CameraPreset::Top,
        CameraPreset::TopLeft,
        CameraPreset::TopRight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CameraPreset::Left => "left",
            CameraPreset::Right => "right",
            CameraPreset::Front => "front",
            CameraPreset::Back => "back",
            CameraPreset::Top => "top",
            CameraPreset::TopLeft => "topLeft",
            CameraPreset::TopRight => "topRight",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name))
    }

    /// Device-specific pose. Mobile variants sit further back so the model
    /// fits a narrow portrait viewport.
    pub fn pose(self, class: DeviceClass) -> CameraPose {
        let target = Vec3::new(0.0, 0.4, 0.0);
        let [x, y, z] = match (class, self) {
            (DeviceClass::Desktop, CameraPreset::Front) => [0.0, 1.0, 3.0],
            (DeviceClass::Desktop, CameraPreset::Back) => [0.0, 1.0, -3.0],
            (DeviceClass::Desktop, CameraPreset::Left) => [-3.0, 1.0, 0.0],
            (DeviceClass::Desktop, CameraPreset::Right) => [3.0, 1.0, 0.0],
            (DeviceClass::Desktop, CameraPreset::Top) => [0.0, 3.5, 0.01],
            (DeviceClass::Desktop, CameraPreset::TopLeft) => [-2.0, 2.5, 2.0],
            (DeviceClass::Desktop, CameraPreset::TopRight) => [2.0, 2.5, 2.0],
            (DeviceClass::Mobile, CameraPreset::Front) => [0.0, 1.2, 4.2],
            (DeviceClass::Mobile, CameraPreset::Back) => [0.0, 1.2, -4.2],
            (DeviceClass::Mobile, CameraPreset::Left) => [-4.2, 1.2, 0.0],
            (DeviceClass::Mobile, CameraPreset::Right) => [4.2, 1.2, 0.0],
            (DeviceClass::Mobile, CameraPreset::Top) => [0.0, 4.8, 0.01],
            (DeviceClass::Mobile, CameraPreset::TopLeft) => [-2.8, 3.2, 2.8],
            (DeviceClass::Mobile, CameraPreset::TopRight) => [2.8, 3.2, 2.8],
        };
        CameraPose::new(Vec3::new(x, y, z), target)
    }
}

impl std::fmt::Display for CameraPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
