//! Minimal, self-contained sample assets for tests and tooling.

use crate::glb::write_glb;

/// Binary buffer of the sample chair: three `VEC3<f32>` positions, three
/// `VEC2<f32>` UVs, then three `u16` indices.
pub fn sample_chair_bin() -> Vec<u8> {
    let positions: [[f32; 3]; 3] = [[-0.5, -0.5, 0.0], [0.5, -0.5, 0.0], [0.0, 0.5, 0.0]];
    let uvs: [[f32; 2]; 3] = [[0.0, 1.0], [1.0, 1.0], [0.5, 0.0]];
    let indices: [u16; 3] = [0, 1, 2];

    let mut out: Vec<u8> = positions
        .iter()
        .flatten()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    out.extend(uvs.iter().flatten().flat_map(|v| v.to_le_bytes()));
    out.extend(indices.iter().flat_map(|v| v.to_le_bytes()));
    out
}

/// glTF JSON for a one-mesh "chair" with an authored (non-normalized)
/// material and a 2x2 embedded PNG.
pub fn sample_chair_json() -> String {
    r#"{
  "asset": { "version": "2.0", "generator": "sample" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [{ "name": "chair", "mesh": 0, "translation": [0.0, 0.5, 0.0] }],
  "meshes": [{
    "name": "seat",
    "primitives": [{ "attributes": { "POSITION": 0, "TEXCOORD_0": 1 }, "indices": 2, "material": 0 }]
  }],
  "materials": [{
    "name": "oak",
    "pbrMetallicRoughness": {
      "baseColorFactor": [0.5, 0.3, 0.1, 0.8],
      "baseColorTexture": { "index": 0 },
      "metallicFactor": 0.7,
      "roughnessFactor": 0.2
    },
    "emissiveFactor": [0.1, 0.0, 0.0],
    "alphaMode": "BLEND",
    "doubleSided": true
  }],
  "textures": [{ "name": "oak-grain", "sampler": 0, "source": 0 }],
  "samplers": [{ "magFilter": 9728, "minFilter": 9728, "wrapS": 33071, "wrapT": 33648 }],
  "images": [{ "uri": "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAIAAAACCAYAAABytg0kAAAAFklEQVR4nGM4MS3qf0WAxn8GEAHiAABR6AlNupod4gAAAABJRU5ErkJggg==" }],
  "accessors": [
    {
      "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [-0.5, -0.5, 0.0], "max": [0.5, 0.5, 0.0]
    },
    { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" },
    { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ],
  "bufferViews": [
    { "buffer": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 24 },
    { "buffer": 0, "byteOffset": 60, "byteLength": 6 }
  ],
  "buffers": [{ "byteLength": 66 }]
}"#
    .to_string()
}

pub fn sample_chair_glb() -> Vec<u8> {
    write_glb(&sample_chair_json(), &sample_chair_bin())
}
