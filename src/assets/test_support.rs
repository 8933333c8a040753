//! In-memory glTF fixtures shared by the asset and viewer tests.

use std::path::PathBuf;

const GLB_MAGIC: u32 = 0x4654_6C67;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

/// Binary glTF with three triangle mesh nodes under one root, a perspective camera at
/// (0, 1, 5) and a one-second translation clip on `part_a`.
pub(crate) fn sample_glb() -> Vec<u8> {
    build_sample(&[])
}

/// [`sample_glb`] declaring `extension` as used and required.
pub(crate) fn sample_glb_requiring(extension: &str) -> Vec<u8> {
    build_sample(&[extension])
}

fn build_sample(required: &[&str]) -> Vec<u8> {
    let mut bin = Vec::new();
    for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&value.to_le_bytes());
    }
    for value in [0.0f32, 1.0] {
        bin.extend_from_slice(&value.to_le_bytes());
    }
    for value in [0.0f32, 0.0, 0.0, 2.0, 0.0, 0.0] {
        bin.extend_from_slice(&value.to_le_bytes());
    }

    let mut json = serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "model", "children": [1, 2, 3, 4] },
            { "name": "part_a", "mesh": 0 },
            { "name": "part_b", "mesh": 0, "translation": [2.0, 0.0, 0.0] },
            { "name": "part_c", "mesh": 0, "translation": [-2.0, 0.0, 0.0] },
            { "name": "shot", "camera": 0, "translation": [0.0, 1.0, 5.0] }
        ],
        "meshes": [{
            "name": "tri",
            "primitives": [{ "attributes": { "POSITION": 0 } }]
        }],
        "cameras": [{
            "type": "perspective",
            "perspective": { "yfov": 0.8, "znear": 0.1, "zfar": 100.0 }
        }],
        "animations": [{
            "name": "slide",
            "channels": [{ "sampler": 0, "target": { "node": 1, "path": "translation" } }],
            "samplers": [{ "input": 1, "output": 2, "interpolation": "LINEAR" }]
        }],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            {
                "bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR",
                "min": [0.0], "max": [1.0]
            },
            { "bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC3" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 44, "byteLength": 24 }
        ],
        "buffers": [{ "byteLength": bin.len() }]
    });

    if !required.is_empty() {
        json["extensionsUsed"] = serde_json::json!(required);
        json["extensionsRequired"] = serde_json::json!(required);
    }

    let mut json_bytes = json.to_string().into_bytes();
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let total = 12 + 8 + json_bytes.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    glb.extend_from_slice(&json_bytes);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    glb.extend_from_slice(&bin);
    glb
}

/// Writes `bytes` to a unique file under the system temp directory.
pub(crate) fn write_temp(name: &str, bytes: Vec<u8>) -> PathBuf {
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!(
        "vitrine_{}_{}_{}",
        std::process::id(),
        nonce,
        name
    ));
    std::fs::write(&path, bytes).unwrap();
    path
}
