pub mod animation;
pub mod camera;
pub mod light;

use glam::{Mat4, Quat, Vec3};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_MATERIAL_HANDLE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryId(u64);

/// Triangle list with per-vertex position, normal and uv.
#[derive(Debug)]
pub struct Geometry {
    id: GeometryId,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Missing normals are computed from the triangles, missing uvs are zeroed and missing
    /// indices are generated in vertex order.
    pub fn new(
        positions: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
        uvs: Option<Vec<[f32; 2]>>,
        indices: Option<Vec<u32>>,
    ) -> Self {
        let indices = indices.unwrap_or_else(|| (0..positions.len() as u32).collect());
        let normals = match normals {
            Some(normals) if normals.len() == positions.len() => normals,
            _ => smooth_normals(&positions, &indices),
        };
        let uvs = match uvs {
            Some(uvs) if uvs.len() == positions.len() => uvs,
            _ => vec![[0.0, 0.0]; positions.len()],
        };
        Self {
            id: GeometryId(NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed)),
            positions,
            normals,
            uvs,
            indices,
        }
    }

    /// Unit plane in the XY plane facing +Z.
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Self::new(
            vec![[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]],
            Some(vec![[0.0, 0.0, 1.0]; 4]),
            Some(vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]),
            Some(vec![0, 1, 2, 0, 2, 3]),
        )
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }
}

fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accum = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let (pa, pb, pc) = (
            Vec3::from_array(positions[a]),
            Vec3::from_array(positions[b]),
            Vec3::from_array(positions[c]),
        );
        let face = (pb - pa).cross(pc - pa);
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }
    accum
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

/// Identity of a runtime material instance. Equal handles mean the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(u64);

impl MaterialHandle {
    pub fn allocate() -> Self {
        Self(NEXT_MATERIAL_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Metallic-roughness factors authored in the source asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthoredMaterial {
    pub name: Option<String>,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
}

impl Default for AuthoredMaterial {
    fn default() -> Self {
        Self {
            name: None,
            base_color: [1.0, 1.0, 1.0, 1.0],
            metallic: 1.0,
            roughness: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterialRef {
    Authored(AuthoredMaterial),
    Shared(MaterialHandle),
}

#[derive(Debug, Clone)]
pub struct MeshNode {
    pub geometry: Arc<Geometry>,
    pub material: MaterialRef,
}

/// Perspective parameters of a camera stored in the asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraDesc {
    pub yfov_deg: f32,
    pub aspect: Option<f32>,
    pub znear: f32,
    pub zfar: Option<f32>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Empty,
    Mesh(MeshNode),
    Camera,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>, transform: Transform, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform,
            kind,
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn mesh(&self) -> Option<&MeshNode> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

/// Ownership tree of scene nodes stored in a flat arena.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    world: Vec<Mat4>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, parent: Option<NodeId>, mut node: Node) -> NodeId {
        let id = self.nodes.len();
        node.parent = parent.filter(|p| *p < id);
        node.children.clear();
        match node.parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.roots.push(id),
        }
        self.nodes.push(node);
        self.world.push(Mat4::IDENTITY);
        id
    }

    /// Moves every node of `other` under this graph's root level. Returns the offset that
    /// was added to `other`'s node ids.
    pub fn attach(&mut self, other: SceneGraph) -> NodeId {
        let offset = self.nodes.len();
        for mut node in other.nodes {
            node.parent = node.parent.map(|p| p + offset);
            for child in &mut node.children {
                *child += offset;
            }
            self.nodes.push(node);
        }
        self.roots.extend(other.roots.into_iter().map(|r| r + offset));
        self.world.extend(other.world);
        offset
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Depth-first, parents before children.
    pub fn traverse(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        order
    }

    pub fn mesh_nodes(&self) -> impl Iterator<Item = (NodeId, &MeshNode)> + '_ {
        self.traverse()
            .into_iter()
            .filter_map(move |id| self.nodes[id].mesh().map(|mesh| (id, mesh)))
    }

    pub fn for_each_mesh_mut(&mut self, mut visit: impl FnMut(&mut MeshNode)) {
        for id in self.traverse() {
            if let NodeKind::Mesh(mesh) = &mut self.nodes[id].kind {
                visit(mesh);
            }
        }
    }

    pub fn update_world_transforms(&mut self) {
        for id in self.traverse() {
            let local = self.nodes[id].transform.matrix();
            self.world[id] = match self.nodes[id].parent {
                Some(parent) => self.world[parent] * local,
                None => local,
            };
        }
    }

    pub fn world_transform(&self, id: NodeId) -> Mat4 {
        self.world.get(id).copied().unwrap_or(Mat4::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(material: MaterialRef) -> NodeKind {
        NodeKind::Mesh(MeshNode {
            geometry: Arc::new(Geometry::plane(1.0, 1.0)),
            material,
        })
    }

    #[test]
    fn traverse_visits_parents_first() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(None, Node::new("root", Transform::IDENTITY, NodeKind::Empty));
        let a = graph.add_node(Some(root), Node::new("a", Transform::IDENTITY, NodeKind::Empty));
        let b = graph.add_node(Some(a), Node::new("b", Transform::IDENTITY, NodeKind::Empty));
        let c = graph.add_node(Some(root), Node::new("c", Transform::IDENTITY, NodeKind::Empty));
        assert_eq!(graph.traverse(), vec![root, a, b, c]);
    }

    #[test]
    fn world_transforms_compose_down_the_tree() {
        let mut graph = SceneGraph::new();
        let mut parent = Transform::IDENTITY;
        parent.translation = Vec3::new(1.0, 0.0, 0.0);
        let mut child = Transform::IDENTITY;
        child.translation = Vec3::new(0.0, 2.0, 0.0);
        let p = graph.add_node(None, Node::new("p", parent, NodeKind::Empty));
        let c = graph.add_node(Some(p), Node::new("c", child, NodeKind::Empty));
        graph.update_world_transforms();
        let origin = graph.world_transform(c).transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn attach_offsets_ids_and_keeps_structure() {
        let mut graph = SceneGraph::new();
        graph.add_node(None, Node::new("plane", Transform::IDENTITY, mesh(MaterialRef::Authored(AuthoredMaterial::default()))));

        let mut other = SceneGraph::new();
        let root = other.add_node(None, Node::new("model", Transform::IDENTITY, NodeKind::Empty));
        other.add_node(Some(root), Node::new("part", Transform::IDENTITY, mesh(MaterialRef::Authored(AuthoredMaterial::default()))));

        let offset = graph.attach(other);
        assert_eq!(offset, 1);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.roots(), &[0, 1]);
        assert_eq!(graph.node(1).map(|n| n.children().to_vec()), Some(vec![2]));
        assert_eq!(graph.node(2).and_then(|n| n.parent()), Some(1));
        assert_eq!(graph.mesh_nodes().count(), 2);
    }

    #[test]
    fn geometry_fills_missing_attributes() {
        let geometry = Geometry::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            None,
            None,
        );
        assert_eq!(geometry.indices, vec![0, 1, 2]);
        assert_eq!(geometry.uvs.len(), 3);
        for normal in &geometry.normals {
            assert!((Vec3::from_array(*normal) - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn handles_and_geometry_ids_are_unique() {
        assert_ne!(MaterialHandle::allocate(), MaterialHandle::allocate());
        assert_ne!(Geometry::plane(1.0, 1.0).id(), Geometry::plane(1.0, 1.0).id());
    }
}
