// Scene module for Wirescape

use glam::{Mat4, Vec3};
use std::f32::consts::FRAC_PI_2;

use crate::geometry::Geometry;
use crate::material::{Color, Material};
use crate::math::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Mesh {
        geometry: GeometryId,
        material: MaterialId,
    },
}

/// Represents an object within the 3D scene.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// A mesh that survived the visibility walk, with its composed world matrix.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem {
    pub node: NodeId,
    pub world: Mat4,
    pub geometry: GeometryId,
    pub material: MaterialId,
}

/// Represents the entire 3D scene. Nodes, geometries and materials live in
/// arenas; meshes refer to geometries and materials by id so several meshes
/// can share one material.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    geometries: Vec<Geometry>,
    materials: Vec<Material>,
}

impl Scene {
    /// Creates a new, empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.push(geometry);
        GeometryId(self.geometries.len() - 1)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Adds a group under `parent`, or at the root when `parent` is `None`.
    pub fn add_group(
        &mut self,
        name: &str,
        transform: Transform,
        parent: Option<NodeId>,
    ) -> NodeId {
        self.insert(name, NodeKind::Group, transform, parent)
    }

    pub fn add_mesh(
        &mut self,
        name: &str,
        geometry: GeometryId,
        material: MaterialId,
        transform: Transform,
        parent: Option<NodeId>,
    ) -> NodeId {
        self.insert(name, NodeKind::Mesh { geometry, material }, transform, parent)
    }

    fn insert(
        &mut self,
        name: &str,
        kind: NodeKind,
        transform: Transform,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_owned(),
            kind,
            transform,
            visible: true,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn geometry(&self, id: GeometryId) -> &Geometry {
        &self.geometries[id.0]
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.0]
    }

    pub fn material_mut(&mut self, id: MaterialId) -> &mut Material {
        &mut self.materials[id.0]
    }

    /// Gets a node by name.
    #[cfg(test)]
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Local transforms composed from the root down to `id`.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let node = self.node(id);
        let local = node.transform.matrix();
        match node.parent() {
            Some(parent) => self.world_matrix(parent) * local,
            None => local,
        }
    }

    /// A node is drawn only if it and every ancestor are visible.
    #[cfg(test)]
    pub fn is_visible(&self, id: NodeId) -> bool {
        let node = self.node(id);
        node.visible && node.parent.map_or(true, |p| self.is_visible(p))
    }

    /// Depth-first list of meshes to draw this frame.
    pub fn visible_meshes(&self) -> Vec<DrawItem> {
        let mut items = Vec::new();
        for &root in &self.roots {
            self.collect(root, Mat4::IDENTITY, &mut items);
        }
        items
    }

    fn collect(&self, id: NodeId, parent_world: Mat4, items: &mut Vec<DrawItem>) {
        let node = self.node(id);
        if !node.visible {
            return;
        }
        let world = parent_world * node.transform.matrix();
        if let NodeKind::Mesh { geometry, material } = node.kind {
            items.push(DrawItem {
                node: id,
                world,
                geometry,
                material,
            });
        }
        for &child in &node.children {
            self.collect(child, world, items);
        }
    }
}

pub const CUBE_OFFSETS: [(f32, f32); 5] =
    [(-3.0, 2.0), (-1.5, 3.0), (0.0, 4.0), (1.5, 3.0), (3.0, 2.0)];
pub const SUN_POSITION: Vec3 = Vec3::new(50.0, 50.0, -200.0);
pub const SUN_RADIUS: f32 = 5.0;

/// The decorative scene plus handles to the parts the debug panel edits.
#[derive(Debug)]
pub struct DemoScene {
    pub scene: Scene,
    pub plane: NodeId,
    pub group: NodeId,
    pub cubes: [NodeId; 5],
    pub sun: NodeId,
    pub cube_material: MaterialId,
    pub sun_material: MaterialId,
}

/// Ground plane, an arc of five cubes in a group, and the sun.
pub fn build_scene(cube_color: Color, sun_color: Color) -> DemoScene {
    let mut scene = Scene::new();

    let plane_geometry = scene.add_geometry(Geometry::plane(100.0, 100.0, 300, 300));
    let plane_material = scene.add_material(Material::wireframe(Color::WHITE));
    let plane = scene.add_mesh(
        "plane",
        plane_geometry,
        plane_material,
        Transform::identity().with_rotation(Vec3::new(-FRAC_PI_2, 0.0, 0.0)),
        None,
    );

    let group = scene.add_group("group", Transform::identity(), None);
    let cube_geometry = scene.add_geometry(Geometry::cuboid([1.0, 1.0, 1.0], [3, 3, 3]));
    let cube_material = scene.add_material(Material::wireframe(cube_color));
    let cubes = std::array::from_fn(|i| {
        let (x, y) = CUBE_OFFSETS[i];
        scene.add_mesh(
            &format!("cube{}", i + 1),
            cube_geometry,
            cube_material,
            Transform::from_position(Vec3::new(x, y, 0.0)),
            Some(group),
        )
    });

    let sun_geometry = scene.add_geometry(Geometry::sphere(SUN_RADIUS, 32, 16));
    let sun_material = scene.add_material(Material::wireframe(sun_color));
    let sun = scene.add_mesh(
        "sun",
        sun_geometry,
        sun_material,
        Transform::from_position(SUN_POSITION),
        None,
    );

    let demo = DemoScene {
        scene,
        plane,
        group,
        cubes,
        sun,
        cube_material,
        sun_material,
    };
    log::debug!(
        "built scene with {} nodes: plane {:?}, {} cubes, sun {:?}",
        demo.scene.node_count(),
        demo.plane,
        demo.cubes.len(),
        demo.sun
    );
    demo
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Shape;
    use approx::assert_abs_diff_eq;

    fn demo() -> DemoScene {
        build_scene(Color::WHITE, Color::YELLOW)
    }

    fn mesh_material(scene: &Scene, id: NodeId) -> MaterialId {
        match scene.node(id).kind {
            NodeKind::Mesh { material, .. } => material,
            NodeKind::Group => panic!("not a mesh"),
        }
    }

    #[test]
    fn cubes_form_symmetric_arc() {
        let demo = demo();
        let position = |c: NodeId| demo.scene.node(c).transform.position;
        let xs: Vec<f32> = demo.cubes.iter().map(|&c| position(c).x).collect();
        let ys: Vec<f32> = demo.cubes.iter().map(|&c| position(c).y).collect();
        assert_eq!(xs, vec![-3.0, -1.5, 0.0, 1.5, 3.0]);
        assert_eq!(ys, vec![2.0, 3.0, 4.0, 3.0, 2.0]);
        for &cube in &demo.cubes {
            assert_eq!(demo.scene.node(cube).parent(), Some(demo.group));
        }
    }

    #[test]
    fn sun_position_and_radius() {
        let demo = demo();
        assert_eq!(demo.scene.node(demo.sun).transform.position, Vec3::new(50.0, 50.0, -200.0));
        let NodeKind::Mesh { geometry, .. } = demo.scene.node(demo.sun).kind else {
            panic!("sun must be a mesh");
        };
        match demo.scene.geometry(geometry).shape {
            Shape::Sphere { radius, width_segments, height_segments } => {
                assert_eq!(radius, 5.0);
                assert_eq!((width_segments, height_segments), (32, 16));
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn every_material_starts_as_wireframe() {
        let demo = demo();
        for item in demo.scene.visible_meshes() {
            assert!(demo.scene.material(item.material).wireframe);
        }
    }

    #[test]
    fn plane_lies_flat() {
        let demo = demo();
        let world = demo.scene.world_matrix(demo.plane);
        let normal = world.transform_vector3(Vec3::Z);
        assert!(normal.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn cubes_share_one_material() {
        let mut demo = demo();
        for &cube in &demo.cubes {
            assert_eq!(mesh_material(&demo.scene, cube), demo.cube_material);
        }
        assert_ne!(mesh_material(&demo.scene, demo.sun), demo.cube_material);

        demo.scene.material_mut(demo.cube_material).color = Color::from_hex(0xff0000);
        for &cube in &demo.cubes {
            let id = mesh_material(&demo.scene, cube);
            assert_eq!(demo.scene.material(id).color, Color::from_hex(0xff0000));
        }
        assert_eq!(demo.scene.material(demo.sun_material).color, Color::YELLOW);
    }

    #[test]
    fn sun_material_is_independent() {
        let mut demo = demo();
        demo.scene.material_mut(demo.sun_material).color = Color::from_hex(0x00ff00);
        assert_eq!(demo.scene.material(demo.cube_material).color, Color::WHITE);
    }

    #[test]
    fn group_transform_composes_with_children() {
        let mut demo = demo();
        demo.scene.node_mut(demo.group).transform.position = Vec3::new(1.0, -2.0, 0.0);
        let world = demo.scene.world_matrix(demo.cubes[2]);
        let origin = world.transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-6));
    }

    #[test]
    fn hiding_group_hides_cubes_only() {
        let mut demo = demo();
        assert_eq!(demo.scene.visible_meshes().len(), 7);
        demo.scene.node_mut(demo.group).visible = false;
        assert!(!demo.scene.is_visible(demo.cubes[0]));
        let drawn: Vec<NodeId> = demo.scene.visible_meshes().iter().map(|i| i.node).collect();
        assert_eq!(drawn, vec![demo.plane, demo.sun]);
    }

    #[test]
    fn group_rotation_spins_children_about_group_origin() {
        let mut demo = demo();
        demo.scene.node_mut(demo.group).transform.rotation.y = std::f32::consts::PI;
        let p = demo.scene.world_matrix(demo.cubes[0]).transform_point3(Vec3::ZERO);
        assert_abs_diff_eq!(p.x, 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.y, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn find_by_name() {
        let demo = demo();
        assert_eq!(demo.scene.find("group"), Some(demo.group));
        assert_eq!(demo.scene.find("cube3"), Some(demo.cubes[2]));
        assert_eq!(demo.scene.find("moon"), None);
    }
}
