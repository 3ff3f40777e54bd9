// Geometry module for Wirescape

use std::collections::HashSet;
use std::f32::consts::PI;

/// Shape descriptor: primitive kind plus its dimensions and subdivision counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Plane {
        width: f32,
        height: f32,
        width_segments: u32,
        height_segments: u32,
    },
    Box {
        width: f32,
        height: f32,
        depth: f32,
        width_segments: u32,
        height_segments: u32,
        depth_segments: u32,
    },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
}

/// Tessellated shape. `indices` is a triangle list, `edges` a line list of the
/// unique triangle edges used when a material is drawn as wireframe.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub shape: Shape,
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub edges: Vec<u32>,
}

impl Geometry {
    pub fn new(shape: Shape) -> Self {
        let mut builder = Builder::default();
        match shape {
            Shape::Plane {
                width,
                height,
                width_segments,
                height_segments,
            } => builder.plane(width, height, width_segments, height_segments),
            Shape::Box {
                width,
                height,
                depth,
                width_segments,
                height_segments,
                depth_segments,
            } => builder.cuboid(
                [width, height, depth],
                [width_segments, height_segments, depth_segments],
            ),
            Shape::Sphere {
                radius,
                width_segments,
                height_segments,
            } => builder.sphere(radius, width_segments, height_segments),
        }

        let edges = unique_edges(&builder.indices);
        Self {
            shape,
            positions: builder.positions,
            indices: builder.indices,
            edges,
        }
    }

    pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        Self::new(Shape::Plane {
            width,
            height,
            width_segments,
            height_segments,
        })
    }

    pub fn cuboid(size: [f32; 3], segments: [u32; 3]) -> Self {
        Self::new(Shape::Box {
            width: size[0],
            height: size[1],
            depth: size[2],
            width_segments: segments[0],
            height_segments: segments[1],
            depth_segments: segments[2],
        })
    }

    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        Self::new(Shape::Sphere {
            radius,
            width_segments,
            height_segments,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Default)]
struct Builder {
    positions: Vec<[f32; 3]>,
    indices: Vec<u32>,
}

impl Builder {
    fn plane(&mut self, width: f32, height: f32, width_segments: u32, height_segments: u32) {
        let grid_x = width_segments.max(1);
        let grid_y = height_segments.max(1);
        let segment_width = width / grid_x as f32;
        let segment_height = height / grid_y as f32;

        for iy in 0..=grid_y {
            let y = iy as f32 * segment_height - height / 2.0;
            for ix in 0..=grid_x {
                let x = ix as f32 * segment_width - width / 2.0;
                self.positions.push([x, -y, 0.0]);
            }
        }
        self.grid_indices(0, grid_x, grid_y);
    }

    /// Six faces, each an independent subdivided grid.
    fn cuboid(&mut self, size: [f32; 3], segments: [u32; 3]) {
        let [w, h, d] = size;
        let [ws, hs, ds] = segments.map(|s| s.max(1));
        // (u, v, w) axes, u/v directions, face extent along u/v, offset along w
        self.face([2, 1, 0], -1.0, -1.0, [d, h], w, [ds, hs]);
        self.face([2, 1, 0], 1.0, -1.0, [d, h], -w, [ds, hs]);
        self.face([0, 2, 1], 1.0, 1.0, [w, d], h, [ws, ds]);
        self.face([0, 2, 1], 1.0, -1.0, [w, d], -h, [ws, ds]);
        self.face([0, 1, 2], 1.0, -1.0, [w, h], d, [ws, hs]);
        self.face([0, 1, 2], -1.0, -1.0, [w, h], -d, [ws, hs]);
    }

    fn face(
        &mut self,
        axes: [usize; 3],
        u_dir: f32,
        v_dir: f32,
        extent: [f32; 2],
        depth: f32,
        grid: [u32; 2],
    ) {
        let [u, v, w] = axes;
        let [grid_x, grid_y] = grid;
        let segment_width = extent[0] / grid_x as f32;
        let segment_height = extent[1] / grid_y as f32;
        let offset = self.positions.len() as u32;

        for iy in 0..=grid_y {
            let y = iy as f32 * segment_height - extent[1] / 2.0;
            for ix in 0..=grid_x {
                let x = ix as f32 * segment_width - extent[0] / 2.0;
                let mut p = [0.0; 3];
                p[u] = x * u_dir;
                p[v] = y * v_dir;
                p[w] = depth / 2.0;
                self.positions.push(p);
            }
        }
        self.grid_indices(offset, grid_x, grid_y);
    }

    fn grid_indices(&mut self, offset: u32, grid_x: u32, grid_y: u32) {
        let row = grid_x + 1;
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = offset + ix + row * iy;
                let b = offset + ix + row * (iy + 1);
                let c = offset + (ix + 1) + row * (iy + 1);
                let d = offset + (ix + 1) + row * iy;
                self.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
    }

    fn sphere(&mut self, radius: f32, width_segments: u32, height_segments: u32) {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let row = width_segments + 1;

        for iy in 0..=height_segments {
            let theta = iy as f32 / height_segments as f32 * PI;
            for ix in 0..=width_segments {
                let phi = ix as f32 / width_segments as f32 * 2.0 * PI;
                self.positions.push([
                    -radius * phi.cos() * theta.sin(),
                    radius * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                ]);
            }
        }

        // The first and last rings collapse to a pole; skip their degenerate halves.
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                if iy != 0 {
                    self.indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    self.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
    }
}

fn unique_edges(triangles: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::with_capacity(triangles.len());
    let mut edges = Vec::with_capacity(triangles.len());
    for tri in triangles.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            if seen.insert((a.min(b), a.max(b))) {
                edges.push(a);
                edges.push(b);
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn plane_counts() {
        let plane = Geometry::plane(100.0, 100.0, 300, 300);
        assert_eq!(plane.vertex_count(), 301 * 301);
        assert_eq!(plane.triangle_count(), 300 * 300 * 2);
        assert!(plane.vertex_count() > usize::from(u16::MAX));
    }

    #[test]
    fn plane_spans_its_extent() {
        let plane = Geometry::plane(100.0, 100.0, 4, 4);
        let max_x = plane.positions.iter().map(|p| p[0]).fold(f32::MIN, f32::max);
        let min_y = plane.positions.iter().map(|p| p[1]).fold(f32::MAX, f32::min);
        assert_abs_diff_eq!(max_x, 50.0);
        assert_abs_diff_eq!(min_y, -50.0);
        assert!(plane.positions.iter().all(|p| p[2] == 0.0));
    }

    #[test]
    fn plane_edges_include_diagonals_once() {
        let plane = Geometry::plane(1.0, 1.0, 2, 2);
        // 6 horizontal + 6 vertical + 4 diagonals
        assert_eq!(plane.edges.len() / 2, 16);
    }

    #[test]
    fn subdivided_cube_counts() {
        let cube = Geometry::cuboid([1.0, 1.0, 1.0], [3, 3, 3]);
        assert_eq!(cube.vertex_count(), 6 * 16);
        assert_eq!(cube.triangle_count(), 6 * 9 * 2);
        assert_eq!(cube.edges.len() / 2, 6 * 33);
    }

    #[test]
    fn cube_vertices_lie_on_its_surface() {
        let cube = Geometry::cuboid([1.0, 1.0, 1.0], [3, 3, 3]);
        for p in &cube.positions {
            let max = p.iter().fold(0.0f32, |m, c| m.max(c.abs()));
            assert_abs_diff_eq!(max, 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn sphere_counts_and_radius() {
        let sphere = Geometry::sphere(5.0, 32, 16);
        assert_eq!(sphere.vertex_count(), 33 * 17);
        assert_eq!(sphere.triangle_count(), 32 * 16 * 2 - 2 * 32);
        for p in &sphere.positions {
            let len = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert_abs_diff_eq!(len, 5.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn edges_are_unique() {
        let sphere = Geometry::sphere(1.0, 8, 4);
        let mut seen = HashSet::new();
        for e in sphere.edges.chunks_exact(2) {
            assert!(seen.insert((e[0].min(e[1]), e[0].max(e[1]))));
        }
    }
}
