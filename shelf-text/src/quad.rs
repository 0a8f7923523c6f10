//! Geometry produced by the atlas: rectangles, textured quads, and the
//! orthographic projection that takes pixel quads into clip space.
//!
//! [`Vertex`] and [`Quad`] derive `bytemuck::Pod` + `Zeroable` so a slice
//! of quads uploads to a GPU vertex buffer without copying.

use bytemuck::{Pod, Zeroable};

// ── Rectangles ──────────────────────────────────────────────────────

/// Pixel rectangle of one cached glyph inside the atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlyphRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl GlyphRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Whether the two rectangles share any pixel.
    pub fn intersects(&self, other: &GlyphRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Normalize against an atlas of `atlas_width × atlas_height`.
    pub fn normalized(&self, atlas_width: u32, atlas_height: u32) -> TexRect {
        TexRect {
            x: self.x as f32 / atlas_width as f32,
            y: self.y as f32 / atlas_height as f32,
            width: self.width as f32 / atlas_width as f32,
            height: self.height as f32 / atlas_height as f32,
        }
    }
}

/// Atlas-relative rectangle in `[0, 1]` texture units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TexRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Screen-space layout region in pixels (origin top-left, y down).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// Layout region in normalized device coordinates.
///
/// `(x, y)` is the top-left corner with y pointing up, so the full
/// viewport is `NdcRect { x: -1.0, y: 1.0, width: 2.0, height: 2.0 }`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NdcRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NdcRect {
    pub const FULL: Self = Self {
        x: -1.0,
        y: 1.0,
        width: 2.0,
        height: 2.0,
    };

    /// Pixel region covered by this rectangle on a `viewport` of
    /// `(width, height)` pixels. Truncates toward zero.
    pub fn to_pixels(&self, viewport: (u32, u32)) -> PixelRect {
        let half_w = viewport.0 as f32 * 0.5;
        let half_h = viewport.1 as f32 * 0.5;
        PixelRect {
            x: ((self.x + 1.0) * half_w) as i32,
            y: ((1.0 - self.y) * half_h) as i32,
            width: (self.width * half_w) as i32,
            height: (self.height * half_h) as i32,
        }
    }
}

// ── Vertices and quads ──────────────────────────────────────────────

/// A position paired with a texture coordinate.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

/// Corner of a [`Quad`], in storage order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Corner {
    TopLeft = 0,
    TopRight = 1,
    BottomRight = 2,
    BottomLeft = 3,
}

/// Four textured vertices: TopLeft, TopRight, BottomRight, BottomLeft.
///
/// Pixel quads carry positions and texture coordinates in pixels;
/// normalized quads carry clip-space positions and `[0, 1]` texture
/// coordinates. Quads are never cached: texture units depend on the atlas
/// size at the time they were produced.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Quad {
    pub top_left: Vertex,
    pub top_right: Vertex,
    pub bottom_right: Vertex,
    pub bottom_left: Vertex,
}

impl Quad {
    /// Corner order for a two-triangle list.
    pub const TRIANGLE_LIST: [Corner; 6] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::TopLeft,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    /// Corner order for a triangle strip.
    pub const TRIANGLE_STRIP: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    /// Pixel-space quad of `glyph`'s size placed at `(x, y)`, textured
    /// with `glyph` in atlas pixels.
    pub fn from_glyph(x: i32, y: i32, glyph: &GlyphRect) -> Self {
        let (left, top) = (x as f32, y as f32);
        let right = left + glyph.width as f32;
        let bottom = top + glyph.height as f32;
        let (u0, v0) = (glyph.x as f32, glyph.y as f32);
        let (u1, v1) = (glyph.right() as f32, glyph.bottom() as f32);
        Self {
            top_left: Vertex {
                position: [left, top],
                tex_coords: [u0, v0],
            },
            top_right: Vertex {
                position: [right, top],
                tex_coords: [u1, v0],
            },
            bottom_right: Vertex {
                position: [right, bottom],
                tex_coords: [u1, v1],
            },
            bottom_left: Vertex {
                position: [left, bottom],
                tex_coords: [u0, v1],
            },
        }
    }

    pub fn corner(&self, corner: Corner) -> &Vertex {
        match corner {
            Corner::TopLeft => &self.top_left,
            Corner::TopRight => &self.top_right,
            Corner::BottomRight => &self.bottom_right,
            Corner::BottomLeft => &self.bottom_left,
        }
    }

    pub fn vertices(&self) -> [Vertex; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Project positions through `projection` and divide pixel texture
    /// coordinates by the atlas size.
    pub fn project(&self, projection: &Orthographic, atlas_size: (u32, u32)) -> Self {
        let (aw, ah) = (atlas_size.0 as f32, atlas_size.1 as f32);
        let map = |v: &Vertex| Vertex {
            position: projection.apply(v.position),
            tex_coords: [v.tex_coords[0] / aw, v.tex_coords[1] / ah],
        };
        Self {
            top_left: map(&self.top_left),
            top_right: map(&self.top_right),
            bottom_right: map(&self.bottom_right),
            bottom_left: map(&self.bottom_left),
        }
    }
}

// ── Projection ──────────────────────────────────────────────────────

/// Orthographic projection from a `width × height` pixel viewport
/// (origin top-left, y down) to clip space (origin center, y up).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orthographic {
    /// 4×4 matrix, column-major.
    pub matrix: [[f32; 4]; 4],
}

impl Orthographic {
    pub fn new(width: f32, height: f32) -> Self {
        // ndc_x = x * (2 / width) - 1
        // ndc_y = 1 - y * (2 / height)
        let sx = 2.0 / width;
        let sy = -2.0 / height;
        Self {
            matrix: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [-1.0, 1.0, 0.0, 1.0],
            ],
        }
    }

    pub fn for_viewport(viewport: (u32, u32)) -> Self {
        Self::new(viewport.0 as f32, viewport.1 as f32)
    }

    /// Transform a pixel-space point (z = 0, w = 1).
    pub fn apply(&self, [x, y]: [f32; 2]) -> [f32; 2] {
        let m = &self.matrix;
        [
            x * m[0][0] + y * m[1][0] + m[3][0],
            x * m[0][1] + y * m[1][1] + m[3][1],
        ]
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-5 && (a[1] - b[1]).abs() < 1e-5
    }

    #[test]
    fn test_vertex_and_quad_sizes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 16);
        assert_eq!(std::mem::size_of::<Quad>(), 64);
    }

    #[test]
    fn test_quad_bytes_are_four_vertices() {
        let quad = Quad::from_glyph(3, 4, &GlyphRect::new(10, 20, 5, 6));
        let as_vertices: &[Vertex] = bytemuck::cast_slice(std::slice::from_ref(&quad));
        assert_eq!(as_vertices, &quad.vertices());
    }

    #[test]
    fn test_from_glyph_corners() {
        let quad = Quad::from_glyph(100, 50, &GlyphRect::new(8, 16, 10, 12));
        assert_eq!(quad.top_left.position, [100.0, 50.0]);
        assert_eq!(quad.top_right.position, [110.0, 50.0]);
        assert_eq!(quad.bottom_right.position, [110.0, 62.0]);
        assert_eq!(quad.bottom_left.position, [100.0, 62.0]);
        assert_eq!(quad.top_left.tex_coords, [8.0, 16.0]);
        assert_eq!(quad.bottom_right.tex_coords, [18.0, 28.0]);
    }

    #[test]
    fn test_triangle_orders() {
        let quad = Quad::from_glyph(0, 0, &GlyphRect::new(0, 0, 1, 1));
        let list: Vec<_> = Quad::TRIANGLE_LIST.iter().map(|&c| *quad.corner(c)).collect();
        assert_eq!(list[0], quad.top_left);
        assert_eq!(list[5], quad.bottom_left);
        assert_eq!(Quad::TRIANGLE_STRIP.map(|c| c as u8), [0, 1, 2, 3]);
    }

    #[test]
    fn test_ortho_corners() {
        let ortho = Orthographic::new(800.0, 600.0);
        assert!(approx(ortho.apply([0.0, 0.0]), [-1.0, 1.0]));
        assert!(approx(ortho.apply([800.0, 600.0]), [1.0, -1.0]));
        assert!(approx(ortho.apply([400.0, 300.0]), [0.0, 0.0]));
    }

    #[test]
    fn test_project_quad() {
        let quad = Quad::from_glyph(0, 0, &GlyphRect::new(32, 0, 16, 8));
        let projected = quad.project(&Orthographic::new(200.0, 100.0), (64, 32));
        assert!(approx(projected.top_left.position, [-1.0, 1.0]));
        assert!(approx(projected.bottom_right.position, [-0.84, 0.84]));
        assert!(approx(projected.top_left.tex_coords, [0.5, 0.0]));
        assert!(approx(projected.bottom_right.tex_coords, [0.75, 0.25]));
    }

    #[test]
    fn test_ndc_full_viewport_to_pixels() {
        assert_eq!(NdcRect::FULL.to_pixels((200, 100)), PixelRect::new(0, 0, 200, 100));
    }

    #[test]
    fn test_ndc_quadrant_to_pixels() {
        // Bottom-right quadrant.
        let region = NdcRect {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        };
        assert_eq!(region.to_pixels((200, 100)), PixelRect::new(100, 50, 100, 50));
    }

    #[test]
    fn test_glyph_rect_intersects() {
        let a = GlyphRect::new(0, 0, 10, 10);
        assert!(a.intersects(&GlyphRect::new(9, 9, 5, 5)));
        assert!(!a.intersects(&GlyphRect::new(10, 0, 5, 5)));
        assert!(!a.intersects(&GlyphRect::new(0, 10, 5, 5)));
    }

    #[test]
    fn test_glyph_rect_normalized() {
        let tex = GlyphRect::new(16, 8, 16, 8).normalized(64, 32);
        assert_eq!(tex, TexRect { x: 0.25, y: 0.25, width: 0.25, height: 0.25 });
    }
}
