// Material module for Wirescape

/// 24-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::from_hex(0xffffff);
    pub const YELLOW: Color = Color::from_hex(0xffff00);
    pub const BLUE: Color = Color::from_hex(0x0000ff);

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    pub fn to_hex(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    pub fn to_srgb_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn from_srgb_array([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }

    /// Linear RGB components, for writing into an sRGB render target.
    pub fn to_linear(self) -> [f32; 3] {
        [
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
        ]
    }
}

fn srgb_to_linear(channel: u8) -> f32 {
    let c = f32::from(channel) / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Unlit material: a flat color, drawn either filled or as polygon edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub color: Color,
    pub wireframe: bool,
}

impl Material {
    pub fn wireframe(color: Color) -> Self {
        Self {
            color,
            wireframe: true,
        }
    }
}
