//! Linear RGBA color value type shared by sprites and presentation collaborators.

use std::ops::Mul;

use serde::{Deserialize, Serialize};

/// RGBA color whose channels are clamped to the range 0.0..=1.0.
///
/// Equality compares channels exactly. Two colors only compare equal when they
/// were produced through the same arithmetic, so callers should not expect
/// `Color::new(0.1 + 0.2, ..)` to equal `Color::new(0.3, ..)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    red: f32,
    green: f32,
    blue: f32,
    alpha: f32,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::opaque(0.0, 0.0, 0.0);
    /// Opaque blue.
    pub const BLUE: Self = Self::opaque(0.0, 0.0, 1.0);
    /// Opaque brown.
    pub const BROWN: Self = Self::opaque(1.0, 0.5, 0.0);
    /// Opaque cyan.
    pub const CYAN: Self = Self::opaque(0.0, 1.0, 1.0);
    /// Opaque dark blue.
    pub const DARK_BLUE: Self = Self::opaque(0.0, 0.0, 0.5);
    /// Opaque dark brown.
    pub const DARK_BROWN: Self = Self::opaque(0.5, 0.25, 0.0);
    /// Opaque dark cyan.
    pub const DARK_CYAN: Self = Self::opaque(0.0, 0.5, 0.5);
    /// Opaque dark gray.
    pub const DARK_GRAY: Self = Self::opaque(0.25, 0.25, 0.25);
    /// Opaque dark green.
    pub const DARK_GREEN: Self = Self::opaque(0.0, 0.5, 0.0);
    /// Opaque dark magenta.
    pub const DARK_MAGENTA: Self = Self::opaque(0.5, 0.0, 0.5);
    /// Opaque dark red.
    pub const DARK_RED: Self = Self::opaque(0.5, 0.0, 0.0);
    /// Opaque dark yellow.
    pub const DARK_YELLOW: Self = Self::opaque(0.5, 0.5, 0.0);
    /// Opaque gray.
    pub const GRAY: Self = Self::opaque(0.5, 0.5, 0.5);
    /// Opaque green.
    pub const GREEN: Self = Self::opaque(0.0, 1.0, 0.0);
    /// Opaque light blue.
    pub const LIGHT_BLUE: Self = Self::opaque(0.5, 0.5, 1.0);
    /// Opaque light brown.
    pub const LIGHT_BROWN: Self = Self::opaque(1.0, 0.75, 0.5);
    /// Opaque light cyan.
    pub const LIGHT_CYAN: Self = Self::opaque(0.5, 1.0, 1.0);
    /// Opaque light gray.
    pub const LIGHT_GRAY: Self = Self::opaque(0.75, 0.75, 0.75);
    /// Opaque light green.
    pub const LIGHT_GREEN: Self = Self::opaque(0.5, 1.0, 0.5);
    /// Opaque light magenta.
    pub const LIGHT_MAGENTA: Self = Self::opaque(1.0, 0.5, 1.0);
    /// Opaque light red.
    pub const LIGHT_RED: Self = Self::opaque(1.0, 0.5, 0.5);
    /// Opaque light yellow.
    pub const LIGHT_YELLOW: Self = Self::opaque(1.0, 1.0, 0.5);
    /// Opaque magenta.
    pub const MAGENTA: Self = Self::opaque(1.0, 0.0, 1.0);
    /// Opaque red.
    pub const RED: Self = Self::opaque(1.0, 0.0, 0.0);
    /// Fully transparent black.
    pub const TRANSPARENT_BLACK: Self = Self::constant(0.0, 0.0, 0.0, 0.0);
    /// Fully transparent white.
    pub const TRANSPARENT_WHITE: Self = Self::constant(1.0, 1.0, 1.0, 0.0);
    /// Opaque white.
    pub const WHITE: Self = Self::opaque(1.0, 1.0, 1.0);
    /// Opaque yellow.
    pub const YELLOW: Self = Self::opaque(1.0, 1.0, 0.0);

    // Palette entries are already in range, so they skip clamping.
    const fn constant(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    const fn opaque(red: f32, green: f32, blue: f32) -> Self {
        Self::constant(red, green, blue, 1.0)
    }

    /// Creates a color from floating point channels, clamping each to 0.0..=1.0.
    #[must_use]
    pub fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red: red.clamp(0.0, 1.0),
            green: green.clamp(0.0, 1.0),
            blue: blue.clamp(0.0, 1.0),
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Creates an opaque color from floating point RGB channels.
    #[must_use]
    pub fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Self::new(red, green, blue, 1.0)
    }

    /// Creates a color from byte channels, each scaled by 1/255.
    #[must_use]
    pub fn from_bytes(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self::new(
            byte_to_channel(red),
            byte_to_channel(green),
            byte_to_channel(blue),
            byte_to_channel(alpha),
        )
    }

    /// Creates an opaque color from byte RGB channels.
    #[must_use]
    pub fn from_rgb_bytes(red: u8, green: u8, blue: u8) -> Self {
        Self::from_bytes(red, green, blue, u8::MAX)
    }

    /// Creates black with the given alpha.
    #[must_use]
    pub fn black_with_alpha(alpha: f32) -> Self {
        Self::new(0.0, 0.0, 0.0, alpha)
    }

    /// Creates black with a byte alpha.
    #[must_use]
    pub fn black_with_alpha_byte(alpha: u8) -> Self {
        Self::black_with_alpha(byte_to_channel(alpha))
    }

    /// Creates a copy of `base` whose alpha channel is replaced by `alpha`.
    #[must_use]
    pub fn with_alpha(base: Color, alpha: f32) -> Self {
        Self::new(base.red, base.green, base.blue, alpha)
    }

    /// Creates a copy of `base` whose alpha channel is replaced by a byte alpha.
    #[must_use]
    pub fn with_alpha_byte(base: Color, alpha: u8) -> Self {
        Self::with_alpha(base, byte_to_channel(alpha))
    }

    /// Red channel intensity.
    #[must_use]
    pub const fn red(&self) -> f32 {
        self.red
    }

    /// Green channel intensity.
    #[must_use]
    pub const fn green(&self) -> f32 {
        self.green
    }

    /// Blue channel intensity.
    #[must_use]
    pub const fn blue(&self) -> f32 {
        self.blue
    }

    /// Alpha channel intensity.
    #[must_use]
    pub const fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Scales every channel, alpha included, by `factor`.
    #[must_use]
    pub fn multiply(self, factor: f32) -> Self {
        Self::new(
            self.red * factor,
            self.green * factor,
            self.blue * factor,
            self.alpha * factor,
        )
    }

    /// Scales the RGB channels by `factor`, leaving alpha untouched.
    #[must_use]
    pub fn multiply_rgb(self, factor: f32) -> Self {
        Self::new(
            self.red * factor,
            self.green * factor,
            self.blue * factor,
            self.alpha,
        )
    }

    /// Scales the alpha channel by `factor`, leaving RGB untouched.
    #[must_use]
    pub fn multiply_alpha(self, factor: f32) -> Self {
        Self::new(self.red, self.green, self.blue, self.alpha * factor)
    }

    /// Interpolates every channel towards `other` by `scale`.
    #[must_use]
    pub fn lerp(self, other: Color, scale: f32) -> Self {
        Self::new(
            lerp_channel(self.red, other.red, scale),
            lerp_channel(self.green, other.green, scale),
            lerp_channel(self.blue, other.blue, scale),
            lerp_channel(self.alpha, other.alpha, scale),
        )
    }

    /// Interpolates the RGB channels towards `other`, keeping this color's alpha.
    #[must_use]
    pub fn lerp_rgb(self, other: Color, scale: f32) -> Self {
        Self::new(
            lerp_channel(self.red, other.red, scale),
            lerp_channel(self.green, other.green, scale),
            lerp_channel(self.blue, other.blue, scale),
            self.alpha,
        )
    }

    /// Interpolates only the alpha channel towards `other`, keeping this color's RGB.
    #[must_use]
    pub fn lerp_alpha(self, other: Color, scale: f32) -> Self {
        Self::new(
            self.red,
            self.green,
            self.blue,
            lerp_channel(self.alpha, other.alpha, scale),
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Mul<f32> for Color {
    type Output = Color;

    fn mul(self, factor: f32) -> Self::Output {
        self.multiply(factor)
    }
}

fn byte_to_channel(value: u8) -> f32 {
    f32::from(value) / 255.0
}

// Weighted form keeps both endpoints exact: scale 0 yields `from`, scale 1 yields `to`.
fn lerp_channel(from: f32, to: f32, scale: f32) -> f32 {
    from * (1.0 - scale) + to * scale
}
