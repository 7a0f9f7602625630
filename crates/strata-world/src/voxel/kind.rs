use std::fmt;

/// Closed set of materials a voxel can hold.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VoxelKind {
    #[default]
    Air = 0,
    Stone = 1,
    Dirt = 2,
    Grass = 3,
    Sand = 4,
    Water = 5,
    Snow = 6,
    Bedrock = 7,
    Gravel = 8,
    Clay = 9,
    Ice = 10,
    Lava = 11,
    PlateauStone = 12,
    DarkStone = 13,
    RedRock = 14,
}

impl VoxelKind {
    pub const COUNT: usize = 15;

    pub const ALL: [VoxelKind; Self::COUNT] = [
        VoxelKind::Air,
        VoxelKind::Stone,
        VoxelKind::Dirt,
        VoxelKind::Grass,
        VoxelKind::Sand,
        VoxelKind::Water,
        VoxelKind::Snow,
        VoxelKind::Bedrock,
        VoxelKind::Gravel,
        VoxelKind::Clay,
        VoxelKind::Ice,
        VoxelKind::Lava,
        VoxelKind::PlateauStone,
        VoxelKind::DarkStone,
        VoxelKind::RedRock,
    ];

    #[inline]
    pub fn is_solid(self) -> bool {
        !matches!(self, VoxelKind::Air | VoxelKind::Water)
    }

    #[inline]
    pub fn is_transparent(self) -> bool {
        matches!(self, VoxelKind::Air | VoxelKind::Water | VoxelKind::Ice)
    }

    #[inline]
    pub fn is_liquid(self) -> bool {
        matches!(self, VoxelKind::Water | VoxelKind::Lava)
    }

    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<VoxelKind> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            VoxelKind::Air => "air",
            VoxelKind::Stone => "stone",
            VoxelKind::Dirt => "dirt",
            VoxelKind::Grass => "grass",
            VoxelKind::Sand => "sand",
            VoxelKind::Water => "water",
            VoxelKind::Snow => "snow",
            VoxelKind::Bedrock => "bedrock",
            VoxelKind::Gravel => "gravel",
            VoxelKind::Clay => "clay",
            VoxelKind::Ice => "ice",
            VoxelKind::Lava => "lava",
            VoxelKind::PlateauStone => "plateau_stone",
            VoxelKind::DarkStone => "dark_stone",
            VoxelKind::RedRock => "red_rock",
        }
    }

    /// Vertex color (RGBA) used by both meshers.
    pub fn color(self) -> [u8; 4] {
        match self {
            VoxelKind::Stone => [128, 128, 128, 255],
            VoxelKind::Dirt => [139, 90, 43, 255],
            VoxelKind::Grass => [34, 139, 34, 255],
            VoxelKind::Sand => [238, 214, 175, 255],
            VoxelKind::Water => [64, 164, 223, 180],
            VoxelKind::Snow => [255, 250, 250, 255],
            VoxelKind::Bedrock => [50, 50, 50, 255],
            VoxelKind::Gravel => [160, 160, 160, 255],
            VoxelKind::Clay => [180, 160, 140, 255],
            VoxelKind::Ice => [200, 230, 255, 200],
            VoxelKind::Lava => [255, 100, 0, 255],
            VoxelKind::PlateauStone => [176, 150, 120, 255],
            VoxelKind::DarkStone => [70, 70, 75, 255],
            VoxelKind::RedRock => [170, 80, 50, 255],
            VoxelKind::Air => [255, 255, 255, 255],
        }
    }
}

impl fmt::Display for VoxelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fully solid density byte (`-1.0`).
pub const DENSITY_SOLID: u8 = 255;
/// Fully open density byte (`+1.0`).
pub const DENSITY_OPEN: u8 = 0;
/// Largest error introduced by one encode/decode round trip.
pub const DENSITY_STEP: f32 = 1.0 / 127.5;

/// Maps a field density in `[-1, 1]` (negative = solid) onto a byte where 255 is solid.
#[inline]
pub fn encode_density(d: f32) -> u8 {
    let d = if d.is_nan() { 1.0 } else { d.clamp(-1.0, 1.0) };
    ((1.0 - d) * 127.5).round() as u8
}

#[inline]
pub fn decode_density(b: u8) -> f32 {
    1.0 - b as f32 / 127.5
}

/// Material plus quantised density, as exchanged with edit and query callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Voxel {
    pub kind: VoxelKind,
    pub density: u8,
}

impl Voxel {
    pub const AIR: Voxel = Voxel {
        kind: VoxelKind::Air,
        density: DENSITY_OPEN,
    };

    #[inline]
    pub const fn new(kind: VoxelKind, density: u8) -> Self {
        Self { kind, density }
    }

    /// Fully dense voxel of `kind`.
    #[inline]
    pub const fn solid(kind: VoxelKind) -> Self {
        Self {
            kind,
            density: DENSITY_SOLID,
        }
    }

    #[inline]
    pub fn from_field(kind: VoxelKind, density: f32) -> Self {
        Self {
            kind,
            density: encode_density(density),
        }
    }

    #[inline]
    pub fn field_density(self) -> f32 {
        decode_density(self.density)
    }

    #[inline]
    pub fn is_solid(self) -> bool {
        self.kind.is_solid()
    }

    #[inline]
    pub fn is_transparent(self) -> bool {
        self.kind.is_transparent()
    }

    #[inline]
    pub fn is_liquid(self) -> bool {
        self.kind.is_liquid()
    }
}

impl Default for Voxel {
    fn default() -> Self {
        Self::AIR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_match_table() {
        use VoxelKind::*;
        for k in VoxelKind::ALL {
            assert_eq!(k.is_solid(), !matches!(k, Air | Water), "{k}");
            assert_eq!(k.is_transparent(), matches!(k, Air | Water | Ice), "{k}");
            assert_eq!(k.is_liquid(), matches!(k, Water | Lava), "{k}");
        }
        // Lava is both solid and liquid; ice is solid but see-through.
        assert!(Lava.is_solid() && Lava.is_liquid());
        assert!(Ice.is_solid() && Ice.is_transparent());
    }

    #[test]
    fn ids_round_trip() {
        for k in VoxelKind::ALL {
            assert_eq!(VoxelKind::from_id(k.id()), Some(k));
        }
        assert_eq!(VoxelKind::from_id(15), None);
    }

    #[test]
    fn density_byte_endpoints() {
        assert_eq!(encode_density(-1.0), DENSITY_SOLID);
        assert_eq!(encode_density(1.0), DENSITY_OPEN);
        assert_eq!(decode_density(DENSITY_SOLID), -1.0);
        assert_eq!(decode_density(DENSITY_OPEN), 1.0);
        assert_eq!(encode_density(-5.0), DENSITY_SOLID);
        assert_eq!(encode_density(f32::NAN), DENSITY_OPEN);
    }

    #[test]
    fn translucent_colors_have_alpha() {
        assert_eq!(VoxelKind::Water.color()[3], 180);
        assert_eq!(VoxelKind::Ice.color()[3], 200);
        assert_eq!(VoxelKind::Stone.color(), [128, 128, 128, 255]);
    }
}
