use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BiomeKind {
    #[default]
    Plains,
    Desert,
    Mountains,
    Forest,
    Tundra,
    Ocean,
    Swamp,
    Plateau,
    DeepValley,
    Canyon,
    Badlands,
    HighlandPlains,
}

impl BiomeKind {
    pub fn name(self) -> &'static str {
        match self {
            BiomeKind::Plains => "plains",
            BiomeKind::Desert => "desert",
            BiomeKind::Mountains => "mountains",
            BiomeKind::Forest => "forest",
            BiomeKind::Tundra => "tundra",
            BiomeKind::Ocean => "ocean",
            BiomeKind::Swamp => "swamp",
            BiomeKind::Plateau => "plateau",
            BiomeKind::DeepValley => "deep_valley",
            BiomeKind::Canyon => "canyon",
            BiomeKind::Badlands => "badlands",
            BiomeKind::HighlandPlains => "highland_plains",
        }
    }

    /// Feature biomes come from terrain-shape influences rather than climate.
    #[inline]
    pub fn is_feature(self) -> bool {
        matches!(
            self,
            BiomeKind::Plateau | BiomeKind::DeepValley | BiomeKind::Canyon
        )
    }

    /// Biomes whose open cells below the water line fill with water.
    #[inline]
    pub fn holds_water(self) -> bool {
        matches!(self, BiomeKind::Ocean | BiomeKind::DeepValley)
    }
}

impl fmt::Display for BiomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-column channel values a biome decision is made from. All in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Climate {
    pub temperature: f32,
    pub moisture: f32,
    pub continentalness: f32,
    pub erosion: f32,
    pub plateau: f32,
    pub valley: f32,
}

/// Climate biome. Strong plateau or valley influence wins over temperature/moisture.
pub fn classify(c: &Climate) -> BiomeKind {
    if c.plateau > 0.6 {
        return if c.temperature < 0.3 {
            BiomeKind::Tundra
        } else {
            BiomeKind::HighlandPlains
        };
    }
    if c.valley > 0.6 {
        return BiomeKind::DeepValley;
    }
    if c.continentalness < 0.3 {
        return BiomeKind::Ocean;
    }
    if c.temperature < 0.25 {
        return BiomeKind::Tundra;
    }
    if c.temperature > 0.75 {
        if c.moisture < 0.3 {
            return if c.erosion < 0.4 {
                BiomeKind::Badlands
            } else {
                BiomeKind::Desert
            };
        }
        if c.moisture > 0.7 {
            return BiomeKind::Swamp;
        }
    }
    if c.erosion < 0.3 {
        return BiomeKind::Mountains;
    }
    if c.moisture > 0.5 {
        BiomeKind::Forest
    } else {
        BiomeKind::Plains
    }
}

/// Dominant terrain feature, priority canyon > valley > plateau, else the climate biome.
pub fn terrain_feature(biome: BiomeKind, plateau: f32, valley: f32, canyon: f32) -> BiomeKind {
    if canyon > 0.5 {
        BiomeKind::Canyon
    } else if valley > 0.5 {
        BiomeKind::DeepValley
    } else if plateau > 0.5 {
        BiomeKind::Plateau
    } else {
        biome
    }
}
