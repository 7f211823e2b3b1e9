// Colour palettes for categorical and diverging encodings

use plotters::style::RGBColor;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<RGBColor>,
}

impl ColorPalette {
    /// The ten-colour categorical palette used by most plotting libraries
    pub fn category10() -> Self {
        Self {
            colors: vec![
                RGBColor(31, 119, 180),
                RGBColor(255, 127, 14),
                RGBColor(44, 160, 44),
                RGBColor(214, 39, 40),
                RGBColor(148, 103, 189),
                RGBColor(140, 86, 75),
                RGBColor(227, 119, 194),
                RGBColor(127, 127, 127),
                RGBColor(188, 189, 34),
                RGBColor(23, 190, 207),
            ],
        }
    }

    /// Colour for the i-th series; wraps around
    pub fn get(&self, index: usize) -> RGBColor {
        self.colors[index % self.colors.len()]
    }

    pub fn assign_colors(&self, keys: &[String]) -> HashMap<String, RGBColor> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), self.get(i)))
            .collect()
    }
}

/// Blue-white-red ramp for values in [-1, 1]
pub fn coolwarm(value: f64) -> RGBColor {
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

    let v = value.clamp(-1.0, 1.0);
    let (from, to, t) = if v < 0.0 { (MID, COLD, -v) } else { (MID, WARM, v) };
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_wraps() {
        let p = ColorPalette::category10();
        assert_eq!(p.get(0), p.get(10));
        assert_ne!(p.get(0), p.get(1));
    }

    #[test]
    fn test_assign_colors() {
        let keys = vec!["a".to_string(), "b".to_string()];
        let map = ColorPalette::category10().assign_colors(&keys);
        assert_eq!(map.len(), 2);
        assert_ne!(map["a"], map["b"]);
    }

    #[test]
    fn test_coolwarm_ends() {
        assert_eq!(coolwarm(-1.0), RGBColor(59, 76, 192));
        assert_eq!(coolwarm(0.0), RGBColor(221, 221, 221));
        assert_eq!(coolwarm(2.0), RGBColor(180, 4, 38));
    }
}
