use std::ops::RangeInclusive;

use prism_engine::paint::Color;
use prism_engine::render::Shape;

use crate::config::SceneSection;

pub const SPEED_RANGE: RangeInclusive<f32> = 0.1..=5.0;
pub const FPS_RANGE: RangeInclusive<u32> = 0..=144;

/// Hue turns per second at animation speed 1.0.
const RAINBOW_RATE: f64 = 0.25;

/// Values shared between the controls panel and the renderer.
///
/// Plain fields: the panel writes them, the frame reads them, last writer
/// wins each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Tunables {
    pub shape_color: [f32; 3],
    pub background_color: [f32; 3],
    pub animation_speed: f32,
    /// `0` disables the limiter.
    pub target_fps: u32,
    pub current_shape: Shape,
    pub rainbow_mode: bool,
    pub show_controls: bool,

    rainbow_phase: f64,
}

impl Tunables {
    pub fn new(scene: &SceneSection, target_fps: u32) -> Self {
        Self {
            shape_color: scene.shape_color,
            background_color: scene.background_color,
            animation_speed: scene.animation_speed,
            target_fps,
            current_shape: scene.shape.into(),
            rainbow_mode: scene.rainbow,
            show_controls: scene.show_controls,
            rainbow_phase: 0.0,
        }
    }

    /// Advances the rainbow by one frame of `dt` seconds.
    ///
    /// The phase accumulates, so changing the speed never makes the hue jump.
    pub fn advance(&mut self, dt: f32) {
        let step = f64::from(dt) * f64::from(self.animation_speed) * RAINBOW_RATE;
        self.rainbow_phase = (self.rainbow_phase + step).rem_euclid(1.0);
    }

    pub fn rainbow_phase(&self) -> f64 {
        self.rainbow_phase
    }

    pub fn shape_color(&self) -> Color {
        if self.rainbow_mode {
            Color::rainbow(self.rainbow_phase)
        } else {
            Color::from_rgb_array(self.shape_color)
        }
    }

    pub fn background(&self) -> Color {
        Color::from_rgb_array(self.background_color)
    }
}

impl Default for Tunables {
    fn default() -> Self {
        Self::new(&SceneSection::default(), 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_scene_section() {
        let t = Tunables::default();
        assert_eq!(t.background(), Color::rgb(0.2, 0.3, 0.3));
        assert_eq!(t.current_shape, Shape::Triangle);
        assert_eq!(t.target_fps, 60);
        assert!(t.rainbow_mode);
        assert!(SPEED_RANGE.contains(&t.animation_speed));
    }

    #[test]
    fn fixed_color_ignores_phase() {
        let mut t = Tunables::default();
        t.rainbow_mode = false;
        t.shape_color = [0.1, 0.2, 0.3];
        t.advance(0.5);
        assert_eq!(t.shape_color(), Color::rgb(0.1, 0.2, 0.3));
    }

    #[test]
    fn rainbow_starts_red_and_moves_with_speed() {
        let mut t = Tunables::default();
        assert_eq!(t.shape_color(), Color::rgb(1.0, 0.0, 0.0));

        t.advance(1.0);
        let slow = t.rainbow_phase();
        assert!((slow - RAINBOW_RATE).abs() < 1e-9);

        let mut fast = Tunables::default();
        fast.animation_speed = 2.0;
        fast.advance(1.0);
        assert!((fast.rainbow_phase() - 2.0 * slow).abs() < 1e-9);
    }

    #[test]
    fn phase_wraps() {
        let mut t = Tunables::default();
        t.animation_speed = 5.0;
        for _ in 0..100 {
            t.advance(0.25);
        }
        assert!((0.0..1.0).contains(&t.rainbow_phase()));
    }
}
