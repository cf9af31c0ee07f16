use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use prism_engine::render::Shape;
use prism_engine::time::PacingStrategy;

/// Environment variable naming the config file when no CLI argument is given.
pub const CONFIG_ENV: &str = "PRISM_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "prism.toml";

/// Demo configuration, read from a TOML file.
///
/// Every section and key is optional; missing ones take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    pub window: WindowSection,
    pub pacing: PacingSection,
    pub shaders: ShaderSection,
    pub scene: SceneSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    pub title: String,
    pub width: f64,
    pub height: f64,
    /// Let the display refresh cap the frame rate in addition to the limiter.
    pub vsync: bool,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            title: "GPU Graphics Project".to_string(),
            width: 800.0,
            height: 600.0,
            vsync: false,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingMode {
    #[default]
    Hybrid,
    Sleep,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingSection {
    /// `0` means uncapped.
    pub target_fps: u32,
    pub mode: PacingMode,
    pub spin_fraction: f64,
}

impl Default for PacingSection {
    fn default() -> Self {
        Self {
            target_fps: 60,
            mode: PacingMode::Hybrid,
            spin_fraction: PacingStrategy::DEFAULT_SPIN_FRACTION,
        }
    }
}

impl PacingSection {
    pub fn strategy(&self) -> PacingStrategy {
        match self.mode {
            PacingMode::Hybrid => PacingStrategy::Hybrid {
                spin_fraction: self.spin_fraction,
            },
            PacingMode::Sleep => PacingStrategy::Sleep,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShaderSection {
    pub dir: PathBuf,
}

impl Default for ShaderSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders")),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneShape {
    #[default]
    Triangle,
    Square,
    Circle,
}

impl From<SceneShape> for Shape {
    fn from(s: SceneShape) -> Self {
        match s {
            SceneShape::Triangle => Shape::Triangle,
            SceneShape::Square => Shape::Square,
            SceneShape::Circle => Shape::Circle,
        }
    }
}

/// Initial values of the GUI tunables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneSection {
    pub shape: SceneShape,
    pub shape_color: [f32; 3],
    pub background_color: [f32; 3],
    pub animation_speed: f32,
    pub rainbow: bool,
    pub show_controls: bool,
}

impl Default for SceneSection {
    fn default() -> Self {
        Self {
            shape: SceneShape::Triangle,
            shape_color: [1.0, 1.0, 1.0],
            background_color: [0.2, 0.3, 0.3],
            animation_speed: 1.0,
            rainbow: true,
            show_controls: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// `env_logger` filter; overrides `RUST_LOG` when set.
    pub filter: Option<String>,
}

impl DemoConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: DemoConfig = toml::from_str(text).context("invalid config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read config {}", path.display()));
            }
        };
        Self::from_toml(&text).with_context(|| format!("failed to load config {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.window.width > 0.0 && self.window.height > 0.0,
            "window size must be positive, got {}x{}",
            self.window.width,
            self.window.height
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.pacing.spin_fraction),
            "pacing.spin_fraction must be within [0, 1], got {}",
            self.pacing.spin_fraction
        );
        anyhow::ensure!(
            self.scene.animation_speed.is_finite() && self.scene.animation_speed >= 0.0,
            "scene.animation_speed must be a non-negative number"
        );
        Ok(())
    }
}

/// Config path: first CLI argument, then `$PRISM_CONFIG`, then `prism.toml`.
pub fn resolve_path(mut args: impl Iterator<Item = String>, env: Option<String>) -> PathBuf {
    args.next()
        .or(env)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = DemoConfig::from_toml("").unwrap();
        assert_eq!(config, DemoConfig::default());
        assert_eq!(config.pacing.target_fps, 60);
        assert_eq!(config.scene.background_color, [0.2, 0.3, 0.3]);
    }

    #[test]
    fn sections_override_defaults() {
        let config = DemoConfig::from_toml(
            r#"
            [window]
            title = "shapes"
            width = 1024

            [pacing]
            target_fps = 144
            mode = "sleep"

            [scene]
            shape = "circle"
            rainbow = false

            [logging]
            filter = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.window.title, "shapes");
        assert_eq!(config.window.width, 1024.0);
        assert_eq!(config.window.height, 600.0);
        assert_eq!(config.pacing.target_fps, 144);
        assert_eq!(config.pacing.strategy(), PacingStrategy::Sleep);
        assert_eq!(Shape::from(config.scene.shape), Shape::Circle);
        assert!(!config.scene.rainbow);
        assert_eq!(config.logging.filter.as_deref(), Some("debug"));
    }

    #[test]
    fn hybrid_mode_carries_spin_fraction() {
        let config = DemoConfig::from_toml("[pacing]\nspin_fraction = 0.05\n").unwrap();
        assert_eq!(
            config.pacing.strategy(),
            PacingStrategy::Hybrid { spin_fraction: 0.05 }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(DemoConfig::from_toml("[window]\ntitel = \"x\"\n").is_err());
        assert!(DemoConfig::from_toml("[pacing]\nmode = \"busy\"\n").is_err());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(DemoConfig::from_toml("[pacing]\nspin_fraction = 1.5\n").is_err());
        assert!(DemoConfig::from_toml("[window]\nwidth = 0\n").is_err());
        assert!(DemoConfig::from_toml("[scene]\nanimation_speed = -1.0\n").is_err());
    }

    #[test]
    fn sample_config_parses() {
        let config = DemoConfig::from_toml(include_str!("../prism.toml")).unwrap();
        assert_eq!(config.window.title, "GPU Graphics Project");
        assert_eq!(config.pacing.strategy(), PacingStrategy::default());
        assert_eq!(config.scene, SceneSection::default());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("prism-demo-no-such-config.toml");
        assert_eq!(DemoConfig::load(&path).unwrap(), DemoConfig::default());
    }

    #[test]
    fn path_resolution_order() {
        let args = || vec!["cli.toml".to_string()].into_iter();
        assert_eq!(resolve_path(args(), Some("env.toml".into())), PathBuf::from("cli.toml"));
        assert_eq!(
            resolve_path(std::iter::empty(), Some("env.toml".into())),
            PathBuf::from("env.toml")
        );
        assert_eq!(resolve_path(std::iter::empty(), None), PathBuf::from(DEFAULT_CONFIG_FILE));
    }
}
