//! Engine configuration.
//!
//! Every field has a default, so a TOML file only needs to name what it
//! changes:
//!
//! ```toml
//! vsync = 0
//!
//! [window]
//! title = "Forest"
//!
//! [billboard]
//! anchor_offset = [0.0, 0.0, 0.0]
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    render::{BASIC_SHADER, BILLBOARD_FRAGMENT_SHADER, MODEL_FRAGMENT_SHADER, TEXTURED_VERTEX_SHADER},
    resources::load_string,
    shader::ShaderSource,
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialize(String),
}

/// Swap interval of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Vsync {
    /// Wait for vblank unless the frame is late (`-1`).
    Adaptive,
    /// Always wait for vblank (`1`).
    #[default]
    On,
    /// Present immediately (`0`).
    Off,
}

impl Vsync {
    pub fn present_mode(self) -> wgpu::PresentMode {
        match self {
            Vsync::Adaptive => wgpu::PresentMode::FifoRelaxed,
            Vsync::On => wgpu::PresentMode::Fifo,
            Vsync::Off => wgpu::PresentMode::Immediate,
        }
    }
}

impl TryFrom<i32> for Vsync {
    type Error = String;

    fn try_from(interval: i32) -> Result<Self, Self::Error> {
        match interval {
            -1 => Ok(Vsync::Adaptive),
            1 => Ok(Vsync::On),
            0 => Ok(Vsync::Off),
            other => Err(format!("unsupported swap interval {other}, expected -1, 0 or 1")),
        }
    }
}

impl From<Vsync> for i32 {
    fn from(vsync: Vsync) -> Self {
        match vsync {
            Vsync::Adaptive => -1,
            Vsync::On => 1,
            Vsync::Off => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "billboard-ngin".to_string(),
            width: 1280,
            height: 960,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillboardConfig {
    /// Added to every billboard position before it is rotated towards the
    /// camera.
    pub anchor_offset: [f32; 3],
}

impl Default for BillboardConfig {
    fn default() -> Self {
        Self {
            anchor_offset: [25.0, 0.0, 25.0],
        }
    }
}

/// Asset paths of the built-in programs. Empty means the embedded default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Combined `#shader vertex` / `#shader fragment` file of the primitive
    /// renderer.
    pub primitive: String,
    pub billboard_vertex: String,
    pub billboard_fragment: String,
    pub model_vertex: String,
    pub model_fragment: String,
}

impl ShaderConfig {
    /// Source of the primitive renderer's program.
    pub async fn primitive_source(&self) -> anyhow::Result<ShaderSource> {
        if self.primitive.is_empty() {
            ShaderSource::parse_combined(BASIC_SHADER)
        } else {
            ShaderSource::load_combined(&self.primitive).await
        }
    }

    pub async fn billboard_source(&self) -> anyhow::Result<ShaderSource> {
        Ok(ShaderSource::new(
            stage(&self.billboard_vertex, TEXTURED_VERTEX_SHADER).await?,
            stage(&self.billboard_fragment, BILLBOARD_FRAGMENT_SHADER).await?,
        ))
    }

    pub async fn model_source(&self) -> anyhow::Result<ShaderSource> {
        Ok(ShaderSource::new(
            stage(&self.model_vertex, TEXTURED_VERTEX_SHADER).await?,
            stage(&self.model_fragment, MODEL_FRAGMENT_SHADER).await?,
        ))
    }
}

async fn stage(file_name: &str, embedded: &str) -> anyhow::Result<String> {
    if file_name.is_empty() {
        Ok(embedded.to_string())
    } else {
        load_string(file_name).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    pub vsync: Vsync,
    /// RGBA the frame is cleared to.
    pub clear_color: [f64; 4],
    pub billboard: BillboardConfig,
    pub shaders: ShaderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            vsync: Vsync::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            billboard: BillboardConfig::default(),
            shaders: ShaderConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Loads a TOML file from the assets directory.
    pub async fn load(file_name: &str) -> anyhow::Result<Self> {
        let text = load_string(file_name).await?;
        Ok(Self::from_toml_str(&text)?)
    }

    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color { r, g, b, a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.billboard.anchor_offset, [25.0, 0.0, 25.0]);
    }

    #[test]
    fn vsync_uses_swap_intervals() {
        let config = EngineConfig::from_toml_str("vsync = -1\n[window]\ntitle = \"Forest\"").unwrap();
        assert_eq!(config.vsync, Vsync::Adaptive);
        assert_eq!(config.window.title, "Forest");
        assert_eq!(config.window.height, 960);
        assert!(EngineConfig::from_toml_str("vsync = 2").is_err());
    }

    #[tokio::test]
    async fn empty_shader_paths_use_embedded_sources() {
        let shaders = ShaderConfig::default();
        let billboard = shaders.billboard_source().await.unwrap();
        assert_eq!(billboard.vertex, TEXTURED_VERTEX_SHADER);
        assert_eq!(billboard.fragment, BILLBOARD_FRAGMENT_SHADER);
        assert!(shaders.primitive_source().await.unwrap().vertex.contains("vs_main"));
    }

    #[test]
    fn config_survives_serialization() {
        let mut config = EngineConfig::default();
        config.vsync = Vsync::Off;
        config.billboard.anchor_offset = [0.0, 0.0, 0.0];
        let text = config.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }
}
