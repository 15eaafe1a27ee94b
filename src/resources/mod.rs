//! Loading of asset files: text, binaries, textures and meshes.
//!
//! Relative file names are looked up in `./assets` natively and below
//! `<origin>/assets` on the web. Absolute paths are used as they are.

use std::path::{Path, PathBuf};

use crate::{data_structures::texture::Texture, gfx::GraphicsContext};

pub mod mesh;

/// Directory relative file names are resolved against.
pub const ASSETS_DIR: &str = "assets";

/// Native path of an asset file.
pub fn asset_path(file_name: &str) -> PathBuf {
    let path = Path::new(file_name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new("./").join(ASSETS_DIR).join(path)
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("no origin: {e:?}"))?;
    let base = reqwest::Url::parse(&format!("{origin}/{ASSETS_DIR}/"))?;
    Ok(base.join(file_name)?)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = asset_path(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("could not read {}: {e}", path.display()))?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = asset_path(file_name);
        tokio::fs::read(&path)
            .await
            .map_err(|e| anyhow::anyhow!("could not read {}: {e}", path.display()))?
    };

    Ok(data)
}

/// Loads and uploads an image file. The format is guessed from the contents.
pub async fn load_texture(ctx: &mut dyn GraphicsContext, file_name: &str) -> anyhow::Result<Texture> {
    let data = load_binary(file_name).await?;
    Texture::from_bytes(ctx, &data, file_name, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_names_resolve_below_assets() {
        assert_eq!(asset_path("shaders/basic.shader"), Path::new("./assets/shaders/basic.shader"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let absolute = std::env::temp_dir().join("tree.png");
        assert_eq!(asset_path(absolute.to_str().unwrap()), absolute);
    }

    #[tokio::test]
    async fn missing_files_name_the_path() {
        let error = load_string("does/not/exist.txt").await.unwrap_err();
        assert!(error.to_string().contains("exist.txt"));
    }
}
