//! ICNS icon resource preparation for macOS bundles.
//!
//! An `.icns` source is copied byte-for-byte; PNG, JPEG and GIF sources are
//! decoded, resampled into the standard icon slots and encoded as ICNS. The
//! result always lands at `Resources/icon.icns`.

use crate::bundler::error::{Error, ErrorExt, Result};
use icns::{IconFamily, IconType, Image as IcnsImage, PixelFormat};
use image::{ImageFormat, imageops::FilterType};
use std::path::{Path, PathBuf};
use tokio::{fs, task};

/// File name of the icon resource inside `Contents/Resources`.
pub const ICON_FILE_NAME: &str = "icon.icns";

/// ICNS slots and the pixel size each one holds.
const ICON_SLOTS: [(IconType, u32, &str); 11] = [
    (IconType::RGBA32_16x16, 16, "16x16"),
    (IconType::RGBA32_16x16_2x, 32, "16x16@2x"),
    (IconType::RGBA32_32x32, 32, "32x32"),
    (IconType::RGBA32_32x32_2x, 64, "32x32@2x"),
    (IconType::RGBA32_64x64, 64, "64x64"),
    (IconType::RGBA32_128x128, 128, "128x128"),
    (IconType::RGBA32_128x128_2x, 256, "128x128@2x"),
    (IconType::RGBA32_256x256, 256, "256x256"),
    (IconType::RGBA32_256x256_2x, 512, "256x256@2x"),
    (IconType::RGBA32_512x512, 512, "512x512"),
    (IconType::RGBA32_512x512_2x, 1024, "512x512@2x"),
];

/// How an icon source is turned into the bundle's icon resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconSource {
    /// Already an ICNS container; copied as-is.
    Icns,
    /// Raster image decoded with the given format.
    Raster(ImageFormat),
}

impl IconSource {
    /// Classifies `path` by its (case-insensitive) extension.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormat`] for anything but `.icns`, `.png`, `.jpg`,
    /// `.jpeg` and `.gif`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "icns" => Ok(IconSource::Icns),
            "png" => Ok(IconSource::Raster(ImageFormat::Png)),
            "jpg" | "jpeg" => Ok(IconSource::Raster(ImageFormat::Jpeg)),
            "gif" => Ok(IconSource::Raster(ImageFormat::Gif)),
            _ => Err(Error::UnsupportedFormat { extension }),
        }
    }
}

/// Writes the icon resource for `source` into `resources_dir`.
///
/// Creates `resources_dir` (and parents) when missing and returns the path of
/// the written `icon.icns`. Nothing is created when the source is missing or
/// its format is unsupported.
pub async fn prepare_icon(source: &Path, resources_dir: &Path) -> Result<PathBuf> {
    if !fs::try_exists(source).await.unwrap_or(false) {
        return Err(Error::NotFound {
            what: "icon file",
            path: source.to_path_buf(),
        });
    }
    let kind = IconSource::from_path(source)?;

    fs::create_dir_all(resources_dir)
        .await
        .fs_context("creating Resources directory", resources_dir)?;
    let dest = resources_dir.join(ICON_FILE_NAME);

    match kind {
        IconSource::Icns => {
            fs::copy(source, &dest)
                .await
                .fs_context("copying icon file", source)?;
        }
        IconSource::Raster(format) => {
            let bytes = fs::read(source).await.fs_context("reading icon file", source)?;
            let encoded = task::spawn_blocking(move || convert_to_icns(&bytes, format))
                .await
                .map_err(|e| Error::GenericError(format!("ICNS encoding task failed: {e}")))??;
            fs::write(&dest, encoded)
                .await
                .fs_context("writing ICNS file", &dest)?;
        }
    }

    log::info!("Prepared icon {} from {}", dest.display(), source.display());
    Ok(dest)
}

/// Converts raster image bytes into an ICNS container.
///
/// Every slot up to the source's longest side is filled with a Lanczos3
/// resample; sources smaller than 16 px still produce the 16x16 slot.
pub fn convert_to_icns(bytes: &[u8], format: ImageFormat) -> Result<Vec<u8>> {
    let source = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        Error::ConversionFailed {
            stage: "decoding image",
            source: Box::new(e),
        }
    })?;
    let longest_side = source.width().max(source.height()).max(16);

    let mut family = IconFamily::new();
    for (icon_type, size, name) in ICON_SLOTS {
        if size > longest_side {
            continue;
        }
        log::debug!("Adding {name} icon");

        let rgba = source
            .resize_exact(size, size, FilterType::Lanczos3)
            .to_rgba8();
        let slot_image = IcnsImage::from_data(PixelFormat::RGBA, size, size, rgba.into_raw())
            .map_err(|e| Error::ConversionFailed {
                stage: "building icon image",
                source: Box::new(e),
            })?;
        family
            .add_icon_with_type(&slot_image, icon_type)
            .map_err(|e| Error::ConversionFailed {
                stage: "encoding icon slot",
                source: Box::new(e),
            })?;
    }

    let mut encoded = Vec::new();
    family.write(&mut encoded).map_err(|e| Error::ConversionFailed {
        stage: "writing ICNS data",
        source: Box::new(e),
    })?;
    Ok(encoded)
}
