use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::{is_heif_file, ConversionError, ConversionRequest, ConversionResult, Outcome};
use crate::codec::Codec;

/// Convert one HEIC/HEIF file according to `request`
///
/// Never touches the source file. The output is encoded into a temporary file
/// in the output directory and renamed over the target only once encoding
/// succeeded, so a failed run leaves any previous output untouched and no
/// partial file behind. The output directory must already exist.
pub fn convert<C: Codec + ?Sized>(codec: &C, request: &ConversionRequest) -> ConversionResult {
    let start = Instant::now();
    tracing::debug!(source = %request.source_path.display(), format = %request.output_format, "converting");

    let outcome = match convert_file(codec, request) {
        Ok(output_path) => {
            tracing::debug!(output = %output_path.display(), "converted");
            Outcome::Success(output_path)
        }
        Err(err) => {
            tracing::debug!(source = %request.source_path.display(), error = %err, "conversion failed");
            Outcome::Failure(err)
        }
    };

    ConversionResult {
        source_path: request.source_path.clone(),
        outcome,
        duration: start.elapsed(),
    }
}

fn convert_file<C: Codec + ?Sized>(
    codec: &C,
    request: &ConversionRequest,
) -> Result<PathBuf, ConversionError> {
    let source = &request.source_path;
    if !source.is_file() || !is_heif_file(source) {
        return Err(ConversionError::UnsupportedInput);
    }
    let output_path = request
        .output_path()
        .ok_or(ConversionError::UnsupportedInput)?;

    let image = codec
        .decode(source)
        .map_err(|e| ConversionError::Decode(format!("{:#}", e)))?;

    write_replacing(codec, &image, &output_path, request)?;
    Ok(output_path)
}

fn write_replacing<C: Codec + ?Sized>(
    codec: &C,
    image: &DynamicImage,
    output_path: &Path,
    request: &ConversionRequest,
) -> Result<(), ConversionError> {
    let dir = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let suffix = format!(".{}.tmp", request.output_format.extension());

    let mut builder = tempfile::Builder::new();
    builder.prefix(".heic-converter-").suffix(&suffix);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }

    let temp = builder.tempfile_in(dir).map_err(|e| {
        ConversionError::Encode(format!(
            "cannot create temporary file in {}: {}",
            dir.display(),
            e
        ))
    })?;

    // On error `temp` is dropped here, which deletes the partial file
    codec
        .encode(image, temp.path(), request.output_format, request.jpg_quality)
        .map_err(|e| ConversionError::Encode(format!("{:#}", e)))?;

    temp.persist(output_path).map_err(|e| {
        ConversionError::Encode(format!(
            "cannot move output into place at {}: {}",
            output_path.display(),
            e.error
        ))
    })?;

    Ok(())
}
