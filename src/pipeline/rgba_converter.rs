use std::time::Instant;

use anyhow::{Result, anyhow, bail};
use nokhwa::{Buffer, utils::FrameFormat};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

use crate::types::Frame;

/// Decodes one captured buffer into an RGBA [`Frame`] stamped with the current time.
pub fn convert_camera_frame(buffer: &Buffer) -> Result<Frame> {
    let resolution = buffer.resolution();
    let (rgba, width, height) = decode_to_rgba(
        buffer.source_frame_format(),
        buffer.buffer(),
        resolution.width_x,
        resolution.height_y,
    )?;
    Ok(Frame {
        rgba,
        width,
        height,
        timestamp: Instant::now(),
    })
}

/// Returns the RGBA pixels together with the decoded size, which for MJPEG comes
/// from the stream rather than the negotiated resolution.
pub fn decode_to_rgba(
    format: FrameFormat,
    data: &[u8],
    width: u32,
    height: u32,
) -> Result<(Vec<u8>, u32, u32)> {
    let pixels = width as usize * height as usize;
    let rgba = match format {
        FrameFormat::MJPEG => return mjpeg_to_rgba(data),
        FrameFormat::NV12 => {
            require_len("NV12", data, pixels + pixels / 2)?;
            nv12_to_rgba(data, width, height)?
        }
        FrameFormat::YUYV => {
            require_len("YUYV", data, pixels * 2)?;
            yuyv_to_rgba(data, width, height)?
        }
        FrameFormat::RAWRGB => {
            require_len("RGB", data, pixels * 3)?;
            packed_rgb_to_rgba(&data[..pixels * 3], [0, 1, 2])
        }
        FrameFormat::RAWBGR => {
            require_len("BGR", data, pixels * 3)?;
            packed_rgb_to_rgba(&data[..pixels * 3], [2, 1, 0])
        }
        FrameFormat::GRAY => {
            require_len("GRAY", data, pixels)?;
            gray_to_rgba(&data[..pixels])
        }
    };
    Ok((rgba, width, height))
}

fn require_len(label: &str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        bail!(
            "{label} buffer too small: got {}, expected {expected}",
            data.len()
        );
    }
    Ok(())
}

fn nv12_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let y_len = width as usize * height as usize;
    let image = YuvBiPlanarImage {
        y_plane: &data[..y_len],
        y_stride: width,
        uv_plane: &data[y_len..y_len + y_len / 2],
        uv_stride: width,
        width,
        height,
    };
    let mut rgba = vec![0u8; y_len * 4];
    yuv_nv12_to_rgba(
        &image,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12 to RGBA failed: {err:?}"))?;
    Ok(rgba)
}

fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };
    let mut rgba = vec![0u8; width as usize * height as usize * 4];
    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV to RGBA failed: {err:?}"))?;
    Ok(rgba)
}

fn mjpeg_to_rgba(data: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;
    let info = decoder
        .info()
        .ok_or_else(|| anyhow!("MJPEG decoder returned no image info"))?;
    let (width, height) = u32::try_from(info.width)
        .and_then(|w| u32::try_from(info.height).map(|h| (w, h)))
        .map_err(|_| anyhow!("MJPEG dimensions out of range"))?;
    require_len("MJPEG output", &rgba, width as usize * height as usize * 4)?;
    Ok((rgba, width, height))
}

/// `order` gives the source byte index of R, G and B.
fn packed_rgb_to_rgba(data: &[u8], order: [usize; 3]) -> Vec<u8> {
    let mut rgba = vec![0u8; data.len() / 3 * 4];
    rgba.par_chunks_exact_mut(4)
        .zip(data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            dst[0] = src[order[0]];
            dst[1] = src[order[1]];
            dst[2] = src[order[2]];
            dst[3] = 255;
        });
    rgba
}

fn gray_to_rgba(data: &[u8]) -> Vec<u8> {
    let mut rgba = vec![0u8; data.len() * 4];
    rgba.par_chunks_exact_mut(4)
        .zip(data.par_iter())
        .for_each(|(dst, &value)| {
            dst.copy_from_slice(&[value, value, value, 255]);
        });
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgr_is_swizzled_to_rgba() {
        let data = [10, 20, 30, 40, 50, 60];
        let (rgba, w, h) = decode_to_rgba(FrameFormat::RAWBGR, &data, 2, 1).expect("decodes");
        assert_eq!((w, h), (2, 1));
        assert_eq!(rgba, vec![30, 20, 10, 255, 60, 50, 40, 255]);

        let (rgba, _, _) = decode_to_rgba(FrameFormat::RAWRGB, &data, 2, 1).expect("decodes");
        assert_eq!(rgba, vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn gray_expands_to_opaque_rgba() {
        let (rgba, _, _) = decode_to_rgba(FrameFormat::GRAY, &[7, 200], 2, 1).expect("decodes");
        assert_eq!(rgba, vec![7, 7, 7, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn trailing_padding_is_ignored() {
        let data = [1, 2, 3, 9, 9];
        let (rgba, _, _) = decode_to_rgba(FrameFormat::RAWRGB, &data, 1, 1).expect("decodes");
        assert_eq!(rgba, vec![1, 2, 3, 255]);
    }

    #[test]
    fn short_buffers_are_rejected() {
        for format in [
            FrameFormat::NV12,
            FrameFormat::YUYV,
            FrameFormat::RAWRGB,
            FrameFormat::GRAY,
        ] {
            let err = decode_to_rgba(format, &[0; 3], 4, 4).expect_err("buffer too small");
            assert!(err.to_string().contains("too small"), "{format:?}: {err}");
        }
        assert!(decode_to_rgba(FrameFormat::MJPEG, &[0xff, 0x00], 4, 4).is_err());
    }
}
