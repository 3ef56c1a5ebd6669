use std::sync::Arc;

use gpui::RenderImage;
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::types::Frame;

/// GPUI textures are BGRA; swapping here avoids the async asset pipeline and its flicker.
pub(super) fn frame_to_image(frame: Frame) -> Option<Arc<RenderImage>> {
    let Frame {
        mut rgba,
        width,
        height,
        ..
    } = frame;
    swap_red_blue(&mut rgba);
    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, rgba)?;
    Some(Arc::new(RenderImage::new(vec![ImageFrame::new(buffer)])))
}

fn swap_red_blue(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_swapped_in_place() {
        let mut pixels = vec![1, 2, 3, 4, 5, 6, 7, 8];
        swap_red_blue(&mut pixels);
        assert_eq!(pixels, vec![3, 2, 1, 4, 7, 6, 5, 8]);
    }

    #[test]
    fn short_buffers_make_no_image() {
        let mut frame = Frame::blank(4, 4);
        frame.rgba.truncate(8);
        assert!(frame_to_image(frame).is_none());
        assert!(frame_to_image(Frame::blank(2, 2)).is_some());
    }
}
