use crate::types::{Frame, RecognizedFrame};

/// Bone pairs of the 21-point hand model.
pub const CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
    (5, 9),
    (9, 13),
    (13, 17),
];

const BONE_COLOR: [u8; 4] = [56, 189, 248, 255];
const JOINT_COLOR: [u8; 4] = [248, 113, 113, 255];

/// Copy of the camera frame with the hand skeleton drawn on, mirrored like a selfie view.
pub fn preview_frame(recognized: &RecognizedFrame) -> Frame {
    let mut frame = recognized.frame.clone();
    if let Some(hand) = &recognized.hand {
        draw_skeleton(&mut frame, &hand.landmarks);
    }
    mirror_horizontally(&mut frame);
    frame
}

/// Line width grows with the frame so the overlay reads the same at any camera resolution.
fn line_thickness(width: u32) -> i32 {
    (width / 160).max(2) as i32
}

pub fn draw_skeleton(frame: &mut Frame, points: &[(f32, f32)]) {
    if points.len() < 2 {
        return;
    }
    let thickness = line_thickness(frame.width);
    let mut canvas = Canvas::new(frame);
    for &(a, b) in CONNECTIONS {
        if let (Some(&pa), Some(&pb)) = (points.get(a), points.get(b)) {
            canvas.line(pa, pb, thickness, BONE_COLOR);
        }
    }
    for &(x, y) in points {
        canvas.dot((x as i32, y as i32), thickness + 2, JOINT_COLOR);
    }
}

pub fn mirror_horizontally(frame: &mut Frame) {
    let stride = frame.width as usize * 4;
    if stride == 0 {
        return;
    }
    for row in frame.rgba.chunks_exact_mut(stride) {
        let (mut left, mut right) = (0, frame.width as usize - 1);
        while left < right {
            for c in 0..4 {
                row.swap(left * 4 + c, right * 4 + c);
            }
            left += 1;
            right -= 1;
        }
    }
}

struct Canvas<'a> {
    pixels: &'a mut [u8],
    width: i32,
    height: i32,
}

impl<'a> Canvas<'a> {
    fn new(frame: &'a mut Frame) -> Self {
        Self {
            width: frame.width as i32,
            height: frame.height as i32,
            pixels: &mut frame.rgba,
        }
    }

    fn put(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        if let Some(px) = self.pixels.get_mut(idx..idx + 4) {
            px.copy_from_slice(&color);
        }
    }

    fn dot(&mut self, center: (i32, i32), radius: i32, color: [u8; 4]) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.put(center.0 + dx, center.1 + dy, color);
                }
            }
        }
    }

    /// Bresenham with a diamond brush.
    fn line(&mut self, from: (f32, f32), to: (f32, f32), thickness: i32, color: [u8; 4]) {
        let (mut x, mut y) = (from.0 as i32, from.1 as i32);
        let (x1, y1) = (to.0 as i32, to.1 as i32);
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let brush = (thickness.max(1) - 1) / 2;

        loop {
            for ox in -brush..=brush {
                for oy in -brush..=brush {
                    if ox.abs() + oy.abs() <= brush {
                        self.put(x + ox, y + oy, color);
                    }
                }
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Gesture, HandReading};
    use glam::Vec2;

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * frame.width + x) * 4) as usize;
        [
            frame.rgba[idx],
            frame.rgba[idx + 1],
            frame.rgba[idx + 2],
            frame.rgba[idx + 3],
        ]
    }

    #[test]
    fn mirroring_reverses_each_row() {
        let mut frame = Frame::blank(3, 2);
        for (i, px) in frame.rgba.chunks_exact_mut(4).enumerate() {
            px[0] = i as u8;
        }
        mirror_horizontally(&mut frame);
        let firsts: Vec<u8> = frame.rgba.chunks_exact(4).map(|px| px[0]).collect();
        assert_eq!(firsts, vec![2, 1, 0, 5, 4, 3]);
    }

    #[test]
    fn skeleton_marks_joints_and_tolerates_off_frame_points() {
        let mut frame = Frame::blank(64, 48);
        let mut points = vec![(10.0, 10.0); 21];
        points[4] = (40.0, 30.0);
        points[20] = (-50.0, 500.0);
        draw_skeleton(&mut frame, &points);

        assert_eq!(pixel(&frame, 10, 10), JOINT_COLOR);
        assert_eq!(pixel(&frame, 40, 30), JOINT_COLOR);
        // thumb bones run from the wrist cluster to (40, 30)
        assert_eq!(pixel(&frame, 25, 20), BONE_COLOR);
        assert_eq!(pixel(&frame, 60, 5), [0, 0, 0, 0]);
    }

    #[test]
    fn preview_is_mirrored_after_drawing() {
        let mut points = vec![(5.0, 5.0); 21];
        points[8] = (6.0, 5.0);
        let recognized = RecognizedFrame {
            frame: Frame::blank(40, 20),
            hand: Some(HandReading {
                gesture: Gesture::Open,
                palm: Vec2::splat(0.5),
                confidence: 0.9,
                landmarks: points,
            }),
        };
        let preview = preview_frame(&recognized);
        assert_eq!(pixel(&preview, 34, 5), JOINT_COLOR);
        assert_eq!(pixel(&preview, 5, 5), [0, 0, 0, 0]);

        let empty = RecognizedFrame {
            frame: Frame::blank(4, 4),
            hand: None,
        };
        assert!(preview_frame(&empty).rgba.iter().all(|&b| b == 0));
    }
}
