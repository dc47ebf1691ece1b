// src/canvas.rs - Persistent overlay canvas and software rasterisation
use image::{Rgb, RgbImage};

pub const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Drawing surface that lives for the whole session, same size as the video frame.
/// Starts as all-background; only the stroke tracker writes to it.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayCanvas {
    image: RgbImage,
}

impl OverlayCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, BACKGROUND),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        *self.image.get_pixel(x, y)
    }

    pub fn clear(&mut self) {
        for p in self.image.pixels_mut() {
            *p = BACKGROUND;
        }
    }

    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|p| *p == BACKGROUND)
    }

    pub fn draw_line(&mut self, from: Point, to: Point, color: Rgb<u8>, thickness: u32) {
        draw_line(&mut self.image, from, to, color, thickness);
    }

    /// Owned copy for work that must not see later strokes.
    pub fn snapshot(&self) -> RgbImage {
        self.image.clone()
    }
}

#[inline]
fn put_pixel(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= img.width() || y >= img.height() {
        return;
    }
    img.put_pixel(x, y, color);
}

/// Filled disc of the given radius, clipped to the image.
pub fn fill_disc(img: &mut RgbImage, center: Point, radius: f32, color: Rgb<u8>) {
    let r = radius.ceil() as i32;
    let r2 = radius * radius;
    for dy in -r..=r {
        for dx in -r..=r {
            if (dx * dx + dy * dy) as f32 <= r2 {
                put_pixel(img, center.x + dx, center.y + dy, color);
            }
        }
    }
}

/// One-pixel circle outline (midpoint algorithm).
pub fn draw_circle(img: &mut RgbImage, center: Point, radius: i32, color: Rgb<u8>) {
    if radius <= 0 {
        put_pixel(img, center.x, center.y, color);
        return;
    }
    let (cx, cy) = (center.x, center.y);
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;
    while x >= y {
        for (px, py) in [
            (x, y), (y, x), (-y, x), (-x, y),
            (-x, -y), (-y, -x), (y, -x), (x, -y),
        ] {
            put_pixel(img, cx + px, cy + py, color);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

/// Straight segment with round caps. Thickness 1 is a plain Bresenham line;
/// thicker lines stamp a disc of diameter `thickness` at every step.
pub fn draw_line(img: &mut RgbImage, from: Point, to: Point, color: Rgb<u8>, thickness: u32) {
    let radius = thickness.max(1) as f32 / 2.0;
    let (mut x0, mut y0) = (from.x, from.y);
    let (x1, y1) = (to.x, to.y);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        if thickness <= 1 {
            put_pixel(img, x0, y0, color);
        } else {
            fill_disc(img, Point::new(x0, y0), radius, color);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
