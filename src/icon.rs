//! Tray icon images, drawn at startup instead of shipped as files.

use image::{Rgba, RgbaImage};

use crate::badge::TrayState;

pub const ICON_SIZE: u32 = 32;

const BODY: Rgba<u8> = Rgba([255, 255, 255, 255]);
const DOT: Rgba<u8> = Rgba([229, 57, 53, 255]);

/// Detects if the system is using light mode.
pub fn is_light_mode() -> bool {
    match dark_light::detect() {
        Ok(dark_light::Mode::Light) => true,
        // unknown or failed detection: assume a dark panel
        Ok(dark_light::Mode::Dark) | Ok(dark_light::Mode::Unspecified) | Err(_) => false,
    }
}

/// Inverted copy for light panels. Alpha and the unread dot are kept.
pub fn create_dark_icon(image: &RgbaImage) -> RgbaImage {
    let mut dark = image.clone();
    for pixel in dark.pixels_mut() {
        if *pixel == DOT {
            continue;
        }
        pixel[0] = 255 - pixel[0];
        pixel[1] = 255 - pixel[1];
        pixel[2] = 255 - pixel[2];
    }
    dark
}

fn inside_rounded_rect(x: u32, y: u32, min: u32, max: u32, radius: u32) -> bool {
    if x < min || y < min || x > max || y > max {
        return false;
    }
    let cx = x.clamp(min + radius, max - radius);
    let cy = y.clamp(min + radius, max - radius);
    let (dx, dy) = (x.abs_diff(cx), y.abs_diff(cy));
    dx * dx + dy * dy <= radius * radius
}

/// A speech bubble; the unread variant carries a red dot in the corner.
pub fn render(state: TrayState) -> RgbaImage {
    let mut image = RgbaImage::new(ICON_SIZE, ICON_SIZE);

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let bubble = inside_rounded_rect(x, y, 3, 24, 5);
        // tail below the bubble, left side
        let tail = (25..=29).contains(&y) && x >= 7 && x <= 7 + (29 - y);
        if bubble || tail {
            *pixel = BODY;
        }
    }

    if state == TrayState::Unread {
        let (cx, cy, r) = (25i32, 7i32, 6i32);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let (dx, dy) = (x as i32 - cx, y as i32 - cy);
            if dx * dx + dy * dy <= r * r {
                *pixel = DOT;
            }
        }
    }

    image
}

/// Icon for the current panel theme.
pub fn themed(state: TrayState) -> RgbaImage {
    let image = render(state);
    if is_light_mode() {
        tracing::debug!("Light mode detected, using dark tray icon");
        create_dark_icon(&image)
    } else {
        image
    }
}

/// RGBA to the ARGB32 layout StatusNotifierItem expects.
pub fn to_argb(image: &RgbaImage) -> Vec<u8> {
    let mut argb = Vec::with_capacity(image.as_raw().len());
    for pixel in image.pixels() {
        argb.extend_from_slice(&[pixel[3], pixel[0], pixel[1], pixel[2]]);
    }
    argb
}
