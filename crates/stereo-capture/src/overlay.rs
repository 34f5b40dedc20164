use crate::{Error, Mat, MatType, Result};

/// Draw a circle outline on a BGRA image. Pixels outside the image are clipped.
///
/// A pixel is painted when its distance to the centre is within
/// `thickness / 2` of `radius`.
pub fn draw_circle(
    image: &mut Mat<u8>,
    center: (u32, u32),
    radius: u32,
    bgr: [u8; 3],
    thickness: u32,
) -> Result<()> {
    if image.data_type() != Some(MatType::U8C4) {
        return Err(Error::Unsupported("circle overlay needs a U8_C4 image"));
    }
    let (cx, cy) = (i64::from(center.0), i64::from(center.1));
    let r = f64::from(radius);
    let half = f64::from(thickness.max(1)) / 2.0;
    let reach = i64::from(radius.saturating_add(thickness));
    let (w, h) = (i64::from(image.width()), i64::from(image.height()));

    for y in (cy - reach).max(0)..(cy + reach + 1).min(h) {
        for x in (cx - reach).max(0)..(cx + reach + 1).min(w) {
            let d = ((x - cx) as f64).hypot((y - cy) as f64);
            if (d - r).abs() <= half {
                let px = image.pixel_mut(x as u32, y as u32)?;
                px[..3].copy_from_slice(&bgr);
            }
        }
    }
    Ok(())
}
