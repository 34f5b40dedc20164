use crate::{Error, Mat, MatType, Result};

#[cfg(feature = "opencv")]
use opencv::{core, highgui, prelude::*};

/// Show a BGRA image in a window and block until a key is pressed.
#[cfg(feature = "opencv")]
pub fn show_until_key(title: &str, image: &Mat<u8>) -> Result<()> {
    if image.data_type() != Some(MatType::U8C4) {
        return Err(Error::Unsupported("display needs a U8_C4 image"));
    }
    let flat = core::Mat::from_slice(image.data()).map_err(|e| Error::Io(e.to_string()))?;
    let bgra = flat
        .reshape(4, image.height() as i32)
        .map_err(|e| Error::Io(e.to_string()))?;
    highgui::imshow(title, &bgra).map_err(|e| Error::Io(e.to_string()))?;
    highgui::wait_key(0).map_err(|e| Error::Io(e.to_string()))?;
    highgui::destroy_all_windows().map_err(|e| Error::Io(e.to_string()))?;
    Ok(())
}

#[cfg(not(feature = "opencv"))]
pub fn show_until_key(_title: &str, image: &Mat<u8>) -> Result<()> {
    if image.data_type() != Some(MatType::U8C4) {
        return Err(Error::Unsupported("display needs a U8_C4 image"));
    }
    Err(Error::Unsupported(
        "display needs the opencv feature; rebuild with --features stereo-capture/opencv",
    ))
}

#[cfg(all(test, not(feature = "opencv")))]
mod tests {
    use super::*;

    #[test]
    fn test_display_unavailable_without_opencv() {
        let img = Mat::<u8>::with_size(2, 2, MatType::U8C4).unwrap();
        assert!(matches!(
            show_until_key("LEFT View", &img),
            Err(Error::Unsupported(_))
        ));
    }
}
