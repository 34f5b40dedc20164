use crate::{Error, Result, Timestamp};
use std::fmt;

/// Element and channel layout of a [`Mat`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatType {
    /// 4 x u8 per pixel (B, G, R, A).
    U8C4,
    /// 1 x f32 per pixel.
    F32C1,
    /// 4 x f32 per pixel.
    F32C4,
}

impl MatType {
    pub const fn channels(self) -> usize {
        match self {
            MatType::U8C4 | MatType::F32C4 => 4,
            MatType::F32C1 => 1,
        }
    }

    pub const fn element_bytes(self) -> usize {
        match self {
            MatType::U8C4 => 1,
            MatType::F32C1 | MatType::F32C4 => 4,
        }
    }

    pub const fn element_name(self) -> &'static str {
        match self {
            MatType::U8C4 => "unsigned char",
            MatType::F32C1 | MatType::F32C4 => "float",
        }
    }
}

impl fmt::Display for MatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatType::U8C4 => "U8_C4",
            MatType::F32C1 => "F32_C1",
            MatType::F32C4 => "F32_C4",
        };
        f.write_str(s)
    }
}

/// Scalar types a [`Mat`] can hold.
pub trait Element: Copy + Default + fmt::Debug + 'static {
    /// Rust name used in diagnostics.
    const NAME: &'static str;

    fn fits(mat_type: MatType) -> bool;
}

impl Element for u8 {
    const NAME: &'static str = "u8";

    fn fits(mat_type: MatType) -> bool {
        mat_type == MatType::U8C4
    }
}

impl Element for f32 {
    const NAME: &'static str = "f32";

    fn fits(mat_type: MatType) -> bool {
        matches!(mat_type, MatType::F32C1 | MatType::F32C4)
    }
}

/// Row-major pixel buffer filled by the session's retrieve calls.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mat<T: Element> {
    width: u32,
    height: u32,
    mat_type: Option<MatType>,
    data: Vec<T>,
    timestamp: Option<Timestamp>,
}

impl<T: Element> Mat<T> {
    /// An empty buffer; retrieve calls size it.
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            mat_type: None,
            data: Vec::new(),
            timestamp: None,
        }
    }

    pub fn with_size(width: u32, height: u32, mat_type: MatType) -> Result<Self> {
        let mut m = Self::new();
        m.reset(width, height, mat_type)?;
        Ok(m)
    }

    /// Build from existing row-major data.
    pub fn from_vec(width: u32, height: u32, mat_type: MatType, data: Vec<T>) -> Result<Self> {
        if !T::fits(mat_type) {
            return Err(Error::Unsupported("element type does not match mat type"));
        }
        let expected = width as usize * height as usize * mat_type.channels();
        if data.len() != expected {
            return Err(Error::Unsupported("buffer length does not match dimensions"));
        }
        Ok(Self {
            width,
            height,
            mat_type: Some(mat_type),
            data,
            timestamp: None,
        })
    }

    /// Resize for new content. Existing values are overwritten with defaults.
    pub(crate) fn reset(&mut self, width: u32, height: u32, mat_type: MatType) -> Result<()> {
        if !T::fits(mat_type) {
            return Err(Error::Unsupported("element type does not match mat type"));
        }
        let len = width as usize * height as usize * mat_type.channels();
        self.data.clear();
        self.data.resize(len, T::default());
        self.width = width;
        self.height = height;
        self.mat_type = Some(mat_type);
        self.timestamp = None;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.mat_type.map(MatType::channels).unwrap_or(0)
    }

    pub fn data_type(&self) -> Option<MatType> {
        self.mat_type
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    pub(crate) fn set_timestamp(&mut self, ts: Timestamp) {
        self.timestamp = Some(ts);
    }

    /// Size of one pixel in bytes.
    pub fn pixel_bytes(&self) -> usize {
        self.mat_type
            .map(|t| t.channels() * t.element_bytes())
            .unwrap_or(0)
    }

    /// Size of one row in bytes.
    pub fn step_bytes(&self) -> usize {
        self.pixel_bytes() * self.width as usize
    }

    /// `(rows, cols, channels)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, self.channels())
    }

    pub fn infos(&self) -> String {
        let ts = self
            .timestamp
            .map(|t| t.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        match self.mat_type {
            Some(t) => format!(
                "Ts {ts} Mat of size [{},{}], with {} channels of type {} ({t})",
                self.width,
                self.height,
                t.channels(),
                t.element_name()
            ),
            None => format!("Ts {ts} empty Mat"),
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    fn offset(&self, x: u32, y: u32) -> Result<usize> {
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfRange {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok((y as usize * self.width as usize + x as usize) * self.channels())
    }

    /// All channels of pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Result<&[T]> {
        let off = self.offset(x, y)?;
        Ok(&self.data[off..off + self.channels()])
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> Result<&mut [T]> {
        let off = self.offset(x, y)?;
        let c = self.channels();
        Ok(&mut self.data[off..off + c])
    }

    /// First channel of pixel `(x, y)`.
    pub fn value(&self, x: u32, y: u32) -> Result<T> {
        let off = self.offset(x, y)?;
        Ok(self.data[off])
    }

    /// Rows as slices of `width * channels` elements.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        let stride = (self.width as usize * self.channels()).max(1);
        self.data.chunks(stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_for_depth_mat() {
        let m = Mat::<f32>::with_size(1920, 1080, MatType::F32C1).unwrap();
        assert_eq!(m.pixel_bytes(), 4);
        assert_eq!(m.step_bytes(), 7680);
        assert_eq!(m.shape(), (1080, 1920, 1));
        assert_eq!(m.data_type(), Some(MatType::F32C1));
        assert!(m.infos().contains("[1920,1080], with 1 channels of type float"));
    }

    #[test]
    fn test_image_mat_pixel_access() {
        let mut m = Mat::<u8>::with_size(4, 3, MatType::U8C4).unwrap();
        m.pixel_mut(3, 2).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(m.pixel(3, 2).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(m.value(3, 2).unwrap(), 1);
        assert_eq!(m.step_bytes(), 16);
    }

    #[test]
    fn test_out_of_bounds_is_range_error() {
        let m = Mat::<f32>::with_size(10, 5, MatType::F32C1).unwrap();
        assert!(matches!(m.value(10, 0), Err(Error::OutOfRange { .. })));
        assert!(matches!(m.value(0, 5), Err(Error::OutOfRange { .. })));
        assert!(m.value(9, 4).is_ok());
    }

    #[test]
    fn test_type_mismatch_rejected() {
        assert!(Mat::<u8>::with_size(2, 2, MatType::F32C1).is_err());
        assert!(Mat::<f32>::from_vec(2, 2, MatType::F32C1, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_rows() {
        let m = Mat::from_vec(3, 2, MatType::F32C1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let rows: Vec<&[f32]> = m.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_empty_mat() {
        let m = Mat::<f32>::new();
        assert!(m.is_empty());
        assert_eq!(m.pixel_bytes(), 0);
        assert!(m.infos().contains("empty"));
    }
}
