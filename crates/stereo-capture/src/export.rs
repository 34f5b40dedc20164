use crate::{Error, Mat, MatType, Result, Timestamp};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Fixed decimal digits used for every exported depth value.
pub const DEPTH_DECIMALS: usize = 8;

/// Format one value with [`DEPTH_DECIMALS`] digits; non-finite values as `nan`, `inf`, `-inf`.
pub fn format_value(v: f32) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v == f32::INFINITY {
        "inf".to_string()
    } else if v == f32::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{:.*}", DEPTH_DECIMALS, v)
    }
}

/// Write a single-channel matrix as text: one line per row, space-separated values.
pub fn write_depth_txt<W: Write>(mut w: W, depth: &Mat<f32>) -> Result<()> {
    if depth.data_type() != Some(MatType::F32C1) {
        return Err(Error::Unsupported("text export needs an F32_C1 matrix"));
    }
    let mut line = String::new();
    for row in depth.rows() {
        line.clear();
        for (i, v) in row.iter().enumerate() {
            if i > 0 {
                line.push(' ');
            }
            line.push_str(&format_value(*v));
        }
        line.push('\n');
        w.write_all(line.as_bytes())?;
    }
    w.flush()?;
    Ok(())
}

/// File name keyed by the frame's capture time: `<timestamp_ms>.txt`.
pub fn depth_file_name(ts: Timestamp) -> String {
    format!("{}.txt", ts.as_millis())
}

/// Write `depth` to `<dir>/<timestamp_ms>.txt` and return the path.
pub fn export_depth_txt(dir: impl AsRef<Path>, depth: &Mat<f32>, ts: Timestamp) -> Result<PathBuf> {
    let path = dir.as_ref().join(depth_file_name(ts));
    let file = File::create(&path).map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
    write_depth_txt(BufWriter::new(file), depth)?;
    info!(path = %path.display(), rows = depth.height(), cols = depth.width(), "depth exported");
    Ok(path)
}

/// Unpack the RGBA colour stored in the fourth channel of an XYZRGBA point.
pub fn unpack_rgba(packed: f32) -> [u8; 4] {
    packed.to_bits().to_le_bytes()
}

pub fn pack_rgba(rgba: [u8; 4]) -> f32 {
    f32::from_bits(u32::from_le_bytes(rgba))
}

/// Write the valid points (finite Z) of an XYZRGBA cloud as ASCII PLY.
/// Returns the number of vertices written.
pub fn write_point_cloud_ply(path: impl AsRef<Path>, cloud: &Mat<f32>) -> Result<usize> {
    if cloud.data_type() != Some(MatType::F32C4) {
        return Err(Error::Unsupported("PLY export needs an F32_C4 point cloud"));
    }
    let mut body = String::new();
    let mut count = 0usize;
    for p in cloud.data().chunks_exact(4) {
        let (x, y, z) = (p[0], p[1], p[2]);
        if !(z.is_finite() && x.is_finite() && y.is_finite()) {
            continue;
        }
        let [r, g, b, _] = unpack_rgba(p[3]);
        body.push_str(&format!("{x} {y} {z} {r} {g} {b}\n"));
        count += 1;
    }

    let header = format!(
        "ply\nformat ascii 1.0\ncomment generated by stereo-capture\nelement vertex {count}\nproperty float x\nproperty float y\nproperty float z\nproperty uchar red\nproperty uchar green\nproperty uchar blue\nend_header\n"
    );
    let path = path.as_ref();
    let mut out = BufWriter::new(
        File::create(path).map_err(|e| Error::Io(format!("{}: {e}", path.display())))?,
    );
    out.write_all(header.as_bytes())?;
    out.write_all(body.as_bytes())?;
    out.flush()?;
    info!(path = %path.display(), points = count, "point cloud exported");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(709.838_44), "709.83843994");
        assert_eq!(format_value(1.0), "1.00000000");
        assert_eq!(format_value(f32::NAN), "nan");
        assert_eq!(format_value(f32::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_write_depth_txt_layout() {
        let m = Mat::from_vec(3, 2, MatType::F32C1, vec![1.0, f32::NAN, 2.5, 0.125, 3.0, 4.0])
            .unwrap();
        let mut buf = Vec::new();
        write_depth_txt(&mut buf, &m).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "1.00000000 nan 2.50000000\n0.12500000 3.00000000 4.00000000\n"
        );
    }

    #[test]
    fn test_export_named_by_timestamp_and_shape_matches() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = Mat::<f32>::with_size(1920, 1080, MatType::F32C1).unwrap();
        m.pixel_mut(1000, 600).unwrap()[0] = 709.838_44;
        let ts = Timestamp::from_nanos(1_709_651_329_565_919_300);

        let path = export_depth_txt(dir.path(), &m, ts).unwrap();
        assert_eq!(path.file_name().unwrap(), "1709651329565.txt");

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1080);
        assert!(lines.iter().all(|l| l.split(' ').count() == 1920));
        let v = lines[600].split(' ').nth(1000).unwrap();
        assert_eq!(v, "709.83843994");
    }

    #[test]
    fn test_export_rejects_multichannel() {
        let m = Mat::<f32>::with_size(2, 2, MatType::F32C4).unwrap();
        let mut buf = Vec::new();
        assert!(write_depth_txt(&mut buf, &m).is_err());
    }

    #[test]
    fn test_rgba_packing() {
        let packed = pack_rgba([10, 20, 30, 255]);
        assert_eq!(unpack_rgba(packed), [10, 20, 30, 255]);
    }

    #[test]
    fn test_ply_skips_invalid_points() {
        let dir = tempfile::tempdir().unwrap();
        let c = pack_rgba([255, 0, 0, 255]);
        let cloud = Mat::from_vec(
            2,
            1,
            MatType::F32C4,
            vec![1.0, 2.0, 3.0, c, f32::NAN, f32::NAN, f32::NAN, c],
        )
        .unwrap();
        let path = dir.path().join("cloud.ply");
        let n = write_point_cloud_ply(&path, &cloud).unwrap();
        assert_eq!(n, 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("element vertex 1\n"));
        assert!(text.ends_with("1 2 3 255 0 0\n"));
    }
}
