//! NIfTI interchange I/O.
//!
//! Volumes are loaded as `Array3<f32>` in `[x, y, z]` index order together
//! with the 4x4 voxel-to-world affine. The affine is taken from the sform
//! when set, the qform quaternion otherwise, and falls back to pixdim
//! scaling. Both `.nii` and `.nii.gz` are supported on read and write.
//!
//! Errors are plain reason strings; callers wrap them in the appropriate
//! stage error.

use std::path::Path;

use nalgebra::Matrix4;
use ndarray::{Array3, ArrayD, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

/// An in-memory volumetric image: voxel data plus voxel-to-world affine.
#[derive(Debug, Clone)]
pub struct Volume {
    /// Voxel data, indexed `[x, y, z]`.
    pub data: Array3<f32>,
    /// Voxel-index to world-coordinate mapping (homogeneous 4x4).
    pub affine: Matrix4<f64>,
}

impl Volume {
    pub fn dims(&self) -> (usize, usize, usize) {
        let s = self.data.shape();
        (s[0], s[1], s[2])
    }

    /// Voxel edge lengths in mm, from the affine column norms.
    pub fn voxel_size(&self) -> (f64, f64, f64) {
        (
            self.affine.column(0).xyz().norm(),
            self.affine.column(1).xyz().norm(),
            self.affine.column(2).xyz().norm(),
        )
    }

    /// Whether `other` shares this volume's grid: same shape and same
    /// affine to within `tol` per element.
    pub fn same_grid(&self, other: &Volume, tol: f64) -> bool {
        if self.data.shape() != other.data.shape() {
            return false;
        }
        self.affine
            .iter()
            .zip(other.affine.iter())
            .all(|(a, b)| (a - b).abs() <= tol)
    }
}

/// Read a 3D volume (4D inputs use the first timepoint).
pub fn read_volume(path: &Path) -> Result<Volume, String> {
    let obj = ReaderOptions::new()
        .read_file(path)
        .map_err(|e| format!("failed to read NIfTI {}: {e}", path.display()))?;

    let affine = affine_from_header(obj.header());

    let array: ArrayD<f32> = obj
        .into_volume()
        .into_ndarray::<f32>()
        .map_err(|e| format!("failed to decode volume {}: {e}", path.display()))?;

    let data = match array.ndim() {
        3 => array
            .into_dimensionality::<Ix3>()
            .map_err(|e| format!("dimensionality error in {}: {e}", path.display()))?,
        n if n >= 4 => {
            let first = array.index_axis_move(ndarray::Axis(3), 0);
            first
                .into_dimensionality::<Ix3>()
                .map_err(|e| format!("dimensionality error in {}: {e}", path.display()))?
        }
        n => {
            return Err(format!(
                "expected a 3D volume in {}, found {n} dimensions",
                path.display()
            ))
        }
    };

    Ok(Volume { data, affine })
}

/// Write a volume; gzip compression follows the `.gz` extension.
pub fn write_volume(path: &Path, volume: &Volume) -> Result<(), String> {
    use nifti::writer::WriterOptions;

    let header = header_for(volume);
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&volume.data)
        .map_err(|e| format!("failed to write NIfTI {}: {e}", path.display()))
}

/// Voxel-to-world affine from the header: sform, then qform, then pixdim.
fn affine_from_header(header: &NiftiHeader) -> Matrix4<f64> {
    if header.sform_code > 0 {
        let x = header.srow_x;
        let y = header.srow_y;
        let z = header.srow_z;
        return Matrix4::new(
            x[0] as f64, x[1] as f64, x[2] as f64, x[3] as f64,
            y[0] as f64, y[1] as f64, y[2] as f64, y[3] as f64,
            z[0] as f64, z[1] as f64, z[2] as f64, z[3] as f64,
            0.0, 0.0, 0.0, 1.0,
        );
    }

    if header.qform_code > 0 {
        // Quaternion form per the NIfTI-1 standard.
        let b = header.quatern_b as f64;
        let c = header.quatern_c as f64;
        let d = header.quatern_d as f64;
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();
        let qfac = if header.pixdim[0] == 0.0 {
            1.0
        } else {
            header.pixdim[0] as f64
        };

        let dx = header.pixdim[1] as f64;
        let dy = header.pixdim[2] as f64;
        let dz = header.pixdim[3] as f64 * qfac;

        let r11 = a * a + b * b - c * c - d * d;
        let r12 = 2.0 * b * c - 2.0 * a * d;
        let r13 = 2.0 * b * d + 2.0 * a * c;
        let r21 = 2.0 * b * c + 2.0 * a * d;
        let r22 = a * a + c * c - b * b - d * d;
        let r23 = 2.0 * c * d - 2.0 * a * b;
        let r31 = 2.0 * b * d - 2.0 * a * c;
        let r32 = 2.0 * c * d + 2.0 * a * b;
        let r33 = a * a + d * d - c * c - b * b;

        return Matrix4::new(
            r11 * dx, r12 * dy, r13 * dz, header.quatern_x as f64,
            r21 * dx, r22 * dy, r23 * dz, header.quatern_y as f64,
            r31 * dx, r32 * dy, r33 * dz, header.quatern_z as f64,
            0.0, 0.0, 0.0, 1.0,
        );
    }

    // Neither form set: pixdim scaling only.
    let dx = header.pixdim[1] as f64;
    let dy = header.pixdim[2] as f64;
    let dz = header.pixdim[3] as f64;
    Matrix4::new(
        dx, 0.0, 0.0, 0.0,
        0.0, dy, 0.0, 0.0,
        0.0, 0.0, dz, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Build a header carrying the volume's grid geometry for writing.
fn header_for(volume: &Volume) -> NiftiHeader {
    let (nx, ny, nz) = volume.dims();
    let (vx, vy, vz) = volume.voxel_size();

    let mut header = NiftiHeader::default();
    header.dim = [3, nx as u16, ny as u16, nz as u16, 1, 1, 1, 1];
    header.pixdim = [1.0, vx as f32, vy as f32, vz as f32, 1.0, 1.0, 1.0, 1.0];
    header.sform_code = 1;
    header.qform_code = 0;

    let a = &volume.affine;
    header.srow_x = [a[(0, 0)] as f32, a[(0, 1)] as f32, a[(0, 2)] as f32, a[(0, 3)] as f32];
    header.srow_y = [a[(1, 0)] as f32, a[(1, 1)] as f32, a[(1, 2)] as f32, a[(1, 3)] as f32];
    header.srow_z = [a[(2, 0)] as f32, a[(2, 1)] as f32, a[(2, 2)] as f32, a[(2, 3)] as f32];
    header.scl_slope = 1.0;
    header.scl_inter = 0.0;
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn synthetic(nx: usize, ny: usize, nz: usize, affine: Matrix4<f64>) -> Volume {
        let data = Array3::from_shape_fn((nx, ny, nz), |(i, j, k)| (i + 10 * j + 100 * k) as f32);
        Volume { data, affine }
    }

    #[test]
    fn test_affine_prefers_sform() {
        let mut header = NiftiHeader::default();
        header.sform_code = 1;
        header.srow_x = [2.0, 0.0, 0.0, 10.0];
        header.srow_y = [0.0, 2.0, 0.0, 20.0];
        header.srow_z = [0.0, 0.0, 2.0, 30.0];
        header.qform_code = 1; // should be ignored

        let affine = affine_from_header(&header);
        assert_abs_diff_eq!(affine[(0, 0)], 2.0);
        assert_abs_diff_eq!(affine[(2, 3)], 30.0);
        assert_abs_diff_eq!(affine[(3, 3)], 1.0);
    }

    #[test]
    fn test_affine_qform_identity_rotation() {
        let mut header = NiftiHeader::default();
        header.sform_code = 0;
        header.qform_code = 1;
        // b=c=d=0 is the identity quaternion
        header.quatern_b = 0.0;
        header.quatern_c = 0.0;
        header.quatern_d = 0.0;
        header.quatern_x = 5.0;
        header.quatern_y = -3.0;
        header.quatern_z = 0.0;
        header.pixdim = [1.0, 1.5, 2.0, 2.5, 1.0, 1.0, 1.0, 1.0];

        let affine = affine_from_header(&header);
        assert_abs_diff_eq!(affine[(0, 0)], 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(affine[(1, 1)], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(affine[(2, 2)], 2.5, epsilon = 1e-6);
        assert_abs_diff_eq!(affine[(0, 3)], 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(affine[(1, 3)], -3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_affine_pixdim_fallback() {
        let mut header = NiftiHeader::default();
        header.sform_code = 0;
        header.qform_code = 0;
        header.pixdim = [1.0, 1.0, 2.0, 3.0, 1.0, 1.0, 1.0, 1.0];

        let affine = affine_from_header(&header);
        assert_abs_diff_eq!(affine[(0, 0)], 1.0);
        assert_abs_diff_eq!(affine[(1, 1)], 2.0);
        assert_abs_diff_eq!(affine[(2, 2)], 3.0);
        assert_abs_diff_eq!(affine[(0, 3)], 0.0);
    }

    #[test]
    fn test_roundtrip_preserves_data_and_grid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vol.nii.gz");

        let affine = Matrix4::new(
            2.0, 0.0, 0.0, -10.0,
            0.0, 2.0, 0.0, -20.0,
            0.0, 0.0, 2.0, -30.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let vol = synthetic(4, 5, 6, affine);

        write_volume(&path, &vol).unwrap();
        let loaded = read_volume(&path).unwrap();

        assert_eq!(loaded.dims(), (4, 5, 6));
        assert!(loaded.same_grid(&vol, 1e-4));
        for (a, b) in vol.data.iter().zip(loaded.data.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_voxel_size_from_affine() {
        let affine = Matrix4::new(
            0.0, 0.0, 3.0, 0.0,
            1.5, 0.0, 0.0, 0.0,
            0.0, 2.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let vol = synthetic(2, 2, 2, affine);
        let (vx, vy, vz) = vol.voxel_size();
        assert_abs_diff_eq!(vx, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(vy, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(vz, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_volume(Path::new("/nonexistent/vol.nii.gz")).unwrap_err();
        assert!(err.contains("failed to read"), "got: {err}");
    }
}
