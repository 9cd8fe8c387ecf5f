//! Spatial Aligner, library form: in-process grid resampling.
//!
//! Maps a moving volume onto a reference grid through world coordinates:
//! for each reference voxel, the reference affine gives the world point,
//! the inverse of the moving affine gives the continuous moving-voxel
//! index, and the requested interpolation samples there. The output always
//! carries the reference's shape and affine exactly; points falling
//! outside the moving volume read as zero.

use ndarray::Array3;

use crate::config::Interp;
use crate::nifti_io::Volume;

/// Resample `moving` onto `reference`'s grid.
///
/// Fails with a reason string when the moving affine is singular (no
/// world-to-voxel mapping exists).
pub fn resample_to_reference(
    moving: &Volume,
    reference: &Volume,
    interp: Interp,
) -> Result<Volume, String> {
    let world_to_moving = moving
        .affine
        .try_inverse()
        .ok_or_else(|| "moving volume affine is singular".to_string())?;

    let (nx, ny, nz) = reference.dims();
    let mut data = Array3::<f32>::zeros((nx, ny, nz));

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let world = reference.affine
                    * nalgebra::Vector4::new(i as f64, j as f64, k as f64, 1.0);
                let idx = world_to_moving * world;
                data[[i, j, k]] = match interp {
                    Interp::Nearest => sample_nearest(moving, idx.x, idx.y, idx.z),
                    Interp::Trilinear => sample_trilinear(moving, idx.x, idx.y, idx.z),
                };
            }
        }
    }

    Ok(Volume {
        data,
        affine: reference.affine,
    })
}

fn sample_nearest(vol: &Volume, x: f64, y: f64, z: f64) -> f32 {
    let (nx, ny, nz) = vol.dims();
    let i = x.round() as i64;
    let j = y.round() as i64;
    let k = z.round() as i64;
    if i < 0 || j < 0 || k < 0 || i >= nx as i64 || j >= ny as i64 || k >= nz as i64 {
        return 0.0;
    }
    vol.data[[i as usize, j as usize, k as usize]]
}

fn sample_trilinear(vol: &Volume, x: f64, y: f64, z: f64) -> f32 {
    let (nx, ny, nz) = vol.dims();
    let x0 = x.floor();
    let y0 = y.floor();
    let z0 = z.floor();
    let fx = (x - x0) as f32;
    let fy = (y - y0) as f32;
    let fz = (z - z0) as f32;

    // Voxel value with zero outside the grid.
    let at = |i: i64, j: i64, k: i64| -> f32 {
        if i < 0 || j < 0 || k < 0 || i >= nx as i64 || j >= ny as i64 || k >= nz as i64 {
            0.0
        } else {
            vol.data[[i as usize, j as usize, k as usize]]
        }
    };

    let (i0, j0, k0) = (x0 as i64, y0 as i64, z0 as i64);
    let c000 = at(i0, j0, k0);
    let c100 = at(i0 + 1, j0, k0);
    let c010 = at(i0, j0 + 1, k0);
    let c110 = at(i0 + 1, j0 + 1, k0);
    let c001 = at(i0, j0, k0 + 1);
    let c101 = at(i0 + 1, j0, k0 + 1);
    let c011 = at(i0, j0 + 1, k0 + 1);
    let c111 = at(i0 + 1, j0 + 1, k0 + 1);

    let c00 = c000 * (1.0 - fx) + c100 * fx;
    let c10 = c010 * (1.0 - fx) + c110 * fx;
    let c01 = c001 * (1.0 - fx) + c101 * fx;
    let c11 = c011 * (1.0 - fx) + c111 * fx;

    let c0 = c00 * (1.0 - fy) + c10 * fy;
    let c1 = c01 * (1.0 - fy) + c11 * fy;

    c0 * (1.0 - fz) + c1 * fz
}
