//! Common test utilities for fsmask integration tests

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Matrix4;
use ndarray::Array3;

use fsmask::nifti_io::{write_volume, Volume};

/// Build a volume from a per-voxel function on an identity-affine grid.
pub fn volume_from_fn<F>(dims: (usize, usize, usize), affine: Matrix4<f64>, f: F) -> Volume
where
    F: Fn(usize, usize, usize) -> f32,
{
    Volume {
        data: Array3::from_shape_fn(dims, |(i, j, k)| f(i, j, k)),
        affine,
    }
}

/// A synthetic head: bright ball of "brain" with a white-matter core and a
/// gray-matter shell, in FreeSurfer label values.
pub struct SyntheticSubject {
    pub t1: Volume,
    pub brain: Volume,
    pub labels: Volume,
}

pub fn synthetic_subject(n: usize) -> SyntheticSubject {
    let c = n as f32 / 2.0;
    let r_brain = n as f32 * 0.4;
    let r_white = n as f32 * 0.2;
    let dist = move |i: usize, j: usize, k: usize| {
        let (x, y, z) = (i as f32 - c, j as f32 - c, k as f32 - c);
        (x * x + y * y + z * z).sqrt()
    };

    let affine = Matrix4::identity();
    let t1 = volume_from_fn((n, n, n), affine, |i, j, k| {
        if dist(i, j, k) < r_brain {
            120.0
        } else {
            10.0
        }
    });
    let brain = volume_from_fn((n, n, n), affine, |i, j, k| {
        if dist(i, j, k) < r_brain {
            100.0
        } else {
            0.0
        }
    });
    // 2 = left cerebral WM, 1010 = a cortical aparc label
    let labels = volume_from_fn((n, n, n), affine, |i, j, k| {
        let d = dist(i, j, k);
        if d < r_white {
            2.0
        } else if d < r_brain {
            1010.0
        } else {
            0.0
        }
    });

    SyntheticSubject { t1, brain, labels }
}

/// Write a recon-all-shaped subject directory with NIfTI sources and
/// return its root.
pub fn write_subject_dir(root: &Path, subject: &SyntheticSubject) -> PathBuf {
    let sub = root.join("sub-01");
    let mri = sub.join("mri");
    fs::create_dir_all(&mri).unwrap();
    write_volume(&mri.join("orig.nii.gz"), &subject.t1).unwrap();
    write_volume(&mri.join("brain.nii.gz"), &subject.brain).unwrap();
    write_volume(&mri.join("aparc+aseg.nii.gz"), &subject.labels).unwrap();
    sub
}

/// Fraction of voxels that are neither 0.0 nor 1.0 (should be zero for a
/// binary mask).
pub fn non_binary_fraction(vol: &Volume) -> f64 {
    let bad = vol
        .data
        .iter()
        .filter(|v| **v != 0.0 && **v != 1.0)
        .count();
    bad as f64 / vol.data.len() as f64
}

pub fn count_on(vol: &Volume) -> usize {
    vol.data.iter().filter(|v| **v == 1.0).count()
}
