//! Mask Binarizer, library form: thresholding, label-class extraction,
//! and morphological erosion on in-memory volumes.
//!
//! Masks are ordinary volumes whose voxels are exactly 0.0 or 1.0 on the
//! grid of their input. Thresholding is strict greater-than, so a threshold
//! equal to the volume maximum yields the empty mask.

use ndarray::Array3;

use crate::config::TissueClass;
use crate::nifti_io::Volume;

/// FreeSurfer label values counted as white matter: cerebral and
/// cerebellar WM, WM hypointensities, and the corpus callosum
/// subdivisions.
const WHITE_LABELS: [u32; 12] = [2, 41, 7, 46, 77, 78, 79, 251, 252, 253, 254, 255];

/// Subcortical gray-matter labels; cortical gray is covered by the
/// aparc ranges 1000-1035 and 2000-2035 (left/right hemisphere).
const GRAY_SUBCORTICAL: [u32; 20] = [
    3, 42, 8, 47, 10, 11, 12, 13, 17, 18, 26, 28, 49, 50, 51, 52, 53, 54, 58, 60,
];

/// Whether a label value belongs to the given tissue class. The two
/// classes are disjoint: no label is both white and gray.
pub fn label_in_class(label: u32, class: TissueClass) -> bool {
    match class {
        TissueClass::White => WHITE_LABELS.contains(&label),
        TissueClass::Gray => {
            GRAY_SUBCORTICAL.contains(&label)
                || (1000..=1035).contains(&label)
                || (2000..=2035).contains(&label)
        }
    }
}

/// Binarize by strict threshold: voxels strictly above `threshold` become
/// 1.0, everything else 0.0.
pub fn threshold_mask(volume: &Volume, threshold: f32) -> Volume {
    Volume {
        data: volume.data.mapv(|v| if v > threshold { 1.0 } else { 0.0 }),
        affine: volume.affine,
    }
}

/// Extract the binary mask of one tissue class from a label volume.
///
/// Label values are taken by rounding; nearest-neighbour resampling
/// upstream guarantees they are still exact integers.
pub fn tissue_mask(labels: &Volume, class: TissueClass) -> Volume {
    Volume {
        data: labels.data.mapv(|v| {
            let label = v.round() as i64;
            if label > 0 && label_in_class(label as u32, class) {
                1.0
            } else {
                0.0
            }
        }),
        affine: labels.affine,
    }
}

/// Erode a binary mask with a spherical structuring element of the given
/// voxel radius. Voxels touching the grid boundary within the radius are
/// removed, so the result is always a subset of the input.
pub fn erode_mask(mask: &Volume, radius: u32) -> Volume {
    if radius == 0 {
        return mask.clone();
    }

    let (nx, ny, nz) = mask.dims();
    let r = radius as i64;
    let mut eroded = Array3::<f32>::zeros((nx, ny, nz));

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                if mask.data[[i, j, k]] == 0.0 {
                    continue;
                }

                let mut all_inside = true;
                'outer: for dz in -r..=r {
                    for dy in -r..=r {
                        for dx in -r..=r {
                            if dx * dx + dy * dy + dz * dz > r * r {
                                continue;
                            }
                            let ni = i as i64 + dx;
                            let nj = j as i64 + dy;
                            let nk = k as i64 + dz;
                            if ni < 0
                                || nj < 0
                                || nk < 0
                                || ni >= nx as i64
                                || nj >= ny as i64
                                || nk >= nz as i64
                            {
                                all_inside = false;
                                break 'outer;
                            }
                            if mask.data[[ni as usize, nj as usize, nk as usize]] == 0.0 {
                                all_inside = false;
                                break 'outer;
                            }
                        }
                    }
                }

                if all_inside {
                    eroded[[i, j, k]] = 1.0;
                }
            }
        }
    }

    Volume {
        data: eroded,
        affine: mask.affine,
    }
}
