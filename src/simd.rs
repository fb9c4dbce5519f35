//! Vectorized child-key search.
//!
//! Both operations scan a fixed-width key vector of which only the first
//! `width` lanes are occupied and return the 1-based lane index of the first
//! hit, or 0 when no lane matches. The 1-based contract leaves 0 free to mean
//! "absent" so callers can branch on the return value directly.
//!
//! `findgt` compares lanes as unsigned octets; key octets can exceed 0x80.

/// True when the 32-lane searches compile down to vector instructions.
///
/// Without them a 32-wide node would be scanned scalar, which is slower than
/// jumping straight to a table-indexed layout, so node growth skips the
/// 32-wide representation entirely.
pub(crate) const HAS_WIDE_LANES: bool = cfg!(all(target_arch = "x86_64", target_feature = "avx2"));

#[cfg(target_arch = "x86_64")]
#[inline]
fn first_lane(bitmap: u32) -> u8 {
    if bitmap == 0 {
        0
    } else {
        bitmap.trailing_zeros() as u8 + 1
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn lane_mask(width: u8, lanes: u8) -> u32 {
    if width >= lanes {
        (1u64 << lanes).wrapping_sub(1) as u32
    } else {
        (1u32 << width) - 1
    }
}

#[cfg(target_arch = "x86_64")]
pub(crate) fn v16_findeq(octet: u8, vec: &[u8; 16], width: u8) -> u8 {
    use std::arch::x86_64::*;

    // SAFETY: SSE2 is part of the x86_64 baseline.
    unsafe {
        let hay = _mm_loadu_si128(vec.as_ptr().cast());
        let cmp = _mm_cmpeq_epi8(_mm_set1_epi8(octet as i8), hay);
        let bitmap = _mm_movemask_epi8(cmp) as u32 & lane_mask(width, 16);
        first_lane(bitmap)
    }
}

#[cfg(target_arch = "x86_64")]
pub(crate) fn v16_findgt(octet: u8, vec: &[u8; 16], width: u8) -> u8 {
    use std::arch::x86_64::*;

    // SAFETY: SSE2 is part of the x86_64 baseline.
    unsafe {
        // cmpgt is signed; biasing both sides by 0x80 yields unsigned order.
        let bias = _mm_set1_epi8(0x80u8 as i8);
        let hay = _mm_xor_si128(_mm_loadu_si128(vec.as_ptr().cast()), bias);
        let needle = _mm_xor_si128(_mm_set1_epi8(octet as i8), bias);
        let cmp = _mm_cmpgt_epi8(hay, needle);
        let bitmap = _mm_movemask_epi8(cmp) as u32 & lane_mask(width, 16);
        first_lane(bitmap)
    }
}

#[cfg(not(target_arch = "x86_64"))]
pub(crate) fn v16_findeq(octet: u8, vec: &[u8; 16], width: u8) -> u8 {
    scalar_findeq(octet, vec, width)
}

#[cfg(not(target_arch = "x86_64"))]
pub(crate) fn v16_findgt(octet: u8, vec: &[u8; 16], width: u8) -> u8 {
    scalar_findgt(octet, vec, width)
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub(crate) fn v32_findeq(octet: u8, vec: &[u8; 32], width: u8) -> u8 {
    use std::arch::x86_64::*;

    // SAFETY: the avx2 target feature is enabled for this build.
    unsafe {
        let hay = _mm256_loadu_si256(vec.as_ptr().cast());
        let cmp = _mm256_cmpeq_epi8(_mm256_set1_epi8(octet as i8), hay);
        let bitmap = _mm256_movemask_epi8(cmp) as u32 & lane_mask(width, 32);
        first_lane(bitmap)
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub(crate) fn v32_findgt(octet: u8, vec: &[u8; 32], width: u8) -> u8 {
    use std::arch::x86_64::*;

    // SAFETY: the avx2 target feature is enabled for this build.
    unsafe {
        let bias = _mm256_set1_epi8(0x80u8 as i8);
        let hay = _mm256_xor_si256(_mm256_loadu_si256(vec.as_ptr().cast()), bias);
        let needle = _mm256_xor_si256(_mm256_set1_epi8(octet as i8), bias);
        let cmp = _mm256_cmpgt_epi8(hay, needle);
        let bitmap = _mm256_movemask_epi8(cmp) as u32 & lane_mask(width, 32);
        first_lane(bitmap)
    }
}

#[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
pub(crate) fn v32_findeq(octet: u8, vec: &[u8; 32], width: u8) -> u8 {
    scalar_findeq(octet, vec, width)
}

#[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
pub(crate) fn v32_findgt(octet: u8, vec: &[u8; 32], width: u8) -> u8 {
    scalar_findgt(octet, vec, width)
}

#[allow(dead_code)]
fn scalar_findeq(octet: u8, vec: &[u8], width: u8) -> u8 {
    let occupied = (width as usize).min(vec.len());
    for (idx, &lane) in vec[..occupied].iter().enumerate() {
        if lane == octet {
            return idx as u8 + 1;
        }
    }
    0
}

#[allow(dead_code)]
fn scalar_findgt(octet: u8, vec: &[u8], width: u8) -> u8 {
    let occupied = (width as usize).min(vec.len());
    for (idx, &lane) in vec[..occupied].iter().enumerate() {
        if lane > octet {
            return idx as u8 + 1;
        }
    }
    0
}
