//! Cubic soft clip and output limiter.

/// Knee constant `a` in `y = x - x³/a²`.
pub const SOFT_CLIP_A: i64 = 2048;

/// Input magnitude where the cubic curve peaks (a/√3). Inputs beyond it
/// are held there so the transfer stays monotone.
pub const SOFT_CLIP_KNEE: i32 = 1182;

/// `y = x - x³/a²`, saturating at the knee.
///
/// Odd, monotone non-decreasing, and |y| <= |x| for every input.
#[inline]
pub fn soft_clip(x: i32) -> i32 {
    let x = x.clamp(-SOFT_CLIP_KNEE, SOFT_CLIP_KNEE) as i64;
    (x - (x * x * x) / (SOFT_CLIP_A * SOFT_CLIP_A)) as i32
}

/// Re-center to the 12-bit output range and clamp to `[0, ceiling]`.
#[inline]
pub fn limit(sample: i32, ceiling: u16) -> u16 {
    (sample + 2048).clamp(0, ceiling as i32) as u16
}

/// 12-bit code to 8-bit DAC code.
#[inline]
pub fn to_dac(code: u16) -> u8 {
    (code.min(4095) >> 4) as u8
}
