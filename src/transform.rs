//! In-place moves of a pixel buffer. Positive offsets move pixels toward the
//! end of the strip.

use crate::apa102::STRIDE;

/// Moves every pixel `offset` positions along the strip, wrapping around.
pub fn rotate(buf: &mut [u8], offset: isize) {
    let pixels = buf.len() / STRIDE;
    if pixels == 0 {
        return;
    }
    let buf = &mut buf[..pixels * STRIDE];
    let by = offset.rem_euclid(pixels as isize) as usize * STRIDE;
    buf.rotate_right(by);
}

/// Moves every pixel `offset` positions along the strip. Pixels pushed off
/// one end are lost and the other end is filled with black.
pub fn shift(buf: &mut [u8], offset: isize) {
    let len = buf.len() / STRIDE * STRIDE;
    let buf = &mut buf[..len];
    let by = offset.unsigned_abs().saturating_mul(STRIDE);
    if by >= len {
        buf.fill(0);
        return;
    }
    if offset > 0 {
        buf.copy_within(..len - by, by);
        buf[..by].fill(0);
    } else {
        buf.copy_within(by.., 0);
        buf[len - by..].fill(0);
    }
}
