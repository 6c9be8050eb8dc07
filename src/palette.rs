use image::{Rgb, Rgba};

use crate::error::{SceneGenError, SceneGenResult};

/// Fixed red channel shared by every instance color in a scene.
pub const PALETTE_RED: u8 = 128;
/// Fixed blue channel shared by every instance color in a scene.
pub const PALETTE_BLUE: u8 = 200;

/// The identity channel (green) ranges over [1, 254], so a scene can hold at
/// most 254 simultaneously distinguishable instances.
pub const MAX_INSTANCES: u32 = 254;

const IDENTITY_MIN: u32 = 1;
const IDENTITY_MAX: u32 = 254;

/// One instance color: a unique green value combined with the fixed palette
/// constants. The channel order (red fixed, green varying, blue fixed) is
/// invariant so the annotation decode step can invert it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceColor {
    pub identity: u8,
}

impl InstanceColor {
    pub fn rgb(self) -> Rgb<u8> {
        Rgb([PALETTE_RED, self.identity, PALETTE_BLUE])
    }

    pub fn rgba(self) -> Rgba<u8> {
        Rgba([PALETTE_RED, self.identity, PALETTE_BLUE, 255])
    }
}

/// Allocate `n` instance colors with strictly increasing, evenly spaced
/// identity values: step = floor(254 / n), values 1, 1+step, 1+2*step, ...
pub fn allocate(n: u32) -> SceneGenResult<Vec<InstanceColor>> {
    if n < 1 {
        return Err(SceneGenError::configuration(
            "instance count must be >= 1",
        ));
    }
    let step = IDENTITY_MAX / n;
    if step == 0 {
        return Err(SceneGenError::configuration(format!(
            "cannot allocate {n} instance colors: palette holds at most {MAX_INSTANCES} per scene"
        )));
    }

    let colors = (0..n)
        .map(|i| InstanceColor {
            identity: (IDENTITY_MIN + i * step) as u8,
        })
        .collect();
    Ok(colors)
}
