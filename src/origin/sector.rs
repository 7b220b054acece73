//! Sector-based coordinates.
//!
//! A position is an integer sector plus a bounded local offset. Moves only
//! ever touch the offset, and overflow is carried into the sector with floor
//! division, so the float part never grows past one sector.

use bevy::math::{DVec3, I64Vec3};

/// A position stored as `sector * sector_size + local_offset`.
///
/// After [`normalize`](Self::normalize) every component of `local_offset`
/// lies in `[0, sector_size)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VirtualPosition {
    pub sector: I64Vec3,
    pub local_offset: DVec3,
}

/// Split one component into whole sectors and a remainder in `[0, size)`.
fn carry(value: f64, size: f64) -> (i64, f64) {
    let sectors = (value / size).floor();
    let mut rest = value - sectors * size;
    let mut sectors = sectors as i64;
    // Rounding can land exactly on either edge.
    if rest >= size {
        rest -= size;
        sectors += 1;
    } else if rest < 0.0 {
        rest += size;
        sectors -= 1;
    }
    (sectors, rest)
}

impl VirtualPosition {
    pub const ZERO: Self = Self {
        sector: I64Vec3::ZERO,
        local_offset: DVec3::ZERO,
    };

    pub fn new(sector: I64Vec3, local_offset: DVec3, sector_size: f64) -> Self {
        let mut pos = Self { sector, local_offset };
        pos.normalize(sector_size);
        pos
    }

    /// Split a world position into sector and offset.
    pub fn from_world(position: DVec3, sector_size: f64) -> Self {
        Self::new(I64Vec3::ZERO, position, sector_size)
    }

    /// Move overflow from the local offset into the sector.
    pub fn normalize(&mut self, sector_size: f64) {
        if !self.local_offset.is_finite() {
            return;
        }
        let (sx, lx) = carry(self.local_offset.x, sector_size);
        let (sy, ly) = carry(self.local_offset.y, sector_size);
        let (sz, lz) = carry(self.local_offset.z, sector_size);
        self.sector = self.sector.saturating_add(I64Vec3::new(sx, sy, sz));
        self.local_offset = DVec3::new(lx, ly, lz);
    }

    pub fn move_by(&mut self, delta: DVec3, sector_size: f64) {
        self.local_offset += delta;
        self.normalize(sector_size);
    }

    /// Componentwise sum of two positions, renormalized.
    pub fn offset_by(&self, other: &VirtualPosition, sector_size: f64) -> Self {
        Self::new(
            self.sector.saturating_add(other.sector),
            self.local_offset + other.local_offset,
            sector_size,
        )
    }

    /// Flatten to a single `DVec3`.
    ///
    /// Lossy once `sector * sector_size` outgrows the f64 mantissa.
    pub fn to_world_position(&self, sector_size: f64) -> DVec3 {
        self.sector.as_dvec3() * sector_size + self.local_offset
    }
}
