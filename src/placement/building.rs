//! Building geometry used to constrain placement.
//!
//! A building is an axis-aligned box split into a regular grid of floors and
//! rooms. Floors and rooms are numbered from 1, the way the LTE building
//! model numbers them.

use crate::config::{BuildingConfig, BuildingUsage, WallMaterial};
use serde::Serialize;
use std::fmt;

/// Point in scenario space, metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.x, self.y, self.z)
    }
}

/// Room cell a position falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoomCell {
    pub floor: u16,
    pub room_x: u16,
    pub room_y: u16,
}

/// Building index plus the room cell inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndoorLocation {
    pub building: usize,
    #[serde(flatten)]
    pub cell: RoomCell,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
    pub floors: u16,
    pub rooms_x: u16,
    pub rooms_y: u16,
    pub wall: WallMaterial,
    pub usage: BuildingUsage,
}

impl From<&BuildingConfig> for Building {
    fn from(config: &BuildingConfig) -> Self {
        Self {
            x_min: config.x_min,
            x_max: config.x_max,
            y_min: config.y_min,
            y_max: config.y_max,
            z_min: config.z_min,
            z_max: config.z_max,
            floors: config.floors,
            rooms_x: config.rooms_x,
            rooms_y: config.rooms_y,
            wall: config.wall,
            usage: config.usage,
        }
    }
}

impl Building {
    pub fn height(&self) -> f64 {
        self.z_max - self.z_min
    }

    fn room_width(&self) -> f64 {
        (self.x_max - self.x_min) / f64::from(self.rooms_x)
    }

    fn room_length(&self) -> f64 {
        (self.y_max - self.y_min) / f64::from(self.rooms_y)
    }

    fn floor_height(&self) -> f64 {
        self.height() / f64::from(self.floors)
    }

    /// Whether the ground footprint covers `(x, y)`
    pub fn covers(&self, x: f64, y: f64) -> bool {
        self.x_min <= x && x < self.x_max && self.y_min <= y && y < self.y_max
    }

    /// Whether the volume contains `position` (half-open on every axis)
    pub fn contains(&self, position: &Position) -> bool {
        self.covers(position.x, position.y) && self.z_min <= position.z && position.z < self.z_max
    }

    /// Room cell holding `position`, or `None` when it is outside the volume
    pub fn locate(&self, position: &Position) -> Option<RoomCell> {
        if !self.contains(position) {
            return None;
        }
        Some(RoomCell {
            floor: grid_index(position.z - self.z_min, self.floor_height(), self.floors),
            room_x: grid_index(position.x - self.x_min, self.room_width(), self.rooms_x),
            room_y: grid_index(position.y - self.y_min, self.room_length(), self.rooms_y),
        })
    }

    /// Whether `position` keeps at least `clearance` metres from every wall,
    /// ceiling and floor slab of `cell`
    pub fn clears(&self, position: &Position, cell: RoomCell, clearance: f64) -> bool {
        let (w, l, h) = (self.room_width(), self.room_length(), self.floor_height());
        let x0 = self.x_min + f64::from(cell.room_x - 1) * w;
        let y0 = self.y_min + f64::from(cell.room_y - 1) * l;
        let z0 = self.z_min + f64::from(cell.floor - 1) * h;

        let margins = [
            position.x - x0,
            x0 + w - position.x,
            position.y - y0,
            y0 + l - position.y,
            position.z - z0,
            z0 + h - position.z,
        ];
        margins.iter().all(|margin| *margin >= clearance)
    }
}

/// 1-based cell index along one axis, clamped against rounding at the far edge
fn grid_index(offset: f64, cell_size: f64, cells: u16) -> u16 {
    let index = (offset / cell_size).floor() as u16 + 1;
    index.min(cells)
}

/// First building whose volume contains `position`
pub fn locate_in(buildings: &[Building], position: &Position) -> Option<IndoorLocation> {
    buildings.iter().enumerate().find_map(|(building, b)| {
        b.locate(position)
            .map(|cell| IndoorLocation { building, cell })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office() -> Building {
        // 8 x 3 rooms of 5 m x 6 m, 6 floors of 3 m
        Building {
            x_min: 0.0,
            x_max: 40.0,
            y_min: 10.0,
            y_max: 28.0,
            z_min: 0.0,
            z_max: 18.0,
            floors: 6,
            rooms_x: 8,
            rooms_y: 3,
            wall: WallMaterial::ConcreteWithWindows,
            usage: BuildingUsage::Office,
        }
    }

    #[test]
    fn test_locate_room_cells() {
        let b = office();
        let cell = b.locate(&Position::new(2.5, 13.0, 1.5)).unwrap();
        assert_eq!(cell, RoomCell { floor: 1, room_x: 1, room_y: 1 });

        let cell = b.locate(&Position::new(39.9, 27.9, 17.9)).unwrap();
        assert_eq!(cell, RoomCell { floor: 6, room_x: 8, room_y: 3 });
    }

    #[test]
    fn test_outside_volume() {
        let b = office();
        assert!(b.locate(&Position::new(40.0, 13.0, 1.5)).is_none());
        assert!(b.locate(&Position::new(5.0, 5.0, 1.5)).is_none());
        assert!(b.locate(&Position::new(5.0, 13.0, 18.0)).is_none());
    }

    #[test]
    fn test_clearance() {
        let b = office();
        let centre = Position::new(2.5, 13.0, 1.5);
        let cell = b.locate(&centre).unwrap();
        assert!(b.clears(&centre, cell, 0.5));

        let near_wall = Position::new(4.8, 13.0, 1.5);
        let cell = b.locate(&near_wall).unwrap();
        assert!(!b.clears(&near_wall, cell, 0.5));
        assert!(b.clears(&near_wall, cell, 0.0));
    }

    #[test]
    fn test_locate_in_picks_first_containing_building() {
        let mut second = office();
        second.x_min = 50.0;
        second.x_max = 90.0;
        let buildings = vec![office(), second];

        let inside_second = Position::new(60.0, 12.0, 1.0);
        let location = locate_in(&buildings, &inside_second).unwrap();
        assert_eq!(location.building, 1);
        assert_eq!(location.cell.room_x, 3);

        assert!(locate_in(&buildings, &Position::new(45.0, 12.0, 1.0)).is_none());
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(30.0, 5.0, 0.0).to_string(), "30, 5, 0");
        assert_eq!(Position::new(1.25, 0.5, 2.0).to_string(), "1.25, 0.5, 2");
    }
}
