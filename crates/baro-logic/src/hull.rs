//! Hulls and gaps: where the water is and what the air is like.
//!
//! Hulls are axis-aligned rooms. Gaps connect two hulls side by side
//! (wall), one above the other (floor), or a hull to the sea (ocean).
//! Each tick water flows through open gaps, pressure follows the water
//! column and oxygen diffuses between hulls and is breathed away by
//! occupants. A point outside every hull is in the sea.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;
use crate::physics::FloorSegment;

/// Oxygen level of fresh air, in percent.
pub const FULL_OXYGEN: f32 = 100.0;

/// Tuned constants of the flooding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HullConfig {
    /// Wall gap flow per metre of level difference per metre of gap, per second.
    pub wall_flow_rate: f32,
    /// Floor gap flow per metre of gap, per second.
    pub floor_flow_rate: f32,
    /// Ocean gap inflow per metre of depth per metre of gap, per second.
    pub ocean_flow_rate: f32,
    /// Oxygen equalisation rate through open gaps, per second.
    pub oxygen_diffusion: f32,
    /// Oxygen percent consumed per occupant per second.
    pub oxygen_consumption: f32,
    /// Height of the sea surface. Depth below it sets ocean pressure.
    pub sea_level: f32,
    /// Pressure per metre of water.
    pub pressure_per_metre: f32,
}

impl Default for HullConfig {
    fn default() -> Self {
        Self {
            wall_flow_rate: 2.0,
            floor_flow_rate: 1.5,
            ocean_flow_rate: 0.5,
            oxygen_diffusion: 0.5,
            oxygen_consumption: 0.2,
            sea_level: 100.0,
            pressure_per_metre: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hull {
    /// Bottom-left corner.
    pub min: Vec2,
    pub size: Vec2,
    /// Water area (the world is 2D), at most `capacity()`.
    pub water_volume: f32,
    /// Oxygen percent of the air.
    pub oxygen: f32,
    pub pressure: f32,
}

impl Hull {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self {
            min,
            size,
            water_volume: 0.0,
            oxygen: FULL_OXYGEN,
            pressure: 0.0,
        }
    }

    pub fn capacity(&self) -> f32 {
        self.size.x * self.size.y
    }

    /// Height of the water surface.
    pub fn surface(&self) -> f32 {
        if self.size.x <= 0.0 {
            return self.min.y;
        }
        self.min.y + (self.water_volume / self.size.x).min(self.size.y)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.min.x + self.size.x
            && point.y >= self.min.y
            && point.y <= self.min.y + self.size.y
    }

    pub fn is_full(&self) -> bool {
        self.water_volume >= self.capacity() - 1e-4
    }

    /// Fraction of the hull still holding air.
    pub fn air_fraction(&self) -> f32 {
        let capacity = self.capacity();
        if capacity <= 0.0 {
            return 0.0;
        }
        (1.0 - self.water_volume / capacity).clamp(0.0, 1.0)
    }

    fn add_water(&mut self, amount: f32) -> f32 {
        let before = self.water_volume;
        self.water_volume = (self.water_volume + amount).clamp(0.0, self.capacity());
        self.water_volume - before
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapKind {
    /// Between two hulls side by side. The gap spans `size` upward from
    /// `position.y`.
    Wall,
    /// In the floor of the first hull, above the second.
    Floor,
    /// From the first hull to the sea. Spans `size` upward from `position.y`.
    Ocean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub kind: GapKind,
    pub first: usize,
    /// Unused for ocean gaps.
    pub second: Option<usize>,
    pub position: Vec2,
    pub size: f32,
    /// 0 = closed, 1 = fully open.
    pub open: f32,
}

impl Gap {
    pub fn wall(first: usize, second: usize, position: Vec2, size: f32) -> Self {
        Self {
            kind: GapKind::Wall,
            first,
            second: Some(second),
            position,
            size,
            open: 1.0,
        }
    }

    /// A hole in `upper`'s floor that drains into `lower`.
    pub fn floor(upper: usize, lower: usize, position: Vec2, size: f32) -> Self {
        Self {
            kind: GapKind::Floor,
            first: upper,
            second: Some(lower),
            position,
            size,
            open: 1.0,
        }
    }

    pub fn ocean(hull: usize, position: Vec2, size: f32) -> Self {
        Self {
            kind: GapKind::Ocean,
            first: hull,
            second: None,
            position,
            size,
            open: 1.0,
        }
    }

    fn is_open(&self) -> bool {
        self.open > 0.0 && self.size > 0.0
    }
}

/// All hulls and gaps of the level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HullSystem {
    hulls: Vec<Hull>,
    gaps: Vec<Gap>,
}

impl HullSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hull(&mut self, hull: Hull) -> usize {
        self.hulls.push(hull);
        self.hulls.len() - 1
    }

    pub fn add_gap(&mut self, gap: Gap) -> usize {
        self.gaps.push(gap);
        self.gaps.len() - 1
    }

    pub fn hulls(&self) -> &[Hull] {
        &self.hulls
    }

    pub fn hull(&self, index: usize) -> &Hull {
        &self.hulls[index]
    }

    pub fn hull_mut(&mut self, index: usize) -> &mut Hull {
        &mut self.hulls[index]
    }

    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    pub fn set_gap_open(&mut self, index: usize, open: f32) {
        if let Some(gap) = self.gaps.get_mut(index) {
            gap.open = open.clamp(0.0, 1.0);
        }
    }

    pub fn hull_at(&self, point: Vec2) -> Option<usize> {
        self.hulls.iter().position(|h| h.contains(point))
    }

    /// Below a hull's water surface, or outside every hull.
    pub fn is_in_water(&self, point: Vec2) -> bool {
        match self.hull_at(point) {
            Some(index) => point.y < self.hulls[index].surface(),
            None => true,
        }
    }

    /// Water surface of a hull.
    pub fn surface(&self, index: usize) -> f32 {
        self.hulls[index].surface()
    }

    /// Oxygen at a point: the hull's air, or none outside.
    pub fn oxygen_at(&self, point: Vec2) -> f32 {
        self.hull_at(point).map_or(0.0, |i| self.hulls[i].oxygen)
    }

    /// Floors to register with the physics world, one per hull bottom.
    pub fn floor_segments(&self) -> Vec<FloorSegment> {
        self.hulls
            .iter()
            .map(|h| FloorSegment {
                y: h.min.y,
                min_x: h.min.x,
                max_x: h.min.x + h.size.x,
            })
            .collect()
    }

    /// Advance water, pressure and oxygen by `dt` seconds. `occupants[i]`
    /// is the number of breathing characters in hull `i`.
    pub fn update(&mut self, dt: f32, occupants: &[u32], config: &HullConfig) {
        if !(dt > 0.0) {
            return;
        }
        for g in 0..self.gaps.len() {
            let gap = self.gaps[g].clone();
            if !gap.is_open() {
                continue;
            }
            match (gap.kind, gap.second) {
                (GapKind::Wall, Some(second)) => self.flow_wall(&gap, second, dt, config),
                (GapKind::Floor, Some(second)) => self.flow_floor(&gap, second, dt, config),
                (GapKind::Ocean, _) => self.flow_ocean(&gap, dt, config),
                _ => {}
            }
        }

        for g in 0..self.gaps.len() {
            let gap = &self.gaps[g];
            let (Some(second), true) = (gap.second, gap.is_open()) else {
                continue;
            };
            let rate = config.oxygen_diffusion * gap.open * dt;
            let (first, second) = (gap.first, second);
            if first == second || first >= self.hulls.len() || second >= self.hulls.len() {
                continue;
            }
            let flow = (self.hulls[second].oxygen - self.hulls[first].oxygen) * rate.min(0.5);
            self.hulls[first].oxygen += flow;
            self.hulls[second].oxygen -= flow;
        }

        let ocean_connected: Vec<bool> = (0..self.hulls.len())
            .map(|i| {
                self.gaps.iter().any(|g| {
                    g.kind == GapKind::Ocean
                        && g.first == i
                        && g.is_open()
                        && g.position.y < config.sea_level
                })
            })
            .collect();
        for (i, hull) in self.hulls.iter_mut().enumerate() {
            let breathers = occupants.get(i).copied().unwrap_or(0) as f32;
            hull.oxygen -= config.oxygen_consumption * breathers * dt;
            if hull.air_fraction() < 0.01 {
                hull.oxygen = 0.0;
            }
            hull.oxygen = hull.oxygen.clamp(0.0, FULL_OXYGEN);

            let column = hull.surface() - hull.min.y;
            let depth = if hull.is_full() && ocean_connected[i] {
                column.max(config.sea_level - hull.min.y)
            } else {
                column
            };
            hull.pressure = depth.max(0.0) * config.pressure_per_metre;
        }
    }

    fn flow_wall(&mut self, gap: &Gap, second: usize, dt: f32, config: &HullConfig) {
        let (a, b) = (gap.first, second);
        if a == b || a >= self.hulls.len() || b >= self.hulls.len() {
            return;
        }
        let (sa, sb) = (self.hulls[a].surface(), self.hulls[b].surface());
        let (from, to, high, low) = if sa >= sb { (a, b, sa, sb) } else { (b, a, sb, sa) };
        if high <= gap.position.y {
            return;
        }
        // only water above the gap bottom can pass
        let low = low.max(gap.position.y);
        let diff = (high - low).min(gap.size);
        if diff <= 0.0 {
            return;
        }
        let amount = diff * config.wall_flow_rate * gap.size * gap.open * dt;
        // never overshoot the level where both surfaces meet
        let width_from = self.hulls[from].size.x;
        let width_to = self.hulls[to].size.x;
        let equalize = (high - low) * width_from * width_to / (width_from + width_to).max(1e-6);
        self.transfer(from, to, amount.min(equalize));
    }

    fn flow_floor(&mut self, gap: &Gap, lower: usize, dt: f32, config: &HullConfig) {
        let upper = gap.first;
        if upper == lower || upper >= self.hulls.len() || lower >= self.hulls.len() {
            return;
        }
        let amount = config.floor_flow_rate * gap.size * gap.open * dt;
        self.transfer(upper, lower, amount);
    }

    fn flow_ocean(&mut self, gap: &Gap, dt: f32, config: &HullConfig) {
        let Some(hull) = self.hulls.get_mut(gap.first) else {
            return;
        };
        let depth = config.sea_level - gap.position.y;
        if depth > 0.0 {
            let amount = depth * config.ocean_flow_rate * gap.size * gap.open * dt;
            hull.add_water(amount);
        } else if hull.surface() > gap.position.y {
            // above the sea: water drains out
            let above = (hull.surface() - gap.position.y) * hull.size.x;
            let amount = (config.ocean_flow_rate * gap.size * gap.open * dt).min(above);
            hull.add_water(-amount);
        }
    }

    fn transfer(&mut self, from: usize, to: usize, amount: f32) {
        let available = self.hulls[from].water_volume;
        let room = self.hulls[to].capacity() - self.hulls[to].water_volume;
        let amount = amount.min(available).min(room).max(0.0);
        self.hulls[from].add_water(-amount);
        self.hulls[to].add_water(amount);
    }
}
