use std::collections::{HashMap, VecDeque};

use super::prepare::PreparedModel;

/// Values within this distance below zero are treated as zero for items that
/// may not go negative.
pub(crate) const NEGATIVE_TOLERANCE: f64 = 1e-4;

/// An outstanding bond investment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BondLot {
    pub principal: f64,
    pub cpi_index: f64,
}

/// Current value of an asset or debt. Plain items keep their whole value in
/// `price`; quantity-bearing items hold `units` at `price` each.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AssetState {
    pub price: f64,
    pub units: Option<f64>,
    pub started: bool,
    pub purchase_price: Option<f64>,
    pub cpi_index: f64,
    pub lots: VecDeque<BondLot>,
}

impl AssetState {
    fn new(units: Option<f64>) -> Self {
        Self {
            price: 0.0,
            units,
            started: false,
            purchase_price: None,
            cpi_index: 1.0,
            lots: VecDeque::new(),
        }
    }

    pub fn value(&self) -> f64 {
        self.price * self.units.unwrap_or(1.0)
    }

    /// Units a money amount buys at the current price. Plain items have no
    /// units.
    pub fn units_for(&self, money: f64) -> Option<f64> {
        self.units.map(|_| {
            if self.price.abs() > f64::EPSILON {
                money / self.price
            } else {
                0.0
            }
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct FlowState {
    pub value: f64,
    pub started: bool,
}

/// A pending change to one asset: a money amount, or a unit count for
/// quantity-bearing assets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Leg {
    pub asset: usize,
    pub money: f64,
    pub units: Option<f64>,
}

/// Mutable per-run values. Discarded once the run's snapshots are taken.
#[derive(Debug)]
pub(crate) struct RunState {
    pub assets: Vec<AssetState>,
    pub incomes: Vec<FlowState>,
    pub expenses: Vec<FlowState>,
    pub settings: HashMap<String, f64>,
}

impl RunState {
    pub fn new(prepared: &PreparedModel) -> Self {
        Self {
            assets: prepared
                .assets
                .iter()
                .map(|asset| AssetState::new(asset.units))
                .collect(),
            incomes: vec![FlowState::default(); prepared.incomes.len()],
            expenses: vec![FlowState::default(); prepared.expenses.len()],
            settings: prepared.settings.clone(),
        }
    }

    /// Current value of a setting, or of an asset by name.
    pub fn lookup(&self, prepared: &PreparedModel, name: &str) -> Option<f64> {
        self.settings.get(name).copied().or_else(|| {
            prepared
                .asset_index
                .get(name)
                .map(|index| self.assets[*index].value())
        })
    }

    pub fn setting(&self, name: &str) -> f64 {
        self.settings.get(name).copied().unwrap_or(0.0)
    }

    /// Applies `legs` only if no item that may not go negative is pushed below
    /// zero beyond tolerance. Items that end no lower than they started are
    /// accepted even while negative. Returns the offending asset otherwise.
    pub fn apply_legs(&mut self, prepared: &PreparedModel, legs: &[Leg]) -> Result<(), usize> {
        let mut pending: Vec<(usize, AssetState)> = Vec::new();
        for leg in legs {
            let position = match pending.iter().position(|(index, _)| *index == leg.asset) {
                Some(position) => position,
                None => {
                    pending.push((leg.asset, self.assets[leg.asset].clone()));
                    pending.len() - 1
                }
            };
            let state = &mut pending[position].1;
            match (state.units.as_mut(), leg.units) {
                (Some(units), Some(delta)) => *units += delta,
                _ => state.price += leg.money,
            }
        }

        for (index, state) in pending.iter_mut() {
            if level(state) >= level(&self.assets[*index]) {
                continue;
            }
            if !settle(state, prepared.assets[*index].can_be_negative) {
                return Err(*index);
            }
        }
        for (index, state) in pending {
            self.assets[index] = state;
        }
        Ok(())
    }
}

/// The amount the non-negative rule applies to: units for quantity-bearing
/// items, the price otherwise.
fn level(state: &AssetState) -> f64 {
    state.units.unwrap_or(state.price)
}

/// Clamps a near-zero negative value to zero. Returns `false` when the item
/// may not go negative and is beyond tolerance.
pub(crate) fn settle(state: &mut AssetState, can_be_negative: bool) -> bool {
    if can_be_negative {
        return true;
    }
    match state.units.as_mut() {
        Some(units) => clamp(units),
        None => clamp(&mut state.price),
    }
}

fn clamp(value: &mut f64) -> bool {
    if *value >= 0.0 {
        true
    } else if *value >= -NEGATIVE_TOLERANCE {
        *value = 0.0;
        true
    } else {
        false
    }
}
