use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cart::AddToCartIntent;
use crate::product::{Axis, Dimensions};

#[derive(Debug, Clone, PartialEq)]
pub enum CustomizationError {
    NonFinite { axis: Axis },
    UnknownOption(String),
    UnknownValue { option: String, value: String },
}

impl std::fmt::Display for CustomizationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustomizationError::NonFinite { axis } => write!(f, "{axis} must be a finite number"),
            CustomizationError::UnknownOption(name) => write!(f, "unknown option {name:?}"),
            CustomizationError::UnknownValue { option, value } => {
                write!(f, "option {option:?} has no value {value:?}")
            }
        }
    }
}

impl std::error::Error for CustomizationError {}

/// Allowed range per axis, in centimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionLimits {
    pub width: (f64, f64),
    pub depth: (f64, f64),
    pub height: (f64, f64),
}

impl Default for DimensionLimits {
    fn default() -> Self {
        Self {
            width: (30.0, 300.0),
            depth: (30.0, 150.0),
            height: (30.0, 250.0),
        }
    }
}

impl DimensionLimits {
    pub fn range(&self, axis: Axis) -> (f64, f64) {
        let (lo, hi) = match axis {
            Axis::Width => self.width,
            Axis::Depth => self.depth,
            Axis::Height => self.height,
        };
        (lo.min(hi), hi.max(lo))
    }
}

/// Flat price adders keyed by option name, then option value.
///
/// The first value listed for an option is its default selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    pub options: BTreeMap<String, Vec<(String, f64)>>,
}

impl Default for PriceTable {
    fn default() -> Self {
        let mut options = BTreeMap::new();
        options.insert(
            "fittings".to_string(),
            vec![
                ("Standard".to_string(), 0.0),
                ("Premium".to_string(), 25.0),
                ("Luxury".to_string(), 50.0),
            ],
        );
        Self { options }
    }
}

impl PriceTable {
    pub fn adder(&self, option: &str, value: &str) -> Option<f64> {
        self.options
            .get(option)?
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, price)| *price)
    }

    pub fn defaults(&self) -> BTreeMap<String, String> {
        self.options
            .iter()
            .filter_map(|(name, values)| values.first().map(|(v, _)| (name.clone(), v.clone())))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizationState {
    pub dimensions: Dimensions,
    pub options: BTreeMap<String, String>,
}

/// Values recomputed on every mutation.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Derived {
    /// Per-axis `value / base` as `[width, depth, height]`.
    pub scale_factors: [f64; 3],
    pub price_adjustment: f64,
}

/// Holds the shopper's selections for one product.
///
/// Every setter validates first and then replaces state and derived values
/// together, so readers never see a half-applied change.
#[derive(Debug, Clone)]
pub struct CustomizationStore {
    base: Dimensions,
    limits: DimensionLimits,
    prices: PriceTable,
    state: CustomizationState,
    derived: Derived,
    revision: u64,
}

impl CustomizationStore {
    pub fn new(base: Dimensions, limits: DimensionLimits, prices: PriceTable) -> Self {
        let state = CustomizationState {
            dimensions: base,
            options: prices.defaults(),
        };
        let derived = derive(&base, &state, &prices);
        Self {
            base,
            limits,
            prices,
            state,
            derived,
            revision: 0,
        }
    }

    pub fn base(&self) -> Dimensions {
        self.base
    }

    pub fn state(&self) -> &CustomizationState {
        &self.state
    }

    pub fn derived(&self) -> Derived {
        self.derived
    }

    pub fn scale_factors(&self) -> [f64; 3] {
        self.derived.scale_factors
    }

    pub fn price_adjustment(&self) -> f64 {
        self.derived.price_adjustment
    }

    /// Bumped on every accepted mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Effective range for `axis`. Always contains the base dimension so
    /// that selecting the base size yields a scale of exactly one.
    pub fn range(&self, axis: Axis) -> (f64, f64) {
        let (lo, hi) = self.limits.range(axis);
        let base = self.base.get(axis);
        if base.is_finite() && base > 0.0 {
            (lo.min(base), hi.max(base))
        } else {
            (lo, hi)
        }
    }

    /// Sets one dimension, clamped to its range. Returns the stored value.
    pub fn set_dimension(&mut self, axis: Axis, value: f64) -> Result<f64, CustomizationError> {
        if !value.is_finite() {
            return Err(CustomizationError::NonFinite { axis });
        }
        let (lo, hi) = self.range(axis);
        let clamped = value.clamp(lo, hi);

        let mut next = self.state.clone();
        next.dimensions.set(axis, clamped);
        self.commit(next);
        debug!(axis = %axis, value, clamped, "dimension set");
        Ok(clamped)
    }

    /// Selects an option value. Returns the new price adjustment.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<f64, CustomizationError> {
        if !self.prices.options.contains_key(name) {
            return Err(CustomizationError::UnknownOption(name.to_string()));
        }
        if self.prices.adder(name, value).is_none() {
            return Err(CustomizationError::UnknownValue {
                option: name.to_string(),
                value: value.to_string(),
            });
        }
        let mut next = self.state.clone();
        next.options.insert(name.to_string(), value.to_string());
        self.commit(next);
        Ok(self.derived.price_adjustment)
    }

    /// Applies a previously saved state. Unknown options and non-finite
    /// dimensions are dropped; everything else is clamped as usual.
    pub fn restore(&mut self, saved: &CustomizationState) {
        let mut next = CustomizationState {
            dimensions: self.base,
            options: self.prices.defaults(),
        };
        for axis in Axis::ALL {
            let v = saved.dimensions.get(axis);
            if v.is_finite() {
                let (lo, hi) = self.range(axis);
                next.dimensions.set(axis, v.clamp(lo, hi));
            }
        }
        for (name, value) in &saved.options {
            if self.prices.adder(name, value).is_some() {
                next.options.insert(name.clone(), value.clone());
            }
        }
        self.commit(next);
    }

    /// Human-readable line for the cart, e.g. `W 80 × D 55 × H 90 cm, fittings: Premium`.
    pub fn summary(&self) -> String {
        let d = &self.state.dimensions;
        let mut out = format!(
            "W {} × D {} × H {} cm",
            fmt_cm(d.width),
            fmt_cm(d.depth),
            fmt_cm(d.height)
        );
        for (name, value) in &self.state.options {
            out.push_str(&format!(", {name}: {value}"));
        }
        out
    }

    pub fn cart_intent(&self, slug: &str, quantity: u32, list_price: f64) -> AddToCartIntent {
        AddToCartIntent {
            slug: slug.to_string(),
            quantity: quantity.max(1),
            scale_factors: self.derived.scale_factors,
            price_adjustment: self.derived.price_adjustment,
            unit_price: list_price + self.derived.price_adjustment,
            summary: self.summary(),
        }
    }

    fn commit(&mut self, next: CustomizationState) {
        self.derived = derive(&self.base, &next, &self.prices);
        self.state = next;
        self.revision += 1;
    }
}

fn derive(base: &Dimensions, state: &CustomizationState, prices: &PriceTable) -> Derived {
    let scale = |axis: Axis| {
        let b = base.get(axis);
        if b.is_finite() && b > 0.0 {
            (state.dimensions.get(axis) / b).max(0.0)
        } else {
            1.0
        }
    };
    let price_adjustment = state
        .options
        .iter()
        .filter_map(|(name, value)| prices.adder(name, value))
        .sum();
    Derived {
        scale_factors: [scale(Axis::Width), scale(Axis::Depth), scale(Axis::Height)],
        price_adjustment,
    }
}

fn fmt_cm(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{v:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::{CustomizationError, CustomizationStore, DimensionLimits, PriceTable};
    use crate::product::{Axis, Dimensions};
    use pretty_assertions::assert_eq;

    fn store() -> CustomizationStore {
        CustomizationStore::new(
            Dimensions::new(60.0, 55.0, 90.0),
            DimensionLimits::default(),
            PriceTable::default(),
        )
    }

    #[test]
    fn starts_at_base_with_default_options() {
        let s = store();
        assert_eq!(s.scale_factors(), [1.0, 1.0, 1.0]);
        assert_eq!(s.price_adjustment(), 0.0);
        assert_eq!(s.state().options.get("fittings").map(String::as_str), Some("Standard"));
    }

    #[test]
    fn width_80_over_base_60() {
        let mut s = store();
        s.set_dimension(Axis::Width, 80.0).expect("set");
        assert!((s.scale_factors()[0] - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.scale_factors()[1], 1.0);
    }

    #[test]
    fn base_value_always_scales_to_one() {
        let mut s = store();
        for axis in Axis::ALL {
            s.set_dimension(axis, 200.0).expect("set");
            s.set_dimension(axis, s.base().get(axis)).expect("set");
        }
        assert_eq!(s.scale_factors(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn base_outside_limits_still_scales_to_one() {
        let mut s = CustomizationStore::new(
            Dimensions::new(400.0, 55.0, 90.0),
            DimensionLimits::default(),
            PriceTable::default(),
        );
        assert_eq!(s.set_dimension(Axis::Width, 400.0), Ok(400.0));
        assert_eq!(s.scale_factors()[0], 1.0);
    }

    #[test]
    fn out_of_range_is_clamped_and_nan_rejected() {
        let mut s = store();
        assert_eq!(s.set_dimension(Axis::Depth, 10_000.0), Ok(150.0));
        assert_eq!(s.set_dimension(Axis::Depth, -5.0), Ok(30.0));
        let rev = s.revision();
        assert_eq!(
            s.set_dimension(Axis::Height, f64::NAN),
            Err(CustomizationError::NonFinite { axis: Axis::Height })
        );
        assert_eq!(s.revision(), rev);
    }

    #[test]
    fn fittings_tiers_price() {
        let mut s = store();
        assert_eq!(s.set_option("fittings", "Premium"), Ok(25.0));
        assert_eq!(s.set_option("fittings", "Luxury"), Ok(50.0));
        assert_eq!(s.set_option("fittings", "Standard"), Ok(0.0));
    }

    #[test]
    fn unknown_options_leave_state_untouched() {
        let mut s = store();
        s.set_option("fittings", "Premium").expect("set");
        let before = s.state().clone();
        assert!(matches!(
            s.set_option("fittings", "Gold"),
            Err(CustomizationError::UnknownValue { .. })
        ));
        assert!(matches!(
            s.set_option("colour", "Red"),
            Err(CustomizationError::UnknownOption(_))
        ));
        assert_eq!(s.state(), &before);
        assert_eq!(s.price_adjustment(), 25.0);
    }

    #[test]
    fn restore_sanitizes_saved_state() {
        let mut saved = store();
        saved.set_dimension(Axis::Width, 80.0).expect("set");
        saved.set_option("fittings", "Luxury").expect("set");
        let mut state = saved.state().clone();
        state.dimensions.height = f64::INFINITY;
        state.options.insert("legacy".into(), "x".into());

        let mut s = store();
        s.restore(&state);
        assert_eq!(s.state().dimensions.width, 80.0);
        assert_eq!(s.state().dimensions.height, 90.0);
        assert_eq!(s.state().options.len(), 1);
        assert_eq!(s.price_adjustment(), 50.0);
    }

    #[test]
    fn cart_intent_carries_derived_values() {
        let mut s = store();
        s.set_dimension(Axis::Width, 80.0).expect("set");
        s.set_option("fittings", "Premium").expect("set");
        let intent = s.cart_intent("oak-chair", 0, 199.0);
        assert_eq!(intent.quantity, 1);
        assert_eq!(intent.unit_price, 224.0);
        assert_eq!(intent.price_adjustment, 25.0);
        assert_eq!(intent.summary, "W 80 × D 55 × H 90 cm, fittings: Premium");
    }
}
