//! Vertical reference conversion
//!
//! Depths measured from the ice top are mirrored to depths measured from the
//! ice bottom (and back) through the ice thickness `h`: `y' = h - y`. An
//! interval `[low, sup]` maps to `[h - sup, h - low]` so that bounds stay
//! ordered.

use crate::observation::{ObservationRow, VerticalReference};

/// Mirror a single depth through the thickness
pub fn convert_depth(y: f64, h: f64) -> f64 {
    h - y
}

/// Mirror an interval, keeping `low <= sup`
pub fn convert_interval(y_low: f64, y_sup: f64, h: f64) -> (f64, f64) {
    (convert_depth(y_sup, h), convert_depth(y_low, h))
}

/// Convert one row in place to `target`
///
/// Rows already in `target` are left untouched. Only the depth fields and
/// `v_ref` change.
pub fn convert_row(row: &mut ObservationRow, target: VerticalReference, h: f64) {
    if row.v_ref == target {
        return;
    }
    match (row.y_low, row.y_sup) {
        (Some(low), Some(sup)) => {
            let (new_low, new_sup) = convert_interval(low, sup, h);
            row.y_low = Some(new_low);
            row.y_sup = Some(new_sup);
        }
        (low, sup) => {
            row.y_low = low.map(|y| convert_depth(y, h));
            row.y_sup = sup.map(|y| convert_depth(y, h));
        }
    }
    row.y_mid = row.y_mid.map(|y| convert_depth(y, h));
    row.v_ref = target;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_interval_to_bottom() {
        let mut row = ObservationRow::stepwise("A", "salinity", 0.0, 10.0);
        convert_row(&mut row, VerticalReference::Bottom, 100.0);
        assert_eq!(row.y_low, Some(90.0));
        assert_eq!(row.y_sup, Some(100.0));
        assert_eq!(row.y_mid, Some(95.0));
        assert_eq!(row.v_ref, VerticalReference::Bottom);
    }

    #[test]
    fn test_point_to_bottom() {
        let mut row = ObservationRow::point("A", "temperature", 25.0);
        convert_row(&mut row, VerticalReference::Bottom, 80.0);
        assert_eq!(row.y_low, None);
        assert_eq!(row.y_mid, Some(55.0));
    }

    #[test]
    fn test_same_reference_untouched() {
        let mut row = ObservationRow::stepwise("A", "salinity", 0.0, 10.0);
        let before = row.clone();
        convert_row(&mut row, VerticalReference::Top, 100.0);
        assert_eq!(row, before);
    }

    proptest! {
        #[test]
        fn prop_round_trip(low in 0.0f64..100.0, len in 0.1f64..50.0, h in 50.0f64..250.0) {
            let original = ObservationRow::stepwise("A", "salinity", low, low + len);
            let mut row = original.clone();
            convert_row(&mut row, VerticalReference::Bottom, h);
            prop_assert!(row.y_low.unwrap() <= row.y_sup.unwrap());
            convert_row(&mut row, VerticalReference::Top, h);
            prop_assert!((row.y_low.unwrap() - original.y_low.unwrap()).abs() < 1e-6);
            prop_assert!((row.y_sup.unwrap() - original.y_sup.unwrap()).abs() < 1e-6);
            prop_assert!((row.y_mid.unwrap() - original.y_mid.unwrap()).abs() < 1e-6);
        }
    }
}
