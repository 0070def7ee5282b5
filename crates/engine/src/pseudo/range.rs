//! Key-range parsing shared by every pseudo-kind handler
//!
//! A pseudo-kind query understands exactly two constraint forms: filters
//! comparing the reserved `__key__` property with one of {<, <=, >, >=,
//! =}, and at most one ascending order on `__key__`. Anything else is a
//! request error; unsupported constraints fail fast instead of being
//! silently ignored.
//!
//! Filters fold into one tightening (lower, upper) bound pair; `=`
//! tightens both sides at once and looser bounds are discarded. Concrete
//! handlers receive only the clean range, never the original filter and
//! order lists.

use crate::query::{FilterOp, Query};
use burrow_core::{Error, IndexDirection, Key, PropertyValue, Result, KEY_PROPERTY};
use std::cmp::Ordering;

/// One end of a key range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBound {
    /// Boundary key
    pub key: Key,
    /// Whether the boundary key itself is inside the range
    pub inclusive: bool,
}

/// Inclusive/exclusive key range fed to a bounded pseudo-kind scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    /// Lower bound, if any
    pub lower: Option<KeyBound>,
    /// Upper bound, if any
    pub upper: Option<KeyBound>,
}

impl KeyRange {
    /// Range covering every key
    pub fn unbounded() -> Self {
        KeyRange::default()
    }

    /// True if `key` lies inside the range
    pub fn contains(&self, key: &Key) -> bool {
        if let Some(lower) = &self.lower {
            match key.cmp(&lower.key) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }
        if let Some(upper) = &self.upper {
            match key.cmp(&upper.key) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
        }
        true
    }

    /// Tighten the lower bound; looser candidates are discarded
    fn tighten_lower(&mut self, key: &Key, inclusive: bool) {
        let tighter = match &self.lower {
            None => true,
            Some(existing) => match key.cmp(&existing.key) {
                Ordering::Greater => true,
                Ordering::Equal => existing.inclusive && !inclusive,
                Ordering::Less => false,
            },
        };
        if tighter {
            self.lower = Some(KeyBound {
                key: key.clone(),
                inclusive,
            });
        }
    }

    /// Tighten the upper bound; looser candidates are discarded
    fn tighten_upper(&mut self, key: &Key, inclusive: bool) {
        let tighter = match &self.upper {
            None => true,
            Some(existing) => match key.cmp(&existing.key) {
                Ordering::Less => true,
                Ordering::Equal => existing.inclusive && !inclusive,
                Ordering::Greater => false,
            },
        };
        if tighter {
            self.upper = Some(KeyBound {
                key: key.clone(),
                inclusive,
            });
        }
    }
}

/// Fold a pseudo-kind query's constraints into a key range
///
/// # Errors
///
/// `Error::InvalidQuery` for any filter not on `__key__`, any non-key
/// filter value, or any order other than a single ascending `__key__`.
pub fn parse_key_query(query: &Query) -> Result<KeyRange> {
    let mut range = KeyRange::unbounded();

    for filter in &query.filters {
        if filter.property != KEY_PROPERTY {
            return Err(Error::InvalidQuery(format!(
                "pseudo-kind queries only support {} filters, got {:?}",
                KEY_PROPERTY, filter.property
            )));
        }
        let PropertyValue::Key(key) = &filter.value else {
            return Err(Error::InvalidQuery(format!(
                "{} filter value must be a key, got {}",
                KEY_PROPERTY,
                filter.value.type_name()
            )));
        };
        match filter.op {
            FilterOp::LessThan => range.tighten_upper(key, false),
            FilterOp::LessThanOrEqual => range.tighten_upper(key, true),
            FilterOp::GreaterThan => range.tighten_lower(key, false),
            FilterOp::GreaterThanOrEqual => range.tighten_lower(key, true),
            FilterOp::Equal => {
                range.tighten_lower(key, true);
                range.tighten_upper(key, true);
            }
        }
    }

    match query.orders.as_slice() {
        [] => {}
        [order]
            if order.property == KEY_PROPERTY
                && order.direction == IndexDirection::Ascending => {}
        _ => {
            return Err(Error::InvalidQuery(format!(
                "pseudo-kind queries only support a single ascending {} order",
                KEY_PROPERTY
            )));
        }
    }

    Ok(range)
}
