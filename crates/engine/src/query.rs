//! Query model and bounded evaluation
//!
//! A query names a kind within an (application, namespace) pair, plus an
//! optional ancestor, property filters, orderings, and pagination. The
//! evaluator works over an extent snapshot: filter, sort, then page.
//!
//! Cursors are opaque positions into the filtered-and-sorted result
//! sequence; a returned cursor can be fed back through `start_cursor` to
//! resume the scan.

use burrow_core::{Entity, IndexDirection, Key, PropertyValue};
use std::cmp::Ordering;

/// Filter comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Strictly less than
    LessThan,
    /// Less than or equal
    LessThanOrEqual,
    /// Strictly greater than
    GreaterThan,
    /// Greater than or equal
    GreaterThanOrEqual,
    /// Equal
    Equal,
}

impl FilterOp {
    /// Whether `ordering` (candidate vs reference) satisfies the operator
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            FilterOp::LessThan => ordering == Ordering::Less,
            FilterOp::LessThanOrEqual => ordering != Ordering::Greater,
            FilterOp::GreaterThan => ordering == Ordering::Greater,
            FilterOp::GreaterThanOrEqual => ordering != Ordering::Less,
            FilterOp::Equal => ordering == Ordering::Equal,
        }
    }
}

/// One property filter
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Property name (`__key__` addresses the entity key)
    pub property: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Reference value
    pub value: PropertyValue,
}

/// One sort order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Property name (`__key__` addresses the entity key)
    pub property: String,
    /// Sort direction
    pub direction: IndexDirection,
}

/// Opaque resume position into a query's result sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(pub u64);

/// A query over one kind
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Application to query
    pub app: String,
    /// Namespace to query ("" = default)
    pub namespace: String,
    /// Kind to scan (may be a pseudo-kind)
    pub kind: String,
    /// Restrict results to descendants of this key
    pub ancestor: Option<Key>,
    /// Property filters, all of which must match
    pub filters: Vec<Filter>,
    /// Sort orders, applied in sequence
    pub orders: Vec<Order>,
    /// Results to skip after filtering and sorting
    pub offset: usize,
    /// Maximum results to return
    pub limit: Option<usize>,
    /// Resume position from a previous result
    pub start_cursor: Option<Cursor>,
}

impl Query {
    /// Create a query over `kind` in the default namespace
    pub fn new(app: impl Into<String>, kind: impl Into<String>) -> Self {
        Query {
            app: app.into(),
            namespace: String::new(),
            kind: kind.into(),
            ancestor: None,
            filters: Vec::new(),
            orders: Vec::new(),
            offset: 0,
            limit: None,
            start_cursor: None,
        }
    }

    /// Set the namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Restrict to descendants of `ancestor`
    pub fn with_ancestor(mut self, ancestor: Key) -> Self {
        self.ancestor = Some(ancestor);
        self
    }

    /// Add a property filter
    pub fn with_filter(
        mut self,
        property: impl Into<String>,
        op: FilterOp,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.filters.push(Filter {
            property: property.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Add a sort order
    pub fn with_order(mut self, property: impl Into<String>, direction: IndexDirection) -> Self {
        self.orders.push(Order {
            property: property.into(),
            direction,
        });
        self
    }

    /// Skip the first `offset` results
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Cap the number of returned results
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume from a cursor returned by a previous run
    pub fn with_start_cursor(mut self, cursor: Cursor) -> Self {
        self.start_cursor = Some(cursor);
        self
    }
}

/// Entities matched by a query, with the resume position if the scan
/// stopped early
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Matched entities, in query order
    pub entities: Vec<Entity>,
    /// Resume position when more results remain
    pub cursor: Option<Cursor>,
}

/// True if `entity` satisfies the query's namespace, ancestor, and
/// property filters
fn matches(query: &Query, entity: &Entity) -> bool {
    if entity.key.namespace != query.namespace {
        return false;
    }
    if let Some(ancestor) = &query.ancestor {
        if !entity.key.has_ancestor(ancestor) {
            return false;
        }
    }
    query.filters.iter().all(|filter| {
        if filter.property == burrow_core::KEY_PROPERTY {
            if let PropertyValue::Key(reference) = &filter.value {
                return filter.op.matches(entity.key.cmp(reference));
            }
            return false;
        }
        // A repeated property matches if any of its values does.
        entity
            .property_values(&filter.property)
            .any(|value| filter.op.matches(value.cmp(&filter.value)))
    })
}

/// Value an entity sorts by for one order
///
/// Repeated properties sort by their smallest value ascending and their
/// largest value descending.
fn sort_value<'a>(entity: &'a Entity, order: &'a Order) -> Option<&'a PropertyValue> {
    match order.direction {
        IndexDirection::Ascending => entity.property_values(&order.property).min(),
        IndexDirection::Descending => entity.property_values(&order.property).max(),
    }
}

fn compare(a: &Entity, b: &Entity, orders: &[Order]) -> Ordering {
    for order in orders {
        if order.property == burrow_core::KEY_PROPERTY {
            let ordering = a.key.cmp(&b.key);
            let ordering = match order.direction {
                IndexDirection::Ascending => ordering,
                IndexDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
            continue;
        }
        // Presence is guaranteed by the pre-filter in `execute`.
        let (Some(left), Some(right)) = (sort_value(a, order), sort_value(b, order)) else {
            continue;
        };
        let ordering = match order.direction {
            IndexDirection::Ascending => left.cmp(right),
            IndexDirection::Descending => left.cmp(right).reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.key.cmp(&b.key)
}

/// Evaluate `query` over a snapshot of candidate entities
///
/// Entities lacking a property named by an order are excluded, mirroring
/// the index-backed behavior of the emulated product.
pub fn execute(candidates: Vec<Entity>, query: &Query) -> QueryResult {
    let mut matched: Vec<Entity> = candidates
        .into_iter()
        .filter(|entity| matches(query, entity))
        .filter(|entity| {
            query.orders.iter().all(|order| {
                order.property == burrow_core::KEY_PROPERTY
                    || entity.property(&order.property).is_some()
            })
        })
        .collect();
    matched.sort_by(|a, b| compare(a, b, &query.orders));
    paginate(matched, query)
}

/// Apply cursor, offset, and limit to an already-ordered result sequence
pub fn paginate(ordered: Vec<Entity>, query: &Query) -> QueryResult {
    let total = ordered.len();
    let skip = query.start_cursor.map_or(0, |c| c.0 as usize) + query.offset;
    let skip = skip.min(total);
    let take = query.limit.unwrap_or(total - skip).min(total - skip);
    let end = skip + take;

    let entities = ordered[skip..end].to_vec();
    let cursor = if end < total {
        Some(Cursor(end as u64))
    } else {
        None
    };
    QueryResult { entities, cursor }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: i64, priority: i64) -> Entity {
        Entity::new(Key::with_id("app", "", "Task", id)).with_property("priority", priority)
    }

    fn run(query: &Query, entities: Vec<Entity>) -> Vec<i64> {
        execute(entities, query)
            .entities
            .iter()
            .map(|e| match e.key.leaf().unwrap().id {
                burrow_core::Identifier::Id(id) => id,
                _ => panic!("expected id"),
            })
            .collect()
    }

    #[test]
    fn test_filter_ops() {
        assert!(FilterOp::LessThan.matches(Ordering::Less));
        assert!(!FilterOp::LessThan.matches(Ordering::Equal));
        assert!(FilterOp::LessThanOrEqual.matches(Ordering::Equal));
        assert!(FilterOp::GreaterThanOrEqual.matches(Ordering::Greater));
        assert!(!FilterOp::GreaterThan.matches(Ordering::Equal));
        assert!(FilterOp::Equal.matches(Ordering::Equal));
    }

    #[test]
    fn test_equality_filter() {
        let query = Query::new("app", "Task").with_filter("priority", FilterOp::Equal, 2i64);
        let results = run(&query, vec![entity(1, 1), entity(2, 2), entity(3, 2)]);
        assert_eq!(results, vec![2, 3]);
    }

    #[test]
    fn test_range_filters_combine() {
        let query = Query::new("app", "Task")
            .with_filter("priority", FilterOp::GreaterThan, 1i64)
            .with_filter("priority", FilterOp::LessThanOrEqual, 3i64);
        let results = run(
            &query,
            vec![entity(1, 1), entity(2, 2), entity(3, 3), entity(4, 4)],
        );
        assert_eq!(results, vec![2, 3]);
    }

    #[test]
    fn test_repeated_property_matches_any_value() {
        let multi = Entity::new(Key::with_id("app", "", "Task", 1))
            .with_repeated_property("tag", "a")
            .with_repeated_property("tag", "b");
        let single = Entity::new(Key::with_id("app", "", "Task", 2)).with_repeated_property("tag", "c");

        let query = Query::new("app", "Task").with_filter("tag", FilterOp::Equal, "b");
        let results = run(&query, vec![multi, single]);
        assert_eq!(results, vec![1]);
    }

    #[test]
    fn test_namespace_scoping() {
        let default_ns = Entity::new(Key::with_id("app", "", "Task", 1));
        let other_ns = Entity::new(Key::with_id("app", "ns1", "Task", 2));

        let query = Query::new("app", "Task");
        assert_eq!(run(&query, vec![default_ns.clone(), other_ns.clone()]), vec![1]);

        let query = Query::new("app", "Task").with_namespace("ns1");
        assert_eq!(run(&query, vec![default_ns, other_ns]), vec![2]);
    }

    #[test]
    fn test_ancestor_filter() {
        let root = Key::with_id("app", "", "Author", 1);
        let inside = Entity::new(root.child_id("Task", 1));
        let outside = Entity::new(Key::with_id("app", "", "Author", 2).child_id("Task", 2));

        let query = Query::new("app", "Task").with_ancestor(root);
        assert_eq!(run(&query, vec![inside, outside]), vec![1]);
    }

    #[test]
    fn test_order_descending_with_key_tiebreak() {
        let query = Query::new("app", "Task").with_order("priority", IndexDirection::Descending);
        let results = run(
            &query,
            vec![entity(1, 2), entity(2, 3), entity(3, 2), entity(4, 1)],
        );
        assert_eq!(results, vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_order_excludes_entities_missing_property() {
        let bare = Entity::new(Key::with_id("app", "", "Task", 9));
        let query = Query::new("app", "Task").with_order("priority", IndexDirection::Ascending);
        let results = run(&query, vec![entity(1, 5), bare, entity(2, 3)]);
        assert_eq!(results, vec![2, 1]);
    }

    #[test]
    fn test_order_on_repeated_property_uses_extremes() {
        let spread = Entity::new(Key::with_id("app", "", "Task", 1))
            .with_repeated_property("priority", 1i64)
            .with_repeated_property("priority", 9i64);
        let middle = entity(2, 5);

        // Smallest value sorts ascending, largest sorts descending, so
        // the spread entity leads both ways.
        let asc = Query::new("app", "Task").with_order("priority", IndexDirection::Ascending);
        assert_eq!(run(&asc, vec![spread.clone(), middle.clone()]), vec![1, 2]);

        let desc = Query::new("app", "Task").with_order("priority", IndexDirection::Descending);
        assert_eq!(run(&desc, vec![spread, middle]), vec![1, 2]);
    }

    #[test]
    fn test_default_order_is_key_order() {
        let query = Query::new("app", "Task");
        let results = run(&query, vec![entity(3, 1), entity(1, 1), entity(2, 1)]);
        assert_eq!(results, vec![1, 2, 3]);
    }

    #[test]
    fn test_key_filter() {
        let boundary = Key::with_id("app", "", "Task", 2);
        let query = Query::new("app", "Task").with_filter(
            burrow_core::KEY_PROPERTY,
            FilterOp::GreaterThanOrEqual,
            PropertyValue::Key(boundary),
        );
        let results = run(&query, vec![entity(1, 1), entity(2, 1), entity(3, 1)]);
        assert_eq!(results, vec![2, 3]);
    }

    #[test]
    fn test_offset_limit_and_cursor() {
        let query = Query::new("app", "Task").with_limit(2);
        let all = vec![entity(1, 1), entity(2, 1), entity(3, 1), entity(4, 1), entity(5, 1)];

        let first = execute(all.clone(), &query);
        assert_eq!(first.entities.len(), 2);
        let cursor = first.cursor.expect("more results remain");

        let second = execute(all.clone(), &query.clone().with_start_cursor(cursor));
        assert_eq!(second.entities.len(), 2);
        let cursor = second.cursor.expect("one more result remains");

        let third = execute(all, &query.with_start_cursor(cursor));
        assert_eq!(third.entities.len(), 1);
        assert_eq!(third.cursor, None);
    }

    #[test]
    fn test_offset_past_end() {
        let query = Query::new("app", "Task").with_offset(10);
        let result = execute(vec![entity(1, 1)], &query);
        assert!(result.entities.is_empty());
        assert_eq!(result.cursor, None);
    }
}
