use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::value_as_text;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::In(column, _) => column,
        }
    }

    /// PostgREST operator expression, e.g. `eq.pending` or `in.("a","b")`.
    pub fn expression(&self) -> String {
        match self {
            Filter::Eq(_, value) => format!("eq.{}", value_as_text(value)),
            Filter::In(_, values) => {
                let list = values
                    .iter()
                    .map(|value| format!("\"{}\"", value_as_text(value).replace('"', "\\\"")))
                    .collect::<Vec<_>>()
                    .join(",");
                format!("in.({list})")
            }
        }
    }

    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::Eq(column, expected) => row
                .get(column)
                .map(|actual| same_value(actual, expected))
                .unwrap_or(false),
            Filter::In(column, candidates) => row
                .get(column)
                .map(|actual| candidates.iter().any(|c| same_value(actual, c)))
                .unwrap_or(false),
        }
    }
}

fn same_value(actual: &Value, expected: &Value) -> bool {
    actual == expected || value_as_text(actual) == value_as_text(expected)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn in_<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filters.push(Filter::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), compact_columns(&self.columns))];

        for filter in &self.filters {
            params.push((filter.column().to_string(), filter.expression()));
        }

        if let Some(order) = &self.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{direction}", order.column)));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }

    /// Evaluates the query against in-process rows: filter, order, limit, project.
    pub fn apply(&self, rows: &[Value]) -> Vec<Value> {
        let mut selected: Vec<Value> = rows.iter().filter(|row| self.matches(row)).cloned().collect();

        if let Some(order) = &self.order {
            selected.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }

        let columns = plain_columns(&self.columns);
        if columns.is_empty() {
            return selected;
        }

        selected
            .into_iter()
            .map(|row| {
                let projected: Map<String, Value> = columns
                    .iter()
                    .filter_map(|column| row.get(*column).map(|v| (column.to_string(), v.clone())))
                    .collect();
                Value::Object(projected)
            })
            .collect()
    }
}

fn compact_columns(columns: &str) -> String {
    columns.split_whitespace().collect::<Vec<_>>().join("")
}

/// Simple column names; `*` or embedded resources yield an empty list (all columns).
fn plain_columns(columns: &str) -> Vec<&str> {
    let parts: Vec<&str> = columns.split(',').map(str::trim).collect();
    if parts.iter().any(|part| *part == "*" || part.contains('(')) {
        return Vec::new();
    }
    parts.into_iter().filter(|part| !part.is_empty()).collect()
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .unwrap_or_default()
            .total_cmp(&y.as_f64().unwrap_or_default()),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, _) => Ordering::Greater,
        (_, Some(Value::Null) | None) => Ordering::Less,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Query;

    #[test]
    fn renders_postgrest_parameters() {
        let query = Query::from("bookings")
            .select("*, customer:profiles!bookings_customer_id_fkey(full_name, phone_number)")
            .eq("status", "pending")
            .in_("id", ["a", "b"])
            .order("pickup_time", true)
            .limit(5);

        let params = query.to_params();
        assert_eq!(
            params[0].1,
            "*,customer:profiles!bookings_customer_id_fkey(full_name,phone_number)"
        );
        assert_eq!(params[1], ("status".to_string(), "eq.pending".to_string()));
        assert_eq!(params[2], ("id".to_string(), "in.(\"a\",\"b\")".to_string()));
        assert_eq!(params[3], ("order".to_string(), "pickup_time.asc".to_string()));
        assert_eq!(params[4], ("limit".to_string(), "5".to_string()));
    }

    #[test]
    fn applies_filters_order_and_projection() {
        let rows = vec![
            json!({ "city_name": "Pune", "district": "Pune", "is_active": true }),
            json!({ "city_name": "Alibag", "district": "Raigad", "is_active": true }),
            json!({ "city_name": "Old Town", "district": "Raigad", "is_active": false }),
        ];

        let result = Query::from("maharashtra_locations")
            .select("city_name, district")
            .eq("is_active", true)
            .order("city_name", true)
            .apply(&rows);

        assert_eq!(
            result,
            vec![
                json!({ "city_name": "Alibag", "district": "Raigad" }),
                json!({ "city_name": "Pune", "district": "Pune" }),
            ]
        );
    }

    #[test]
    fn descending_order_puts_missing_values_first() {
        let rows = vec![
            json!({ "id": 1, "created_at": "2026-01-01" }),
            json!({ "id": 2 }),
            json!({ "id": 3, "created_at": "2026-02-01" }),
        ];

        let ids: Vec<_> = Query::from("routes")
            .order("created_at", false)
            .apply(&rows)
            .iter()
            .map(|row| row["id"].as_i64().unwrap())
            .collect();

        assert_eq!(ids, vec![2, 3, 1]);
    }
}
