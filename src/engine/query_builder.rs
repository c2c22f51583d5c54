use crate::engine::rendering::{render_query, render_query_pretty};
use crate::engine::selection::{ColumnSelection, Filter, OrderBy, SelectionState};
use crate::engine::sql::structure::{Database, KeyReference, TableName};
use crate::engine::{Aggregate, JoinStrategy, Operator, QualifiedColumn};
use thiserror::Error;

pub use sql_introspection::Introspective;

mod sql_introspection;
mod assembler;

/// Compiles the selection into SQL. This never touches the store, everything it needs to know
/// about tables comes from the `schema` snapshot.
pub fn build_query(
    state: &SelectionState,
    schema: &Database,
    strategy: JoinStrategy,
) -> Result<CompiledQuery, QueryBuildError> {
    let builder = assembler::QueryAssembler::new(state, schema, strategy);

    Ok(builder.try_build()?.compile())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryBuildError {
    #[error("Please select at least one table")]
    NoTablesSelected,
    #[error("Table '{0}' not found")]
    TableNotFound(TableName),
    #[error("Invalid foreign key found between {} and {}", from.table, to.table)]
    InvalidForeignKey {
        from: KeyReference,
        to: KeyReference,
    },
}

/// SQL text plus the parameters to bind to its `?` placeholders, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    sql: String,
    params: Vec<String>,
    pretty_sql: String,
}

/// The assembled query, before rendering.
#[derive(Debug, Clone)]
pub struct Query {
    pub select: Projection,
    pub from: TableName,
    pub joins: Vec<Join>,
    pub filters: Vec<Predicate>,
    pub group_by: Vec<QualifiedColumn>,
    pub orders: Vec<OrderBy>,
    pub limit: u64,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Count,
    Items(Vec<Selectable>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selectable {
    /// `table.*`
    AllOf(TableName),
    Column(QualifiedColumn),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Join {
    Left {
        target_table: TableName,
        conditions: Vec<JoinCondition>,
    },
    /// Rendered as `, table`, the way you would write an implicit cross join by hand.
    Cross(TableName),
}

/// `left = right`, where left is on the table joined so far and right on the joined table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    pub left: QualifiedColumn,
    pub right: QualifiedColumn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: QualifiedColumn,
    pub test: Test,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Test {
    /// Any operator that takes exactly one placeholder, LIKE included.
    Compare(Operator),
    /// Holds the number of placeholders.
    In(usize),
    Between,
}

impl Query {
    fn compile(self) -> CompiledQuery {
        let sql = render_query(&self);
        let pretty_sql = render_query_pretty(&self);

        CompiledQuery {
            sql,
            params: self.params,
            pretty_sql,
        }
    }
}

impl CompiledQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Same query, broken into lines for display.
    pub fn pretty_sql(&self) -> &str {
        &self.pretty_sql
    }
}

impl Filter {
    /// Turns the filter into a predicate and the parameters it binds.
    ///
    /// Returns None for BETWEEN filters that don't have exactly two comma separated values. Those
    /// are dropped from the query instead of failing it.
    fn to_predicate(&self) -> Option<(Predicate, Vec<String>)> {
        let column = self.column.clone();

        let (test, params) = match self.operator {
            Operator::Like => (
                Test::Compare(Operator::Like),
                vec![format!("%{}%", self.value)],
            ),
            Operator::In => {
                let values: Vec<_> = split_list(&self.value).collect();

                (Test::In(values.len()), values)
            }
            Operator::Between => {
                let values: Vec<_> = split_list(&self.value).collect();

                if values.len() != 2 {
                    return None;
                }

                (Test::Between, values)
            }
            operator => (Test::Compare(operator), vec![self.value.clone()]),
        };

        Some((Predicate { column, test }, params))
    }
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value.split(',').map(|piece| piece.trim().to_string())
}

impl Selectable {
    fn for_table(table: &TableName, selection: &ColumnSelection) -> Vec<Selectable> {
        match selection {
            ColumnSelection::All => vec![Selectable::AllOf(table.clone())],
            ColumnSelection::Columns(columns) => columns
                .iter()
                .map(|column| Selectable::Column(QualifiedColumn::new(table.clone(), column.clone())))
                .collect(),
        }
    }
}

impl Projection {
    fn from_state(state: &SelectionState) -> Projection {
        if state.aggregate() == Aggregate::CountOnly {
            return Projection::Count;
        }

        let items: Vec<_> = state
            .tables()
            .iter()
            .flat_map(|table| Selectable::for_table(table, state.column_selection(table)))
            .collect();

        if !items.is_empty() {
            return Projection::Items(items);
        }

        // Nothing picked anywhere: never render an empty SELECT.
        Projection::Items(
            state
                .tables()
                .iter()
                .cloned()
                .map(Selectable::AllOf)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::selection::SelectionState;
    use crate::engine::tests::fixture_schema;
    use crate::engine::OrderDirection;

    fn select(tables: &[&str]) -> (SelectionState, Database) {
        let schema = fixture_schema();
        let mut state = SelectionState::new();
        for table in tables {
            state.toggle_table(&schema, &(*table).into()).unwrap();
        }

        (state, schema)
    }

    fn build(state: &SelectionState, schema: &Database) -> CompiledQuery {
        build_query(state, schema, JoinStrategy::SharedColumn).unwrap()
    }

    #[test]
    fn like_filter_on_a_single_table() {
        let (mut state, schema) = select(&["crops"]);
        state
            .add_filter(&schema, "crops", "crop_name", "LIKE", "Rice")
            .unwrap();
        state.set_limit("50");

        let query = build(&state, &schema);

        assert_eq!(
            "SELECT crops.* FROM crops WHERE crops.crop_name LIKE ? LIMIT 50;",
            query.sql()
        );
        assert_eq!(vec!["%Rice%".to_string()], query.params());
    }

    #[test]
    fn building_needs_a_table() {
        let schema = fixture_schema();
        let state = SelectionState::new();

        assert_eq!(
            Err(QueryBuildError::NoTablesSelected),
            build_query(&state, &schema, JoinStrategy::SharedColumn)
        );
    }

    #[test]
    fn non_numeric_limit_uses_default() {
        let (mut state, schema) = select(&["crops"]);
        state.set_limit("lots");

        assert_eq!("SELECT crops.* FROM crops LIMIT 100;", build(&state, &schema).sql());
    }

    #[test]
    fn explicit_columns_keep_selection_order() {
        let (mut state, schema) = select(&["crops"]);
        state
            .set_column_selection(
                &schema,
                &"crops".into(),
                ColumnSelection::Columns(vec!["crop_name".into(), "crop_id".into()]),
            )
            .unwrap();

        assert_eq!(
            "SELECT crops.crop_name, crops.crop_id FROM crops LIMIT 100;",
            build(&state, &schema).sql()
        );
    }

    #[test]
    fn empty_projection_falls_back_to_every_table() {
        let (mut state, schema) = select(&["crops", "crop_requirements"]);
        for table in ["crops", "crop_requirements"] {
            state
                .set_column_selection(&schema, &table.into(), ColumnSelection::Columns(vec![]))
                .unwrap();
        }

        let query = build(&state, &schema);

        assert!(
            query
                .sql()
                .starts_with("SELECT crops.*, crop_requirements.* FROM crops"),
            "{}",
            query.sql()
        );
    }

    #[test]
    fn count_only_ignores_columns() {
        let (mut state, schema) = select(&["crops"]);
        state
            .set_column_selection(
                &schema,
                &"crops".into(),
                ColumnSelection::Columns(vec!["crop_name".into()]),
            )
            .unwrap();
        state.set_aggregate(Aggregate::CountOnly);

        assert_eq!(
            "SELECT COUNT(*) AS count FROM crops LIMIT 100;",
            build(&state, &schema).sql()
        );
    }

    #[test]
    fn in_filter_binds_each_trimmed_value() {
        let (mut state, schema) = select(&["crops"]);
        state
            .add_filter(&schema, "crops", "crop_name", "IN", "a, b ,c")
            .unwrap();

        let query = build(&state, &schema);

        assert_eq!(
            "SELECT crops.* FROM crops WHERE crops.crop_name IN (?,?,?) LIMIT 100;",
            query.sql()
        );
        assert_eq!(vec!["a", "b", "c"], query.params());
    }

    #[test]
    fn in_filter_keeps_empty_pieces() {
        let (mut state, schema) = select(&["crops"]);
        state
            .add_filter(&schema, "crops", "crop_name", "IN", "a,,b")
            .unwrap();

        let query = build(&state, &schema);

        assert_eq!(
            "SELECT crops.* FROM crops WHERE crops.crop_name IN (?,?,?) LIMIT 100;",
            query.sql()
        );
        assert_eq!(vec!["a", "", "b"], query.params());
    }

    #[test]
    fn between_binds_two_values() {
        let (mut state, schema) = select(&["crop_production_statistic"]);
        state
            .add_filter(&schema, "crop_production_statistic", "yield", "BETWEEN", "1, 2.5")
            .unwrap();

        let query = build(&state, &schema);

        assert_eq!(
            "SELECT crop_production_statistic.* FROM crop_production_statistic \
             WHERE crop_production_statistic.yield BETWEEN ? AND ? LIMIT 100;",
            query.sql()
        );
        assert_eq!(vec!["1", "2.5"], query.params());
    }

    #[test]
    fn malformed_between_is_dropped() {
        let (mut state, schema) = select(&["crops"]);
        state
            .add_filter(&schema, "crops", "crop_id", "BETWEEN", "1,2,3")
            .unwrap();
        state
            .add_filter(&schema, "crops", "crop_group", "=", "Cereals")
            .unwrap();

        let query = build(&state, &schema);

        assert_eq!(
            "SELECT crops.* FROM crops WHERE crops.crop_group = ? LIMIT 100;",
            query.sql()
        );
        assert_eq!(vec!["Cereals"], query.params());
    }

    #[test]
    fn between_with_an_empty_bound_is_kept() {
        let (mut state, schema) = select(&["crops"]);
        state
            .add_filter(&schema, "crops", "crop_id", "BETWEEN", "1,")
            .unwrap();

        let query = build(&state, &schema);

        assert_eq!(
            "SELECT crops.* FROM crops WHERE crops.crop_id BETWEEN ? AND ? LIMIT 100;",
            query.sql()
        );
        assert_eq!(vec!["1", ""], query.params());
    }

    #[test]
    fn placeholders_match_parameters() {
        let (mut state, schema) = select(&["crop_production_statistic"]);
        let filters = [
            ("season", "=", "Kharif"),
            ("area", ">", "10"),
            ("area", "<", "1000"),
            ("yield", ">=", "1"),
            ("yield", "<=", "9"),
            ("season", "LIKE", "har"),
        ];
        for (column, operator, value) in filters {
            state
                .add_filter(&schema, "crop_production_statistic", column, operator, value)
                .unwrap();
        }

        let query = build(&state, &schema);

        assert_eq!(filters.len(), query.params().len());
        assert_eq!(filters.len(), query.sql().matches('?').count());
        assert_eq!(filters.len() - 1, query.sql().matches(" AND ").count());
        assert_eq!("Kharif", query.params()[0]);
        assert_eq!("%har%", query.params()[5]);
    }

    #[test]
    fn tables_sharing_a_column_are_left_joined() {
        let (state, schema) = select(&["crops", "crop_production_statistic"]);

        assert_eq!(
            "SELECT crops.*, crop_production_statistic.* FROM crops \
             LEFT JOIN crop_production_statistic ON crops.crop_id = crop_production_statistic.crop_id \
             LIMIT 100;",
            build(&state, &schema).sql()
        );
    }

    #[test]
    fn tables_sharing_nothing_are_cross_joined() {
        let (state, schema) = select(&["crops", "districts"]);

        assert_eq!(
            "SELECT crops.*, districts.* FROM crops , districts LIMIT 100;",
            build(&state, &schema).sql()
        );
    }

    #[test]
    fn joins_only_look_at_the_previous_table() {
        // districts shares nothing with crops, markets shares district_id with districts
        let (state, schema) = select(&["crops", "districts", "markets"]);

        let sql = build(&state, &schema).sql().to_string();

        assert!(
            sql.contains(
                "FROM crops , districts LEFT JOIN markets ON districts.district_id = markets.district_id"
            ),
            "{sql}"
        );
    }

    #[test]
    fn strategies_agree_when_names_line_up() {
        let (state, schema) = select(&["markets", "crop_arrival_price"]);
        let expected =
            "LEFT JOIN crop_arrival_price ON markets.market_id = crop_arrival_price.market_id";

        let heuristic = build(&state, &schema);
        let declared = build_query(&state, &schema, JoinStrategy::ForeignKeys).unwrap();

        assert!(heuristic.sql().contains(expected), "{}", heuristic.sql());
        assert_eq!(heuristic, declared);
    }

    #[test]
    fn foreign_key_strategy_avoids_unrelated_shared_columns() {
        // crop_group comes first in crop_requirements, but the declared key goes through crop_id
        let (state, schema) = select(&["crop_requirements", "crops"]);

        let heuristic = build(&state, &schema);
        let declared = build_query(&state, &schema, JoinStrategy::ForeignKeys).unwrap();

        assert!(
            heuristic
                .sql()
                .contains("LEFT JOIN crops ON crop_requirements.crop_group = crops.crop_group"),
            "{}",
            heuristic.sql()
        );
        assert!(
            declared
                .sql()
                .contains("LEFT JOIN crops ON crop_requirements.crop_id = crops.crop_id"),
            "{}",
            declared.sql()
        );
    }

    #[test]
    fn foreign_key_strategy_joins_through_a_common_parent() {
        // neither table references the other, both reference crops
        let (state, schema) = select(&["crop_pesticide", "crop_district"]);

        let declared = build_query(&state, &schema, JoinStrategy::ForeignKeys).unwrap();

        assert!(
            declared
                .sql()
                .contains("LEFT JOIN crop_district ON crop_pesticide.crop_id = crop_district.crop_id"),
            "{}",
            declared.sql()
        );
    }

    #[test]
    fn foreign_key_strategy_still_cross_joins_unrelated_tables() {
        let (state, schema) = select(&["crops", "districts"]);

        let declared = build_query(&state, &schema, JoinStrategy::ForeignKeys).unwrap();

        assert!(declared.sql().contains("FROM crops , districts"), "{}", declared.sql());
    }

    #[test]
    fn grouping_and_ordering_follow_insertion_order() {
        let (mut state, schema) = select(&["crop_production_statistic"]);
        state.set_aggregate(Aggregate::CountOnly);
        for column in ["season", "crop_id"] {
            state
                .add_group_by(
                    &schema,
                    QualifiedColumn::new("crop_production_statistic", column),
                )
                .unwrap();
        }
        state
            .add_order_by(
                &schema,
                QualifiedColumn::new("crop_production_statistic", "season"),
                OrderDirection::Descending,
            )
            .unwrap();
        state
            .add_order_by(
                &schema,
                QualifiedColumn::new("crop_production_statistic", "crop_id"),
                OrderDirection::Ascending,
            )
            .unwrap();

        assert_eq!(
            "SELECT COUNT(*) AS count FROM crop_production_statistic \
             GROUP BY crop_production_statistic.season, crop_production_statistic.crop_id \
             ORDER BY crop_production_statistic.season DESC, crop_production_statistic.crop_id ASC \
             LIMIT 100;",
            build(&state, &schema).sql()
        );
    }

    #[test]
    fn building_twice_gives_the_same_query() {
        let (mut state, schema) = select(&["crops", "crop_production_statistic"]);
        state
            .add_filter(&schema, "crops", "crop_name", "IN", "Rice,Wheat")
            .unwrap();
        state
            .add_filter(&schema, "crop_production_statistic", "season", "LIKE", "Rabi")
            .unwrap();

        assert_eq!(build(&state, &schema), build(&state, &schema));
    }

    #[test]
    fn missing_tables_fail_the_build() {
        let (state, mut schema) = select(&["crops", "districts"]);
        schema.tables.remove(&"districts".into());

        assert_eq!(
            Err(QueryBuildError::TableNotFound("districts".into())),
            build_query(&state, &schema, JoinStrategy::SharedColumn)
        );
    }
}
