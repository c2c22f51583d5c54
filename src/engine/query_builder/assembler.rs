use crate::engine::query_builder::sql_introspection::Introspective;
use crate::engine::query_builder::{Join, Predicate, Projection, Query, QueryBuildError};
use crate::engine::selection::{OrderBy, SelectionState};
use crate::engine::sql::structure::{Database, TableName};
use crate::engine::{JoinStrategy, QualifiedColumn};
use log::debug;

pub struct QueryAssembler<'a> {
    state: &'a SelectionState,
    schema: &'a Database,
    strategy: JoinStrategy,
}

impl<'a> QueryAssembler<'a> {
    pub fn new(state: &'a SelectionState, schema: &'a Database, strategy: JoinStrategy) -> Self {
        QueryAssembler {
            state,
            schema,
            strategy,
        }
    }

    pub fn try_build(self) -> Result<Query, QueryBuildError> {
        let (from, rest) = self
            .state
            .tables()
            .split_first()
            .ok_or(QueryBuildError::NoTablesSelected)?;

        let select = Projection::from_state(self.state);
        let joins = self.process_joins(from, rest)?;
        let (filters, params) = self.process_filters();
        let group_by = self.process_group_by();
        let orders = self.process_orders();

        Ok(Query {
            select,
            from: from.clone(),
            joins,
            filters,
            group_by,
            orders,
            limit: self.state.limit(),
            params,
        })
    }

    /// Each table joins to the one selected right before it, never to anything earlier.
    fn process_joins(
        &self,
        from: &TableName,
        rest: &[TableName],
    ) -> Result<Vec<Join>, QueryBuildError> {
        // Lookups fail early for tables that went missing since they were selected.
        self.schema.columns(from)?;

        let mut previous = from;
        let mut joins = Vec::with_capacity(rest.len());

        for table in rest {
            let join = match self
                .schema
                .join_conditions(previous, table, self.strategy)?
            {
                Some(conditions) => Join::Left {
                    target_table: table.clone(),
                    conditions,
                },
                None => {
                    debug!("nothing in common between {previous} and {table}, cross joining");

                    Join::Cross(table.clone())
                }
            };

            joins.push(join);
            previous = table;
        }

        Ok(joins)
    }

    fn process_filters(&self) -> (Vec<Predicate>, Vec<String>) {
        let mut params = Vec::new();
        let mut predicates = Vec::with_capacity(self.state.filters().len());

        for filter in self.state.filters() {
            match filter.to_predicate() {
                Some((predicate, filter_params)) => {
                    predicates.push(predicate);
                    params.extend(filter_params);
                }
                None => debug!(
                    "dropping {} {} filter, expected two comma separated values but got {:?}",
                    filter.column, filter.operator, filter.value
                ),
            }
        }

        (predicates, params)
    }

    fn process_group_by(&self) -> Vec<QualifiedColumn> {
        self.state.group_by().to_vec()
    }

    fn process_orders(&self) -> Vec<OrderBy> {
        self.state.order_by().to_vec()
    }
}
