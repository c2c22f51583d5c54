use crate::engine::executor::{execute, ResultSet};
use crate::engine::query_builder::{build_query, CompiledQuery};
use crate::engine::selection::{ColumnSelection, SelectionError, SelectionState, Toggle};
use crate::engine::sql::querying::{analyze, sqlite, Analyzer};
use crate::engine::sql::structure::{Database, StoreParams, TableName};
use crate::engine::{Aggregate, JoinStrategy, OrderDirection, QualifiedColumn};
use crate::Error;
use log::{debug, info, warn};

/// Owns one selection and the schema snapshot it is checked against.
///
/// Connections are never held between actions: every method that needs the store opens a
/// connection and closes it before returning.
pub struct Session {
    store: StoreParams,
    strategy: JoinStrategy,
    schema: Database,
    state: SelectionState,
}

impl Session {
    pub async fn open(store: StoreParams, strategy: JoinStrategy) -> Result<Session, Error> {
        let schema = load_schema(&store).await?;

        Ok(Session {
            store,
            strategy,
            schema,
            state: SelectionState::new(),
        })
    }

    pub fn schema(&self) -> &Database {
        &self.schema
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Re-reads the schema if it changed since the snapshot was taken. Returns true if it did.
    pub async fn refresh_schema(&mut self) -> Result<bool, Error> {
        let mut connection = sqlite(&self.store).await?;
        let version = connection.schema_version().await?;

        if version == self.schema.schema_version {
            connection.close().await?;

            return Ok(false);
        }

        info!(
            "schema changed from version {} to {version}, reloading",
            self.schema.schema_version
        );

        self.schema = analyze(&mut connection).await?;
        connection.close().await?;

        if let Err(error) = self.state.validate(&self.schema) {
            warn!("the current selection no longer matches the schema: {error}");
        }

        Ok(true)
    }

    /// Adds or removes a table. The schema gets refreshed first, so newly created tables can be
    /// picked without restarting.
    pub async fn toggle_table(&mut self, table: &TableName) -> Result<Toggle, Error> {
        self.refresh_schema().await?;

        Ok(self.state.toggle_table(&self.schema, table)?)
    }

    pub fn set_column_selection(
        &mut self,
        table: &TableName,
        selection: ColumnSelection,
    ) -> Result<(), SelectionError> {
        self.state
            .set_column_selection(&self.schema, table, selection)
    }

    pub fn add_filter(
        &mut self,
        table: &str,
        column: &str,
        operator: &str,
        value: &str,
    ) -> Result<(), SelectionError> {
        self.state
            .add_filter(&self.schema, table, column, operator, value)
    }

    pub fn remove_filter(&mut self, index: usize) -> bool {
        self.state.remove_filter(index).is_some()
    }

    pub fn add_group_by(&mut self, column: QualifiedColumn) -> Result<bool, SelectionError> {
        self.state.add_group_by(&self.schema, column)
    }

    pub fn add_order_by(
        &mut self,
        column: QualifiedColumn,
        direction: OrderDirection,
    ) -> Result<bool, SelectionError> {
        self.state.add_order_by(&self.schema, column, direction)
    }

    pub fn set_aggregate(&mut self, aggregate: Aggregate) {
        self.state.set_aggregate(aggregate);
    }

    pub fn set_limit(&mut self, limit: &str) {
        self.state.set_limit(limit);
    }

    pub fn clear_all(&mut self) {
        self.state.clear_all();
    }

    /// Replaces the selection with one loaded from elsewhere, as long as it fits the schema.
    pub fn restore(&mut self, state: SelectionState) -> Result<(), SelectionError> {
        state.validate(&self.schema)?;
        self.state = state;

        Ok(())
    }

    pub fn build(&self) -> Result<CompiledQuery, Error> {
        Ok(build_query(&self.state, &self.schema, self.strategy)?)
    }

    /// Builds and executes. Only building can fail here, execution problems are in the
    /// [`ResultSet`].
    pub async fn run(&mut self) -> Result<(CompiledQuery, ResultSet), Error> {
        if let Err(error) = self.refresh_schema().await {
            // The query will most likely fail too, and report it.
            warn!("could not refresh the schema: {error}");
        }

        let query = self.build()?;
        let results = execute(&query, &self.store).await;

        Ok((query, results))
    }

    /// Distinct values to suggest for a filter. Failing to read them is not worth bothering the
    /// user with, so errors just give no suggestions.
    pub async fn sample_values(&self, column: &QualifiedColumn) -> Vec<String> {
        match self.try_sample_values(column).await {
            Ok(values) => values,
            Err(error) => {
                debug!("no sample values for {column}: {error}");

                Vec::new()
            }
        }
    }

    async fn try_sample_values(&self, column: &QualifiedColumn) -> Result<Vec<String>, Error> {
        let known = self
            .schema
            .table(&column.table)
            .is_some_and(|table| table.has_column(&column.column));
        if !known {
            return Err(SelectionError::UnknownColumn(column.clone()).into());
        }

        let mut connection = sqlite(&self.store).await?;
        let values = connection
            .sample_values(&column.table, &column.column)
            .await?;
        connection.close().await?;

        Ok(values)
    }
}

async fn load_schema(store: &StoreParams) -> Result<Database, Error> {
    let mut connection = sqlite(store).await?;
    let schema = analyze(&mut connection).await?;
    connection.close().await?;

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::executor::Cell;
    use crate::engine::tests::fixture_store;
    use crate::ErrorKind;

    #[tokio::test]
    async fn opening_reads_the_schema() {
        let (_dir, store) = fixture_store().await;

        let session = Session::open(store, JoinStrategy::SharedColumn)
            .await
            .unwrap();

        assert!(session.schema().table(&"crops".into()).is_some());
        assert!(session.state().tables().is_empty());
    }

    #[tokio::test]
    async fn new_tables_can_be_toggled_without_reopening() {
        let (_dir, store) = fixture_store().await;
        let mut session = Session::open(store.clone(), JoinStrategy::SharedColumn)
            .await
            .unwrap();

        let mut connection = sqlite(&store).await.unwrap();
        sqlx::query("CREATE TABLE soil_samples (sample_id INTEGER PRIMARY KEY, ph REAL)")
            .execute(connection.as_inner())
            .await
            .unwrap();
        connection.close().await.unwrap();

        let toggle = session.toggle_table(&"soil_samples".into()).await.unwrap();

        assert_eq!(Toggle::Added, toggle);
    }

    #[tokio::test]
    async fn unknown_tables_are_rejected() {
        let (_dir, store) = fixture_store().await;
        let mut session = Session::open(store, JoinStrategy::SharedColumn)
            .await
            .unwrap();

        let error = session
            .toggle_table(&"tractors".into())
            .await
            .unwrap_err();

        assert!(matches!(
            error.kind(),
            ErrorKind::SelectionError(SelectionError::UnknownTable(_))
        ));
    }

    #[tokio::test]
    async fn sample_values_are_distinct() {
        let (_dir, store) = fixture_store().await;
        let session = Session::open(store, JoinStrategy::SharedColumn)
            .await
            .unwrap();

        let mut seasons = session
            .sample_values(&QualifiedColumn::new("crop_production_statistic", "season"))
            .await;
        seasons.sort();

        assert_eq!(vec!["Kharif", "Rabi"], seasons);
    }

    #[tokio::test]
    async fn sample_values_of_unknown_columns_are_empty() {
        let (_dir, store) = fixture_store().await;
        let session = Session::open(store, JoinStrategy::SharedColumn)
            .await
            .unwrap();

        let values = session
            .sample_values(&QualifiedColumn::new("crops", "harvest_moon"))
            .await;

        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn restoring_checks_the_selection() {
        let (_dir, store) = fixture_store().await;
        let mut session = Session::open(store, JoinStrategy::SharedColumn)
            .await
            .unwrap();
        let json = r#"{
            "tables": ["tractors"],
            "columns": {},
            "filters": [],
            "group_by": [],
            "order_by": [],
            "aggregate": "AllRows",
            "limit": null
        }"#;
        let state: SelectionState = serde_json::from_str(json).unwrap();

        assert_eq!(
            Err(SelectionError::UnknownTable("tractors".into())),
            session.restore(state)
        );
        assert!(session.state().tables().is_empty());
    }

    #[tokio::test]
    async fn run_builds_and_executes() {
        let (_dir, store) = fixture_store().await;
        let mut session = Session::open(store, JoinStrategy::SharedColumn)
            .await
            .unwrap();
        session.toggle_table(&"crops".into()).await.unwrap();
        session
            .set_column_selection(
                &"crops".into(),
                ColumnSelection::Columns(vec!["crop_name".into()]),
            )
            .unwrap();
        session
            .add_filter("crops", "crop_name", "LIKE", "ric")
            .unwrap();

        let (query, results) = session.run().await.unwrap();

        assert_eq!(
            "SELECT crops.crop_name FROM crops WHERE crops.crop_name LIKE ? LIMIT 100;",
            query.sql()
        );
        assert_eq!(vec![vec![Cell::Text("Rice".to_string())]], results.rows);
    }
}
