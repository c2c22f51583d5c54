use crate::engine::sql::structure::{ForeignKey, Key, TableName};

/// Lists the tables `table` can be joined with through declared foreign keys, in either
/// direction. `neighbors` are expected to start at `table`.
pub fn render_neighbors(table: &TableName, neighbors: Vec<ForeignKey>) -> String {
    if neighbors.is_empty() {
        return format!("`{table}` has no foreign keys to or from other tables\n");
    }

    let mut rendering = format!("Foreign keys of `{table}`:\n");

    for fk in neighbors {
        rendering.push_str(&format!(
            "  {}.{} using {}\n",
            fk.to.table,
            joined(&fk.to.key),
            joined(&fk.from.key)
        ));
    }

    rendering
}

fn joined(key: &Key) -> String {
    key.columns
        .iter()
        .map(|column| column.as_str())
        .collect::<Vec<_>>()
        .join("+")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::query_builder::Introspective;
    use crate::engine::tests::fixture_schema;

    #[test]
    fn each_neighbor_gets_a_line() {
        let schema = fixture_schema();
        let table: TableName = "crop_pesticide".into();

        let rendering = render_neighbors(&table, schema.neighbors(&table).unwrap());

        assert_eq!(
            "Foreign keys of `crop_pesticide`:\n  \
               crops.crop_id using crop_id\n  \
               pesticide_use.pesticide_id using pesticide_id\n",
            rendering
        );
    }

    #[test]
    fn lonely_tables_say_so() {
        let rendering = render_neighbors(&"farm_notes".into(), vec![]);

        assert_eq!(
            "`farm_notes` has no foreign keys to or from other tables\n",
            rendering
        );
    }
}
