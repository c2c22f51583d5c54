use crate::engine::sql::structure::Table;

pub fn render_columns(table: &Table) -> String {
    let mut buffer = format!("Columns for `{}`:\n", table.name);

    let name_width = table
        .columns
        .iter()
        .map(|column| column.name.as_str().len())
        .max()
        .unwrap_or_default();

    for column in &table.columns {
        let declared_type = if column.declared_type.is_empty() {
            "(untyped)"
        } else {
            column.declared_type.as_str()
        };

        let line = format!("  {:<name_width$}  {declared_type}", column.name.as_str());
        buffer.push_str(line.trim_end());

        if column.is_primary_key {
            buffer.push_str("  PRIMARY KEY");
        }

        buffer.push('\n');
    }

    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::fixture_schema;

    #[test]
    fn columns_are_listed_in_declaration_order() {
        let schema = fixture_schema();
        let table = schema.table(&"crops".into()).unwrap();

        assert_eq!(
            "Columns for `crops`:\n  \
               crop_id     INTEGER  PRIMARY KEY\n  \
               crop_name   VARCHAR(100)\n  \
               crop_group  VARCHAR(100)\n",
            render_columns(table)
        );
    }
}
