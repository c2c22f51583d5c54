use crate::commands::{block_on, Target};
use agri_query::analyze::{analyze, sqlite, Database, Introspective, TableName};
use agri_query::{render_columns, render_neighbors, Error, QueryBuildError};
use colored::Colorize;

pub fn tables(target: Target) -> Result<(), Error> {
    let schema = read_schema(&target)?;

    println!("Tables in {}:", target.store.to_string().bold());
    for table in schema.tables.values() {
        println!(
            "  {} ({} columns)",
            table.name.to_string().bold(),
            table.columns.len()
        );
    }

    Ok(())
}

pub fn columns(target: Target, table: &str) -> Result<(), Error> {
    let schema = read_schema(&target)?;
    let table = TableName::from(table);

    let table = schema
        .table(&table)
        .ok_or(QueryBuildError::TableNotFound(table.clone()))?;

    print!("{}", render_columns(table));

    Ok(())
}

pub fn neighbors(target: Target, table: &str) -> Result<(), Error> {
    let schema = read_schema(&target)?;
    let table = TableName::from(table);

    let neighbors = schema.neighbors(&table)?;

    print!("{}", render_neighbors(&table, neighbors));

    Ok(())
}

fn read_schema(target: &Target) -> Result<Database, Error> {
    block_on(async {
        let mut connection = sqlite(&target.store).await?;
        let schema = analyze(&mut connection).await?;
        connection.close().await?;

        Ok::<_, Error>(schema)
    })?
}
