use crate::commands::{block_on, Target};
use agri_query::saved::{SavedSelection, SelectionName};
use agri_query::{cache, export_csv, render_preview, render_results, Error};
use colored::Colorize;
use std::path::Path;

pub fn run(target: Target, name: &str, export: Option<&Path>) -> Result<(), Error> {
    let saved: SavedSelection = cache::read(&SelectionName::from(name))?;

    let (query, results) = block_on(async {
        let mut session = target.open_session().await?;
        session.restore(saved.state)?;

        session.run().await
    })??;

    println!("{}\n", query.sql().dimmed());
    println!("{}", render_results(&results));

    if let Some(error) = results.error {
        return Err(error.into());
    }

    if let Some(path) = export {
        let written = export_csv(&results, path)?;

        println!("Exported {written} rows to {}", path.display().to_string().bold());
    }

    Ok(())
}

pub fn show(target: Target, name: &str) -> Result<(), Error> {
    let saved: SavedSelection = cache::read(&SelectionName::from(name))?;

    let query = block_on(async {
        let mut session = target.open_session().await?;
        session.restore(saved.state)?;

        session.build()
    })??;

    println!("{}", render_preview(&query));

    Ok(())
}

pub fn list() -> Result<(), Error> {
    let saved: Vec<SavedSelection> = cache::read_all()?;

    if saved.is_empty() {
        println!("Nothing saved yet. Use agq build to make and save a selection.");

        return Ok(());
    }

    println!("Saved selections:");
    for selection in saved {
        let tables: Vec<_> = selection
            .state
            .tables()
            .iter()
            .map(|table| table.to_string())
            .collect();

        println!(
            "   {}: {}",
            selection.name.to_string().bold(),
            tables.join(", ")
        );
    }

    Ok(())
}
