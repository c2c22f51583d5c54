//! The interactive query builder. Every menu action maps to one session operation, and mistakes
//! are reported as warnings so the user can just try again.
use crate::commands::{block_on, warn, Target};
use agri_query::analyze::TableName;
use agri_query::saved::{SavedSelection, SelectionName};
use agri_query::{
    cache, export_csv, render_preview, render_results, Aggregate, ColumnSelection, Error,
    Operator, OrderDirection, QualifiedColumn, ResultSet, SelectionState, Session, Toggle,
};
use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{FuzzySelect, Input, MultiSelect, Select};
use std::path::PathBuf;

#[derive(Clone, Copy)]
enum Action {
    ToggleTable,
    ChooseColumns,
    AddFilter,
    RemoveFilter,
    AddGroupBy,
    AddOrderBy,
    SwitchAggregate,
    SetLimit,
    ClearAll,
    Preview,
    Run,
    Export,
    Save,
    Quit,
}

const ACTIONS: [(Action, &str); 14] = [
    (Action::ToggleTable, "Add or remove a table"),
    (Action::ChooseColumns, "Choose columns"),
    (Action::AddFilter, "Add a filter"),
    (Action::RemoveFilter, "Remove a filter"),
    (Action::AddGroupBy, "Group by"),
    (Action::AddOrderBy, "Order by"),
    (Action::SwitchAggregate, "Switch between all rows and count only"),
    (Action::SetLimit, "Set the row limit"),
    (Action::ClearAll, "Clear filters, grouping and ordering"),
    (Action::Preview, "Preview SQL"),
    (Action::Run, "Run"),
    (Action::Export, "Export the last results to CSV"),
    (Action::Save, "Save the selection"),
    (Action::Quit, "Quit"),
];

pub fn build(target: Target) -> Result<(), Error> {
    block_on(async {
        let mut session = target.open_session().await?;

        println!(
            "Building a query on {}. Use arrow keys (⬆⬇) to navigate and {} to confirm.",
            target.store.to_string().bold(),
            "<enter>".bold(),
        );

        interact(&mut session).await
    })?
}

async fn interact(session: &mut Session) -> Result<(), Error> {
    let theme = ColorfulTheme::default();
    let mut last_results: Option<ResultSet> = None;

    loop {
        println!();
        print!("{}", describe(session.state()));

        let labels: Vec<_> = ACTIONS.iter().map(|(_, label)| *label).collect();
        let choice = Select::with_theme(&theme)
            .with_prompt("What next?")
            .items(&labels)
            .default(0)
            .interact()?;

        match ACTIONS[choice].0 {
            Action::ToggleTable => toggle_table(session, &theme).await?,
            Action::ChooseColumns => choose_columns(session, &theme)?,
            Action::AddFilter => add_filter(session, &theme).await?,
            Action::RemoveFilter => remove_filter(session, &theme)?,
            Action::AddGroupBy => add_group_by(session, &theme)?,
            Action::AddOrderBy => add_order_by(session, &theme)?,
            Action::SwitchAggregate => {
                let aggregate = match session.state().aggregate() {
                    Aggregate::AllRows => Aggregate::CountOnly,
                    Aggregate::CountOnly => Aggregate::AllRows,
                };
                session.set_aggregate(aggregate);
            }
            Action::SetLimit => {
                let limit: String = Input::with_theme(&theme)
                    .with_prompt("Limit (empty for the default)")
                    .allow_empty(true)
                    .interact_text()?;
                session.set_limit(&limit);
            }
            Action::ClearAll => session.clear_all(),
            Action::Preview => match session.build() {
                Ok(query) => println!("\n{}", render_preview(&query)),
                Err(error) => warn(error),
            },
            Action::Run => match session.run().await {
                Ok((query, results)) => {
                    println!("\n{}\n", render_preview(&query).dimmed());
                    println!("{}", render_results(&results));
                    last_results = Some(results);
                }
                Err(error) => warn(error),
            },
            Action::Export => export(last_results.as_ref(), &theme)?,
            Action::Save => save(session.state(), &theme)?,
            Action::Quit => return Ok(()),
        }
    }
}

async fn toggle_table(session: &mut Session, theme: &ColorfulTheme) -> Result<(), Error> {
    let tables: Vec<TableName> = session.schema().table_names().cloned().collect();
    let labels: Vec<_> = tables
        .iter()
        .map(|table| {
            let marker = if session.state().is_selected(table) {
                "[x]"
            } else {
                "[ ]"
            };
            format!("{marker} {table}")
        })
        .collect();

    let Some(choice) = FuzzySelect::with_theme(theme)
        .with_prompt("Table")
        .items(&labels)
        .interact_opt()?
    else {
        return Ok(());
    };

    match session.toggle_table(&tables[choice]).await {
        Ok(Toggle::Added) => println!("Added {}", tables[choice].to_string().bold()),
        Ok(Toggle::Removed) => println!(
            "Removed {} and everything that referenced it",
            tables[choice].to_string().bold()
        ),
        Err(error) => warn(error),
    }

    Ok(())
}

fn choose_columns(session: &mut Session, theme: &ColorfulTheme) -> Result<(), Error> {
    let Some(table) = pick_selected_table(session, theme)? else {
        return Ok(());
    };

    let all = Select::with_theme(theme)
        .with_prompt(format!("Columns of {table}"))
        .items(&["All columns", "Pick columns"])
        .default(0)
        .interact()?
        == 0;

    let selection = if all {
        ColumnSelection::All
    } else {
        let columns: Vec<_> = session
            .schema()
            .table(&table)
            .map(|table| table.columns.iter().map(|c| c.name.clone()).collect::<Vec<_>>())
            .unwrap_or_default();
        let defaults: Vec<bool> = match session.state().column_selection(&table) {
            ColumnSelection::All => vec![false; columns.len()],
            ColumnSelection::Columns(picked) => {
                columns.iter().map(|c| picked.contains(c)).collect()
            }
        };

        println!("Use {} to select, {} to confirm.", "<space>".bold(), "<enter>".bold());
        let picked = MultiSelect::with_theme(theme)
            .items(&columns)
            .defaults(&defaults)
            .interact()?;

        ColumnSelection::Columns(picked.into_iter().map(|i| columns[i].clone()).collect())
    };

    if let Err(error) = session.set_column_selection(&table, selection) {
        warn(error);
    }

    Ok(())
}

async fn add_filter(session: &mut Session, theme: &ColorfulTheme) -> Result<(), Error> {
    let Some(column) = pick_column(session, theme, "Filter on")? else {
        return Ok(());
    };

    let operators: Vec<_> = Operator::ALL.iter().map(|o| o.symbol()).collect();
    let operator = Operator::ALL[Select::with_theme(theme)
        .with_prompt("Operator")
        .items(&operators)
        .default(0)
        .interact()?];

    let value = match operator {
        Operator::In => ask_value(theme, "Values, separated by commas")?,
        Operator::Between => ask_value(theme, "Lower and upper bound, separated by a comma")?,
        _ => suggest_value(session, theme, &column).await?,
    };

    let added = session.add_filter(
        column.table.as_str(),
        column.column.as_str(),
        operator.symbol(),
        &value,
    );
    if let Err(error) = added {
        warn(error);
    }

    Ok(())
}

/// Offers the values the column already has, with the option of typing something else.
async fn suggest_value(
    session: &Session,
    theme: &ColorfulTheme,
    column: &QualifiedColumn,
) -> Result<String, Error> {
    let samples = session.sample_values(column).await;
    if samples.is_empty() {
        return ask_value(theme, "Value");
    }

    let mut options = vec!["<type a value>".to_string()];
    options.extend(samples);

    let choice = FuzzySelect::with_theme(theme)
        .with_prompt("Value")
        .items(&options)
        .default(0)
        .interact()?;

    if choice == 0 {
        ask_value(theme, "Value")
    } else {
        Ok(options.swap_remove(choice))
    }
}

fn ask_value(theme: &ColorfulTheme, prompt: &str) -> Result<String, Error> {
    Ok(Input::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?)
}

fn remove_filter(session: &mut Session, theme: &ColorfulTheme) -> Result<(), Error> {
    if session.state().filters().is_empty() {
        warn("there are no filters to remove");

        return Ok(());
    }

    let labels: Vec<_> = session
        .state()
        .filters()
        .iter()
        .map(|filter| format!("{} {} {}", filter.column, filter.operator, filter.value))
        .collect();

    if let Some(choice) = Select::with_theme(theme)
        .with_prompt("Remove which filter?")
        .items(&labels)
        .interact_opt()?
    {
        session.remove_filter(choice);
    }

    Ok(())
}

fn add_group_by(session: &mut Session, theme: &ColorfulTheme) -> Result<(), Error> {
    let Some(column) = pick_column(session, theme, "Group by")? else {
        return Ok(());
    };

    match session.add_group_by(column) {
        Ok(true) => {}
        Ok(false) => warn("already grouped by that column"),
        Err(error) => warn(error),
    }

    Ok(())
}

fn add_order_by(session: &mut Session, theme: &ColorfulTheme) -> Result<(), Error> {
    let Some(column) = pick_column(session, theme, "Order by")? else {
        return Ok(());
    };

    let direction = match Select::with_theme(theme)
        .with_prompt("Direction")
        .items(&["ASC", "DESC"])
        .default(0)
        .interact()?
    {
        0 => OrderDirection::Ascending,
        _ => OrderDirection::Descending,
    };

    match session.add_order_by(column, direction) {
        Ok(true) => {}
        Ok(false) => warn("already ordered that way"),
        Err(error) => warn(error),
    }

    Ok(())
}

fn export(results: Option<&ResultSet>, theme: &ColorfulTheme) -> Result<(), Error> {
    let Some(results) = results.filter(|results| !results.rows.is_empty()) else {
        warn("no results to export, run a query first");

        return Ok(());
    };

    let path: String = Input::with_theme(theme)
        .with_prompt("CSV file")
        .default("results.csv".to_string())
        .interact_text()?;

    match export_csv(results, &PathBuf::from(&path)) {
        Ok(written) => println!("Exported {written} rows to {}", path.bold()),
        Err(error) => warn(error),
    }

    Ok(())
}

fn save(state: &SelectionState, theme: &ColorfulTheme) -> Result<(), Error> {
    let name: String = Input::with_theme(theme)
        .with_prompt("Save as")
        .interact_text()?;

    cache::write(&SavedSelection {
        name: SelectionName::from(name.trim()),
        state: state.clone(),
    })?;

    println!(
        "Saved. Run it again with {}.",
        format!("agq run {}", name.trim()).bold()
    );

    Ok(())
}

fn pick_selected_table(
    session: &Session,
    theme: &ColorfulTheme,
) -> Result<Option<TableName>, Error> {
    let tables = session.state().tables();
    if tables.is_empty() {
        warn("add a table first");

        return Ok(None);
    }

    let choice = Select::with_theme(theme)
        .with_prompt("Table")
        .items(tables)
        .default(0)
        .interact_opt()?;

    Ok(choice.map(|index| tables[index].clone()))
}

/// Any column of the selected tables.
fn pick_column(
    session: &Session,
    theme: &ColorfulTheme,
    prompt: &str,
) -> Result<Option<QualifiedColumn>, Error> {
    let columns: Vec<QualifiedColumn> = session
        .state()
        .tables()
        .iter()
        .filter_map(|table| session.schema().table(table))
        .flat_map(|table| {
            table
                .columns
                .iter()
                .map(|column| QualifiedColumn::new(table.name.clone(), column.name.clone()))
        })
        .collect();

    if columns.is_empty() {
        warn("add a table first");

        return Ok(None);
    }

    let choice = FuzzySelect::with_theme(theme)
        .with_prompt(prompt)
        .items(&columns)
        .interact_opt()?;

    Ok(choice.map(|index| columns[index].clone()))
}

fn describe(state: &SelectionState) -> String {
    if state.tables().is_empty() {
        return "Nothing selected yet.\n".to_string();
    }

    let mut buffer = String::new();

    let tables: Vec<_> = state
        .tables()
        .iter()
        .map(|table| match state.column_selection(table) {
            ColumnSelection::All => format!("{table} (all columns)"),
            ColumnSelection::Columns(columns) => {
                let names: Vec<_> = columns.iter().map(|c| c.as_str()).collect();
                format!("{table} ({})", names.join(", "))
            }
        })
        .collect();
    buffer.push_str(&format!("{} {}\n", "Tables:".bold(), tables.join(", ")));

    for filter in state.filters() {
        buffer.push_str(&format!(
            "{} {} {} {}\n",
            "Filter:".bold(),
            filter.column,
            filter.operator,
            filter.value
        ));
    }

    if !state.group_by().is_empty() {
        let columns: Vec<_> = state.group_by().iter().map(|c| c.to_string()).collect();
        buffer.push_str(&format!("{} {}\n", "Group by:".bold(), columns.join(", ")));
    }

    if !state.order_by().is_empty() {
        let orders: Vec<_> = state
            .order_by()
            .iter()
            .map(|order| format!("{} {}", order.column, order.direction))
            .collect();
        buffer.push_str(&format!("{} {}\n", "Order by:".bold(), orders.join(", ")));
    }

    if state.aggregate() == Aggregate::CountOnly {
        buffer.push_str(&format!("{} count only\n", "Rows:".bold()));
    }

    buffer.push_str(&format!("{} {}\n", "Limit:".bold(), state.limit()));

    buffer
}
