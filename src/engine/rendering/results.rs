use crate::engine::executor::ResultSet;

/// Cells wider than this get cut, so one long text value doesn't push everything off screen.
const MAX_CELL_WIDTH: usize = 40;

pub fn render_results(results: &ResultSet) -> String {
    if let Some(error) = &results.error {
        return format!("Query failed: {error}");
    }

    if results.columns.is_empty() {
        return "Query executed successfully (no results to display)".to_string();
    }

    let rows: Vec<Vec<String>> = results
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| truncate(cell.to_string())).collect())
        .collect();

    let mut widths: Vec<usize> = results
        .columns
        .iter()
        .map(|column| column.chars().count())
        .collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut buffer = render_line(&results.columns, &widths);
    buffer.push_str(&render_line(
        &widths.iter().map(|&width| "-".repeat(width)).collect::<Vec<_>>(),
        &widths,
    ));
    for row in &rows {
        buffer.push_str(&render_line(row, &widths));
    }

    buffer.push_str(&format!("{} results", rows.len()));

    buffer
}

fn render_line(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<_> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();

    let mut line = padded.join(" | ").trim_end().to_string();
    line.push('\n');

    line
}

fn truncate(value: String) -> String {
    if value.chars().count() <= MAX_CELL_WIDTH {
        return value;
    }

    let mut cut: String = value.chars().take(MAX_CELL_WIDTH - 1).collect();
    cut.push('…');

    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::executor::{Cell, ExecutionError};

    #[test]
    fn rows_are_aligned_under_their_headers() {
        let results = ResultSet {
            columns: vec!["crop_id".to_string(), "crop_name".to_string()],
            rows: vec![
                vec![Cell::Integer(1), Cell::Text("Rice".to_string())],
                vec![Cell::Integer(12), Cell::Null],
            ],
            error: None,
        };

        assert_eq!(
            "crop_id | crop_name\n\
             ------- | ---------\n\
             1       | Rice\n\
             12      | NULL\n\
             2 results",
            render_results(&results)
        );
    }

    #[test]
    fn statements_without_columns_get_a_notice() {
        assert_eq!(
            "Query executed successfully (no results to display)",
            render_results(&ResultSet::default())
        );
    }

    #[test]
    fn errors_are_shown_verbatim() {
        let results = ResultSet {
            error: Some(ExecutionError {
                message: "no such column: crops.harvest_moon".to_string(),
            }),
            ..ResultSet::default()
        };

        assert_eq!(
            "Query failed: no such column: crops.harvest_moon",
            render_results(&results)
        );
    }

    #[test]
    fn long_values_are_cut() {
        let long = "x".repeat(MAX_CELL_WIDTH + 10);

        assert_eq!(MAX_CELL_WIDTH, truncate(long).chars().count());
    }
}
