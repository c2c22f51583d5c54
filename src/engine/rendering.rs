pub use columns::render_columns;
pub use neighbors::render_neighbors;
pub(crate) use query_rendering::{render_query, render_query_pretty};
pub use results::render_results;

use crate::engine::CompiledQuery;
use std::fmt::{Display, Formatter};

mod columns;
mod neighbors;
mod query_rendering;
mod results;

/// The pretty SQL, with its parameters in a trailing comment so the whole thing can still be
/// pasted into a SQL shell.
pub fn render_preview(query: &CompiledQuery) -> String {
    let mut preview = query.pretty_sql().to_string();

    if !query.params().is_empty() {
        preview.push_str(&format!("\n\n-- Parameters: {:?}", query.params()));
    }

    preview
}

struct OptionalClause<'a, T> {
    lead: &'a str,
    intro: &'a str,
    ligature: &'a str,
    items: &'a [T],
}

impl<'a, T> OptionalClause<'a, T> {
    fn filter(lead: &'a str, ligature: &'a str, items: &'a [T]) -> Self {
        OptionalClause {
            lead,
            intro: "WHERE",
            ligature,
            items,
        }
    }

    fn group_by(lead: &'a str, items: &'a [T]) -> Self {
        OptionalClause {
            lead,
            intro: "GROUP BY",
            ligature: ", ",
            items,
        }
    }

    fn order_by(lead: &'a str, items: &'a [T]) -> Self {
        OptionalClause {
            lead,
            intro: "ORDER BY",
            ligature: ", ",
            items,
        }
    }
}

/// Displays things like "WHERE x AND Y AND Z", "GROUP BY 1, 2, 3", and "ORDER BY 1, 2, 3".
/// These are all optional clauses that have a ligature between each element. Empty clauses
/// render as nothing at all, lead included.
impl<'a, T> Display for OptionalClause<'a, T>
where
    T: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Self {
            lead,
            intro,
            ligature,
            items,
        } = self;

        if let Some((first, rest)) = items.split_first() {
            write!(f, "{lead}{intro} {first}")?;

            for item in rest {
                write!(f, "{ligature}{item}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::query_builder::build_query;
    use crate::engine::tests::fixture_schema;
    use crate::engine::{JoinStrategy, SelectionState};

    #[test]
    fn empty_clauses_render_nothing() {
        let items: [&str; 0] = [];

        assert_eq!("", OptionalClause::group_by(" ", &items).to_string());
        assert_eq!(
            " GROUP BY a, b",
            OptionalClause::group_by(" ", &["a", "b"]).to_string()
        );
    }

    #[test]
    fn preview_lists_parameters() {
        let schema = fixture_schema();
        let mut state = SelectionState::new();
        state.toggle_table(&schema, &"crops".into()).unwrap();
        state
            .add_filter(&schema, "crops", "crop_group", "=", "Cereals")
            .unwrap();

        let query = build_query(&state, &schema, JoinStrategy::SharedColumn).unwrap();

        assert_eq!(
            "SELECT crops.*\nFROM crops\nWHERE crops.crop_group = ?\nLIMIT 100;\n\n-- Parameters: [\"Cereals\"]",
            render_preview(&query)
        );
    }

    #[test]
    fn preview_without_parameters_is_just_the_query() {
        let schema = fixture_schema();
        let mut state = SelectionState::new();
        state.toggle_table(&schema, &"crops".into()).unwrap();

        let query = build_query(&state, &schema, JoinStrategy::SharedColumn).unwrap();

        assert_eq!("SELECT crops.*\nFROM crops\nLIMIT 100;", render_preview(&query));
    }
}
