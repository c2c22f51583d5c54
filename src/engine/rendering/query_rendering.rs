use crate::engine::query_builder::{
    Join, JoinCondition, Predicate, Projection, Query, Selectable, Test,
};
use crate::engine::rendering::OptionalClause;
use crate::engine::OrderBy;
use std::fmt::{Display, Formatter};

struct Layout {
    /// Goes before every clause after SELECT, and before each LEFT JOIN.
    clause_break: &'static str,
    filter_ligature: &'static str,
}

const SINGLE_LINE: Layout = Layout {
    clause_break: " ",
    filter_ligature: " AND ",
};

const PRETTY: Layout = Layout {
    clause_break: "\n",
    filter_ligature: "\n  AND ",
};

/// The SQL that gets executed.
pub(crate) fn render_query(query: &Query) -> String {
    format!("{};", Rendered::new(query, &SINGLE_LINE))
}

/// Same query, one clause per line.
pub(crate) fn render_query_pretty(query: &Query) -> String {
    format!("{};", Rendered::new(query, &PRETTY))
}

struct Rendered<'a> {
    query: &'a Query,
    layout: &'a Layout,
}

impl<'a> Rendered<'a> {
    fn new(query: &'a Query, layout: &'a Layout) -> Self {
        Rendered { query, layout }
    }
}

impl Display for Rendered<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Layout {
            clause_break,
            filter_ligature,
        } = self.layout;
        let query = self.query;

        write!(f, "SELECT {}", query.select)?;
        write!(f, "{clause_break}FROM {}", query.from)?;

        for join in &query.joins {
            match join {
                Join::Cross(_) => write!(f, " {join}")?,
                Join::Left { .. } => write!(f, "{clause_break}{join}")?,
            }
        }

        write!(
            f,
            "{}",
            OptionalClause::filter(clause_break, filter_ligature, query.filters.as_slice())
        )?;
        write!(
            f,
            "{}",
            OptionalClause::group_by(clause_break, query.group_by.as_slice())
        )?;
        write!(
            f,
            "{}",
            OptionalClause::order_by(clause_break, query.orders.as_slice())
        )?;
        write!(f, "{clause_break}LIMIT {}", query.limit)?;

        Ok(())
    }
}

impl Display for Projection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Projection::Count => write!(f, "COUNT(*) AS count"),
            Projection::Items(items) => {
                if let Some((last, first)) = items.split_last() {
                    for item in first {
                        write!(f, "{item}, ")?;
                    }

                    write!(f, "{last}")?;
                }

                Ok(())
            }
        }
    }
}

impl Display for Selectable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Selectable::AllOf(table) => write!(f, "{table}.*"),
            Selectable::Column(column) => write!(f, "{column}"),
        }
    }
}

impl Display for Join {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Join::Cross(table) => write!(f, ", {table}"),
            Join::Left {
                target_table,
                conditions,
            } => {
                write!(f, "LEFT JOIN {target_table} ON ")?;

                let mut condition_iterator = conditions.iter();

                if let Some(condition) = condition_iterator.next() {
                    write!(f, "{condition}")?;
                }

                for condition in condition_iterator {
                    write!(f, " AND {condition}")?;
                }

                Ok(())
            }
        }
    }
}

impl Display for JoinCondition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let column = &self.column;

        match self.test {
            Test::Compare(operator) => write!(f, "{column} {operator} ?"),
            Test::Between => write!(f, "{column} BETWEEN ? AND ?"),
            Test::In(count) => {
                let placeholders = vec!["?"; count].join(",");

                write!(f, "{column} IN ({placeholders})")
            }
        }
    }
}

impl Display for OrderBy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.column, self.direction)
    }
}
