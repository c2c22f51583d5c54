use crate::engine::query_builder::{JoinCondition, QueryBuildError};
use crate::engine::sql::structure::{
    Column, ColumnName, Database, ForeignKey, Key, KeyReference, Table, TableName,
};
use crate::engine::{JoinStrategy, QualifiedColumn};
use std::collections::HashSet;

type Result<T> = std::result::Result<T, QueryBuildError>;

pub trait Introspective {
    /// Ordered as declared.
    fn columns(&self, table: &TableName) -> Result<&[Column]>;
    /// Foreign keys going out of `table`, and foreign keys pointing at it, inverted so that
    /// they all start at `table`.
    fn neighbors(&self, table: &TableName) -> Result<Vec<ForeignKey>>;
    /// How to join `to` onto `from`. None means the tables have nothing to join on.
    fn join_conditions(
        &self,
        from: &TableName,
        to: &TableName,
        strategy: JoinStrategy,
    ) -> Result<Option<Vec<JoinCondition>>>;
}

impl Introspective for Database {
    fn columns(&self, table: &TableName) -> Result<&[Column]> {
        Ok(self.table_or_err(table)?.columns.as_slice())
    }

    fn neighbors(&self, table: &TableName) -> Result<Vec<ForeignKey>> {
        let direct_joins = self.table_or_err(table)?.foreign_keys.iter().cloned();
        let reverse_joins = self
            .tables
            .values()
            .filter(|other| &other.name != table)
            .flat_map(|other| {
                other
                    .foreign_keys
                    .iter()
                    .filter(|fk| &fk.to.table == table)
            })
            .map(|fk| fk.invert());

        // A key declared on both sides shows up twice, and not necessarily next to itself.
        let mut all_joins: Vec<ForeignKey> = Vec::new();
        for join in direct_joins.chain(reverse_joins) {
            if !all_joins.contains(&join) {
                all_joins.push(join);
            }
        }

        Ok(all_joins)
    }

    fn join_conditions(
        &self,
        from: &TableName,
        to: &TableName,
        strategy: JoinStrategy,
    ) -> Result<Option<Vec<JoinCondition>>> {
        if strategy == JoinStrategy::ForeignKeys {
            if let Some(join) = self.find_declared_join(from, to)? {
                return conditions_for(&join).map(Some);
            }
        }

        let shared = self
            .find_shared_column(from, to)?
            .map(|column| {
                vec![JoinCondition {
                    left: QualifiedColumn::new(from.clone(), column.clone()),
                    right: QualifiedColumn::new(to.clone(), column),
                }]
            });

        Ok(shared)
    }
}

impl Database {
    fn table_or_err(&self, table: &TableName) -> Result<&Table> {
        self.table(table)
            .ok_or_else(|| QueryBuildError::TableNotFound(table.clone()))
    }

    /// The first column of `from`, in declaration order, that `to` has as well.
    fn find_shared_column(&self, from: &TableName, to: &TableName) -> Result<Option<ColumnName>> {
        let from = self.table_or_err(from)?;
        let to = self.table_or_err(to)?;

        let shared = from
            .columns
            .iter()
            .map(|column| &column.name)
            .find(|name| to.has_column(name))
            .cloned();

        Ok(shared)
    }

    /// Returns a foreign key going from `from` to `to`, even if it is actually declared the other
    /// way around.
    fn find_declared_join(&self, from: &TableName, to: &TableName) -> Result<Option<ForeignKey>> {
        if let Some(inverse_join) = self.table_or_err(to)?.get_foreign_key(from) {
            return Ok(Some(inverse_join.invert()));
        }

        if let Some(direct_join) = self.table_or_err(from)?.get_foreign_key(to) {
            return Ok(Some(direct_join.clone()));
        }

        self.find_incidental_join(from, to)
    }

    /// Finds joins that incidentally happen to be usable.
    ///
    /// For tables that don't have direct foreign keys between them, we can
    /// try to find if they share any other foreign key that they share.
    ///
    /// For example, crop_pesticide and crop_district both have a foreign key to the crops
    /// table. We can then join them on crop_id.
    fn find_incidental_join(&self, from: &TableName, to: &TableName) -> Result<Option<ForeignKey>> {
        let from = self.table_or_err(from)?;
        let to = self.table_or_err(to)?;

        let mut first_common = from.foreign_keys.iter().filter_map(|from_fk| {
            // O(n^2) is not the best, but the numbers should be low.
            to.foreign_keys
                .iter()
                .find(|to_fk| {
                    if from_fk.to.table != to_fk.to.table {
                        return false;
                    }

                    // Key order does not matter here.
                    let from_keys: HashSet<_> = from_fk.to.key.columns.iter().collect();
                    let to_keys: HashSet<_> = to_fk.to.key.columns.iter().collect();

                    from_keys == to_keys
                })
                .map(|to_fk| ForeignKey {
                    // Both keys point at the same parent columns. Sorting each side by the
                    // parent column lines their own columns up pairwise.
                    from: KeyReference {
                        table: from.name.clone(),
                        key: columns_sorted_by_parent(from_fk),
                    },
                    to: KeyReference {
                        table: to.name.clone(),
                        key: columns_sorted_by_parent(to_fk),
                    },
                })
        });

        // auto joins get the first possible way to join, even if multiple are available
        Ok(first_common.next())
    }
}

fn conditions_for(join: &ForeignKey) -> Result<Vec<JoinCondition>> {
    if join.from.key.columns.len() != join.to.key.columns.len() || join.from.key.columns.is_empty()
    {
        return Err(QueryBuildError::InvalidForeignKey {
            from: join.from.clone(),
            to: join.to.clone(),
        });
    }

    let conditions = join
        .key_pairs()
        .into_iter()
        .map(|(from_column, to_column)| JoinCondition {
            left: QualifiedColumn::new(join.from.table.clone(), from_column.clone()),
            right: QualifiedColumn::new(join.to.table.clone(), to_column.clone()),
        })
        .collect();

    Ok(conditions)
}

fn columns_sorted_by_parent(key: &ForeignKey) -> Key {
    let mut pairs = key.key_pairs();

    pairs.sort_by_key(|(_, parent_column)| *parent_column);

    Key {
        columns: pairs
            .into_iter()
            .map(|(column, _)| column.clone())
            .collect(),
    }
}
