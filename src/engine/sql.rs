/// Talks to the store: connections and schema analysis.
pub mod querying;
/// Structs used to represent database structure.
pub mod structure;
