pub mod boolean;
pub mod ranked;

pub use boolean::{evaluate, parse, Expr};
pub use ranked::{daat, parse_query, taat, ScoredDoc};
