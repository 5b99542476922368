pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{banner, dim, error, info, muted, percent, section, success, summary_row, warn};
pub use progress::Spinner;
pub use table::{TableBuilder, history_table, models_table, stats_table};
pub use theme::{Theme, theme};
