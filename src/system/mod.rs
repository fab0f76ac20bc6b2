pub(crate) mod banner;
pub(crate) mod summary_output;

pub(crate) use summary_output::selection_line;
