/// Forward-only row cursor over the dataset.
pub mod cursor;
/// Dense numeric view of the composite frame.
pub mod data;
