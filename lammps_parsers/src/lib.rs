pub mod dump;
pub mod xyz;
pub mod convert;

pub use dump::{
    Atom,
    BoxBounds,
    Frame,
    read_dump,
};
pub use convert::{
    Conversion,
    OutputRecord,
    SelectionPolicy,
    TrajectoryConverter,
};
