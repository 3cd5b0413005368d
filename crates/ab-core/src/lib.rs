pub mod config;
pub mod error;
pub mod flex;
pub mod geometry;
pub mod grid;
pub mod id;
pub mod model;
pub mod tree;

pub use config::LayoutConfig;
pub use error::Error;
pub use flex::{
    Direction, FlexContainer, FlexItem, FlexSolution, content_cross_extent, content_main_extent,
    solve_flex,
};
pub use geometry::{Padding, Rect, bounding_box};
pub use grid::{GridCell, GridContainer, GridItem, GridSolution, resolve_columns, solve_grid};
pub use id::NodeId;
pub use model::*;
pub use tree::ContainmentIndex;
