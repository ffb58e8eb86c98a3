pub mod display;
pub mod flow_type;
pub mod input;
pub mod model;
pub mod node;
pub mod transition;

pub use display::*;
pub use flow_type::*;
pub use input::*;
pub use model::*;
pub use node::*;
pub use transition::*;
