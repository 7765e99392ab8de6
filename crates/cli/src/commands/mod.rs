pub mod backends;
pub mod batch;
pub mod compare;
pub mod history;
pub mod layout;
pub mod scan;
pub mod util;
pub mod workspace;

pub use backends::*;
pub use batch::*;
pub use compare::*;
pub use history::*;
pub use layout::*;
pub use scan::*;
pub use util::*;
pub use workspace::*;
