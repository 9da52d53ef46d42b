pub mod completion;
pub mod request;
pub mod schedule;
pub mod time;

pub use completion::*;
pub use request::*;
pub use schedule::*;
pub use time::*;
