pub mod context;
pub mod doctor;
pub mod facts;
pub mod interview;
pub mod note;

pub use context::context;
pub use doctor::doctor;
pub use facts::facts;
pub use interview::interview;
pub use note::note;
