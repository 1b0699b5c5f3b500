mod identities;

pub use identities::*;
