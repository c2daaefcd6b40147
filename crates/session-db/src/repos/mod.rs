//! Store implementations on [`SessionDb`](crate::SessionDb).

pub mod session;
