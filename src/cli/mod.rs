//! Terminal front end for the query session.

pub mod dashboard;
pub mod info;
pub mod posts;
pub mod series;
pub mod ui;
