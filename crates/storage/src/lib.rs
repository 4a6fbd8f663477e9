//! Client-local persistence for the signed-in session.

pub mod repository;
pub mod sqlite;
