pub mod dataset;
pub mod form;
pub mod geometry;
pub mod media;
pub mod project;
pub mod record;
pub mod site;
pub mod species;
pub mod statistics;
pub mod user;
