pub mod github;
pub mod testgrid;
